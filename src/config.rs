use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::auth::{Role, User};
use crate::error::AppError;

pub fn load_environment() -> Result<(), Box<dyn std::error::Error>> {
    let is_production =
        dotenvy::var("DASHBOARD_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        warn!("Warning: Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}

/// Process configuration, read after the env files have been layered.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub state_dir: PathBuf,
    pub session_token: Option<String>,
    pub operator: String,
    pub role: Role,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let api_base_url = dotenvy::var("DASHBOARD_API_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        let state_dir = dotenvy::var("DASHBOARD_STATE_DIR")
            .unwrap_or_else(|_| ".dashboard-admin".to_string());
        let session_token = dotenvy::var("DASHBOARD_SESSION_TOKEN")
            .ok()
            .filter(|token| !token.is_empty());
        let operator = dotenvy::var("DASHBOARD_OPERATOR").unwrap_or_else(|_| "admin".to_string());
        let role = match dotenvy::var("DASHBOARD_ROLE") {
            Ok(raw) => {
                Role::from_str(&raw).map_err(|err| AppError::Validation(err.to_string()))?
            }
            _ => Role::Admin,
        };

        Ok(Self {
            api_base_url,
            state_dir: PathBuf::from(state_dir),
            session_token,
            operator,
            role,
        })
    }

    /// The identity every permission check runs against.
    pub fn operator_user(&self) -> User {
        User {
            id: 0,
            username: self.operator.clone(),
            role: self.role.clone(),
        }
    }
}
