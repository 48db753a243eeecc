use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, instrument};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::{Page, PageDraft, PagePatch};
use crate::pages::PagesApi;
use crate::provision::{ProvisionAck, ProvisionApi, ProvisionErrorBody, TableSpec};

/// REST client for the dashboard backend. The configured session
/// cookie rides along on every request.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.session_token {
            let value = HeaderValue::from_str(&format!("session_token={}", token))
                .map_err(|err| AppError::Internal(format!("Invalid session token: {}", err)))?;
            headers.insert(COOKIE, value);
        }

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn ensure_success(response: &reqwest::Response) -> Result<(), AppError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AppError::Status {
                status: status.as_u16(),
            })
        }
    }

    #[instrument(skip(self))]
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let response = self.http.get(self.url(path)).send().await?;
        Self::ensure_success(&response)?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self, body))]
    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Self::ensure_success(&response)?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self, body))]
    async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let response = self.http.put(self.url(path)).json(body).send().await?;
        Self::ensure_success(&response)?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self))]
    async fn delete(&self, path: &str) -> Result<(), AppError> {
        let response = self.http.delete(self.url(path)).send().await?;
        Self::ensure_success(&response)
    }
}

#[async_trait]
impl PagesApi for ApiClient {
    async fn list_pages(&self) -> Result<Vec<Page>, AppError> {
        info!("Fetching all pages");
        self.get_json("/api/admin/pages").await
    }

    async fn get_page(&self, id: i64) -> Result<Page, AppError> {
        info!(page_id = id, "Fetching page");
        self.get_json(&format!("/api/admin/pages/{}", id)).await
    }

    async fn create_page(&self, draft: &PageDraft) -> Result<Page, AppError> {
        info!(title = %draft.title, "Creating page");
        self.post_json("/api/admin/pages", draft).await
    }

    async fn update_page(&self, id: i64, patch: &PagePatch) -> Result<Page, AppError> {
        info!(page_id = id, "Updating page");
        self.put_json(&format!("/api/admin/pages/{}", id), patch)
            .await
    }

    async fn delete_page(&self, id: i64) -> Result<(), AppError> {
        info!(page_id = id, "Deleting page");
        self.delete(&format!("/api/admin/pages/{}", id)).await
    }
}

#[async_trait]
impl ProvisionApi for ApiClient {
    /// The one flow that surfaces the server's error text: rejections
    /// carry `{error}` and fall back to a generic message.
    async fn create_table(&self, spec: &TableSpec) -> Result<String, AppError> {
        info!(
            table_name = %spec.table_name,
            columns = spec.fields.len(),
            "Provisioning table"
        );
        let response = self
            .http
            .post(self.url("/api/admin/dynamic/tables"))
            .json(spec)
            .send()
            .await?;

        if !response.status().is_success() {
            let message = response
                .json::<ProvisionErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(AppError::ExternalService(message));
        }

        let ack: ProvisionAck = response.json().await?;
        Ok(ack.data.table_name)
    }
}
