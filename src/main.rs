mod auth;
mod bus;
mod cli;
mod config;
mod error;
mod forms;
mod http;
mod models;
mod nav;
mod pages;
mod provision;
mod sections;
mod store;
mod telemetry;
mod view;
#[cfg(test)]
mod test;

use clap::Parser;
use tracing::info;

use cli::Cli;
use config::AppConfig;
use telemetry::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    if let Err(err) = config::load_environment() {
        anyhow::bail!("Failed to load environment: {}", err);
    }

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    info!(api = %config.api_base_url, role = %config.role, "Starting dashboard-admin");

    if let Err(err) = cli::run(cli, config).await {
        err.log_and_record("running command");
        eprintln!("{}", err.user_message());
        std::process::exit(1);
    }

    Ok(())
}
