use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use payer_gateway::observability::metrics::get_metrics;
use payer_gateway::server;
use payer_gateway::server::server::AppState;
use payer_gateway::utils::config_loader;
use payer_gateway::utils::logging;
use payer_gateway::utils::logging::LogLevel;
use payer_gateway::Environment;
use reqwest::Client;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "payer-gateway.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// overrides vendor.default_environment from the config file
    #[arg(long, env = "DEFAULT_ENVIRONMENT")]
    default_environment: Option<Environment>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Read args, load YAML config
    // -------------------------------

    let args = Args::parse();
    let mut service_config = config_loader::run(&args.config).await?;
    if let Some(environment) = args.default_environment {
        service_config.vendor.default_environment = environment;
    }
    logging::run(&service_config, args.log_level).await?;

    // -------------------------------
    // 2. Shared request client, token cache
    // -------------------------------

    let client = Client::builder().build()?;
    let metrics = get_metrics().await;
    let vendor = Arc::new(service_config.vendor.clone());
    let state = AppState::from_config(metrics, &service_config.settings, vendor, client);

    info!(
        "default environment: {}, token safety margin: {}s",
        service_config.vendor.default_environment,
        service_config.settings.token.safety_margin_seconds()
    );

    // -------------------------------
    // 3. Serve proxy + metrics
    // -------------------------------

    info!("Service starting...");
    server::server::start(&service_config.settings, state).await
}
