use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use reqwest::Client;
use tokio::net::TcpListener;
use tracing::info;

use crate::cache::token_cache::TokenCache;
use crate::config::settings::SettingsConfig;
use crate::config::vendor::VendorConfig;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::proxy::forward::VendorClient;
use crate::proxy::routes;
use crate::sources::HttpTokenExchange;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub token_cache: Arc<TokenCache>,
    pub vendor: Arc<VendorConfig>,
    pub vendor_client: VendorClient,
}

impl AppState {
    pub fn new(
        metrics: &Metrics,
        vendor: Arc<VendorConfig>,
        client: Client,
        token_cache: Arc<TokenCache>,
    ) -> Self {
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            token_cache,
            vendor,
            vendor_client: VendorClient::new(client),
        }
    }

    /// Wires a system-clock token cache over the shared HTTP client.
    pub fn from_config(
        metrics: &Metrics,
        settings: &SettingsConfig,
        vendor: Arc<VendorConfig>,
        client: Client,
    ) -> Self {
        let exchange = HttpTokenExchange::new(client.clone(), vendor.clone());
        let token_cache = Arc::new(TokenCache::new(exchange, settings.token.safety_margin_seconds()));
        Self::new(metrics, vendor, client, token_cache)
    }
}

pub fn router(settings_config: &SettingsConfig, state: AppState) -> Router {
    Router::new()
        .merge(state.metrics_state.router(&settings_config.metrics))
        .merge(routes::router())
        .with_state(state)
}

/// Serve the gateway until ctrl-c.
pub async fn start(settings_config: &SettingsConfig, state: AppState) -> Result<()> {
    let metrics = get_metrics().await;
    let app = router(settings_config, state);

    let bind_addr = format!("{}:{}", settings_config.server.host, settings_config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("listening on {}", bind_addr);

    metrics.up.set(1);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;
    metrics.up.set(0);

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
