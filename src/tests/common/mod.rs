// tests/common/mod.rs
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use tokio::task::JoinHandle;

use crate::config::vendor::VendorConfig;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// Vendor config pointing both environments at local mock servers.
pub fn vendor_config(sandbox_url: &str, production_url: &str) -> Arc<VendorConfig> {
    let mut vendor = VendorConfig::default();
    vendor.environments.sandbox.base_url = sandbox_url.to_owned();
    vendor.environments.production.base_url = production_url.to_owned();
    Arc::new(vendor)
}

/// Expected `Authorization` header value for HTTP Basic auth.
pub fn basic_auth(client_id: &str, client_secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", client_id, client_secret)))
}
