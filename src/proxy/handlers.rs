use axum::{
    body::Bytes,
    extract::State,
    http::Method,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::vendor::VendorRoutes;
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::proxy::error::ProxyError;
use crate::proxy::forward::VendorResponse;
use crate::proxy::request::ProxyRequest;
use crate::server::server::AppState;

/// Vendor operations exposed by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorRoute {
    Eligibility,
    ClaimSubmission,
    ClaimValidation,
    Payers,
}

impl VendorRoute {
    pub fn label(&self) -> &'static str {
        match self {
            VendorRoute::Eligibility => "eligibility",
            VendorRoute::ClaimSubmission => "claim_submission",
            VendorRoute::ClaimValidation => "claim_validation",
            VendorRoute::Payers => "payers",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            VendorRoute::Payers => Method::GET,
            _ => Method::POST,
        }
    }

    fn requires_payload(&self) -> bool {
        !matches!(self, VendorRoute::Payers)
    }

    fn vendor_path<'a>(&self, routes: &'a VendorRoutes) -> &'a str {
        match self {
            VendorRoute::Eligibility => &routes.eligibility,
            VendorRoute::ClaimSubmission => &routes.claim_submission,
            VendorRoute::ClaimValidation => &routes.claim_validation,
            VendorRoute::Payers => &routes.payers,
        }
    }
}

pub async fn eligibility(State(state): State<AppState>, body: Bytes) -> Response {
    proxy(&state, VendorRoute::Eligibility, body).await
}

pub async fn claim_submission(State(state): State<AppState>, body: Bytes) -> Response {
    proxy(&state, VendorRoute::ClaimSubmission, body).await
}

pub async fn claim_validation(State(state): State<AppState>, body: Bytes) -> Response {
    proxy(&state, VendorRoute::ClaimValidation, body).await
}

pub async fn payers(State(state): State<AppState>, body: Bytes) -> Response {
    proxy(&state, VendorRoute::Payers, body).await
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn proxy(state: &AppState, route: VendorRoute, body: Bytes) -> Response {
    let metrics = get_metrics().await;
    let start = get_instant();

    let response = match relay(state, route, &body).await {
        Ok(vendor_response) => vendor_response.into_response(),
        Err(e) => {
            warn!("{} request failed: {}", route.label(), e);
            e.into_response()
        }
    };

    let status = response.status();
    info!("{} -> {}", route.label(), status);
    metrics
        .proxy_requests
        .with_label_values(&[route.label(), status.as_str()])
        .inc();
    metrics
        .proxy_duration
        .with_label_values(&[route.label()])
        .observe(start.elapsed().as_secs_f64());
    response
}

async fn relay(state: &AppState, route: VendorRoute, body: &[u8]) -> Result<VendorResponse, ProxyError> {
    let request = ProxyRequest::parse(body)?;

    let payload = if route.requires_payload() {
        let payload = request
            .payload
            .as_ref()
            .ok_or_else(|| ProxyError::InvalidRequest("payload is required".to_owned()))?;
        Some(payload)
    } else {
        None
    };

    let environment = request.environment.unwrap_or(state.vendor.default_environment);
    let token = state
        .token_cache
        .get_access_token(&request.credentials(), environment, request.scope.as_deref())
        .await?;

    let url = state
        .vendor
        .endpoint_url(environment, route.vendor_path(&state.vendor.routes));
    let response = state
        .vendor_client
        .send(route.method(), &url, &token, payload)
        .await?;
    Ok(response)
}
