use axum::{
    body::Bytes,
    http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// Vendor answer, relayed to the caller unchanged.
#[derive(Debug, Clone)]
pub struct VendorResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl IntoResponse for VendorResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        match self.content_type {
            Some(value) => {
                response.headers_mut().insert(CONTENT_TYPE, value);
            }
            None => {
                response.headers_mut().remove(CONTENT_TYPE);
            }
        }
        response
    }
}

/// Calls the vendor business API with a bearer token.
#[derive(Debug, Clone)]
pub struct VendorClient {
    client: Client,
}

impl VendorClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        payload: Option<&Value>,
    ) -> Result<VendorResponse, reqwest::Error> {
        debug!("forwarding {} {}", method, url);
        let mut request = self.client.request(method, url).bearer_auth(token);
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let response = request.send().await?;
        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response.bytes().await?;
        debug!("vendor responded {} ({} bytes)", status, body.len());

        Ok(VendorResponse { status, content_type, body })
    }
}
