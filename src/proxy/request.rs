use serde::Deserialize;
use serde_json::Value;

use crate::config::environment::Environment;
use crate::proxy::error::ProxyError;
use crate::sources::ClientCredentials;

/// Inbound envelope sent by the frontend. `payload` is forwarded to the
/// vendor untouched.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub environment: Option<Environment>,
    pub scope: Option<String>,
    pub payload: Option<Value>,
}

impl ProxyRequest {
    pub fn parse(body: &[u8]) -> Result<Self, ProxyError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ProxyError::InvalidRequest("request body is required".to_owned()));
        }
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ProxyError::InvalidRequest(format!("request body is not valid JSON: {}", e)))?;
        if value.is_null() {
            return Err(ProxyError::InvalidRequest("request body is required".to_owned()));
        }
        serde_json::from_value(value)
            .map_err(|e| ProxyError::InvalidRequest(format!("invalid request body: {}", e)))
    }

    pub fn credentials(&self) -> ClientCredentials {
        ClientCredentials::new(self.client_id.as_str(), self.client_secret.as_str())
    }
}
