use std::sync::Arc;

use http::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::environment::Environment;
use crate::config::vendor::VendorConfig;
use crate::sources::credentials::ClientCredentials;
use crate::sources::error::TokenError;
use crate::utils::constants::GRANT_TYPE_CLIENT_CREDENTIALS;

/// Success body of the auth endpoint. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    /// lifetime in seconds
    pub expires_in: u64,
}

/// Performs the OAuth2 client-credentials grant against the
/// environment-specific auth endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenExchange {
    client: Client,
    vendor: Arc<VendorConfig>,
}

impl HttpTokenExchange {
    pub fn new(client: Client, vendor: Arc<VendorConfig>) -> Self {
        Self { client, vendor }
    }

    pub async fn exchange(
        &self,
        credentials: &ClientCredentials,
        environment: Environment,
        scope: Option<&str>,
    ) -> Result<TokenResponse, TokenError> {
        let url = self.vendor.token_url(environment);
        debug!("requesting token from {} for client '{}'", url, credentials.client_id);

        let mut form = vec![("grant_type", GRANT_TYPE_CLIENT_CREDENTIALS)];
        if let Some(scope) = scope {
            form.push(("scope", scope));
        }

        let response = self
            .client
            .post(&url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body = response.text().await?;
            warn!("token request for client '{}' failed: {}", credentials.client_id, status);
            return Err(TokenError::Rejected { status, content_type, body });
        }

        let body = response.text().await?;
        serde_json::from_str::<TokenResponse>(&body)
            .map_err(|e| TokenError::MalformedResponse(e.to_string()))
    }
}
