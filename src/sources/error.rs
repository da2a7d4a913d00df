use http::StatusCode;
use thiserror::Error;

/// Failures of the client-credentials exchange. The token cache never
/// recovers from any of these; they go straight back to the caller.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(&'static str),

    /// Non-2xx answer from the auth endpoint, kept verbatim for relay.
    #[error("token endpoint responded with {status}")]
    Rejected {
        status: StatusCode,
        content_type: Option<String>,
        body: String,
    },

    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed token response: {0}")]
    MalformedResponse(String),
}

impl TokenError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::InvalidCredentials(_) => "invalid_credentials",
            TokenError::Rejected { .. } => "rejected",
            TokenError::Transport(_) => "transport",
            TokenError::MalformedResponse(_) => "malformed",
        }
    }
}
