use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::sources::TokenError;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("vendor request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Token(TokenError::InvalidCredentials(_)) => StatusCode::BAD_REQUEST,

            // vendor auth error goes back exactly as received
            ProxyError::Token(TokenError::Rejected { status, content_type, body }) => {
                let mut response = (*status, body.clone()).into_response();
                if let Some(value) = content_type.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
                    response.headers_mut().insert(CONTENT_TYPE, value);
                }
                return response;
            }

            ProxyError::Token(TokenError::Transport(_))
            | ProxyError::Token(TokenError::MalformedResponse(_))
            | ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };

        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}
