use std::fmt;

use crate::config::environment::Environment;

/// Cache entry: bearer token plus the instant it stops being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub token: String,
    pub expires_at_ms: i64, // UNIX TIMESTAMP, milliseconds
}

impl CachedToken {
    pub fn new(token: String, expires_at_ms: i64) -> Self {
        Self { token, expires_at_ms }
    }

    pub fn is_fresh(&self, now_ms: i64) -> bool {
        self.expires_at_ms > now_ms
    }
}

/// Tokens are memoized per (client id, environment, scope).
/// `scope: None` is its own dimension, distinct from any string value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub client_id: String,
    pub environment: Environment,
    pub scope: Option<String>,
}

impl CacheKey {
    pub fn new(client_id: impl Into<String>, environment: Environment, scope: Option<String>) -> Self {
        Self {
            client_id: client_id.into(),
            environment,
            scope,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{}-{}-scope:{}", self.client_id, self.environment, scope),
            None => write!(f, "{}-{}-<no scope>", self.client_id, self.environment),
        }
    }
}
