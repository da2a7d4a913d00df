//! # Payer Gateway Library
//!
//! Proxies eligibility, claim and payer-list requests to a payer API,
//! authenticating each call with an OAuth2 client-credentials token that is
//! cached per client, environment and scope until it nears expiry.
//!
//! Modules:
//! - `config` — service configuration, environments, vendor routes
//! - `cache` — token cache implementation
//! - `sources` — client credentials and the token exchange
//! - `proxy` — HTTP handlers forwarding to the vendor API
//! - `server` — axum server and shared state

pub mod cache;
pub mod config;
pub mod helpers;
pub mod observability;
pub mod proxy;
pub mod server;
pub mod sources;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::cache::token_cache::TokenCache;
pub use crate::config::environment::Environment;
pub use crate::config::service::ServiceConfig;
pub use crate::sources::{ClientCredentials, TokenError};
