pub mod credentials;
pub mod error;
pub mod token_exchange;

pub use credentials::ClientCredentials;
pub use error::TokenError;
pub use token_exchange::{HttpTokenExchange, TokenResponse};
