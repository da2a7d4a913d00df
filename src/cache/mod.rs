pub mod token;
pub mod token_cache;

pub use token::{CacheKey, CachedToken};
pub use token_cache::TokenCache;
