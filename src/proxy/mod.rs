pub mod error;
pub mod forward;
pub mod handlers;
pub mod request;
pub mod routes;

pub use error::ProxyError;
pub use forward::{VendorClient, VendorResponse};
pub use request::ProxyRequest;
