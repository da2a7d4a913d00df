use axum::routing::{get, post};
use axum::Router;

use crate::proxy::handlers;
use crate::server::server::AppState;

pub const PATH_ELIGIBILITY: &str = "/api/eligibility";
pub const PATH_CLAIM_SUBMISSION: &str = "/api/claims/submission";
pub const PATH_CLAIM_VALIDATION: &str = "/api/claims/validation";
pub const PATH_PAYERS: &str = "/api/payers";
pub const PATH_HEALTH: &str = "/health";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(PATH_ELIGIBILITY, post(handlers::eligibility))
        .route(PATH_CLAIM_SUBMISSION, post(handlers::claim_submission))
        .route(PATH_CLAIM_VALIDATION, post(handlers::claim_validation))
        .route(PATH_PAYERS, post(handlers::payers))
        .route(PATH_HEALTH, get(handlers::health))
}
