//! Shared constants and invariants

pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 60;

/// client-credentials grant endpoint, relative to the environment base URL
pub const TOKEN_PATH: &str = "/apip/auth/v2/token";
pub const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";

pub const SANDBOX_BASE_URL: &str = "https://sandbox.apigw.changehealthcare.com";
pub const PRODUCTION_BASE_URL: &str = "https://apigw.changehealthcare.com";

// Vendor business endpoints
pub const ROUTE_ELIGIBILITY: &str = "/medicalnetwork/eligibility/v3";
pub const ROUTE_CLAIM_SUBMISSION: &str = "/medicalnetwork/professionalclaims/v3/submission";
pub const ROUTE_CLAIM_VALIDATION: &str = "/medicalnetwork/professionalclaims/v3/validation";
pub const ROUTE_PAYERS: &str = "/medicalnetwork/payerfinder/v1/payers";
