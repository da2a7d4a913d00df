use serde::Deserialize;

use crate::config::environment::Environment;
use crate::utils::constants::{
    PRODUCTION_BASE_URL, ROUTE_CLAIM_SUBMISSION, ROUTE_CLAIM_VALIDATION, ROUTE_ELIGIBILITY,
    ROUTE_PAYERS, SANDBOX_BASE_URL, TOKEN_PATH,
};

/// ================================
/// Payer API (vendor) settings
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct VendorConfig {
    /// used when an inbound request names no environment
    #[serde(default)]
    pub default_environment: Environment,
    #[serde(default)]
    pub environments: EnvironmentsConfig,
    #[serde(default)]
    pub routes: VendorRoutes,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnvironmentsConfig {
    #[serde(default = "default_sandbox")]
    pub sandbox: EnvironmentConfig,
    #[serde(default = "default_production")]
    pub production: EnvironmentConfig,
}

impl Default for EnvironmentsConfig {
    fn default() -> Self {
        Self {
            sandbox: default_sandbox(),
            production: default_production(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnvironmentConfig {
    pub base_url: String,
}

/// Business endpoint paths, relative to the environment base URL.
#[derive(Debug, Deserialize, Clone)]
pub struct VendorRoutes {
    #[serde(default = "default_eligibility")]
    pub eligibility: String,
    #[serde(default = "default_claim_submission")]
    pub claim_submission: String,
    #[serde(default = "default_claim_validation")]
    pub claim_validation: String,
    #[serde(default = "default_payers")]
    pub payers: String,
}

impl Default for VendorRoutes {
    fn default() -> Self {
        Self {
            eligibility: default_eligibility(),
            claim_submission: default_claim_submission(),
            claim_validation: default_claim_validation(),
            payers: default_payers(),
        }
    }
}

impl VendorConfig {
    pub fn base_url(&self, environment: Environment) -> &str {
        let base = match environment {
            Environment::Sandbox => &self.environments.sandbox.base_url,
            Environment::Production => &self.environments.production.base_url,
        };
        base.trim_end_matches('/')
    }

    pub fn token_url(&self, environment: Environment) -> String {
        format!("{}{}", self.base_url(environment), TOKEN_PATH)
    }

    pub fn endpoint_url(&self, environment: Environment, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url(environment), path)
        } else {
            format!("{}/{}", self.base_url(environment), path)
        }
    }
}

fn default_sandbox() -> EnvironmentConfig {
    EnvironmentConfig { base_url: SANDBOX_BASE_URL.to_owned() }
}

fn default_production() -> EnvironmentConfig {
    EnvironmentConfig { base_url: PRODUCTION_BASE_URL.to_owned() }
}

fn default_eligibility() -> String {
    ROUTE_ELIGIBILITY.to_owned()
}

fn default_claim_submission() -> String {
    ROUTE_CLAIM_SUBMISSION.to_owned()
}

fn default_claim_validation() -> String {
    ROUTE_CLAIM_VALIDATION.to_owned()
}

fn default_payers() -> String {
    ROUTE_PAYERS.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_url_is_built_per_environment() {
        let mut vendor = VendorConfig::default();
        vendor.environments.sandbox.base_url = "http://127.0.0.1:9000/".to_owned();

        assert_eq!(vendor.token_url(Environment::Sandbox), "http://127.0.0.1:9000/apip/auth/v2/token");
        assert_eq!(
            vendor.token_url(Environment::Production),
            format!("{}/apip/auth/v2/token", PRODUCTION_BASE_URL)
        );
    }

    #[test]
    fn endpoint_url_tolerates_missing_leading_slash() {
        let mut vendor = VendorConfig::default();
        vendor.environments.production.base_url = "http://vendor".to_owned();

        assert_eq!(vendor.endpoint_url(Environment::Production, "/a/b"), "http://vendor/a/b");
        assert_eq!(vendor.endpoint_url(Environment::Production, "a/b"), "http://vendor/a/b");
    }
}
