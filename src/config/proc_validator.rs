//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks server, logging and metrics settings
//! - Checks vendor base URLs and endpoint paths

use reqwest::Url;
use tracing::{error, info};

use crate::config::service::ServiceConfig;
use crate::config::settings::SettingsConfig;
use crate::config::vendor::VendorConfig;
use crate::observability::metrics::get_metrics;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_vendor(&cfg.vendor, &mut errors);

    if errors.is_empty() {
        info!("config is valid");
        Ok(())
    } else {
        let metrics = get_metrics().await;
        for e in &errors {
            error!("config error: {}", e);
            metrics.config_validation_errors.inc();
        }
        Err(errors)
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    // safety margin sane bounds
    if let Some(s) = settings.token.safety_margin_seconds {
        if s > 60 * 60 * 24 {
            errors.push(format!(
                "settings.token.safety_margin_seconds ({}) is unreasonably large",
                s
            ));
        }
    }

    if settings.server.host.trim().is_empty() {
        errors.push("settings.server.host must not be empty".to_string());
    }

    // metrics endpoint start with '/'
    let metrics = &settings.metrics;
    if !metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            metrics.path
        ));
    }

    // logging level
    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }
}

fn validate_vendor(vendor: &VendorConfig, errors: &mut Vec<String>) {
    let environments = [
        ("sandbox", &vendor.environments.sandbox.base_url),
        ("production", &vendor.environments.production.base_url),
    ];
    for (name, base_url) in environments {
        match Url::parse(base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(format!(
                "vendor.environments.{}.base_url '{}' has unsupported scheme '{}'",
                name,
                base_url,
                url.scheme()
            )),
            Err(e) => errors.push(format!(
                "vendor.environments.{}.base_url '{}' is not a valid URL: {}",
                name, base_url, e
            )),
        }
    }

    let routes = [
        ("eligibility", &vendor.routes.eligibility),
        ("claim_submission", &vendor.routes.claim_submission),
        ("claim_validation", &vendor.routes.claim_validation),
        ("payers", &vendor.routes.payers),
    ];
    for (name, path) in routes {
        if path.trim().is_empty() {
            errors.push(format!("vendor.routes.{} cannot be empty", name));
        }
    }
}
