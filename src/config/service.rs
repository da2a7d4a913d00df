use serde::Deserialize;

use crate::config::settings::SettingsConfig;
use crate::config::vendor::VendorConfig;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub settings: SettingsConfig,
    #[serde(default)]
    pub vendor: VendorConfig,
}
