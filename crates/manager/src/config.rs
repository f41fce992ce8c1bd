use std::time::Duration;

use serde::Deserialize;

use paygate_rules::{DEFAULT_FREE_TIER_SKU, DEFAULT_REGISTERED_SKU};

use crate::error::ManagerError;

/// Manager configuration, typically the `[manager]` table of a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct ManagerConfig {
    /// Prefix for every persisted key.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Fall back to the persisted rule set and entitlements when fetching fails.
    #[serde(default = "default_use_cached_paywall")]
    pub use_cached_paywall: bool,
    /// Upper bound on `initialize`.
    #[serde(default = "default_init_timeout_seconds")]
    pub init_timeout_seconds: u64,
    /// IANA timezone for calendar budgets. Defaults to UTC.
    #[serde(default)]
    pub timezone: Option<String>,
    /// Sku every free-tier viewer holds; holding it never exempts.
    #[serde(default = "default_free_tier_sku")]
    pub free_tier_sku: String,
    /// Excluded-sku marker that exempts any logged-in viewer.
    #[serde(default = "default_registered_sku")]
    pub registered_sku: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            use_cached_paywall: default_use_cached_paywall(),
            init_timeout_seconds: default_init_timeout_seconds(),
            timezone: None,
            free_tier_sku: default_free_tier_sku(),
            registered_sku: default_registered_sku(),
        }
    }
}

fn default_namespace() -> String {
    "paywall".to_owned()
}

fn default_use_cached_paywall() -> bool {
    true
}

fn default_init_timeout_seconds() -> u64 {
    30
}

fn default_free_tier_sku() -> String {
    DEFAULT_FREE_TIER_SKU.to_owned()
}

fn default_registered_sku() -> String {
    DEFAULT_REGISTERED_SKU.to_owned()
}

impl ManagerConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self, ManagerError> {
        toml::from_str(s).map_err(|e| ManagerError::Configuration(e.to_string()))
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_seconds)
    }
}
