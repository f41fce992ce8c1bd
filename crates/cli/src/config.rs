use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use paygate_manager::ManagerConfig;

/// Contents of the `paygate.toml` configuration file.
#[derive(Debug, Default, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub manager: ManagerConfig,
}

/// Where the rule and entitlement services live.
#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Viewer access token for the entitlement service.
    pub access_token: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            access_token: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_owned()
}

fn default_timeout_seconds() -> u64 {
    10
}

/// Location of the persisted cache and ledger.
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("paygate-state.json")
}

impl CliConfig {
    /// Load the configuration file, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let config = CliConfig::load(None).unwrap();
        assert_eq!(config.client.base_url, "http://localhost:8080");
        assert_eq!(config.client.timeout_seconds, 10);
        assert!(config.client.access_token.is_none());
        assert_eq!(config.store.path, PathBuf::from("paygate-state.json"));
        assert_eq!(config.manager.namespace, "paywall");
    }

    #[test]
    fn parses_all_sections() {
        let config = CliConfig::parse(
            r#"
            [client]
            base_url = "https://api.example.com"
            access_token = "tok"

            [store]
            path = "/var/lib/paygate/state.json"

            [manager]
            namespace = "site-a"
            timezone = "Europe/Paris"
            "#,
        )
        .unwrap();
        assert_eq!(config.client.base_url, "https://api.example.com");
        assert_eq!(config.client.access_token.as_deref(), Some("tok"));
        assert_eq!(config.client.timeout_seconds, 10);
        assert_eq!(config.store.path, PathBuf::from("/var/lib/paygate/state.json"));
        assert_eq!(config.manager.namespace, "site-a");
        assert_eq!(config.manager.timezone.as_deref(), Some("Europe/Paris"));
        assert!(config.manager.use_cached_paywall);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = CliConfig::load(Some(Path::new("/nonexistent/paygate.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(CliConfig::parse("[client]\ntimeout_seconds = \"ten\"").is_err());
    }
}
