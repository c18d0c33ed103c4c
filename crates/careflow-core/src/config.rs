//! Careflow configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CareflowError, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CareflowConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl CareflowConfig {
    /// Load config from the default path (~/.careflow/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CareflowError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| CareflowError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".careflow")
            .join("config.toml")
    }
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Record-store configuration.
///
/// The API credential and base id are secrets — they normally arrive through
/// the `AIRTABLE_API_KEY` / `AIRTABLE_BASE_ID` environment variables rather
/// than the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend selection: "airtable" or "memory".
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_id: String,
    #[serde(default = "default_patients_table")]
    pub patients_table: String,
    #[serde(default = "default_callback_table")]
    pub callback_table: String,
}

fn default_backend() -> String {
    "airtable".into()
}
fn default_patients_table() -> String {
    "Patients".into()
}
fn default_callback_table() -> String {
    "Callback list".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            api_key: String::new(),
            base_id: String::new(),
            patients_table: default_patients_table(),
            callback_table: default_callback_table(),
        }
    }
}

impl StoreConfig {
    /// Overlay secrets from the environment. Env values win over the file.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("AIRTABLE_API_KEY")
            && !key.is_empty()
        {
            self.api_key = key;
        }
        if let Ok(base) = std::env::var("AIRTABLE_BASE_ID")
            && !base.is_empty()
        {
            self.base_id = base;
        }
    }

    /// Fail fast when the Airtable backend is selected without credentials.
    /// Starting with empty credentials would turn every webhook into a 500.
    pub fn validate(&self) -> Result<()> {
        if self.backend != "airtable" {
            return Ok(());
        }
        if self.api_key.is_empty() {
            return Err(CareflowError::Config(
                "AIRTABLE_API_KEY is not set (env var or store.api_key)".into(),
            ));
        }
        if self.base_id.is_empty() {
            return Err(CareflowError::Config(
                "AIRTABLE_BASE_ID is not set (env var or store.base_id)".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CareflowConfig::default();
        assert_eq!(config.gateway.host, "0.0.0.0");
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.store.backend, "airtable");
        assert_eq!(config.store.patients_table, "Patients");
        assert_eq!(config.store.callback_table, "Callback list");
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: CareflowConfig = toml::from_str(
            r#"
            [gateway]
            port = 9090

            [store]
            base_id = "appXYZ"
            "#,
        )
        .unwrap();
        assert_eq!(config.gateway.port, 9090);
        assert_eq!(config.gateway.host, "0.0.0.0");
        assert_eq!(config.store.base_id, "appXYZ");
        assert_eq!(config.store.patients_table, "Patients");
    }

    #[test]
    fn test_validate_requires_credentials() {
        let mut store = StoreConfig::default();
        assert!(store.validate().is_err());
        store.api_key = "key".into();
        assert!(store.validate().is_err());
        store.base_id = "app123".into();
        assert!(store.validate().is_ok());
    }

    #[test]
    fn test_memory_backend_needs_no_credentials() {
        let store = StoreConfig {
            backend: "memory".into(),
            ..Default::default()
        };
        assert!(store.validate().is_ok());
    }
}
