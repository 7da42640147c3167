//! Configuration for sporecast
//!
//! Loaded once at startup from `sporecast.toml` (or JSON) next to the
//! process; every field has a default so an absent file is fine.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File the server looks for in its working directory
pub const DEFAULT_CONFIG_FILE: &str = "sporecast.toml";

/// Request bodies larger than this are rejected before parsing
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SporecastConfig {
    /// Listen address
    pub addr: String,
    /// XGBoost JSON model artifact
    pub model_path: PathBuf,
    /// Category code table saved at training time; per-batch codes when unset
    pub category_table_path: Option<PathBuf>,
    /// Log raw request bodies at debug level
    pub log_payloads: bool,
    /// Largest accepted `/predict` body, in bytes
    pub max_body_bytes: usize,
}

impl Default for SporecastConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8000".to_string(),
            model_path: PathBuf::from("mushroom_xgb_model.json"),
            category_table_path: None,
            log_payloads: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl SporecastConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json_str)?)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Read a config file, JSON when the extension says so, TOML otherwise
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents)?,
            _ => Self::from_toml(&contents)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Read `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_path(path)
        } else {
            tracing::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Parsed listen address
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.addr
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("addr '{}': {}", self.addr, e)))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.model_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("model_path must not be empty".to_string()));
        }

        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than 0".to_string(),
            ));
        }

        if let Some(table) = &self.category_table_path {
            if table.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "category_table_path must not be empty when set".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SporecastConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.socket_addr().unwrap().port(), 8000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SporecastConfig::from_toml(
            r#"
            model_path = "models/agaricus.json"
            log_payloads = true
            "#,
        )
        .unwrap();
        assert_eq!(config.model_path, PathBuf::from("models/agaricus.json"));
        assert!(config.log_payloads);
        assert_eq!(config.addr, "127.0.0.1:8000");
        assert_eq!(config.category_table_path, None);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = SporecastConfig::default();
        config.category_table_path = Some(PathBuf::from("codes.json"));
        let toml = config.to_toml().unwrap();
        assert_eq!(SporecastConfig::from_toml(&toml).unwrap(), config);
    }

    #[test]
    fn test_invalid_addr() {
        let mut config = SporecastConfig::default();
        config.addr = "localhost".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_body_limit() {
        let config = SporecastConfig::from_toml("max_body_bytes = 1048576\n").unwrap();
        assert_eq!(config.max_body_bytes, 1024 * 1024);
        assert!(config.validate().is_ok());

        let config = SporecastConfig::from_toml("max_body_bytes = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_empty_model_path() {
        let mut config = SporecastConfig::default();
        config.model_path = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_path_json_and_toml() {
        let dir = tempfile::tempdir().unwrap();

        let json = dir.path().join("sporecast.json");
        std::fs::write(&json, r#"{"addr": "0.0.0.0:9000"}"#).unwrap();
        assert_eq!(SporecastConfig::from_path(&json).unwrap().addr, "0.0.0.0:9000");

        let toml = dir.path().join("sporecast.toml");
        std::fs::write(&toml, "addr = \"0.0.0.0:9001\"\n").unwrap();
        assert_eq!(SporecastConfig::from_path(&toml).unwrap().addr, "0.0.0.0:9001");
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = SporecastConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, SporecastConfig::default());
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            SporecastConfig::from_toml("addr = ["),
            Err(ConfigError::Toml(_))
        ));
    }
}
