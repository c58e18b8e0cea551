//! Server configuration
//!
//! Loaded from a versioned YAML file, then overridden from `STOREFRONT_*`
//! environment variables, then validated.
//!
//! ```yaml
//! version: 1
//! server:
//!   port: 8080
//!   database_path: /var/lib/storefront/shop.db
//!   currency: usd
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const SUPPORTED_VERSIONS: &[u32] = &[1];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing 'version' field in configuration file. Add 'version: 1' to the top of your YAML file.")]
    MissingVersion,

    #[error("Unsupported configuration version {found}. Supported versions: {}", supported.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "))]
    UnsupportedVersion { found: u32, supported: Vec<u32> },

    #[error("Invalid range for field '{field}': {value} not in {min}..={max}")]
    Range {
        field: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("Invalid value for field '{field}': {reason}")]
    Invalid { field: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    pub fn range(
        field: impl Into<String>,
        value: impl ToString,
        min: impl ToString,
        max: impl ToString,
    ) -> Self {
        Self::Range {
            field: field.into(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// On-disk layout (v1 schema)
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFileV1 {
    version: Option<u32>,
    #[serde(default)]
    server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    /// Base of the success/cancel URLs handed to the payment provider
    pub public_base_url: String,
    pub checkout_base_url: String,
    /// ISO 4217 code, lowercase
    pub currency: String,
    pub session_ttl_hours: i64,
    pub page_size: u32,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_path: PathBuf::from("storefront.db"),
            public_base_url: "http://localhost:8000".to_string(),
            checkout_base_url: "http://localhost:8000/pay".to_string(),
            currency: "rub".to_string(),
            session_ttl_hours: 24 * 14,
            page_size: 9,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Defaults, or the given file; env overrides applied; validated
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::from_yaml_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let file: ConfigFileV1 = serde_yaml::from_str(content)?;
        match file.version {
            None => Err(ConfigError::MissingVersion),
            Some(found) if !SUPPORTED_VERSIONS.contains(&found) => {
                Err(ConfigError::UnsupportedVersion {
                    found,
                    supported: SUPPORTED_VERSIONS.to_vec(),
                })
            }
            Some(_) => Ok(file.server),
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `STOREFRONT_*` overrides read through `lookup`
    ///
    /// A value that does not parse is ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("STOREFRONT_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("STOREFRONT_PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(e) => warn!("Invalid STOREFRONT_PORT value '{}': {}, keeping {}", port, e, self.port),
            }
        }
        if let Some(path) = lookup("STOREFRONT_DATABASE") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(url) = lookup("STOREFRONT_BASE_URL") {
            if is_http_url(&url) {
                self.public_base_url = url;
            } else {
                warn!(
                    "Invalid STOREFRONT_BASE_URL value '{}', keeping {}",
                    url, self.public_base_url
                );
            }
        }
        if let Some(currency) = lookup("STOREFRONT_CURRENCY") {
            if is_currency_code(&currency) {
                self.currency = currency;
            } else {
                warn!(
                    "Invalid STOREFRONT_CURRENCY value '{}', keeping {}",
                    currency, self.currency
                );
            }
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.port == 0 {
            return Err(ConfigError::range("port", self.port, 1, u16::MAX));
        }
        if !(1..=100).contains(&self.page_size) {
            return Err(ConfigError::range("page_size", self.page_size, 1, 100));
        }
        if self.session_ttl_hours <= 0 {
            return Err(ConfigError::range(
                "session_ttl_hours",
                self.session_ttl_hours,
                1,
                i64::MAX,
            ));
        }
        if !is_currency_code(&self.currency) {
            return Err(ConfigError::invalid(
                "currency",
                format!("'{}' is not a lowercase three-letter code", self.currency),
            ));
        }
        for (field, url) in [
            ("public_base_url", &self.public_base_url),
            ("checkout_base_url", &self.checkout_base_url),
        ] {
            if !is_http_url(url) {
                return Err(ConfigError::invalid(
                    field,
                    format!("'{}' must start with http:// or https://", url),
                ));
            }
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }

    pub fn success_url(&self) -> String {
        format!("{}/checkout/success", self.public_base_url.trim_end_matches('/'))
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/checkout/cancel", self.public_base_url.trim_end_matches('/'))
    }
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_lowercase())
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.listen_addr(), "0.0.0.0:8000");
        assert_eq!(config.session_ttl(), chrono::Duration::days(14));
        assert_eq!(config.success_url(), "http://localhost:8000/checkout/success");
    }

    #[test]
    fn test_yaml_loading() {
        let yaml = r#"
version: 1
server:
  port: 9090
  currency: usd
  public_base_url: https://shop.example.com/
"#;
        let config = ServerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.currency, "usd");
        assert_eq!(config.page_size, 9);
        assert_eq!(config.cancel_url(), "https://shop.example.com/checkout/cancel");
    }

    #[test]
    fn test_yaml_missing_version() {
        let err = ServerConfig::from_yaml_str("server:\n  port: 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingVersion));
        assert!(err.to_string().contains("version: 1"));
    }

    #[test]
    fn test_yaml_unsupported_version() {
        let err = ServerConfig::from_yaml_str("version: 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion { found: 2, .. }));
    }

    #[test]
    fn test_yaml_unknown_field() {
        let yaml = "version: 1\nserver:\n  prot: 80\n";
        assert!(matches!(
            ServerConfig::from_yaml_str(yaml),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("STOREFRONT_PORT", "not-a-port"),
            ("STOREFRONT_HOST", "127.0.0.1"),
            ("STOREFRONT_CURRENCY", "EUR"),
            ("STOREFRONT_DATABASE", "/tmp/shop.db"),
            ("STOREFRONT_BASE_URL", "ftp://shop.example.com"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.currency, "rub");
        assert_eq!(config.database_path, PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.public_base_url, ServerConfig::default().public_base_url);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_base_url_override() {
        let mut config = ServerConfig::default();
        config.apply_overrides(|key| {
            (key == "STOREFRONT_BASE_URL").then(|| "https://shop.example.com".to_string())
        });
        assert_eq!(config.public_base_url, "https://shop.example.com");
    }

    #[test]
    fn test_validation() {
        let config = ServerConfig {
            page_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Range { .. })));

        let config = ServerConfig {
            checkout_base_url: "ftp://pay".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("checkout_base_url"));

        let config = ServerConfig {
            port: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
