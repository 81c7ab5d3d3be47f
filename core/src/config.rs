//! Broker client configuration.
//!
//! The base URL may be left unset at construction and supplied later;
//! a missing base URL is reported when a request is built, not here.

use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_UNEXPECTED_ERROR_MESSAGE: &str =
    "An unexpected error occurred. Please try again later.";

pub const ENV_BASE_URL: &str = "BROKER_BASE_URL";
pub const ENV_UNEXPECTED_ERROR_MESSAGE: &str = "BROKER_UNEXPECTED_ERROR_MESSAGE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerConfig {
    /// Absolute URL every request path is joined to.
    pub base_url: Option<String>,

    /// User-facing text reported when a successful exchange has no body.
    pub unexpected_error_message: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            unexpected_error_message: DEFAULT_UNEXPECTED_ERROR_MESSAGE.to_string(),
        }
    }
}

impl BrokerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    /// Read `BROKER_BASE_URL` and `BROKER_UNEXPECTED_ERROR_MESSAGE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, reading variables through `lookup`. Blank values
    /// count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            base_url: read(ENV_BASE_URL),
            unexpected_error_message: read(ENV_UNEXPECTED_ERROR_MESSAGE)
                .unwrap_or_else(|| DEFAULT_UNEXPECTED_ERROR_MESSAGE.to_string()),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base_url) = &self.base_url {
            let parsed = Url::parse(base_url).map_err(|source| ConfigError::InvalidBaseUrl {
                url: base_url.clone(),
                source,
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(format!(
                    "base_url must be an http(s) URL, got {base_url:?}"
                )));
            }
        }
        if self.unexpected_error_message.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "unexpected_error_message must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured base URL, or `MissingBaseUrl`.
    pub fn base_url(&self) -> Result<&str, ConfigError> {
        self.base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingBaseUrl)
    }
}
