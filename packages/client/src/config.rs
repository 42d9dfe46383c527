//! Client configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables (`ROADWATCH_API_URL`, `ROADWATCH_TIMEOUT_SECS`,
//! `ROADWATCH_MAX_RETRIES`). Command-line flags are applied last by the
//! binary.
//!
//! ```toml
//! base_url = "http://localhost:8000/api"
//! timeout_secs = 30
//! max_retries = 3
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::endpoint::Endpoint;

/// Default API base URL of the data service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File that failed to read.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`ClientConfig`].
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is present but unusable.
    #[error("Invalid {key}: {message}")]
    Invalid {
        /// Setting name.
        key: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Connection settings for the data service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API base URL, e.g. `http://localhost:8000/api`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Retries for transient failures (uploads are never retried).
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl ClientConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the document is invalid or a value fails
    /// validation.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Defaults, then the optional file, then the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any layer is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_env(|key| std::env::var(key).ok())
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a numeric variable does not
    /// parse or the resulting URL is unusable.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ROADWATCH_API_URL") {
            self.base_url = url;
        }
        if let Some(secs) = lookup("ROADWATCH_TIMEOUT_SECS") {
            self.timeout_secs = secs.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "ROADWATCH_TIMEOUT_SECS",
                message: format!("{e}"),
            })?;
        }
        if let Some(retries) = lookup("ROADWATCH_MAX_RETRIES") {
            self.max_retries = retries.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "ROADWATCH_MAX_RETRIES",
                message: format!("{e}"),
            })?;
        }
        self.validate()
    }

    /// Checks the base URL scheme and strips trailing slashes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a non-HTTP base URL or a zero
    /// timeout.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "base_url",
                message: format!("'{}' is not an http(s) URL", self.base_url),
            });
        }
        self.base_url = trimmed.to_string();
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "timeout_secs",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(self)
    }

    /// Full URL for `endpoint`.
    #[must_use]
    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
