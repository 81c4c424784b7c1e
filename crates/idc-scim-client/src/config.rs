//! Connection settings for the directory's SCIM endpoint.
//!
//! Settings come from environment variables (with `.env` support) or from a
//! JSON file, and are validated eagerly so a bad configuration fails before
//! any request is sent.

use reqwest::Url;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default per-request deadline.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Upper bound accepted for the per-request deadline.
const MAX_TIMEOUT_SECS: u64 = 600;

/// Configuration errors that can occur while loading connection settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Failed to read config file {path}: {message}")]
    File { path: String, message: String },
}

/// Validated connection settings.
#[derive(Clone)]
pub struct ScimConfig {
    endpoint: String,
    token: String,
    timeout: Duration,
}

/// On-disk shape of `scim-config.json`.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    scim_endpoint: Option<String>,
    scim_token: Option<String>,
    timeout_secs: Option<u64>,
}

impl ScimConfig {
    /// Build and validate a configuration.
    ///
    /// The endpoint must be an absolute http(s) URL; a trailing slash is
    /// stripped. The token must be non-empty.
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let endpoint = endpoint.into().trim().trim_end_matches('/').to_string();
        let token = token.into().trim().to_string();

        if endpoint.is_empty() {
            return Err(ConfigError::MissingVar("SCIM_ENDPOINT".to_string()));
        }
        let url = Url::parse(&endpoint).map_err(|e| ConfigError::InvalidValue {
            var: "SCIM_ENDPOINT".to_string(),
            message: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                var: "SCIM_ENDPOINT".to_string(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if token.is_empty() {
            return Err(ConfigError::MissingVar("SCIM_TOKEN".to_string()));
        }

        let secs = timeout.as_secs();
        if secs == 0 || secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::InvalidValue {
                var: "SCIM_TIMEOUT_SECS".to_string(),
                message: format!("must be between 1 and {MAX_TIMEOUT_SECS} seconds"),
            });
        }

        Ok(Self {
            endpoint,
            token,
            timeout,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// # Required Variables
    ///
    /// - `SCIM_ENDPOINT` - SCIM base URL of the directory
    /// - `SCIM_TOKEN` - bearer token
    ///
    /// # Optional Variables
    ///
    /// - `SCIM_TIMEOUT_SECS` - per-request deadline (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let endpoint = env::var("SCIM_ENDPOINT")
            .map_err(|_| ConfigError::MissingVar("SCIM_ENDPOINT".to_string()))?;
        let token =
            env::var("SCIM_TOKEN").map_err(|_| ConfigError::MissingVar("SCIM_TOKEN".to_string()))?;
        let timeout = match env::var("SCIM_TIMEOUT_SECS") {
            Ok(raw) => parse_timeout(&raw)?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Self::new(endpoint, token, Duration::from_secs(timeout))
    }

    /// Load configuration from a JSON file with `scim_endpoint`,
    /// `scim_token` and optional `timeout_secs` keys.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: display.clone(),
            message: e.to_string(),
        })?;
        let file: ConfigFile = serde_json::from_str(&raw).map_err(|e| ConfigError::File {
            path: display,
            message: e.to_string(),
        })?;

        Self::new(
            file.scim_endpoint
                .ok_or_else(|| ConfigError::MissingVar("scim_endpoint".to_string()))?,
            file.scim_token
                .ok_or_else(|| ConfigError::MissingVar("scim_token".to_string()))?,
            Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        )
    }

    /// SCIM base URL without trailing slash.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Bearer token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Per-request deadline.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Return a copy with a different endpoint, re-validated.
    pub fn with_endpoint(self, endpoint: impl Into<String>) -> Result<Self, ConfigError> {
        Self::new(endpoint, self.token, self.timeout)
    }

    /// Return a copy with a different token, re-validated.
    pub fn with_token(self, token: impl Into<String>) -> Result<Self, ConfigError> {
        Self::new(self.endpoint, token, self.timeout)
    }

    /// Return a copy with a different deadline, re-validated.
    pub fn with_timeout(self, timeout: Duration) -> Result<Self, ConfigError> {
        Self::new(self.endpoint, self.token, timeout)
    }
}

impl fmt::Debug for ScimConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScimConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn parse_timeout(raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidValue {
            var: "SCIM_TIMEOUT_SECS".to_string(),
            message: e.to_string(),
        })
}
