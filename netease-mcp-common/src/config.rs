//! Configuration module for loading environment variables and settings.

use crate::error::ConfigError;

/// Default gateway request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the NeteaseCloudMusicApi gateway (required)
    pub api_base_url: String,
    /// Global fallback cookie; anonymous registration is attempted when absent
    pub cookie: Option<String>,
    /// Per-request timeout applied by the gateway client
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables and .env file.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingEnvVar` if NETEASE_API_URL is not set, and
    /// `ConfigError::InvalidValue` if it is not an http(s) URL or if
    /// NETEASE_API_TIMEOUT is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = std::env::var("NETEASE_API_URL")
            .map_err(|_| ConfigError::missing_env_var("NETEASE_API_URL"))?;
        let api_base_url = Self::normalize_base_url(&api_base_url)?;

        let cookie = std::env::var("NETEASE_COOKIE")
            .ok()
            .filter(|c| !c.trim().is_empty());

        let request_timeout_secs = match std::env::var("NETEASE_API_TIMEOUT") {
            Ok(raw) => Self::parse_timeout(&raw)?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_base_url,
            cookie,
            request_timeout_secs,
        })
    }

    /// Validate a gateway base URL and strip trailing slashes.
    pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
        let trimmed = raw.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::invalid_value(
                "NETEASE_API_URL",
                format!("expected an http(s) URL, got '{}'", raw),
            ));
        }
        Ok(trimmed.to_string())
    }

    /// Parse the gateway timeout in whole seconds.
    pub fn parse_timeout(raw: &str) -> Result<u64, ConfigError> {
        match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(secs),
            _ => Err(ConfigError::invalid_value(
                "NETEASE_API_TIMEOUT",
                format!("expected a positive number of seconds, got '{}'", raw),
            )),
        }
    }

    /// Full URL for a gateway route such as `/cloudsearch`.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }
}
