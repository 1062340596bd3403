//! Error types for the common library.
//!
//! This module provides the error hierarchy shared by the NetEase MCP server
//! crates, built on `thiserror`.
//!
//! # Error Categories
//!
//! - `ConfigError`: Missing or invalid configuration
//! - `Error::Api`: NetEase gateway errors (includes endpoint and status)
//! - `Error::Timeout`: Gateway requests that exceeded the client timeout

use thiserror::Error;

/// Unified error type for the common library.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors (missing env vars, invalid values)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// API errors with endpoint and HTTP status context
    ///
    /// A status code of `0` means the request never produced an HTTP
    /// response (connection refused, DNS failure, ...).
    #[error("API error for {endpoint} (HTTP {status_code}): {message}")]
    Api {
        /// The API endpoint that was called
        endpoint: String,
        /// HTTP status code returned by the API
        status_code: u16,
        /// Error message from the API or describing the failure
        message: String,
    },

    /// Operation timeout errors
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),
}

impl Error {
    /// Create a new API error with endpoint, status code, and message.
    ///
    /// # Example
    ///
    /// ```
    /// use netease_mcp_common::error::Error;
    ///
    /// let err = Error::api("http://localhost:3000/cloudsearch", 502, "Bad gateway");
    /// assert!(err.to_string().contains("/cloudsearch"));
    /// assert!(err.to_string().contains("502"));
    /// ```
    pub fn api(endpoint: impl Into<String>, status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            endpoint: endpoint.into(),
            status_code,
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(seconds: u64) -> Self {
        Error::Timeout(seconds)
    }

    /// The HTTP status attached to an API error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

/// Configuration errors.
///
/// These errors occur when loading or validating configuration from
/// environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("Required environment variable {0} is not set")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl ConfigError {
    /// Create a new missing environment variable error.
    pub fn missing_env_var(name: impl Into<String>) -> Self {
        ConfigError::MissingEnvVar(name.into())
    }

    /// Create a new invalid value error.
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue(name.into(), reason.into())
    }
}

/// Result type alias using the unified Error type.
pub type Result<T> = std::result::Result<T, Error>;
