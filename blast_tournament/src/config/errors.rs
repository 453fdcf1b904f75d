//! Dynamic configuration error types.

use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Transport failure talking to the configuration source
    #[error("Failed to fetch configuration: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Source answered with a non-success status
    #[error("Configuration source returned HTTP {0}")]
    Status(u16),

    /// Document is not valid JSON for [`super::DynamicConfig`]
    #[error("Failed to decode configuration: {0}")]
    Decode(#[from] serde_json::Error),

    /// Envelope content is not valid base64
    #[error("Failed to decode configuration envelope: {0}")]
    Envelope(#[from] base64::DecodeError),

    /// Document decoded but a value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
