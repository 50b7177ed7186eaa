//! Error type for configuration and bootstrap.

use thiserror::Error;

/// Failures that can occur while loading or saving configuration.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A configuration value failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading or writing a config/state file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured API URL does not parse.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The config file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required filesystem location could not be resolved.
    #[error("Path error: {0}")]
    Path(String),
}

/// Result type alias using CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
