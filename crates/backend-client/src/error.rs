//! Backend client error types.

use thiserror::Error;

/// Error type for backend operations.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Transport-level failure (connect, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Auth endpoint rejected the request.
    ///
    /// `code` carries the provider's machine-readable error code when one was
    /// present in the response body (e.g. `invalid_credentials`).
    #[error("Auth request failed with status {status}: {message}")]
    Auth {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Data endpoint returned a non-success status.
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// No session is available for an operation that requires one.
    #[error("No active session")]
    NoSession,

    /// Injected fault (fake backend only).
    #[error("Backend fault: {0}")]
    Fault(String),
}

impl BackendError {
    /// Shorthand used by the fake backend's failure injection.
    pub fn fault(message: impl Into<String>) -> Self {
        BackendError::Fault(message.into())
    }
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
