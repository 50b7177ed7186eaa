//! Normalized auth error taxonomy.

use backend_client::BackendError;
use thiserror::Error;

/// Closed set of failure categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Transport-level failure reaching the backend.
    Network,
    /// A bounded operation did not finish inside its window.
    Timeout,
    /// Email/password rejected.
    InvalidCredentials,
    /// The account exists but its email is not confirmed yet.
    UnconfirmedEmail,
    /// The provider throttled the request.
    RateLimited,
    /// User, session, or record not found.
    NotFound,
    /// A privileged operation was attempted without admin authority.
    AuthorizationDenied,
    /// Local persistence failed.
    Storage,
    /// Anything the taxonomy does not cover.
    Unknown,
}

/// Normalized auth error: a category plus a human-readable message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A bounded operation ran out of time.
    pub fn timeout(operation: &str) -> Self {
        Self::new(
            AuthErrorKind::Timeout,
            format!("{operation} timed out, please try again"),
        )
    }

    /// Privileged operation attempted without admin authority.
    pub fn authorization_denied() -> Self {
        Self::new(
            AuthErrorKind::AuthorizationDenied,
            "You do not have permission to perform this action",
        )
    }

    /// Map a backend error into the closed taxonomy.
    ///
    /// Nothing downstream inspects provider-specific fields; this is the one
    /// place that knows the provider's error codes.
    pub fn normalize(err: BackendError) -> Self {
        match err {
            BackendError::Http(e) => {
                let kind = if e.is_timeout() || e.is_connect() {
                    AuthErrorKind::Network
                } else {
                    AuthErrorKind::Unknown
                };
                Self::new(kind, e.to_string())
            }
            BackendError::Auth {
                status,
                code,
                message,
            } => {
                let kind = match code.as_deref() {
                    Some("invalid_credentials") | Some("invalid_grant") => {
                        AuthErrorKind::InvalidCredentials
                    }
                    Some("email_not_confirmed") => AuthErrorKind::UnconfirmedEmail,
                    Some("over_request_rate_limit") => AuthErrorKind::RateLimited,
                    Some("user_not_found") => AuthErrorKind::NotFound,
                    _ if status == 429 => AuthErrorKind::RateLimited,
                    _ if status == 400 || status == 401 => AuthErrorKind::InvalidCredentials,
                    _ => AuthErrorKind::Unknown,
                };
                Self::new(kind, message)
            }
            BackendError::Status { status, message } => {
                let kind = match status {
                    404 => AuthErrorKind::NotFound,
                    429 => AuthErrorKind::RateLimited,
                    _ => AuthErrorKind::Unknown,
                };
                Self::new(kind, message)
            }
            BackendError::NoSession => Self::new(AuthErrorKind::NotFound, "No active session"),
            BackendError::Decode(message) => Self::new(AuthErrorKind::Unknown, message),
            BackendError::Fault(message) => Self::new(AuthErrorKind::Unknown, message),
        }
    }
}

/// Result type for gateway operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_invalid_credentials() {
        let err = AuthError::normalize(BackendError::Auth {
            status: 400,
            code: Some("invalid_credentials".to_string()),
            message: "Invalid login credentials".to_string(),
        });
        assert_eq!(err.kind, AuthErrorKind::InvalidCredentials);
    }

    #[test]
    fn test_normalize_unconfirmed_email() {
        let err = AuthError::normalize(BackendError::Auth {
            status: 400,
            code: Some("email_not_confirmed".to_string()),
            message: "Email not confirmed".to_string(),
        });
        assert_eq!(err.kind, AuthErrorKind::UnconfirmedEmail);
    }

    #[test]
    fn test_normalize_rate_limited_by_status() {
        let err = AuthError::normalize(BackendError::Auth {
            status: 429,
            code: None,
            message: "slow down".to_string(),
        });
        assert_eq!(err.kind, AuthErrorKind::RateLimited);
    }

    #[test]
    fn test_normalize_data_not_found() {
        let err = AuthError::normalize(BackendError::Status {
            status: 404,
            message: "gone".to_string(),
        });
        assert_eq!(err.kind, AuthErrorKind::NotFound);
    }

    #[test]
    fn test_timeout_message_is_user_readable() {
        let err = AuthError::timeout("Sign-in");
        assert_eq!(err.kind, AuthErrorKind::Timeout);
        assert!(err.message.contains("Sign-in"));
    }
}
