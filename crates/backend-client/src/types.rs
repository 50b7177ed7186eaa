//! Wire-shaped types exchanged with the remote backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user as reported by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendUser {
    /// User UUID
    pub id: String,
    /// User email
    pub email: String,
    /// Display name from sign-up metadata, if any
    #[serde(default)]
    pub display_name: Option<String>,
}

/// An authenticated session issued by the backend.
///
/// The token material is opaque to this workspace; only the expiry and the
/// associated user are inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSession {
    /// Bearer token for subsequent requests
    pub access_token: String,
    /// Token used to mint a replacement session
    pub refresh_token: String,
    /// Access token expiry (epoch seconds)
    pub expires_at: i64,
    /// The user this session belongs to
    pub user: BackendUser,
}

impl BackendSession {
    /// Whether the access token is expired or about to expire.
    ///
    /// Treats anything with less than 60 seconds remaining as expired, so a
    /// token is never handed out right at the boundary.
    pub fn is_expired(&self) -> bool {
        self.expires_at - Utc::now().timestamp() < 60
    }
}

/// Session-change notification pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChanged {
    /// A session was established (sign-in or restore).
    SignedIn(BackendSession),
    /// The session's tokens were refreshed.
    TokenRefreshed(BackendSession),
    /// The session ended.
    SignedOut,
}

/// A row from the profiles table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    /// User UUID (primary key)
    pub id: String,
    /// Stored role name (snake_case)
    pub role: String,
    /// Display name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Email
    #[serde(default)]
    pub email: Option<String>,
}

/// A row from the role-assignments table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignmentRow {
    /// User UUID
    pub user_id: String,
    /// Assigned role name (snake_case)
    pub role: String,
}

/// An immutable audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry UUID
    pub id: String,
    /// User who performed the action
    pub actor_id: String,
    /// Action name (e.g. `user.update_role`)
    pub action: String,
    /// Resource the action targeted
    pub resource: String,
    /// Free-text detail
    pub detail: String,
    /// When the action happened
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Create a new entry stamped with the current time and a fresh id.
    pub fn new(actor_id: &str, action: &str, resource: &str, detail: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            actor_id: actor_id.to_string(),
            action: action.to_string(),
            resource: resource.to_string(),
            detail: detail.to_string(),
            created_at: Utc::now(),
        }
    }
}
