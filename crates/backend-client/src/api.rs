//! Trait seams for the remote backend.
//!
//! The identity stack is written against these traits rather than a concrete
//! client so tests can inject [`crate::FakeBackend`].

use crate::types::{
    AuditEntry, BackendSession, BackendUser, ProfileRow, RoleAssignmentRow, SessionChanged,
};
use crate::BackendResult;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Auth operations consumed by the session gateway.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange email + password for a session.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> BackendResult<BackendSession>;

    /// Register a new user.
    ///
    /// `redirect_to` is the confirmation callback the provider embeds in the
    /// verification email. The returned user is not yet confirmed.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
        redirect_to: &str,
    ) -> BackendResult<BackendUser>;

    /// End the current session remotely.
    async fn sign_out(&self) -> BackendResult<()>;

    /// The current session, if one is held.
    async fn get_session(&self) -> BackendResult<Option<BackendSession>>;

    /// Mint a replacement session from the current refresh token.
    async fn refresh_session(&self) -> BackendResult<BackendSession>;

    /// Adopt a previously persisted session (startup restore).
    ///
    /// Implementations validate the token and refresh it when stale; the
    /// adopted session becomes current and a `SignedIn` notification is
    /// pushed.
    async fn restore_session(&self, session: BackendSession) -> BackendResult<BackendSession>;

    /// Subscribe to session-change notifications.
    fn subscribe(&self) -> broadcast::Receiver<SessionChanged>;
}

/// Table operations consumed by the role resolver and the orchestrator.
#[async_trait]
pub trait DataApi: Send + Sync {
    /// Whether the user appears in the site-admin registry.
    async fn is_site_admin(&self, user_id: &str) -> BackendResult<bool>;

    /// Fetch the user's profile row, if present.
    async fn fetch_profile(&self, user_id: &str) -> BackendResult<Option<ProfileRow>>;

    /// Insert a profile row (first-login provisioning, admin user creation).
    async fn insert_profile(&self, row: &ProfileRow) -> BackendResult<()>;

    /// Update the role field of an existing profile.
    async fn update_profile_role(&self, user_id: &str, role: &str) -> BackendResult<()>;

    /// Delete a profile row.
    async fn delete_profile(&self, user_id: &str) -> BackendResult<()>;

    /// Fetch the user's row from the role-assignments table, if present.
    async fn fetch_role_assignment(
        &self,
        user_id: &str,
    ) -> BackendResult<Option<RoleAssignmentRow>>;

    /// Append an entry to the audit log.
    async fn insert_audit_entry(&self, entry: &AuditEntry) -> BackendResult<()>;
}
