//! In-memory backend for tests.
//!
//! Implements both [`AuthApi`] and [`DataApi`] against hash maps, with
//! failure/hang injection knobs so callers can exercise their degraded
//! paths. The audit log is recorded so tests assert emission.

use crate::api::{AuthApi, DataApi};
use crate::error::{BackendError, BackendResult};
use crate::types::{
    AuditEntry, BackendSession, BackendUser, ProfileRow, RoleAssignmentRow, SessionChanged,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;

/// In-memory fake backend.
#[derive(Default)]
pub struct FakeBackend {
    /// email -> (password, user)
    users: Mutex<HashMap<String, (String, BackendUser)>>,
    session: Mutex<Option<BackendSession>>,
    site_admins: Mutex<HashSet<String>>,
    profiles: Mutex<HashMap<String, ProfileRow>>,
    assignments: Mutex<HashMap<String, RoleAssignmentRow>>,
    audit: Mutex<Vec<AuditEntry>>,
    token_counter: AtomicU64,

    fail_get_session: AtomicBool,
    hang_get_session: AtomicBool,
    fail_sign_out: AtomicBool,
    fail_site_admin: AtomicBool,
    hang_site_admin: AtomicBool,
    fail_profile: AtomicBool,
    fail_assignment: AtomicBool,
    fail_audit: AtomicBool,

    events: EventChannel,
}

/// Broadcast channel with a Default impl so FakeBackend can derive Default.
struct EventChannel(broadcast::Sender<SessionChanged>);

impl Default for EventChannel {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self(tx)
    }
}

impl FakeBackend {
    /// Create an empty fake backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user that can sign in with `password`.
    pub fn add_user(&self, id: &str, email: &str, password: &str) -> BackendUser {
        let user = BackendUser {
            id: id.to_string(),
            email: email.to_string(),
            display_name: None,
        };
        self.users
            .lock()
            .unwrap()
            .insert(email.to_string(), (password.to_string(), user.clone()));
        user
    }

    /// Install a session directly, without emitting a notification.
    pub fn seed_session(&self, session: BackendSession) {
        *self.session.lock().unwrap() = Some(session);
    }

    /// Build a session for a registered user (helper for seeding).
    pub fn session_for(&self, email: &str) -> BackendSession {
        let users = self.users.lock().unwrap();
        let (_, user) = users.get(email).expect("user not registered");
        self.mint_session(user.clone())
    }

    /// Push a session-change notification, as an external event would.
    pub fn push_event(&self, event: SessionChanged) {
        let _ = self.events.0.send(event);
    }

    /// Add a user id to the site-admin registry.
    pub fn add_site_admin(&self, user_id: &str) {
        self.site_admins.lock().unwrap().insert(user_id.to_string());
    }

    /// Seed a profile row.
    pub fn set_profile(&self, row: ProfileRow) {
        self.profiles.lock().unwrap().insert(row.id.clone(), row);
    }

    /// Look up a profile row (assertion helper).
    pub fn profile(&self, user_id: &str) -> Option<ProfileRow> {
        self.profiles.lock().unwrap().get(user_id).cloned()
    }

    /// Seed a role-assignment row.
    pub fn set_assignment(&self, user_id: &str, role: &str) {
        self.assignments.lock().unwrap().insert(
            user_id.to_string(),
            RoleAssignmentRow {
                user_id: user_id.to_string(),
                role: role.to_string(),
            },
        );
    }

    /// All recorded audit entries.
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.lock().unwrap().clone()
    }

    // Failure injection ------------------------------------------------

    pub fn set_fail_get_session(&self, fail: bool) {
        self.fail_get_session.store(fail, Ordering::SeqCst);
    }

    /// Make `get_session` suspend forever (timeout-path testing).
    pub fn set_hang_get_session(&self, hang: bool) {
        self.hang_get_session.store(hang, Ordering::SeqCst);
    }

    pub fn set_fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_site_admin(&self, fail: bool) {
        self.fail_site_admin.store(fail, Ordering::SeqCst);
    }

    /// Make the site-admin query suspend forever (profile-timeout testing).
    pub fn set_hang_site_admin(&self, hang: bool) {
        self.hang_site_admin.store(hang, Ordering::SeqCst);
    }

    pub fn set_fail_profile(&self, fail: bool) {
        self.fail_profile.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_assignment(&self, fail: bool) {
        self.fail_assignment.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_audit(&self, fail: bool) {
        self.fail_audit.store(fail, Ordering::SeqCst);
    }

    fn mint_session(&self, user: BackendUser) -> BackendSession {
        let n = self.token_counter.fetch_add(1, Ordering::SeqCst);
        BackendSession {
            access_token: format!("access-{}", n),
            refresh_token: format!("refresh-{}", n),
            expires_at: chrono::Utc::now().timestamp() + 3600,
            user,
        }
    }
}

#[async_trait]
impl AuthApi for FakeBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> BackendResult<BackendSession> {
        let user = {
            let users = self.users.lock().unwrap();
            match users.get(email) {
                Some((stored, user)) if stored == password => user.clone(),
                _ => {
                    return Err(BackendError::Auth {
                        status: 400,
                        code: Some("invalid_credentials".to_string()),
                        message: "Invalid login credentials".to_string(),
                    })
                }
            }
        };

        let session = self.mint_session(user);
        *self.session.lock().unwrap() = Some(session.clone());
        let _ = self
            .events
            .0
            .send(SessionChanged::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
        _redirect_to: &str,
    ) -> BackendResult<BackendUser> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(email) {
            return Err(BackendError::Auth {
                status: 422,
                code: Some("user_already_exists".to_string()),
                message: "User already registered".to_string(),
            });
        }
        let user = BackendUser {
            id: format!("user-{}", users.len() + 1),
            email: email.to_string(),
            display_name: display_name.map(String::from),
        };
        users.insert(email.to_string(), (password.to_string(), user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        *self.session.lock().unwrap() = None;
        let _ = self.events.0.send(SessionChanged::SignedOut);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(BackendError::fault("sign-out unavailable"));
        }
        Ok(())
    }

    async fn get_session(&self) -> BackendResult<Option<BackendSession>> {
        if self.hang_get_session.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_get_session.load(Ordering::SeqCst) {
            return Err(BackendError::fault("get-session unavailable"));
        }
        Ok(self.session.lock().unwrap().clone())
    }

    async fn refresh_session(&self) -> BackendResult<BackendSession> {
        let user = {
            let session = self.session.lock().unwrap();
            session
                .as_ref()
                .map(|s| s.user.clone())
                .ok_or(BackendError::NoSession)?
        };
        let refreshed = self.mint_session(user);
        *self.session.lock().unwrap() = Some(refreshed.clone());
        let _ = self
            .events
            .0
            .send(SessionChanged::TokenRefreshed(refreshed.clone()));
        Ok(refreshed)
    }

    async fn restore_session(&self, session: BackendSession) -> BackendResult<BackendSession> {
        let session = if session.is_expired() {
            self.mint_session(session.user)
        } else {
            session
        };
        *self.session.lock().unwrap() = Some(session.clone());
        let _ = self
            .events
            .0
            .send(SessionChanged::SignedIn(session.clone()));
        Ok(session)
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChanged> {
        self.events.0.subscribe()
    }
}

#[async_trait]
impl DataApi for FakeBackend {
    async fn is_site_admin(&self, user_id: &str) -> BackendResult<bool> {
        if self.hang_site_admin.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_site_admin.load(Ordering::SeqCst) {
            return Err(BackendError::fault("site-admin registry unavailable"));
        }
        Ok(self.site_admins.lock().unwrap().contains(user_id))
    }

    async fn fetch_profile(&self, user_id: &str) -> BackendResult<Option<ProfileRow>> {
        if self.fail_profile.load(Ordering::SeqCst) {
            return Err(BackendError::fault("profiles table unavailable"));
        }
        Ok(self.profiles.lock().unwrap().get(user_id).cloned())
    }

    async fn insert_profile(&self, row: &ProfileRow) -> BackendResult<()> {
        if self.fail_profile.load(Ordering::SeqCst) {
            return Err(BackendError::fault("profiles table unavailable"));
        }
        self.profiles
            .lock()
            .unwrap()
            .insert(row.id.clone(), row.clone());
        Ok(())
    }

    async fn update_profile_role(&self, user_id: &str, role: &str) -> BackendResult<()> {
        let mut profiles = self.profiles.lock().unwrap();
        match profiles.get_mut(user_id) {
            Some(row) => {
                row.role = role.to_string();
                Ok(())
            }
            None => Err(BackendError::Status {
                status: 404,
                message: "profile not found".to_string(),
            }),
        }
    }

    async fn delete_profile(&self, user_id: &str) -> BackendResult<()> {
        self.profiles.lock().unwrap().remove(user_id);
        Ok(())
    }

    async fn fetch_role_assignment(
        &self,
        user_id: &str,
    ) -> BackendResult<Option<RoleAssignmentRow>> {
        if self.fail_assignment.load(Ordering::SeqCst) {
            return Err(BackendError::fault("role-assignments table unavailable"));
        }
        Ok(self.assignments.lock().unwrap().get(user_id).cloned())
    }

    async fn insert_audit_entry(&self, entry: &AuditEntry) -> BackendResult<()> {
        if self.fail_audit.load(Ordering::SeqCst) {
            return Err(BackendError::fault("audit log unavailable"));
        }
        self.audit.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_known_user() {
        let backend = FakeBackend::new();
        backend.add_user("user-1", "a@x.com", "pw");

        let session = backend.sign_in_with_password("a@x.com", "pw").await.unwrap();
        assert_eq!(session.user.id, "user-1");
        assert!(backend.get_session().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password() {
        let backend = FakeBackend::new();
        backend.add_user("user-1", "a@x.com", "pw");

        let err = backend
            .sign_in_with_password("a@x.com", "nope")
            .await
            .unwrap_err();
        match err {
            BackendError::Auth { status, code, .. } => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("invalid_credentials"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_events_on_sign_in_and_out() {
        let backend = FakeBackend::new();
        backend.add_user("user-1", "a@x.com", "pw");
        let mut rx = backend.subscribe();

        backend.sign_in_with_password("a@x.com", "pw").await.unwrap();
        assert!(matches!(rx.recv().await.unwrap(), SessionChanged::SignedIn(_)));

        backend.sign_out().await.unwrap();
        assert!(matches!(rx.recv().await.unwrap(), SessionChanged::SignedOut));
    }
}
