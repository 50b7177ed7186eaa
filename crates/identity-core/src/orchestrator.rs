//! The identity orchestrator.

use crate::profile::Profile;
use crate::state::IdentitySnapshot;
use access_control::{Role, RoleResolver};
use backend_client::{AuditEntry, AuthApi, BackendSession, BackendUser, DataApi, ProfileRow, SessionChanged};
use session_gateway::{AuthError, AuthResult, SessionGateway};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Default bound on initial session acquisition.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(15);

/// Default bound on profile composition (role resolution + permissions).
pub const DEFAULT_PROFILE_TIMEOUT: Duration = Duration::from_secs(10);

const ACTION_USER_CREATE: &str = "user.create";
const ACTION_USER_UPDATE_ROLE: &str = "user.update_role";
const ACTION_USER_DELETE: &str = "user.delete";

/// Orchestrator timing configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Window for the startup session acquisition.
    pub startup_timeout: Duration,
    /// Window for profile composition before the fallback profile is used.
    pub profile_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            profile_timeout: DEFAULT_PROFILE_TIMEOUT,
        }
    }
}

struct Inner {
    gateway: SessionGateway,
    auth: Arc<dyn AuthApi>,
    data: Arc<dyn DataApi>,
    resolver: RoleResolver,
    snapshot: watch::Sender<IdentitySnapshot>,
    /// Monotonically increasing; a composition only commits if its
    /// generation is still current, so a late-resolving operation can never
    /// override a newer state.
    generation: AtomicU64,
    /// Held across the generation check and the publish in [`Inner::commit`].
    commit_lock: Mutex<()>,
    config: OrchestratorConfig,
}

impl Inner {
    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn commit(&self, generation: u64, snapshot: IdentitySnapshot) -> bool {
        // Check and publish under one lock: a newer commit that lands between
        // the generation load and the send must not be overwritten.
        let _guard = self.commit_lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Discarding stale identity composition");
            return false;
        }
        self.snapshot.send_replace(snapshot);
        true
    }

    /// Compose the authenticated snapshot for a session, falling back to the
    /// viewer profile when resolution fails to finish in time.
    async fn compose(&self, session: BackendSession) -> IdentitySnapshot {
        let profile = match timeout(
            self.config.profile_timeout,
            self.build_profile(&session.user),
        )
        .await
        {
            Ok(profile) => profile,
            Err(_) => {
                warn!(user_id = %session.user.id, "Profile composition timed out, using fallback");
                Profile::fallback(&session.user.email)
            }
        };
        IdentitySnapshot::authenticated(session, profile)
    }

    async fn build_profile(&self, user: &BackendUser) -> Profile {
        let role = self.resolver.resolve(&user.id).await;
        Profile::compose(user, role)
    }

    /// Best-effort audit append; never fails the primary mutation.
    async fn append_audit(&self, actor_id: &str, action: &str, resource: &str, detail: &str) {
        let entry = AuditEntry::new(actor_id, action, resource, detail);
        if let Err(e) = self.data.insert_audit_entry(&entry).await {
            warn!(action, error = %e, "Audit append failed");
        }
    }
}

/// Top-level identity state machine.
///
/// Owns the current [`IdentitySnapshot`], drives initial session
/// acquisition, reacts to session-change notifications, and exposes the
/// operations the UI consumes.
pub struct IdentityOrchestrator {
    inner: Arc<Inner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IdentityOrchestrator {
    /// Create an orchestrator with default timing.
    pub fn new(
        auth: Arc<dyn AuthApi>,
        data: Arc<dyn DataApi>,
        gateway: SessionGateway,
    ) -> Self {
        Self::with_config(auth, data, gateway, OrchestratorConfig::default())
    }

    /// Create an orchestrator with explicit timing (tests shrink the
    /// windows).
    pub fn with_config(
        auth: Arc<dyn AuthApi>,
        data: Arc<dyn DataApi>,
        gateway: SessionGateway,
        config: OrchestratorConfig,
    ) -> Self {
        let (snapshot, _) = watch::channel(IdentitySnapshot::initializing());
        Self {
            inner: Arc::new(Inner {
                gateway,
                auth,
                resolver: RoleResolver::new(data.clone()),
                data,
                snapshot,
                generation: AtomicU64::new(0),
                commit_lock: Mutex::new(()),
                config,
            }),
            task: Mutex::new(None),
        }
    }

    /// Acquire the existing session (bounded) and start reacting to
    /// session-change notifications.
    ///
    /// Startup never hangs: on error or timeout the state machine lands in
    /// `Anonymous` with identity cleared.
    pub async fn start(&self) {
        let inner = &self.inner;
        let generation = inner.next_generation();

        let snapshot = match timeout(inner.config.startup_timeout, inner.gateway.get_session())
            .await
        {
            Ok(Ok(Some(session))) => {
                info!(user_id = %session.user.id, "Existing session acquired");
                inner.compose(session).await
            }
            Ok(Ok(None)) => {
                debug!("No existing session");
                IdentitySnapshot::anonymous()
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Startup session acquisition failed");
                IdentitySnapshot::anonymous()
            }
            Err(_) => {
                warn!("Startup session acquisition timed out");
                IdentitySnapshot::anonymous()
            }
        };
        inner.commit(generation, snapshot);

        let task_inner = inner.clone();
        let handle = tokio::spawn(async move {
            let mut events = task_inner.auth.subscribe();
            loop {
                match events.recv().await {
                    Ok(SessionChanged::SignedIn(session))
                    | Ok(SessionChanged::TokenRefreshed(session)) => {
                        let generation = task_inner.next_generation();
                        let snapshot = task_inner.compose(session).await;
                        task_inner.commit(generation, snapshot);
                    }
                    Ok(SessionChanged::SignedOut) => {
                        let generation = task_inner.next_generation();
                        task_inner.commit(generation, IdentitySnapshot::anonymous());
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Session-change stream lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = task.replace(handle) {
            old.abort();
        }
    }

    /// Stop reacting to session-change notifications. Synchronous; no state
    /// update can land after this returns.
    pub fn shutdown(&self) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = task.take() {
            handle.abort();
        }
        // A late in-flight composition is fenced off as well.
        self.inner.next_generation();
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> IdentitySnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Watch the snapshot for changes.
    pub fn subscribe(&self) -> watch::Receiver<IdentitySnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Sign in and compose the authenticated state before returning.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<BackendSession> {
        let session = self.inner.gateway.sign_in(email, password).await?;
        let generation = self.inner.next_generation();
        let snapshot = self.inner.compose(session.clone()).await;
        self.inner.commit(generation, snapshot);
        Ok(session)
    }

    /// Register a new account. Does not change identity state; the user
    /// signs in after confirming their email.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> AuthResult<BackendUser> {
        self.inner.gateway.sign_up(email, password, display_name).await
    }

    /// Sign out. In-memory identity is cleared synchronously before the
    /// remote call is awaited, so consumers observe "logged out" immediately
    /// even when the network is slow. Idempotent.
    pub async fn sign_out(&self) {
        let generation = self.inner.next_generation();
        self.inner.commit(generation, IdentitySnapshot::anonymous());
        self.inner.gateway.sign_out().await;
    }

    /// Capability check by name. False when no permissions are loaded.
    pub fn has_permission(&self, name: &str) -> bool {
        self.inner.snapshot.borrow().has_permission(name)
    }

    /// Whether the current role carries admin authority.
    pub fn is_admin(&self) -> bool {
        self.inner.snapshot.borrow().is_admin()
    }

    /// Create a user profile with the given role. Admin only.
    pub async fn create_user(
        &self,
        user_id: &str,
        email: &str,
        display_name: Option<&str>,
        role: Role,
    ) -> AuthResult<()> {
        let actor = self.require_admin()?;

        let row = ProfileRow {
            id: user_id.to_string(),
            role: role.as_str().to_string(),
            display_name: display_name.map(String::from),
            email: Some(email.to_string()),
        };
        self.inner
            .data
            .insert_profile(&row)
            .await
            .map_err(AuthError::normalize)?;

        self.inner
            .append_audit(
                &actor,
                ACTION_USER_CREATE,
                &format!("user:{user_id}"),
                &format!("created {email} as {role}"),
            )
            .await;
        Ok(())
    }

    /// Change a user's role. Admin only.
    pub async fn update_user_role(&self, user_id: &str, role: Role) -> AuthResult<()> {
        let actor = self.require_admin()?;

        self.inner
            .data
            .update_profile_role(user_id, role.as_str())
            .await
            .map_err(AuthError::normalize)?;

        self.inner
            .append_audit(
                &actor,
                ACTION_USER_UPDATE_ROLE,
                &format!("user:{user_id}"),
                &format!("role set to {role}"),
            )
            .await;
        Ok(())
    }

    /// Delete a user profile. Admin only.
    pub async fn delete_user(&self, user_id: &str) -> AuthResult<()> {
        let actor = self.require_admin()?;

        self.inner
            .data
            .delete_profile(user_id)
            .await
            .map_err(AuthError::normalize)?;

        self.inner
            .append_audit(
                &actor,
                ACTION_USER_DELETE,
                &format!("user:{user_id}"),
                "profile deleted",
            )
            .await;
        Ok(())
    }

    /// Authorization gate for privileged mutations: checked at the point of
    /// the call, not at render time. Returns the acting user's id.
    fn require_admin(&self) -> AuthResult<String> {
        let snapshot = self.inner.snapshot.borrow();
        if !snapshot.is_admin() {
            return Err(AuthError::authorization_denied());
        }
        snapshot
            .user
            .as_ref()
            .map(|u| u.user_id.clone())
            .ok_or_else(AuthError::authorization_denied)
    }
}

impl Drop for IdentityOrchestrator {
    fn drop(&mut self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}
