//! Timeout-raced auth operations with persistence side effects.

use crate::error::{AuthError, AuthResult};
use backend_client::{AuthApi, BackendSession, BackendUser};
use credential_store::{CredentialRecord, CredentialStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Default timeout for explicit user actions (sign-in, sign-up).
pub const DEFAULT_SIGN_IN_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for background session operations.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(15);

/// Freshness window stamped onto persisted credentials, independent of the
/// token's own expiry. Acts as a resilience buffer for offline restarts.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(3600);

/// Gateway timing and redirect configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Window for sign-in and sign-up.
    pub sign_in_timeout: Duration,
    /// Window for get-session, refresh, and remote sign-out.
    pub session_timeout: Duration,
    /// Freshness window for persisted credentials.
    pub freshness_window: Duration,
    /// Email-confirmation redirect sent with sign-up.
    pub confirm_redirect_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            sign_in_timeout: DEFAULT_SIGN_IN_TIMEOUT,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            confirm_redirect_url: opsboard_config::Config::default().confirm_redirect_url(),
        }
    }
}

impl GatewayConfig {
    /// Build from application config.
    pub fn from_config(config: &opsboard_config::Config) -> Self {
        Self {
            confirm_redirect_url: config.confirm_redirect_url(),
            ..Self::default()
        }
    }
}

/// Wraps the remote auth API with timeouts, error normalization, and
/// credential persistence.
///
/// Each operation races the remote call against its window; the loser's
/// eventual resolution is dropped and never produces a second transition.
pub struct SessionGateway {
    auth: Arc<dyn AuthApi>,
    store: Arc<CredentialStore>,
    config: GatewayConfig,
}

impl SessionGateway {
    /// Create a gateway with default timing.
    pub fn new(auth: Arc<dyn AuthApi>, store: Arc<CredentialStore>) -> Self {
        Self::with_config(auth, store, GatewayConfig::default())
    }

    /// Create a gateway with explicit timing (tests shrink the windows).
    pub fn with_config(
        auth: Arc<dyn AuthApi>,
        store: Arc<CredentialStore>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            auth,
            store,
            config,
        }
    }

    /// The credential store this gateway persists through.
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Sign in with email and password.
    ///
    /// Timeouts are surfaced here (not swallowed) because this is an explicit
    /// user action the user can retry.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<BackendSession> {
        match timeout(
            self.config.sign_in_timeout,
            self.auth.sign_in_with_password(email, password),
        )
        .await
        {
            Ok(Ok(session)) => {
                self.persist(&session);
                info!(user_id = %session.user.id, "Sign-in succeeded");
                Ok(session)
            }
            Ok(Err(e)) => Err(AuthError::normalize(e)),
            Err(_) => Err(AuthError::timeout("Sign-in")),
        }
    }

    /// Register a new account. The returned user is not yet confirmed.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> AuthResult<BackendUser> {
        match timeout(
            self.config.sign_in_timeout,
            self.auth
                .sign_up(email, password, display_name, &self.config.confirm_redirect_url),
        )
        .await
        {
            Ok(Ok(user)) => {
                info!(user_id = %user.id, "Sign-up accepted, confirmation pending");
                Ok(user)
            }
            Ok(Err(e)) => Err(AuthError::normalize(e)),
            Err(_) => Err(AuthError::timeout("Sign-up")),
        }
    }

    /// Sign out. Idempotent and infallible: local state is cleared whether or
    /// not the remote call succeeds.
    pub async fn sign_out(&self) {
        self.store.mark_next_removal_intentional();

        match timeout(self.config.session_timeout, self.auth.sign_out()).await {
            Ok(Ok(())) => debug!("Remote sign-out succeeded"),
            Ok(Err(e)) => warn!(error = %e, "Remote sign-out failed, clearing locally anyway"),
            Err(_) => warn!("Remote sign-out timed out, clearing locally anyway"),
        }

        self.store.remove(true);
        self.store.clear_intentional_marker();
    }

    /// The current session, restoring from persisted credentials when the
    /// backend holds none.
    pub async fn get_session(&self) -> AuthResult<Option<BackendSession>> {
        let current = match timeout(self.config.session_timeout, self.auth.get_session()).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => return Err(AuthError::normalize(e)),
            Err(_) => return Err(AuthError::timeout("Session lookup")),
        };

        if let Some(session) = current {
            self.persist(&session);
            return Ok(Some(session));
        }

        // Backend has nothing in memory; try the persisted record.
        let Some(record) = self.store.read() else {
            return Ok(None);
        };
        let Ok(persisted) = serde_json::from_value::<BackendSession>(record.current_session) else {
            warn!("Persisted session payload is malformed, ignoring");
            return Ok(None);
        };

        debug!("Restoring session from persisted credentials");
        match timeout(
            self.config.session_timeout,
            self.auth.restore_session(persisted),
        )
        .await
        {
            Ok(Ok(session)) => {
                self.persist(&session);
                Ok(Some(session))
            }
            Ok(Err(e)) => Err(AuthError::normalize(e)),
            Err(_) => Err(AuthError::timeout("Session restore")),
        }
    }

    /// Mint a replacement session from the current refresh token.
    pub async fn refresh_session(&self) -> AuthResult<BackendSession> {
        match timeout(self.config.session_timeout, self.auth.refresh_session()).await {
            Ok(Ok(session)) => {
                self.persist(&session);
                Ok(session)
            }
            Ok(Err(e)) => Err(AuthError::normalize(e)),
            Err(_) => Err(AuthError::timeout("Session refresh")),
        }
    }

    /// Mirror a session into the credential store with the freshness window.
    fn persist(&self, session: &BackendSession) {
        let payload = match serde_json::to_value(session) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Could not serialize session for persistence");
                return;
            }
        };
        let record = CredentialRecord {
            current_session: payload,
            expires_at: chrono::Utc::now().timestamp_millis()
                + self.config.freshness_window.as_millis() as i64,
        };
        self.store.write(&record);
    }
}
