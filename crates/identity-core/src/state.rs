//! The identity state machine's observable state.

use crate::profile::{Identity, Profile};
use access_control::{PermissionSet, Role};
use backend_client::BackendSession;

/// Authentication state.
///
/// `Initializing` is the only start state. `Authenticated` and `Anonymous`
/// transition into each other on sign-in/sign-out/session loss; there is no
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Initializing,
    Anonymous,
    Authenticated,
}

/// Whole-object snapshot of the current identity.
///
/// Transitions replace the entire snapshot, never a single field, so
/// consumers cannot observe a role paired with another role's permissions.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentitySnapshot {
    pub state: AuthState,
    pub session: Option<BackendSession>,
    pub user: Option<Identity>,
    pub profile: Option<Profile>,
}

impl IdentitySnapshot {
    /// The start state.
    pub fn initializing() -> Self {
        Self {
            state: AuthState::Initializing,
            session: None,
            user: None,
            profile: None,
        }
    }

    /// Signed-out state with all identity cleared.
    pub fn anonymous() -> Self {
        Self {
            state: AuthState::Anonymous,
            session: None,
            user: None,
            profile: None,
        }
    }

    /// Signed-in state with a composed profile.
    pub fn authenticated(session: BackendSession, profile: Profile) -> Self {
        let user = Identity::from(&session.user);
        Self {
            state: AuthState::Authenticated,
            session: Some(session),
            user: Some(user),
            profile: Some(profile),
        }
    }

    /// Whether initial session acquisition is still in flight.
    pub fn loading(&self) -> bool {
        self.state == AuthState::Initializing
    }

    /// The current role, if authenticated.
    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }

    /// The current permission set, if authenticated.
    pub fn permissions(&self) -> Option<PermissionSet> {
        self.profile.as_ref().map(|p| p.permissions)
    }

    /// Capability check by name. False when no permissions are loaded.
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions()
            .map(|p| p.allows(name))
            .unwrap_or(false)
    }

    /// Whether the current role carries admin authority.
    pub fn is_admin(&self) -> bool {
        self.role().map(|r| r.is_admin()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_has_no_capabilities() {
        let snapshot = IdentitySnapshot::anonymous();
        assert!(!snapshot.loading());
        assert!(!snapshot.is_admin());
        assert!(!snapshot.has_permission("canViewReports"));
        assert!(snapshot.role().is_none());
    }

    #[test]
    fn test_initializing_is_loading() {
        assert!(IdentitySnapshot::initializing().loading());
    }
}
