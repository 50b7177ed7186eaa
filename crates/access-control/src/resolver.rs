//! Cascade role resolution.

use crate::Role;
use backend_client::{DataApi, ProfileRow};
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves a user id to a role through an ordered cascade of authority
/// sources:
///
/// 1. the site-admin registry (overrides everything),
/// 2. the profile row's role field,
/// 3. the role-assignments table,
/// 4. [`Role::Viewer`].
///
/// A source failure is logged and the cascade continues; resolution never
/// returns an error.
pub struct RoleResolver {
    data: Arc<dyn DataApi>,
}

impl RoleResolver {
    /// Create a resolver over the given data backend.
    pub fn new(data: Arc<dyn DataApi>) -> Self {
        Self { data }
    }

    /// Resolve the user's role.
    pub async fn resolve(&self, user_id: &str) -> Role {
        match self.data.is_site_admin(user_id).await {
            Ok(true) => {
                debug!(user_id, "Resolved via site-admin registry");
                return Role::SiteAdmin;
            }
            Ok(false) => {}
            Err(e) => warn!(user_id, error = %e, "Site-admin registry query failed"),
        }

        match self.data.fetch_profile(user_id).await {
            Ok(Some(profile)) => {
                if let Some(role) = Role::parse(&profile.role) {
                    debug!(user_id, role = %role, "Resolved via profile");
                    return role;
                }
                warn!(user_id, stored = %profile.role, "Profile holds unknown role name");
            }
            Ok(None) => {
                // First login: provision a default profile so the next
                // resolution is deterministic. Best-effort.
                if let Err(e) = self.provision_profile(user_id).await {
                    warn!(user_id, error = %e, "Default profile provisioning failed");
                }
            }
            Err(e) => warn!(user_id, error = %e, "Profile query failed"),
        }

        match self.data.fetch_role_assignment(user_id).await {
            Ok(Some(assignment)) => {
                if let Some(role) = Role::parse(&assignment.role) {
                    debug!(user_id, role = %role, "Resolved via role assignment");
                    return role;
                }
                warn!(user_id, stored = %assignment.role, "Assignment holds unknown role name");
            }
            Ok(None) => {}
            Err(e) => warn!(user_id, error = %e, "Role-assignment query failed"),
        }

        debug!(user_id, "No authority source matched, defaulting to viewer");
        Role::Viewer
    }

    async fn provision_profile(&self, user_id: &str) -> backend_client::BackendResult<()> {
        let row = ProfileRow {
            id: user_id.to_string(),
            role: Role::Viewer.as_str().to_string(),
            display_name: None,
            email: None,
        };
        self.data.insert_profile(&row).await
    }
}
