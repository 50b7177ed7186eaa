//! Identity and composed profile types.

use access_control::{permissions_for, PermissionSet, Role};
use backend_client::BackendUser;

/// Minimal user reference derived from a valid session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

impl From<&BackendUser> for Identity {
    fn from(user: &BackendUser) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
        }
    }
}

/// Composed view-model for UI consumption.
///
/// Always built whole — role and permissions come from the same resolution
/// pass, so an inconsistent pairing is never observable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub permissions: PermissionSet,
}

impl Profile {
    /// Compose a profile for a resolved role.
    pub fn compose(user: &BackendUser, role: Role) -> Self {
        let display_name = user
            .display_name
            .clone()
            .unwrap_or_else(|| email_local_part(&user.email).to_string());
        Self {
            display_name,
            email: user.email.clone(),
            role,
            permissions: permissions_for(role),
        }
    }

    /// Safe default used when role resolution fails or times out: display
    /// name from the email's local part, viewer permissions.
    pub fn fallback(email: &str) -> Self {
        Self {
            display_name: email_local_part(email).to_string(),
            email: email.to_string(),
            role: Role::Viewer,
            permissions: permissions_for(Role::Viewer),
        }
    }
}

fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_profile() {
        let profile = Profile::fallback("ada.lovelace@x.com");
        assert_eq!(profile.display_name, "ada.lovelace");
        assert_eq!(profile.role, Role::Viewer);
        assert!(!profile.permissions.can_manage_users);
    }

    #[test]
    fn test_compose_prefers_stored_display_name() {
        let user = BackendUser {
            id: "user-1".to_string(),
            email: "a@x.com".to_string(),
            display_name: Some("Ada".to_string()),
        };
        let profile = Profile::compose(&user, Role::Manager);
        assert_eq!(profile.display_name, "Ada");
        assert_eq!(profile.permissions, permissions_for(Role::Manager));
    }

    #[test]
    fn test_compose_without_display_name_uses_local_part() {
        let user = BackendUser {
            id: "user-1".to_string(),
            email: "ops@x.com".to_string(),
            display_name: None,
        };
        assert_eq!(Profile::compose(&user, Role::Worker).display_name, "ops");
    }
}
