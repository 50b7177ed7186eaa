//! The closed role set.

use serde::{Deserialize, Serialize};

/// Role of a dashboard user.
///
/// Stored values use snake_case names. Parsing is lenient: unknown strings
/// map to `None` and callers fall back to [`Role::Viewer`], so data drift in
/// the backend tables can never produce an unmapped role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SiteAdmin,
    Admin,
    Manager,
    TeamLead,
    InventoryManager,
    Worker,
    Viewer,
}

impl Role {
    /// All enumerated roles.
    pub const ALL: [Role; 7] = [
        Role::SiteAdmin,
        Role::Admin,
        Role::Manager,
        Role::TeamLead,
        Role::InventoryManager,
        Role::Worker,
        Role::Viewer,
    ];

    /// Parse a stored role name. Unknown names return `None`.
    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "site_admin" => Some(Role::SiteAdmin),
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "team_lead" => Some(Role::TeamLead),
            "inventory_manager" => Some(Role::InventoryManager),
            "worker" => Some(Role::Worker),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }

    /// The stored snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SiteAdmin => "site_admin",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::TeamLead => "team_lead",
            Role::InventoryManager => "inventory_manager",
            Role::Worker => "worker",
            Role::Viewer => "viewer",
        }
    }

    /// Whether this role carries admin authority.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::SiteAdmin | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::parse(""), None);
        assert_eq!(Role::parse("ADMIN"), None);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Role::InventoryManager).unwrap();
        assert_eq!(json, r#""inventory_manager""#);
        let parsed: Role = serde_json::from_str(r#""team_lead""#).unwrap();
        assert_eq!(parsed, Role::TeamLead);
    }

    #[test]
    fn test_admin_authority() {
        assert!(Role::SiteAdmin.is_admin());
        assert!(Role::Admin.is_admin());
        assert!(!Role::Manager.is_admin());
        assert!(!Role::Viewer.is_admin());
    }
}
