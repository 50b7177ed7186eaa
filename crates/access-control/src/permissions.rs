//! The role -> permission table.

use crate::Role;
use serde::{Deserialize, Serialize};

/// Fixed-shape capability record.
///
/// Every field is present for every role; there is no partially-defined
/// permission set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    pub can_create_projects: bool,
    pub can_edit_projects: bool,
    pub can_delete_projects: bool,
    pub can_manage_users: bool,
    pub can_manage_inventory: bool,
    pub can_view_reports: bool,
    pub can_manage_budget: bool,
    pub can_export_data: bool,
}

impl PermissionSet {
    /// No capabilities at all. Also the fallback for unrecognized roles.
    pub const NONE: PermissionSet = PermissionSet {
        can_create_projects: false,
        can_edit_projects: false,
        can_delete_projects: false,
        can_manage_users: false,
        can_manage_inventory: false,
        can_view_reports: false,
        can_manage_budget: false,
        can_export_data: false,
    };

    /// Look up a capability by its camelCase name.
    ///
    /// Unknown names are `false`, so a stale UI permission string can never
    /// grant access.
    pub fn allows(&self, name: &str) -> bool {
        match name {
            "canCreateProjects" => self.can_create_projects,
            "canEditProjects" => self.can_edit_projects,
            "canDeleteProjects" => self.can_delete_projects,
            "canManageUsers" => self.can_manage_users,
            "canManageInventory" => self.can_manage_inventory,
            "canViewReports" => self.can_view_reports,
            "canManageBudget" => self.can_manage_budget,
            "canExportData" => self.can_export_data,
            _ => false,
        }
    }
}

/// Total mapping from role to permission set.
pub const fn permissions_for(role: Role) -> PermissionSet {
    match role {
        Role::SiteAdmin | Role::Admin => PermissionSet {
            can_create_projects: true,
            can_edit_projects: true,
            can_delete_projects: true,
            can_manage_users: true,
            can_manage_inventory: true,
            can_view_reports: true,
            can_manage_budget: true,
            can_export_data: true,
        },
        Role::Manager => PermissionSet {
            can_create_projects: true,
            can_edit_projects: true,
            can_delete_projects: false,
            can_manage_users: false,
            can_manage_inventory: true,
            can_view_reports: true,
            can_manage_budget: true,
            can_export_data: true,
        },
        Role::TeamLead => PermissionSet {
            can_create_projects: true,
            can_edit_projects: true,
            can_delete_projects: false,
            can_manage_users: false,
            can_manage_inventory: false,
            can_view_reports: true,
            can_manage_budget: false,
            can_export_data: true,
        },
        Role::InventoryManager => PermissionSet {
            can_create_projects: false,
            can_edit_projects: false,
            can_delete_projects: false,
            can_manage_users: false,
            can_manage_inventory: true,
            can_view_reports: true,
            can_manage_budget: false,
            can_export_data: true,
        },
        Role::Worker => PermissionSet {
            can_create_projects: false,
            can_edit_projects: true,
            can_delete_projects: false,
            can_manage_users: false,
            can_manage_inventory: false,
            can_view_reports: false,
            can_manage_budget: false,
            can_export_data: false,
        },
        Role::Viewer => PermissionSet {
            can_view_reports: true,
            ..PermissionSet::NONE
        },
    }
}
