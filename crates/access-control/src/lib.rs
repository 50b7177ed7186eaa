//! Roles, permissions, and role resolution for the OpsBoard identity stack.
//!
//! - [`Role`] is the closed set of roles the dashboard knows about
//! - [`permissions_for`] maps every role to a fixed-shape [`PermissionSet`]
//! - [`RoleResolver`] resolves a user id to a role through an ordered cascade
//!   of authority sources and never fails

mod permissions;
mod resolver;
mod role;

pub use permissions::{permissions_for, PermissionSet};
pub use resolver::RoleResolver;
pub use role::Role;
