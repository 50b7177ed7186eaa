//! Remote backend client for the OpsBoard identity stack.
//!
//! This crate owns everything that talks to the hosted backend service:
//! - `AuthApi` / `DataApi` traits that the rest of the workspace is written
//!   against, so a fake backend can be injected in tests
//! - `RestBackend`, the production implementation against a Supabase-style
//!   REST surface (`/auth/v1/*` and `/rest/v1/*`)
//! - session-change notifications pushed over a broadcast channel
//! - `FakeBackend`, an in-memory implementation with failure injection

mod api;
mod error;
pub mod fake;
mod rest;
mod types;

pub use api::{AuthApi, DataApi};
pub use error::{BackendError, BackendResult};
pub use fake::FakeBackend;
pub use rest::RestBackend;
pub use types::{
    AuditEntry, BackendSession, BackendUser, ProfileRow, RoleAssignmentRow, SessionChanged,
};
