//! Identity orchestration for the OpsBoard dashboard.
//!
//! Owns the in-memory identity state machine: acquires the existing session
//! at startup under a bounded timeout, composes a profile from the role
//! cascade and permission table, subscribes to session-change notifications,
//! and exposes sign-in/sign-out and admin-gated user mutations to UI
//! consumers. Every state transition replaces the whole snapshot, and a
//! generation counter discards late-resolving compositions so the most
//! recent event always wins.

mod orchestrator;
mod profile;
mod state;

#[cfg(test)]
mod tests;

pub use orchestrator::{IdentityOrchestrator, OrchestratorConfig};
pub use profile::{Identity, Profile};
pub use state::{AuthState, IdentitySnapshot};
