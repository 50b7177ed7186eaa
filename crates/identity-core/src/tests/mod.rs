//! Integration tests for the identity orchestrator.
//!
//! Scenario files:
//!
//! - `startup.rs`    - initial session acquisition and its degraded paths
//! - `sign_in_out.rs`- explicit sign-in/sign-out flows
//! - `fallback.rs`   - profile composition fallbacks
//! - `privileges.rs` - admin gating and audit emission
//! - `events.rs`     - session-change notifications and staleness guards

mod events;
mod fallback;
mod privileges;

use crate::{IdentityOrchestrator, IdentitySnapshot, OrchestratorConfig};
use backend_client::{AuthApi, DataApi, FakeBackend};
use credential_store::{CredentialStore, MemoryStore};
use session_gateway::{GatewayConfig, SessionGateway};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Every capability name the permission table knows.
pub(crate) const ALL_PERMISSIONS: [&str; 8] = [
    "canCreateProjects",
    "canEditProjects",
    "canDeleteProjects",
    "canManageUsers",
    "canManageInventory",
    "canViewReports",
    "canManageBudget",
    "canExportData",
];

pub(crate) struct Fixture {
    pub backend: Arc<FakeBackend>,
    pub store: Arc<CredentialStore>,
    pub orchestrator: Arc<IdentityOrchestrator>,
}

pub(crate) fn fixture() -> Fixture {
    fixture_with(GatewayConfig::default(), OrchestratorConfig::default())
}

pub(crate) fn fixture_with(
    gateway_config: GatewayConfig,
    orchestrator_config: OrchestratorConfig,
) -> Fixture {
    let backend = Arc::new(FakeBackend::new());
    let store = Arc::new(CredentialStore::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new()),
    ));
    let gateway = SessionGateway::with_config(
        backend.clone() as Arc<dyn AuthApi>,
        store.clone(),
        gateway_config,
    );
    let orchestrator = Arc::new(IdentityOrchestrator::with_config(
        backend.clone() as Arc<dyn AuthApi>,
        backend.clone() as Arc<dyn DataApi>,
        gateway,
        orchestrator_config,
    ));
    Fixture {
        backend,
        store,
        orchestrator,
    }
}

/// Wait until the snapshot satisfies a predicate, or fail after two seconds.
pub(crate) async fn wait_until(
    rx: &mut watch::Receiver<IdentitySnapshot>,
    pred: impl Fn(&IdentitySnapshot) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if pred(&rx.borrow()) {
                return;
            }
            rx.changed().await.expect("snapshot channel closed");
        }
    })
    .await
    .expect("expected state was not reached in time");
}
