//! Profile composition under degraded data sources.

use super::{fixture, fixture_with};
use crate::{AuthState, OrchestratorConfig};
use access_control::Role;
use session_gateway::GatewayConfig;
use std::time::Duration;

#[tokio::test]
async fn slow_resolution_falls_back_to_viewer() {
    let f = fixture_with(
        GatewayConfig::default(),
        OrchestratorConfig {
            profile_timeout: Duration::from_millis(30),
            ..OrchestratorConfig::default()
        },
    );
    f.backend.add_user("user-1", "a@x.com", "pw");
    f.backend.set_hang_site_admin(true);
    f.orchestrator.start().await;

    f.orchestrator.sign_in("a@x.com", "pw").await.unwrap();

    let snapshot = f.orchestrator.snapshot();
    assert_eq!(snapshot.state, AuthState::Authenticated);
    assert_eq!(snapshot.role(), Some(Role::Viewer));
    // Identity stays usable: the display name comes from the email.
    assert_eq!(
        snapshot.profile.as_ref().unwrap().display_name,
        "a".to_string()
    );
    assert!(!f.orchestrator.is_admin());
}

#[tokio::test]
async fn failing_sources_resolve_to_viewer() {
    let f = fixture();
    f.backend.add_user("user-1", "a@x.com", "pw");
    f.backend.set_fail_site_admin(true);
    f.backend.set_fail_profile(true);
    f.backend.set_fail_assignment(true);
    f.orchestrator.start().await;

    f.orchestrator.sign_in("a@x.com", "pw").await.unwrap();

    let snapshot = f.orchestrator.snapshot();
    assert_eq!(snapshot.state, AuthState::Authenticated);
    assert_eq!(snapshot.role(), Some(Role::Viewer));
    assert!(f.orchestrator.has_permission("canViewReports"));
    assert!(!f.orchestrator.has_permission("canManageUsers"));
}
