//! Reaction to session-change notifications.

use super::{fixture, fixture_with, wait_until};
use crate::{AuthState, OrchestratorConfig};
use access_control::Role;
use backend_client::{ProfileRow, SessionChanged};
use session_gateway::GatewayConfig;
use std::time::Duration;

#[tokio::test]
async fn external_sign_out_lands_anonymous() {
    let f = fixture();
    f.backend.add_user("user-1", "a@x.com", "pw");
    f.orchestrator.start().await;
    f.orchestrator.sign_in("a@x.com", "pw").await.unwrap();
    let mut rx = f.orchestrator.subscribe();

    f.backend.push_event(SessionChanged::SignedOut);

    wait_until(&mut rx, |s| s.state == AuthState::Anonymous).await;
    assert!(f.orchestrator.snapshot().user.is_none());
}

#[tokio::test]
async fn token_refresh_recomposes_the_profile() {
    let f = fixture();
    f.backend.add_user("user-1", "a@x.com", "pw");
    f.backend.set_profile(ProfileRow {
        id: "user-1".to_string(),
        role: "worker".to_string(),
        display_name: None,
        email: Some("a@x.com".to_string()),
    });
    f.orchestrator.start().await;
    f.orchestrator.sign_in("a@x.com", "pw").await.unwrap();
    assert_eq!(f.orchestrator.snapshot().role(), Some(Role::Worker));
    let mut rx = f.orchestrator.subscribe();

    // A role change lands on the next refresh, not mid-session.
    f.backend.set_profile(ProfileRow {
        id: "user-1".to_string(),
        role: "manager".to_string(),
        display_name: None,
        email: Some("a@x.com".to_string()),
    });
    f.backend
        .push_event(SessionChanged::TokenRefreshed(f.backend.session_for("a@x.com")));

    wait_until(&mut rx, |s| s.role() == Some(Role::Manager)).await;
    assert!(f.orchestrator.has_permission("canManageBudget"));
}

#[tokio::test]
async fn late_composition_cannot_override_sign_out() {
    let f = fixture_with(
        GatewayConfig::default(),
        OrchestratorConfig {
            profile_timeout: Duration::from_millis(300),
            ..OrchestratorConfig::default()
        },
    );
    f.backend.add_user("user-1", "a@x.com", "pw");
    f.backend.seed_session(f.backend.session_for("a@x.com"));
    f.backend.set_hang_site_admin(true);

    // Startup acquires the session quickly, then sits in profile composition
    // until the 300ms budget runs out.
    let orchestrator = f.orchestrator.clone();
    let startup = tokio::spawn(async move { orchestrator.start().await });

    // Sign out while that composition is still in flight.
    tokio::time::sleep(Duration::from_millis(50)).await;
    f.orchestrator.sign_out().await;
    assert_eq!(f.orchestrator.snapshot().state, AuthState::Anonymous);

    // The slow composition eventually resolves; it must not commit over the
    // newer anonymous state.
    startup.await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(f.orchestrator.snapshot().state, AuthState::Anonymous);
}

#[tokio::test]
async fn events_after_shutdown_are_ignored() {
    let f = fixture();
    f.backend.add_user("user-1", "a@x.com", "pw");
    f.orchestrator.start().await;
    f.orchestrator.sign_in("a@x.com", "pw").await.unwrap();

    f.orchestrator.shutdown();
    f.backend.push_event(SessionChanged::SignedOut);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(f.orchestrator.snapshot().state, AuthState::Authenticated);
}
