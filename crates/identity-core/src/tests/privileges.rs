//! Admin gating on user-management mutations, and audit emission.

use super::fixture;
use access_control::Role;
use backend_client::ProfileRow;
use session_gateway::AuthErrorKind;

#[tokio::test]
async fn non_admin_mutations_are_denied() {
    let f = fixture();
    f.backend.add_user("user-1", "a@x.com", "pw");
    f.backend.set_assignment("user-1", "worker");
    f.backend.set_profile(ProfileRow {
        id: "victim".to_string(),
        role: "viewer".to_string(),
        display_name: None,
        email: Some("victim@x.com".to_string()),
    });
    f.orchestrator.start().await;
    f.orchestrator.sign_in("a@x.com", "pw").await.unwrap();
    assert_eq!(f.orchestrator.snapshot().role(), Some(Role::Worker));

    let err = f
        .orchestrator
        .create_user("new", "new@x.com", None, Role::Viewer)
        .await
        .unwrap_err();
    assert_eq!(err.kind, AuthErrorKind::AuthorizationDenied);

    let err = f
        .orchestrator
        .update_user_role("victim", Role::Admin)
        .await
        .unwrap_err();
    assert_eq!(err.kind, AuthErrorKind::AuthorizationDenied);

    let err = f.orchestrator.delete_user("victim").await.unwrap_err();
    assert_eq!(err.kind, AuthErrorKind::AuthorizationDenied);

    // No mutation happened and nothing was audited.
    let victim = f.backend.profile("victim").unwrap();
    assert_eq!(victim.role, "viewer");
    assert!(f.backend.profile("new").is_none());
    assert!(f.backend.audit_entries().is_empty());
}

#[tokio::test]
async fn anonymous_mutations_are_denied() {
    let f = fixture();
    f.orchestrator.start().await;

    let err = f.orchestrator.delete_user("victim").await.unwrap_err();
    assert_eq!(err.kind, AuthErrorKind::AuthorizationDenied);
}

#[tokio::test]
async fn admin_mutations_succeed_and_are_audited() {
    let f = fixture();
    f.backend.add_user("user-1", "a@x.com", "pw");
    f.backend.set_profile(ProfileRow {
        id: "user-1".to_string(),
        role: "admin".to_string(),
        display_name: Some("Ada".to_string()),
        email: Some("a@x.com".to_string()),
    });
    f.orchestrator.start().await;
    f.orchestrator.sign_in("a@x.com", "pw").await.unwrap();
    assert!(f.orchestrator.is_admin());

    f.orchestrator
        .create_user("user-2", "b@x.com", Some("Bea"), Role::Worker)
        .await
        .unwrap();
    assert_eq!(f.backend.profile("user-2").unwrap().role, "worker");

    f.orchestrator
        .update_user_role("user-2", Role::Manager)
        .await
        .unwrap();
    assert_eq!(f.backend.profile("user-2").unwrap().role, "manager");

    f.orchestrator.delete_user("user-2").await.unwrap();
    assert!(f.backend.profile("user-2").is_none());

    let audit = f.backend.audit_entries();
    let actions: Vec<&str> = audit.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, ["user.create", "user.update_role", "user.delete"]);
    assert!(audit.iter().all(|e| e.actor_id == "user-1"));
    assert!(audit.iter().all(|e| e.resource == "user:user-2"));
}

#[tokio::test]
async fn audit_failure_does_not_fail_the_mutation() {
    let f = fixture();
    f.backend.add_user("user-1", "a@x.com", "pw");
    f.backend.set_profile(ProfileRow {
        id: "user-1".to_string(),
        role: "admin".to_string(),
        display_name: None,
        email: Some("a@x.com".to_string()),
    });
    f.orchestrator.start().await;
    f.orchestrator.sign_in("a@x.com", "pw").await.unwrap();

    f.backend.set_fail_audit(true);
    f.orchestrator
        .create_user("user-2", "b@x.com", None, Role::Viewer)
        .await
        .unwrap();

    assert!(f.backend.profile("user-2").is_some());
    assert!(f.backend.audit_entries().is_empty());
}
