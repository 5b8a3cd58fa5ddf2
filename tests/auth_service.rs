use std::sync::Arc;

use tileboard::api::{ApiClient, AuthService};
use tileboard::session::{SessionStore, User};

fn services(dir: &tempfile::TempDir) -> (Arc<SessionStore>, AuthService) {
    let session = Arc::new(SessionStore::new(dir.path().join("session.json")));
    // Nothing listens here; every request fails fast.
    let api = Arc::new(ApiClient::new("http://127.0.0.1:9", Arc::clone(&session)).unwrap());
    let auth = AuthService::new(api, Arc::clone(&session));
    (session, auth)
}

#[test]
fn login_failure_is_a_tagged_result() {
    let dir = tempfile::tempdir().unwrap();
    let (session, auth) = services(&dir);

    let outcome = auth.login("ada", "secret");

    assert!(!outcome.success);
    assert!(outcome.error.is_some());
    assert!(outcome.user.is_none());
    assert!(!session.is_active());
}

#[test]
fn logout_clears_the_session_even_when_the_backend_is_down() {
    let dir = tempfile::tempdir().unwrap();
    let (session, auth) = services(&dir);
    session
        .save(
            "tok-123",
            &User {
                id: "u1".into(),
                username: "ada".into(),
                display_name: None,
                is_admin: false,
            },
        )
        .unwrap();
    assert!(auth.is_logged_in());

    auth.logout();

    assert!(!auth.is_logged_in());
    assert!(auth.current_user().is_none());
}
