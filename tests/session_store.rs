use tileboard::session::{SessionStore, User};

fn user() -> User {
    User {
        id: "u1".into(),
        username: "ada".into(),
        display_name: Some("Ada".into()),
        is_admin: false,
    }
}

#[test]
fn token_and_user_persist_together() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let store = SessionStore::new(&path);
    assert!(!store.is_active());
    store.save("tok-123", &user()).unwrap();

    let reopened = SessionStore::new(&path);
    assert!(reopened.is_active());
    assert_eq!(reopened.token().as_deref(), Some("tok-123"));
    assert_eq!(reopened.user(), Some(user()));
}

#[test]
fn clear_removes_both_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let store = SessionStore::new(&path);
    store.save("tok-123", &user()).unwrap();
    store.clear();

    assert!(!store.is_active());
    assert!(store.token().is_none());
    assert!(store.user().is_none());
    assert!(!path.exists());
}

#[test]
fn malformed_file_means_no_session_and_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = SessionStore::new(&path);
    assert!(!store.is_active());
    assert!(store.token().is_none());
    assert!(!path.exists());
}

#[test]
fn empty_file_means_no_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "").unwrap();

    let store = SessionStore::new(&path);
    assert!(!store.is_active());
}
