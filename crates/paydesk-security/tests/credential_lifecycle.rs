use chrono::Duration;
use paydesk_common::{ManualClock, Role};
use paydesk_db::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};
use paydesk_security::{CredentialStore, default_headers};
use reqwest::header::AUTHORIZATION;
use std::sync::Arc;

const MERCHANT_JWT: &str = "abc.eyJ1c2VyIjp7InJvbGUiOiJtZXJjaGFudCJ9fQ.xyz";

#[test]
fn merchant_login_then_day_passes() {
    let clock = ManualClock::default();
    let store = CredentialStore::with_clock(MemoryKeyValueStore::new(), clock.clone());

    store.set_token(MERCHANT_JWT, None);
    assert_eq!(store.current_role(), Some(Role::Merchant));
    assert!(store.is_token_valid(None));

    let headers = default_headers(&store);
    assert_eq!(
        headers.get(AUTHORIZATION).unwrap().to_str().unwrap(),
        format!("Bearer {MERCHANT_JWT}")
    );

    clock.advance(Duration::hours(24));
    assert!(!store.is_token_valid(None));
    assert!(default_headers(&store).get(AUTHORIZATION).is_none());
}

#[test]
fn admin_login_replaces_merchant_session() {
    let store = CredentialStore::new(MemoryKeyValueStore::new());
    store.set_token("merchant-token", Some(Role::Merchant));
    store.set_token("admin-token", Some(Role::Admin));

    assert_eq!(store.get_token(Some(Role::Merchant)), None);
    assert_eq!(store.get_token(None), Some("admin-token".to_string()));

    store.remove_token(None);
    store.remove_token(None);
    assert_eq!(store.current_role(), None);
    assert!(store.storage().is_empty());
}

#[test]
fn credential_survives_restart_with_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.db");
    let clock = ManualClock::default();

    {
        let storage = SqliteKeyValueStore::open(&path, "https://dash.example").unwrap();
        let store = CredentialStore::with_clock(storage, clock.clone());
        store.set_token("persisted", Some(Role::Admin));
    }

    let storage = Arc::new(SqliteKeyValueStore::open(&path, "https://dash.example").unwrap());
    let store = CredentialStore::with_clock(Arc::clone(&storage), clock.clone());
    assert_eq!(store.current_role(), Some(Role::Admin));
    assert_eq!(store.get_token(None), Some("persisted".to_string()));

    clock.advance(Duration::hours(24) - Duration::minutes(4));
    assert_eq!(store.get_token(None), None);
    assert_eq!(storage.get("authToken_admin").unwrap(), None);
}
