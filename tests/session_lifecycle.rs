//! End-to-end session lifecycle tests against a mock backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use botdeck_core::{ApiError, Config, MemoryStore, Services};

fn pair_json(access: &str, expires_in: u64) -> serde_json::Value {
    json!({
        "accessToken": access,
        "refreshToken": format!("r-{}", access),
        "expiresIn": expires_in
    })
}

fn test_config(server: &MockServer) -> Config {
    Config {
        base_url: server.uri(),
        ..Config::default()
    }
}

async fn mount_login(server: &MockServer, access: &str, expires_in: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pair_json(access, expires_in)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_authenticated_logout_cycle() {
    let server = MockServer::start().await;
    mount_login(&server, "a1", 3600).await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let services = Services::with_store(&test_config(&server), store.clone()).unwrap();

    assert!(!services.tokens.is_authenticated());
    services.auth.login("t@example.com", "pw").await.unwrap();
    assert_eq!(services.tokens.get_access_token().as_deref(), Some("a1"));
    assert!(store.contains("botdeck.session"));

    services.auth.logout().await;
    assert!(!services.tokens.is_authenticated());
    assert!(!store.contains("botdeck.session"));
}

#[tokio::test]
async fn test_session_survives_restart_via_hydration() {
    let server = MockServer::start().await;
    mount_login(&server, "a1", 3600).await;

    let store = Arc::new(MemoryStore::new());
    {
        let services = Services::with_store(&test_config(&server), store.clone()).unwrap();
        services.auth.login("t@example.com", "pw").await.unwrap();
    }

    // "Restart": a fresh service stack over the same durable store
    let services = Services::with_store(&test_config(&server), store.clone()).unwrap();
    // Hydration is normally fire-and-forget; await it here for determinism
    services.tokens.hydrate().await;
    assert_eq!(services.tokens.get_access_token().as_deref(), Some("a1"));
}

#[tokio::test]
async fn test_short_lived_grant_refreshes_through_service() {
    let server = MockServer::start().await;
    // 30s lifetime is inside the 60s refresh buffer: the wired refresh
    // callback must fire immediately after login
    mount_login(&server, "a1", 30).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refreshToken": "r-a1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(pair_json("a2", 3600)))
        .expect(1)
        .mount(&server)
        .await;

    let services =
        Services::with_store(&test_config(&server), Arc::new(MemoryStore::new())).unwrap();
    services.auth.login("t@example.com", "pw").await.unwrap();

    // Give the spawned refresh a moment to round-trip
    for _ in 0..50 {
        if services.tokens.get_access_token().as_deref() == Some("a2") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(services.tokens.get_access_token().as_deref(), Some("a2"));
}

#[tokio::test]
async fn test_401_during_refresh_clears_session_and_notifies_expiry() {
    let server = MockServer::start().await;
    // Inside the refresh buffer: the wired callback fires right after login,
    // and the backend rejects the rotation outright
    mount_login(&server, "a1", 30).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let services = Services::with_store(&test_config(&server), store.clone()).unwrap();

    let expired = Arc::new(AtomicUsize::new(0));
    let flag = expired.clone();
    services.tokens.set_session_expired_callback(Arc::new(move || {
        flag.fetch_add(1, Ordering::SeqCst);
    }));

    services.auth.login("t@example.com", "pw").await.unwrap();

    for _ in 0..50 {
        if expired.load(Ordering::SeqCst) > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    // The 401 cleared the session and the expiry callback still ran
    assert_eq!(expired.load(Ordering::SeqCst), 1);
    assert_eq!(services.tokens.get_access_token(), None);
    assert!(!store.contains("botdeck.session"));
}

#[tokio::test]
async fn test_401_from_resource_endpoint_clears_session() {
    let server = MockServer::start().await;
    mount_login(&server, "a1", 3600).await;
    Mock::given(method("GET"))
        .and(path("/bots"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let services = Services::with_store(&test_config(&server), store.clone()).unwrap();
    services.auth.login("t@example.com", "pw").await.unwrap();

    let result: Result<Vec<serde_json::Value>, ApiError> = services.api.get("/bots").await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
    // The session was gone before the caller's error handling ran
    assert!(!services.tokens.is_authenticated());
    assert!(!store.contains("botdeck.session"));
}

#[tokio::test]
async fn test_refresh_without_session_fails_fast() {
    let server = MockServer::start().await;
    let services =
        Services::with_store(&test_config(&server), Arc::new(MemoryStore::new())).unwrap();

    let err = services.auth.refresh().await.unwrap_err();
    assert_eq!(err.code(), "auth_required");
    assert!(server.received_requests().await.unwrap().is_empty());
}
