// Token lifecycle and retry behaviour of `Session` against a wiremock server.

use chrono::{Duration, Utc};
use chrono_tz::Europe::Stockholm;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use flexgo_core::api::client::{PLANTS_PATH, TOKEN_PATH, VALUES_PATH};
use flexgo_core::auth::SessionToken;
use flexgo_core::{
    ApiError, ApiRequest, AuthState, Config, Credentials, FileTokenStore, MemoryTokenStore,
    Session,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config(server: &MockServer) -> Config {
    Config {
        api_url: server.uri(),
        subscription_key: Some("test-key".to_string()),
        retries: 3,
        retry_delay_secs: 0,
        ..Config::default()
    }
}

fn session(server: &MockServer, store: MemoryTokenStore) -> Session {
    Session::with_store(
        &config(server),
        Credentials::new("user@example.com", "secret"),
        Box::new(store),
    )
    .unwrap()
}

fn stored_token(token: &str, expires_in: Duration) -> MemoryTokenStore {
    let expires = (Utc::now() + expires_in).with_timezone(&Stockholm);
    MemoryTokenStore::with_token(SessionToken::new(token, expires).to_persisted())
}

async fn mount_plants(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(PLANTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": "P1", "name": "Home" }]
        })))
        .mount(server)
        .await;
}

fn token_body(access_token: &str, expires_in_secs: i64) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": expires_in_secs
    })
}

async fn token_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == TOKEN_PATH)
        .count()
}

// ── Token lifecycle ─────────────────────────────────────────────────

#[tokio::test]
async fn test_expired_stored_token_logs_in_once() {
    let server = MockServer::start().await;
    mount_plants(&server).await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=user%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("fresh", 14 * 86400)))
        .expect(1)
        .mount(&server)
        .await;

    let session = session(&server, stored_token("old", Duration::hours(-2)));
    session.validate_and_refresh().await.unwrap();
    session.validate_and_refresh().await.unwrap();

    assert_eq!(session.state().await, AuthState::Valid);
    assert!(session.password_accepted().await);
    assert_eq!(session.plant_id().await.unwrap(), "P1");
}

#[tokio::test]
async fn test_valid_token_issues_no_requests() {
    let server = MockServer::start().await;
    mount_plants(&server).await;

    let session = session(&server, stored_token("stored", Duration::days(7)));
    session.login().await.unwrap();
    let after_login = server.received_requests().await.unwrap().len();

    session.validate_and_refresh().await.unwrap();
    session.validate_and_refresh().await.unwrap();

    assert_eq!(server.received_requests().await.unwrap().len(), after_login);
    assert_eq!(token_requests(&server).await, 0);
    // The stored token says nothing about the password.
    assert!(!session.password_accepted().await);
}

#[tokio::test]
async fn test_token_inside_refresh_margin_is_renewed() {
    let server = MockServer::start().await;
    mount_plants(&server).await;

    // 30 minutes of validity is always inside the default one hour margin.
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("short", 1800)))
        .mount(&server)
        .await;

    let session = session(&server, MemoryTokenStore::new());
    session.login().await.unwrap();
    assert_eq!(session.state().await, AuthState::ExpiringSoon);

    session.validate_and_refresh().await.unwrap();
    assert_eq!(token_requests(&server).await, 2);
}

#[tokio::test]
async fn test_rejected_credentials_fail_fast() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = session(&server, MemoryTokenStore::new());
    let err = session.login().await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthenticated(_)), "{err:?}");
    assert_eq!(session.state().await, AuthState::Unauthenticated);

    // No second exchange is attempted.
    let err = session.validate_and_refresh().await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthenticated(_)), "{err:?}");
    assert!(!session.password_accepted().await);
}

#[tokio::test]
async fn test_login_persists_token_file() {
    let server = MockServer::start().await;
    mount_plants(&server).await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "persisted",
            ".expires": "Tue, 03 Nov 2099 10:00:00 GMT"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    let session = Session::with_store(
        &config(&server),
        Credentials::new("user@example.com", "secret"),
        Box::new(FileTokenStore::new(&token_path)),
    )
    .unwrap();
    session.login().await.unwrap();

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&token_path).unwrap()).unwrap();
    assert_eq!(saved["token"], "Bearer persisted");
    // 10:00 GMT is 11:00 in Stockholm during winter time.
    assert_eq!(saved["tokenExpires"], "2099-11-03 11:00:00");
}

// ── Retry and re-login ──────────────────────────────────────────────

#[tokio::test]
async fn test_failed_pass_relogs_in_once_then_succeeds() {
    let server = MockServer::start().await;
    mount_plants(&server).await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("relogin", 86400)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(VALUES_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(3)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(VALUES_PATH))
        .and(header("Authorization", "Bearer relogin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "values": {} })))
        .mount(&server)
        .await;

    let session = session(&server, stored_token("stored", Duration::days(7)));
    let value = session.request(&ApiRequest::get(VALUES_PATH)).await.unwrap();
    assert_eq!(value, json!({ "values": {} }));
}

#[tokio::test]
async fn test_exhausted_retries_report_unreachable() {
    let server = MockServer::start().await;
    mount_plants(&server).await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("relogin", 86400)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(VALUES_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(6)
        .mount(&server)
        .await;

    let session = session(&server, stored_token("stored", Duration::days(7)));
    let err = session.request(&ApiRequest::get(VALUES_PATH)).await.unwrap_err();
    assert!(matches!(err, ApiError::Unreachable { attempts: 6, .. }), "{err:?}");
}

#[tokio::test]
async fn test_unauthorized_triggers_relogin_without_retrying() {
    let server = MockServer::start().await;
    mount_plants(&server).await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("renewed", 86400)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(VALUES_PATH))
        .and(header("Authorization", "Bearer revoked"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(VALUES_PATH))
        .and(header("Authorization", "Bearer renewed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "values": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let session = session(&server, stored_token("revoked", Duration::days(7)));
    session.request(&ApiRequest::get(VALUES_PATH)).await.unwrap();
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    mount_plants(&server).await;

    Mock::given(method("GET"))
        .and(path("/DataPoints/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such datapoint"))
        .expect(1)
        .mount(&server)
        .await;

    let session = session(&server, stored_token("stored", Duration::days(7)));
    let err = session
        .request(&ApiRequest::get("/DataPoints/missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(ref body) if body == "no such datapoint"));
    assert_eq!(token_requests(&server).await, 0);
}

#[tokio::test]
async fn test_requests_carry_fixed_headers() {
    let server = MockServer::start().await;
    mount_plants(&server).await;

    Mock::given(method("GET"))
        .and(path(VALUES_PATH))
        .and(header("Ocp-Apim-Subscription-Key", "test-key"))
        .and(header("Authorization", "Bearer stored"))
        .and(header("Accept", "application/json"))
        .and(header("Accept-Language", "en-us"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "values": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let session = session(&server, stored_token("stored", Duration::days(7)));
    session.request(&ApiRequest::get(VALUES_PATH)).await.unwrap();
}

#[tokio::test]
async fn test_plant_resolved_lazily_after_failed_discovery() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(PLANTS_PATH))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_plants(&server).await;

    let session = session(&server, stored_token("stored", Duration::days(7)));
    session.login().await.unwrap();
    assert_eq!(session.plant_id().await.unwrap(), "P1");
}

#[tokio::test]
async fn test_account_without_plants() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(PLANTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;

    let session = session(&server, stored_token("stored", Duration::days(7)));
    session.login().await.unwrap();
    assert!(matches!(
        session.plant_id().await,
        Err(ApiError::InvalidResponse(_))
    ));
}
