use super::*;
use crate::XBridgeError;
use crate::config::OAuthAppConfig;
use crate::constants::UNBOUND_USERNAME;
use crate::error::AuthError;
use crate::model::Credential;
use crate::storage::{MemoryStorage, Storage};
use chrono::{Duration, Utc};
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_config(server_uri: &str) -> OAuthAppConfig {
    OAuthAppConfig {
        client_id: "client123".to_string(),
        client_secret: None,
        redirect_uri: "http://127.0.0.1:8000/auth/callback".to_string(),
        scopes: vec![
            "tweet.read".to_string(),
            "users.read".to_string(),
            "offline.access".to_string(),
        ],
        authorize_url: format!("{}/i/oauth2/authorize", server_uri),
        token_url: format!("{}/2/oauth2/token", server_uri),
        api_base_url: format!("{}/2", server_uri),
        state_ttl_secs: 900,
    }
}

fn credential(username: &str) -> Credential {
    let now = Utc::now();
    Credential {
        username: username.to_string(),
        platform_user_id: "42".to_string(),
        access_token: "old_access".to_string(),
        refresh_token: Some("old_refresh".to_string()),
        expires_at: Some(now + Duration::seconds(30)),
        scopes: vec!["tweet.read".to_string()],
        display_name: None,
        is_active: true,
        created_at: now,
        last_used_at: now,
    }
}

async fn mount_token_success(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/2/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token_type": "bearer",
            "access_token": "access_1",
            "refresh_token": "refresh_1",
            "expires_in": 7200,
            "scope": "tweet.read users.read offline.access"
        })))
        .mount(server)
        .await;
}

async fn mount_identity(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/2/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"id": "42", "username": "alice", "name": "Alice Doe"}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_begin_requires_configuration() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let manager = OAuthManager::new(storage, OAuthAppConfig::default());

    let err = manager.begin_authorization(Some("alice")).await.unwrap_err();
    assert!(matches!(err, XBridgeError::Config(_)));
}

#[tokio::test]
async fn test_begin_authorization_records_pending() {
    let server = MockServer::start().await;
    let storage = Arc::new(MemoryStorage::new());
    let manager = OAuthManager::new(storage.clone(), mock_config(&server.uri()));

    let begin = manager.begin_authorization(Some("@Alice ")).await.unwrap();

    assert!(begin.authorize_url.contains("code_challenge="));
    assert!(begin.authorize_url.contains("code_challenge_method=S256"));
    assert!(begin.authorize_url.contains("client_id=client123"));
    assert!(begin.authorize_url.contains("tweet.read"));
    assert!(begin.authorize_url.contains(&format!("state={}", begin.state)));

    let pending = storage
        .get_pending_authorization(&begin.state)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pending.username, "Alice");
    assert!(pending.is_bound());
    assert!(!pending.code_verifier.is_empty());
    assert!(pending.expires_at > Utc::now());
}

#[tokio::test]
async fn test_begin_unbound_flow() {
    let server = MockServer::start().await;
    let storage = Arc::new(MemoryStorage::new());
    let manager = OAuthManager::new(storage.clone(), mock_config(&server.uri()));

    let begin = manager.begin_authorization(None).await.unwrap();

    let pending = storage
        .get_pending_authorization(&begin.state)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pending.username, UNBOUND_USERNAME);
    assert!(!pending.is_bound());
}

#[tokio::test]
async fn test_distinct_states_per_flow() {
    let server = MockServer::start().await;
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let manager = OAuthManager::new(storage, mock_config(&server.uri()));

    let first = manager.begin_authorization(Some("alice")).await.unwrap();
    let second = manager.begin_authorization(Some("alice")).await.unwrap();
    assert_ne!(first.state, second.state);
}

#[tokio::test]
async fn test_complete_authorization_happy_path() {
    let server = MockServer::start().await;
    mount_token_success(&server).await;
    mount_identity(&server).await;
    let storage = Arc::new(MemoryStorage::new());
    let manager = OAuthManager::new(storage.clone(), mock_config(&server.uri()));

    let begin = manager.begin_authorization(Some("alice")).await.unwrap();
    let outcome = manager
        .complete_authorization(&begin.state, "auth_code")
        .await
        .unwrap();

    assert_eq!(outcome.username, "alice");
    assert_eq!(outcome.platform_user_id, "42");
    assert_eq!(outcome.display_name.as_deref(), Some("Alice Doe"));
    assert_eq!(outcome.scopes.len(), 3);

    let stored = storage.get_credential("alice").await.unwrap().unwrap();
    assert_eq!(stored.access_token, "access_1");
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh_1"));
    assert!(stored.expires_at.unwrap() > Utc::now() + Duration::hours(1));
    assert!(stored.is_active);

    // State is burned
    assert!(
        storage
            .get_pending_authorization(&begin.state)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_complete_unbound_flow_uses_platform_handle() {
    let server = MockServer::start().await;
    mount_token_success(&server).await;
    mount_identity(&server).await;
    let storage = Arc::new(MemoryStorage::new());
    let manager = OAuthManager::new(storage.clone(), mock_config(&server.uri()));

    let begin = manager.begin_authorization(None).await.unwrap();
    let outcome = manager
        .complete_authorization(&begin.state, "auth_code")
        .await
        .unwrap();

    assert_eq!(outcome.username, "alice");
    assert!(storage.get_credential("alice").await.unwrap().is_some());
}

#[tokio::test]
async fn test_complete_unknown_state() {
    let server = MockServer::start().await;
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let manager = OAuthManager::new(storage, mock_config(&server.uri()));

    let err = manager
        .complete_authorization("bogus", "code")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        XBridgeError::Auth(AuthError::InvalidOrExpiredState)
    ));
}

#[tokio::test]
async fn test_complete_is_single_use() {
    let server = MockServer::start().await;
    mount_token_success(&server).await;
    mount_identity(&server).await;
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let manager = OAuthManager::new(storage, mock_config(&server.uri()));

    let begin = manager.begin_authorization(Some("alice")).await.unwrap();
    manager
        .complete_authorization(&begin.state, "auth_code")
        .await
        .unwrap();

    let err = manager
        .complete_authorization(&begin.state, "auth_code")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        XBridgeError::Auth(AuthError::InvalidOrExpiredState)
    ));
}

#[tokio::test]
async fn test_failed_exchange_burns_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"error": "invalid_request"})),
        )
        .mount(&server)
        .await;
    let storage = Arc::new(MemoryStorage::new());
    let manager = OAuthManager::new(storage.clone(), mock_config(&server.uri()));

    let begin = manager.begin_authorization(Some("alice")).await.unwrap();
    let err = manager
        .complete_authorization(&begin.state, "bad_code")
        .await
        .unwrap_err();

    match err {
        XBridgeError::Auth(AuthError::TokenExchangeFailed { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_request"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // No credential was written and the state cannot be retried
    assert!(storage.find_credential("alice").await.unwrap().is_none());
    let replay = manager
        .complete_authorization(&begin.state, "bad_code")
        .await
        .unwrap_err();
    assert!(matches!(
        replay,
        XBridgeError::Auth(AuthError::InvalidOrExpiredState)
    ));
}

#[tokio::test]
async fn test_identity_failure_reports_resolution_error() {
    let server = MockServer::start().await;
    mount_token_success(&server).await;
    Mock::given(method("GET"))
        .and(path("/2/users/me"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;
    let storage = Arc::new(MemoryStorage::new());
    let manager = OAuthManager::new(storage.clone(), mock_config(&server.uri()));

    let begin = manager.begin_authorization(Some("alice")).await.unwrap();
    let err = manager
        .complete_authorization(&begin.state, "auth_code")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        XBridgeError::Auth(AuthError::IdentityResolutionFailed(_))
    ));
    assert!(storage.find_credential("alice").await.unwrap().is_none());
}

#[tokio::test]
async fn test_exchange_sends_code_and_verifier() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/oauth2/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth_code"))
        .and(body_string_contains("code_verifier="))
        .and(body_string_contains("client_id=client123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access_1",
            "expires_in": 7200
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_identity(&server).await;
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let manager = OAuthManager::new(storage, mock_config(&server.uri()));

    let begin = manager.begin_authorization(Some("alice")).await.unwrap();
    manager
        .complete_authorization(&begin.state, "auth_code")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_confidential_client_uses_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/oauth2/token"))
        .and(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access_1",
            "expires_in": 7200
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_identity(&server).await;

    let mut config = mock_config(&server.uri());
    config.client_secret = Some("sekrit".to_string());
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let manager = OAuthManager::new(storage, config);

    let begin = manager.begin_authorization(Some("alice")).await.unwrap();
    manager
        .complete_authorization(&begin.state, "auth_code")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_missing_scope_falls_back_to_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access_1",
            "refresh_token": "refresh_1",
            "expires_in": 7200
        })))
        .mount(&server)
        .await;
    mount_identity(&server).await;
    let storage = Arc::new(MemoryStorage::new());
    let config = mock_config(&server.uri());
    let configured_scopes = config.scopes.clone();
    let manager = OAuthManager::new(storage.clone(), config);

    let begin = manager.begin_authorization(Some("alice")).await.unwrap();
    let outcome = manager
        .complete_authorization(&begin.state, "auth_code")
        .await
        .unwrap();

    assert_eq!(outcome.scopes, configured_scopes);
}

#[tokio::test]
async fn test_refresh_credential_rotates_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=old_refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "new_access",
            "refresh_token": "new_refresh",
            "expires_in": 7200
        })))
        .expect(1)
        .mount(&server)
        .await;
    let storage = Arc::new(MemoryStorage::new());
    let manager = OAuthManager::new(storage.clone(), mock_config(&server.uri()));

    let cred = credential("alice");
    storage.upsert_credential(&cred).await.unwrap();

    let refreshed = manager.refresh_credential(&cred).await.unwrap();
    assert_eq!(refreshed.access_token, "new_access");
    assert_eq!(refreshed.refresh_token.as_deref(), Some("new_refresh"));

    let stored = storage.get_credential("alice").await.unwrap().unwrap();
    assert_eq!(stored.access_token, "new_access");
    assert_eq!(stored.refresh_token.as_deref(), Some("new_refresh"));
}

#[tokio::test]
async fn test_refresh_without_rotation_keeps_stored_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "new_access",
            "expires_in": 7200
        })))
        .mount(&server)
        .await;
    let storage = Arc::new(MemoryStorage::new());
    let manager = OAuthManager::new(storage.clone(), mock_config(&server.uri()));

    let cred = credential("alice");
    storage.upsert_credential(&cred).await.unwrap();

    let refreshed = manager.refresh_credential(&cred).await.unwrap();
    assert_eq!(refreshed.refresh_token.as_deref(), Some("old_refresh"));

    let stored = storage.get_credential("alice").await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some("old_refresh"));
}

#[tokio::test]
async fn test_refresh_without_refresh_token_fails() {
    let server = MockServer::start().await;
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let manager = OAuthManager::new(storage, mock_config(&server.uri()));

    let mut cred = credential("alice");
    cred.refresh_token = None;

    let err = manager.refresh_credential(&cred).await.unwrap_err();
    assert!(matches!(
        err,
        XBridgeError::Auth(AuthError::RefreshFailed(_))
    ));
}

#[tokio::test]
async fn test_refresh_failure_surfaces_platform_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "invalid_grant"})),
        )
        .mount(&server)
        .await;
    let storage = Arc::new(MemoryStorage::new());
    let manager = OAuthManager::new(storage.clone(), mock_config(&server.uri()));

    let cred = credential("alice");
    storage.upsert_credential(&cred).await.unwrap();

    let err = manager.refresh_credential(&cred).await.unwrap_err();
    match err {
        XBridgeError::Auth(AuthError::RefreshFailed(msg)) => {
            assert!(msg.contains("invalid_grant"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // The stored credential is untouched by the failed refresh
    let stored = storage.get_credential("alice").await.unwrap().unwrap();
    assert_eq!(stored.access_token, "old_access");
}
