use super::*;
use crate::storage::MemoryStorage;
use chrono::Duration;

fn credential(username: &str) -> Credential {
    Credential {
        username: username.to_string(),
        platform_user_id: format!("id_{}", username),
        access_token: "access".to_string(),
        refresh_token: Some("refresh".to_string()),
        expires_at: Some(Utc::now() + Duration::hours(2)),
        scopes: vec!["tweet.read".to_string(), "tweet.write".to_string()],
        display_name: None,
        is_active: true,
        created_at: Utc::now(),
        last_used_at: Utc::now(),
    }
}

fn pending(state: &str, username: &str, ttl_secs: i64) -> PendingAuthorization {
    let now = Utc::now();
    PendingAuthorization {
        state: state.to_string(),
        username: username.to_string(),
        code_verifier: "verifier".to_string(),
        created_at: now,
        expires_at: now + Duration::seconds(ttl_secs),
    }
}

#[tokio::test]
async fn test_upsert_and_get_credential() {
    let storage = MemoryStorage::new();
    storage.upsert_credential(&credential("alice")).await.unwrap();

    let retrieved = storage.get_credential("alice").await.unwrap();
    assert!(retrieved.is_some());
    let retrieved = retrieved.unwrap();
    assert_eq!(retrieved.username, "alice");
    assert_eq!(retrieved.access_token, "access");
    assert_eq!(retrieved.scopes.len(), 2);
}

#[tokio::test]
async fn test_get_credential_touches_last_used() {
    let storage = MemoryStorage::new();
    let mut cred = credential("alice");
    cred.last_used_at = Utc::now() - Duration::hours(1);
    storage.upsert_credential(&cred).await.unwrap();

    let retrieved = storage.get_credential("alice").await.unwrap().unwrap();
    assert!(retrieved.last_used_at > cred.last_used_at);
}

#[tokio::test]
async fn test_get_credential_skips_inactive() {
    let storage = MemoryStorage::new();
    storage.upsert_credential(&credential("alice")).await.unwrap();

    assert!(storage.deactivate_credential("alice").await.unwrap());
    assert!(storage.get_credential("alice").await.unwrap().is_none());

    // find_credential still sees it, inactive
    let found = storage.find_credential("alice").await.unwrap();
    assert!(found.is_some());
    assert!(!found.unwrap().is_active);
}

#[tokio::test]
async fn test_upsert_preserves_created_at() {
    let storage = MemoryStorage::new();
    let first = credential("alice");
    storage.upsert_credential(&first).await.unwrap();

    let mut second = credential("alice");
    second.access_token = "rotated".to_string();
    second.created_at = Utc::now() + Duration::hours(5);
    storage.upsert_credential(&second).await.unwrap();

    let retrieved = storage.get_credential("alice").await.unwrap().unwrap();
    assert_eq!(retrieved.access_token, "rotated");
    assert_eq!(retrieved.created_at, first.created_at);
}

#[tokio::test]
async fn test_delete_credential() {
    let storage = MemoryStorage::new();
    storage.upsert_credential(&credential("alice")).await.unwrap();

    assert!(storage.delete_credential("alice").await.unwrap());
    assert!(storage.get_credential("alice").await.unwrap().is_none());
    assert!(storage.find_credential("alice").await.unwrap().is_none());
    assert!(!storage.delete_credential("alice").await.unwrap());
}

#[tokio::test]
async fn test_find_by_platform_user_id() {
    let storage = MemoryStorage::new();
    storage.upsert_credential(&credential("alice")).await.unwrap();

    let found = storage
        .find_credential_by_platform_user_id("id_alice")
        .await
        .unwrap();
    assert_eq!(found.unwrap().username, "alice");

    let missing = storage
        .find_credential_by_platform_user_id("id_bob")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_empty_platform_user_id_never_matches() {
    let storage = MemoryStorage::new();
    let mut cred = credential("manual");
    cred.platform_user_id = String::new();
    storage.upsert_credential(&cred).await.unwrap();

    let found = storage
        .find_credential_by_platform_user_id("")
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_list_active_credentials_newest_first() {
    let storage = MemoryStorage::new();
    let now = Utc::now();
    for (i, name) in ["old", "mid", "new"].iter().enumerate() {
        let mut cred = credential(name);
        cred.created_at = now + Duration::seconds(i as i64);
        storage.upsert_credential(&cred).await.unwrap();
    }
    storage.deactivate_credential("mid").await.unwrap();

    let listed = storage.list_active_credentials().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].username, "new");
    assert_eq!(listed[1].username, "old");
}

#[tokio::test]
async fn test_apply_refreshed_token() {
    let storage = MemoryStorage::new();
    storage.upsert_credential(&credential("alice")).await.unwrap();

    let new_expiry = Utc::now() + Duration::hours(1);
    storage
        .apply_refreshed_token("alice", "new_access", Some("new_refresh"), Some(new_expiry))
        .await
        .unwrap();

    let updated = storage.get_credential("alice").await.unwrap().unwrap();
    assert_eq!(updated.access_token, "new_access");
    assert_eq!(updated.refresh_token.as_deref(), Some("new_refresh"));
    assert_eq!(updated.expires_at, Some(new_expiry));
}

#[tokio::test]
async fn test_refresh_without_rotation_keeps_old_token() {
    let storage = MemoryStorage::new();
    storage.upsert_credential(&credential("alice")).await.unwrap();

    storage
        .apply_refreshed_token("alice", "new_access", None, Some(Utc::now()))
        .await
        .unwrap();

    let updated = storage.get_credential("alice").await.unwrap().unwrap();
    assert_eq!(updated.refresh_token.as_deref(), Some("refresh"));
}

#[tokio::test]
async fn test_refresh_unknown_username_errors() {
    let storage = MemoryStorage::new();
    let result = storage
        .apply_refreshed_token("ghost", "token", None, None)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_take_pending_authorization_is_single_use() {
    let storage = MemoryStorage::new();
    storage
        .save_pending_authorization(&pending("state1", "alice", 900))
        .await
        .unwrap();

    let taken = storage.take_pending_authorization("state1").await.unwrap();
    assert_eq!(taken.unwrap().username, "alice");

    // Second consumer loses
    let replay = storage.take_pending_authorization("state1").await.unwrap();
    assert!(replay.is_none());
}

#[tokio::test]
async fn test_expired_pending_is_invisible() {
    let storage = MemoryStorage::new();
    storage
        .save_pending_authorization(&pending("stale", "alice", -5))
        .await
        .unwrap();

    assert!(
        storage
            .get_pending_authorization("stale")
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        storage
            .take_pending_authorization("stale")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_purge_expired_authorizations() {
    let storage = MemoryStorage::new();
    storage
        .save_pending_authorization(&pending("live", "alice", 900))
        .await
        .unwrap();
    storage
        .save_pending_authorization(&pending("stale", "bob", -5))
        .await
        .unwrap();

    let purged = storage.purge_expired_authorizations().await.unwrap();
    assert_eq!(purged, 1);
    assert!(
        storage
            .get_pending_authorization("live")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_delete_pending_authorization() {
    let storage = MemoryStorage::new();
    storage
        .save_pending_authorization(&pending("state1", "alice", 900))
        .await
        .unwrap();

    assert!(storage.delete_pending_authorization("state1").await.unwrap());
    assert!(!storage.delete_pending_authorization("state1").await.unwrap());
}
