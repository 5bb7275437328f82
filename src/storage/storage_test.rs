use super::*;
use chrono::Duration;

/// Comprehensive test helper that runs all storage operations
/// Used to ensure parity between Memory and SQLite implementations
async fn test_all_storage_operations<S: Storage>(storage: Arc<S>) {
    let now = Utc::now();

    // Test 1: Upsert and get
    let cred = Credential {
        username: "parity".to_string(),
        platform_user_id: "99001".to_string(),
        access_token: "access".to_string(),
        refresh_token: Some("refresh".to_string()),
        expires_at: Some(now + Duration::hours(2)),
        scopes: vec!["tweet.read".to_string(), "offline.access".to_string()],
        display_name: Some("Parity".to_string()),
        is_active: true,
        created_at: now,
        last_used_at: now,
    };
    storage
        .upsert_credential(&cred)
        .await
        .expect("Upsert should succeed");

    let retrieved = storage
        .get_credential("parity")
        .await
        .expect("Get should succeed");
    assert!(retrieved.is_some(), "Should find saved credential");
    let retrieved = retrieved.unwrap();
    assert_eq!(retrieved.access_token, "access");
    assert_eq!(retrieved.scopes.len(), 2);

    // Test 2: Get with unknown username
    let missing = storage
        .get_credential("nobody")
        .await
        .expect("Get should not error");
    assert!(missing.is_none(), "Unknown username should yield None");

    // Test 3: Lookup by platform user id
    let by_id = storage
        .find_credential_by_platform_user_id("99001")
        .await
        .expect("Lookup should succeed");
    assert_eq!(by_id.unwrap().username, "parity");

    // Test 4: Listing
    let listed = storage
        .list_active_credentials()
        .await
        .expect("List should succeed");
    assert_eq!(listed.len(), 1, "Expected 1 active credential");

    // Test 5: Deactivate hides from get and list, find still sees it
    assert!(
        storage
            .deactivate_credential("parity")
            .await
            .expect("Deactivate should succeed")
    );
    assert!(storage.get_credential("parity").await.unwrap().is_none());
    assert!(storage.list_active_credentials().await.unwrap().is_empty());
    let inactive = storage.find_credential("parity").await.unwrap();
    assert!(inactive.is_some());
    assert!(!inactive.unwrap().is_active);

    // Test 6: Re-authorization reactivates
    let mut again = cred.clone();
    again.access_token = "access2".to_string();
    storage.upsert_credential(&again).await.unwrap();
    let reactivated = storage.get_credential("parity").await.unwrap();
    assert!(reactivated.is_some(), "Upsert should reactivate");
    assert_eq!(reactivated.unwrap().access_token, "access2");

    // Test 7: Refresh outcome lands
    storage
        .apply_refreshed_token(
            "parity",
            "access3",
            Some("refresh2"),
            Some(now + Duration::hours(3)),
        )
        .await
        .expect("Refresh should succeed");
    let refreshed = storage.get_credential("parity").await.unwrap().unwrap();
    assert_eq!(refreshed.access_token, "access3");
    assert_eq!(refreshed.refresh_token.as_deref(), Some("refresh2"));

    // Test 8: Delete
    assert!(storage.delete_credential("parity").await.unwrap());
    assert!(!storage.delete_credential("parity").await.unwrap());
    assert!(storage.find_credential("parity").await.unwrap().is_none());

    // Test 9: Pending authorization lifecycle
    let pending = PendingAuthorization {
        state: "parity_state".to_string(),
        username: "parity".to_string(),
        code_verifier: "verifier".to_string(),
        created_at: now,
        expires_at: now + Duration::seconds(900),
    };
    storage
        .save_pending_authorization(&pending)
        .await
        .expect("Save pending should succeed");

    let peeked = storage
        .get_pending_authorization("parity_state")
        .await
        .expect("Get pending should succeed");
    assert!(peeked.is_some(), "Live pending record should be visible");

    let taken = storage
        .take_pending_authorization("parity_state")
        .await
        .expect("Take should succeed");
    assert_eq!(taken.unwrap().code_verifier, "verifier");

    let replay = storage
        .take_pending_authorization("parity_state")
        .await
        .expect("Second take should not error");
    assert!(replay.is_none(), "State must be single-use");

    // Test 10: Expired records are purged and invisible
    let stale = PendingAuthorization {
        state: "stale_state".to_string(),
        username: "parity".to_string(),
        code_verifier: "verifier".to_string(),
        created_at: now - Duration::seconds(60),
        expires_at: now - Duration::seconds(5),
    };
    storage.save_pending_authorization(&stale).await.unwrap();
    assert!(
        storage
            .get_pending_authorization("stale_state")
            .await
            .unwrap()
            .is_none()
    );
    let purged = storage.purge_expired_authorizations().await.unwrap();
    assert_eq!(purged, 1, "Expected 1 purged record");
}

#[tokio::test]
async fn test_memory_storage_all_operations() {
    let storage = Arc::new(MemoryStorage::new());
    test_all_storage_operations(storage).await;
}

#[tokio::test]
async fn test_sqlite_storage_all_operations() {
    let storage = Arc::new(SqliteStorage::new(":memory:").await.unwrap());
    test_all_storage_operations(storage).await;
}

#[tokio::test]
async fn test_create_storage_from_config() {
    let config = crate::config::StorageConfig {
        driver: "memory".to_string(),
        dsn: String::new(),
    };
    let storage = create_storage_from_config(&config).await.unwrap();
    assert!(storage.list_active_credentials().await.unwrap().is_empty());

    let bad = crate::config::StorageConfig {
        driver: "etcd".to_string(),
        dsn: String::new(),
    };
    assert!(create_storage_from_config(&bad).await.is_err());
}
