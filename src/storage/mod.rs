//! Storage backends for XBridge
//!
//! Provides multiple storage backends with a unified trait interface.

pub mod memory;
pub mod postgres;
pub mod sql_common;
pub mod sqlite;

use crate::{Result, model::*};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;

/// Storage trait for persisting credentials and pending authorizations
#[async_trait]
pub trait Storage: Send + Sync {
    // Credential methods
    /// Insert or update a credential keyed by username
    /// An update keeps the original created_at and overwrites everything else
    async fn upsert_credential(&self, credential: &Credential) -> Result<()>;

    /// Get an active credential and touch its last_used_at
    /// Returns None for unknown or deactivated usernames
    async fn get_credential(&self, username: &str) -> Result<Option<Credential>>;

    /// Get a credential regardless of its active flag, without touching last_used_at
    async fn find_credential(&self, username: &str) -> Result<Option<Credential>>;

    /// Find the credential bound to a platform user id, active or not
    async fn find_credential_by_platform_user_id(
        &self,
        platform_user_id: &str,
    ) -> Result<Option<Credential>>;

    /// List active credentials, most recently created first
    async fn list_active_credentials(&self) -> Result<Vec<Credential>>;

    /// Mark a credential inactive
    /// Returns false if the username is unknown
    async fn deactivate_credential(&self, username: &str) -> Result<bool>;

    /// Delete a credential permanently
    /// Returns false if the username is unknown
    async fn delete_credential(&self, username: &str) -> Result<bool>;

    /// Store the outcome of a refresh grant
    /// A None refresh_token keeps the stored one (not every grant rotates it)
    async fn apply_refreshed_token(
        &self,
        username: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    // Pending authorization methods
    /// Save a pending authorization, purging expired records first
    async fn save_pending_authorization(&self, pending: &PendingAuthorization) -> Result<()>;

    /// Get a pending authorization by state
    /// Expired records are reported as absent even if a row still exists
    async fn get_pending_authorization(&self, state: &str)
    -> Result<Option<PendingAuthorization>>;

    /// Atomically fetch and delete a pending authorization
    /// Returns None if absent or expired, preventing state reuse
    async fn take_pending_authorization(
        &self,
        state: &str,
    ) -> Result<Option<PendingAuthorization>>;

    /// Delete a pending authorization
    /// Returns false if the state is unknown
    async fn delete_pending_authorization(&self, state: &str) -> Result<bool>;

    /// Remove all expired pending authorizations, returning how many were purged
    async fn purge_expired_authorizations(&self) -> Result<u64>;
}

/// Create a storage backend from configuration
pub async fn create_storage_from_config(
    config: &crate::config::StorageConfig,
) -> crate::Result<Arc<dyn Storage>> {
    match config.driver.as_str() {
        "memory" => Ok(Arc::new(MemoryStorage::new())),
        "sqlite" => Ok(Arc::new(SqliteStorage::new(&config.dsn).await?)),
        "postgres" => Ok(Arc::new(PostgresStorage::new(&config.dsn).await?)),
        _ => Err(crate::XBridgeError::config(format!(
            "Unknown storage driver: {}. Supported: memory, sqlite, postgres",
            config.driver
        ))),
    }
}

#[cfg(test)]
mod memory_test;
#[cfg(test)]
mod postgres_test;
#[cfg(test)]
mod storage_test;
