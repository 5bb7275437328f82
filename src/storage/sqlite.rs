//! SQLite storage implementation
//!
//! Provides persistent storage for credentials and pending authorizations using SQLite.

use crate::model::*;
use crate::storage::{Storage, sql_common::*};
use crate::{Result, XBridgeError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage
    ///
    /// # Arguments
    /// * `dsn` - Database path (e.g., ".xbridge/xbridge.db" or ":memory:" for in-memory)
    pub async fn new(dsn: &str) -> Result<Self> {
        // Prepend sqlite: prefix if not present and add create-if-missing option
        let connection_string = if dsn.starts_with("sqlite:") {
            if dsn.contains('?') {
                dsn.to_string()
            } else {
                format!("{}?mode=rwc", dsn)
            }
        } else {
            format!("sqlite:{}?mode=rwc", dsn)
        };

        // Extract actual file path for directory creation
        let file_path = dsn.strip_prefix("sqlite:").unwrap_or(dsn);

        // Validate path to prevent directory traversal attacks
        if file_path.contains("..") {
            return Err(XBridgeError::config(
                "Database path cannot contain '..' (path traversal not allowed)",
            ));
        }

        // Create parent directory if needed (unless it's :memory:)
        if file_path != ":memory:"
            && let Some(parent) = Path::new(file_path).parent()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Create connection pool
        let pool = SqlitePool::connect(&connection_string)
            .await
            .map_err(|e| XBridgeError::storage(format!("Failed to connect to SQLite: {}", e)))?;

        // Configure SQLite for better performance
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA busy_timeout = 5000")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await?;

        // Run SQLite-specific migrations
        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .map_err(|e| XBridgeError::storage(format!("Failed to run migrations: {}", e)))?;

        Ok(Self { pool })
    }

    fn parse_credential(row: &SqliteRow) -> Result<Credential> {
        Ok(Credential {
            username: row.try_get("username")?,
            platform_user_id: row.try_get("platform_user_id")?,
            access_token: row.try_get("access_token")?,
            refresh_token: row.try_get("refresh_token")?,
            expires_at: row
                .try_get::<Option<i64>, _>("expires_at")?
                .map(datetime_from_unix),
            scopes: scopes_from_text(&row.try_get::<String, _>("scopes")?),
            display_name: row.try_get("display_name")?,
            is_active: row.try_get("is_active")?,
            created_at: datetime_from_unix(row.try_get("created_at")?),
            last_used_at: datetime_from_unix(row.try_get("last_used_at")?),
        })
    }

    fn parse_pending(row: &SqliteRow) -> Result<PendingAuthorization> {
        Ok(PendingAuthorization {
            state: row.try_get("state")?,
            username: row.try_get("username")?,
            code_verifier: row.try_get("code_verifier")?,
            created_at: datetime_from_unix(row.try_get("created_at")?),
            expires_at: datetime_from_unix(row.try_get("expires_at")?),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn upsert_credential(&self, credential: &Credential) -> Result<()> {
        // created_at is deliberately absent from the update list so the
        // original insertion time survives re-authorization
        sqlx::query(
            "INSERT INTO credentials (username, platform_user_id, access_token, refresh_token,
                                      expires_at, scopes, display_name, is_active, created_at, last_used_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(username) DO UPDATE SET
                platform_user_id = excluded.platform_user_id,
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at,
                scopes = excluded.scopes,
                display_name = excluded.display_name,
                is_active = excluded.is_active,
                last_used_at = excluded.last_used_at",
        )
        .bind(&credential.username)
        .bind(&credential.platform_user_id)
        .bind(&credential.access_token)
        .bind(&credential.refresh_token)
        .bind(credential.expires_at.map(datetime_to_unix))
        .bind(scopes_to_text(&credential.scopes))
        .bind(&credential.display_name)
        .bind(credential.is_active)
        .bind(datetime_to_unix(credential.created_at))
        .bind(datetime_to_unix(credential.last_used_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_credential(&self, username: &str) -> Result<Option<Credential>> {
        // Touch and fetch in one statement so concurrent readers see a
        // consistent last_used_at
        let row = sqlx::query(
            "UPDATE credentials SET last_used_at = ?
             WHERE username = ? AND is_active = 1
             RETURNING username, platform_user_id, access_token, refresh_token,
                       expires_at, scopes, display_name, is_active, created_at, last_used_at",
        )
        .bind(datetime_to_unix(Utc::now()))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_credential).transpose()
    }

    async fn find_credential(&self, username: &str) -> Result<Option<Credential>> {
        let row = sqlx::query(
            "SELECT username, platform_user_id, access_token, refresh_token,
                    expires_at, scopes, display_name, is_active, created_at, last_used_at
             FROM credentials WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_credential).transpose()
    }

    async fn find_credential_by_platform_user_id(
        &self,
        platform_user_id: &str,
    ) -> Result<Option<Credential>> {
        // Unresolved credentials store an empty id; never match on it
        if platform_user_id.is_empty() {
            return Ok(None);
        }

        let row = sqlx::query(
            "SELECT username, platform_user_id, access_token, refresh_token,
                    expires_at, scopes, display_name, is_active, created_at, last_used_at
             FROM credentials WHERE platform_user_id = ?",
        )
        .bind(platform_user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_credential).transpose()
    }

    async fn list_active_credentials(&self) -> Result<Vec<Credential>> {
        let rows = sqlx::query(
            "SELECT username, platform_user_id, access_token, refresh_token,
                    expires_at, scopes, display_name, is_active, created_at, last_used_at
             FROM credentials
             WHERE is_active = 1
             ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::parse_credential).collect()
    }

    async fn deactivate_credential(&self, username: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE credentials SET is_active = 0 WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_credential(&self, username: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM credentials WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn apply_refreshed_token(
        &self,
        username: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE credentials
             SET access_token = ?,
                 refresh_token = COALESCE(?, refresh_token),
                 expires_at = ?,
                 last_used_at = ?
             WHERE username = ?",
        )
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at.map(datetime_to_unix))
        .bind(datetime_to_unix(Utc::now()))
        .bind(username)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(XBridgeError::not_found(format!(
                "credential for {}",
                username
            )));
        }

        Ok(())
    }

    async fn save_pending_authorization(&self, pending: &PendingAuthorization) -> Result<()> {
        self.purge_expired_authorizations().await?;

        sqlx::query(
            "INSERT OR REPLACE INTO pending_authorizations
                (state, username, code_verifier, created_at, expires_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&pending.state)
        .bind(&pending.username)
        .bind(&pending.code_verifier)
        .bind(datetime_to_unix(pending.created_at))
        .bind(datetime_to_unix(pending.expires_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_pending_authorization(
        &self,
        state: &str,
    ) -> Result<Option<PendingAuthorization>> {
        let row = sqlx::query(
            "SELECT state, username, code_verifier, created_at, expires_at
             FROM pending_authorizations
             WHERE state = ? AND expires_at > ?",
        )
        .bind(state)
        .bind(datetime_to_unix(Utc::now()))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_pending).transpose()
    }

    async fn take_pending_authorization(
        &self,
        state: &str,
    ) -> Result<Option<PendingAuthorization>> {
        // Single-statement delete-and-return so two concurrent callbacks
        // cannot both consume the same state
        let row = sqlx::query(
            "DELETE FROM pending_authorizations
             WHERE state = ? AND expires_at > ?
             RETURNING state, username, code_verifier, created_at, expires_at",
        )
        .bind(state)
        .bind(datetime_to_unix(Utc::now()))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_pending).transpose()
    }

    async fn delete_pending_authorization(&self, state: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pending_authorizations WHERE state = ?")
            .bind(state)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired_authorizations(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM pending_authorizations WHERE expires_at <= ?")
            .bind(datetime_to_unix(Utc::now()))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
