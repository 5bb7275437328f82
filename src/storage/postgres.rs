//! PostgreSQL storage backend
//!
//! Provides a production-ready PostgreSQL implementation of the Storage trait.

use super::{Storage, sql_common::*};
use crate::{Result, XBridgeError, model::*};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

/// PostgreSQL storage implementation
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Create a new PostgreSQL storage from a connection string
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await.map_err(|e| {
            XBridgeError::storage(format!("Failed to connect to PostgreSQL: {}", e))
        })?;

        // Run PostgreSQL-specific migrations
        sqlx::migrate!("./migrations/postgres")
            .run(&pool)
            .await
            .map_err(|e| XBridgeError::storage(format!("Failed to run migrations: {}", e)))?;

        Ok(Self { pool })
    }

    fn parse_credential(row: &PgRow) -> Result<Credential> {
        Ok(Credential {
            username: row.try_get("username")?,
            platform_user_id: row.try_get("platform_user_id")?,
            access_token: row.try_get("access_token")?,
            refresh_token: row.try_get("refresh_token")?,
            expires_at: row.try_get("expires_at")?,
            scopes: scopes_from_text(&row.try_get::<String, _>("scopes")?),
            display_name: row.try_get("display_name")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            last_used_at: row.try_get("last_used_at")?,
        })
    }

    fn parse_pending(row: &PgRow) -> Result<PendingAuthorization> {
        Ok(PendingAuthorization {
            state: row.try_get("state")?,
            username: row.try_get("username")?,
            code_verifier: row.try_get("code_verifier")?,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
        })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn upsert_credential(&self, credential: &Credential) -> Result<()> {
        // created_at is not in the update list so the original insertion
        // time survives re-authorization
        sqlx::query(
            "INSERT INTO credentials
             (username, platform_user_id, access_token, refresh_token, expires_at, scopes, display_name, is_active, created_at, last_used_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT(username) DO UPDATE SET
                platform_user_id = EXCLUDED.platform_user_id,
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                expires_at = EXCLUDED.expires_at,
                scopes = EXCLUDED.scopes,
                display_name = EXCLUDED.display_name,
                is_active = EXCLUDED.is_active,
                last_used_at = EXCLUDED.last_used_at",
        )
        .bind(&credential.username)
        .bind(&credential.platform_user_id)
        .bind(&credential.access_token)
        .bind(&credential.refresh_token)
        .bind(credential.expires_at)
        .bind(scopes_to_text(&credential.scopes))
        .bind(&credential.display_name)
        .bind(credential.is_active)
        .bind(credential.created_at)
        .bind(credential.last_used_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_credential(&self, username: &str) -> Result<Option<Credential>> {
        let row = sqlx::query(
            "UPDATE credentials SET last_used_at = $1
             WHERE username = $2 AND is_active = TRUE
             RETURNING username, platform_user_id, access_token, refresh_token,
                       expires_at, scopes, display_name, is_active, created_at, last_used_at",
        )
        .bind(Utc::now())
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_credential).transpose()
    }

    async fn find_credential(&self, username: &str) -> Result<Option<Credential>> {
        let row = sqlx::query(
            "SELECT username, platform_user_id, access_token, refresh_token,
                    expires_at, scopes, display_name, is_active, created_at, last_used_at
             FROM credentials WHERE username = $1",
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
             FROM credentials WHERE platform_user_id = $1",
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
             WHERE is_active = TRUE
             ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::parse_credential).collect()
    }

    async fn deactivate_credential(&self, username: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE credentials SET is_active = FALSE WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_credential(&self, username: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM credentials WHERE username = $1")
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
             SET access_token = $1,
                 refresh_token = COALESCE($2, refresh_token),
                 expires_at = $3,
                 last_used_at = $4
             WHERE username = $5",
        )
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at)
        .bind(Utc::now())
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
            "INSERT INTO pending_authorizations (state, username, code_verifier, created_at, expires_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT(state) DO UPDATE SET
                username = EXCLUDED.username,
                code_verifier = EXCLUDED.code_verifier,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at",
        )
        .bind(&pending.state)
        .bind(&pending.username)
        .bind(&pending.code_verifier)
        .bind(pending.created_at)
        .bind(pending.expires_at)
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
             WHERE state = $1 AND expires_at > $2",
        )
        .bind(state)
        .bind(Utc::now())
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
             WHERE state = $1 AND expires_at > $2
             RETURNING state, username, code_verifier, created_at, expires_at",
        )
        .bind(state)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_pending).transpose()
    }

    async fn delete_pending_authorization(&self, state: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pending_authorizations WHERE state = $1")
            .bind(state)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired_authorizations(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM pending_authorizations WHERE expires_at <= $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
