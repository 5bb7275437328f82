//! In-memory storage implementation
//!
//! Fast, non-persistent storage for development and testing.
//! Uses DashMap for lock-free concurrent access.
//!
//! **WARNING:** MemoryStorage is NOT recommended for production use:
//! - Data is lost on process restart
//! - Does not coordinate state across multiple process instances
//!
//! For production deployments, use SqliteStorage or PostgresStorage.

use super::*;
use crate::XBridgeError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// In-memory storage implementation - uses DashMap for lock-free concurrent access
#[derive(Clone)]
pub struct MemoryStorage {
    credentials: Arc<DashMap<String, Credential>>,
    pending: Arc<DashMap<String, PendingAuthorization>>,
}

impl MemoryStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self {
            credentials: Arc::new(DashMap::new()),
            pending: Arc::new(DashMap::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upsert_credential(&self, credential: &Credential) -> Result<()> {
        match self.credentials.entry(credential.username.clone()) {
            Entry::Occupied(mut entry) => {
                let created_at = entry.get().created_at;
                let mut updated = credential.clone();
                updated.created_at = created_at;
                entry.insert(updated);
            }
            Entry::Vacant(entry) => {
                entry.insert(credential.clone());
            }
        }
        Ok(())
    }

    async fn get_credential(&self, username: &str) -> Result<Option<Credential>> {
        match self.credentials.get_mut(username) {
            Some(mut entry) if entry.is_active => {
                entry.last_used_at = Utc::now();
                Ok(Some(entry.value().clone()))
            }
            _ => Ok(None),
        }
    }

    async fn find_credential(&self, username: &str) -> Result<Option<Credential>> {
        Ok(self.credentials.get(username).map(|c| c.clone()))
    }

    async fn find_credential_by_platform_user_id(
        &self,
        platform_user_id: &str,
    ) -> Result<Option<Credential>> {
        // Unresolved credentials store an empty id; never match on it
        if platform_user_id.is_empty() {
            return Ok(None);
        }
        Ok(self
            .credentials
            .iter()
            .find(|entry| entry.platform_user_id == platform_user_id)
            .map(|entry| entry.value().clone()))
    }

    async fn list_active_credentials(&self) -> Result<Vec<Credential>> {
        let mut credentials: Vec<Credential> = self
            .credentials
            .iter()
            .filter(|entry| entry.is_active)
            .map(|entry| entry.value().clone())
            .collect();
        credentials.sort_unstable_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(credentials)
    }

    async fn deactivate_credential(&self, username: &str) -> Result<bool> {
        match self.credentials.get_mut(username) {
            Some(mut entry) => {
                entry.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_credential(&self, username: &str) -> Result<bool> {
        Ok(self.credentials.remove(username).is_some())
    }

    async fn apply_refreshed_token(
        &self,
        username: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut entry = self
            .credentials
            .get_mut(username)
            .ok_or_else(|| XBridgeError::not_found(format!("credential for {}", username)))?;
        entry.access_token = access_token.to_string();
        if let Some(token) = refresh_token {
            entry.refresh_token = Some(token.to_string());
        }
        entry.expires_at = expires_at;
        entry.last_used_at = Utc::now();
        Ok(())
    }

    async fn save_pending_authorization(&self, pending: &PendingAuthorization) -> Result<()> {
        self.purge_expired_authorizations().await?;
        self.pending.insert(pending.state.clone(), pending.clone());
        Ok(())
    }

    async fn get_pending_authorization(
        &self,
        state: &str,
    ) -> Result<Option<PendingAuthorization>> {
        Ok(self
            .pending
            .get(state)
            .filter(|p| !p.is_expired())
            .map(|p| p.value().clone()))
    }

    async fn take_pending_authorization(
        &self,
        state: &str,
    ) -> Result<Option<PendingAuthorization>> {
        // remove_if only yields the record when it is still live, so two
        // concurrent callbacks cannot both consume the same state
        Ok(self
            .pending
            .remove_if(state, |_, p| !p.is_expired())
            .map(|(_, p)| p))
    }

    async fn delete_pending_authorization(&self, state: &str) -> Result<bool> {
        Ok(self.pending.remove(state).is_some())
    }

    async fn purge_expired_authorizations(&self) -> Result<u64> {
        let before = self.pending.len();
        self.pending.retain(|_, p| !p.is_expired());
        Ok(before.saturating_sub(self.pending.len()) as u64)
    }
}
