//! Per-account API client handles

use crate::Result;
use crate::auth::OAuthManager;
use crate::constants::TOKEN_REFRESH_MARGIN_SECS;
use crate::error::AuthError;
use crate::model::normalize_username;
use crate::storage::Storage;
use crate::twitter::XClient;
use std::sync::Arc;

/// Hands out X API clients bound to a valid access token
///
/// `get_client` loads the active credential, refreshes it when it is inside
/// the expiry margin and a refresh token exists, and binds the returned
/// handle to whatever token is current afterwards.
pub struct ClientFactory {
    storage: Arc<dyn Storage>,
    oauth: Arc<OAuthManager>,
    api_base_url: String,
}

impl ClientFactory {
    /// Create a new client factory
    pub fn new(
        storage: Arc<dyn Storage>,
        oauth: Arc<OAuthManager>,
        api_base_url: String,
    ) -> Self {
        Self {
            storage,
            oauth,
            api_base_url,
        }
    }

    /// Get an API client for an account
    ///
    /// Unknown and deactivated usernames both report as not found. An
    /// expired credential without a refresh token is handed out as-is; the
    /// platform's rejection then surfaces on first use.
    pub async fn get_client(&self, username: &str) -> Result<XClient> {
        let username = normalize_username(username);
        let credential = self
            .storage
            .get_credential(&username)
            .await?
            .ok_or_else(|| AuthError::CredentialNotFound(username.clone()))?;

        // At most one refresh attempt per call; a failure propagates instead
        // of silently handing out a stale token
        let credential = if credential.is_expired(TOKEN_REFRESH_MARGIN_SECS)
            && credential.refresh_token.is_some()
        {
            tracing::debug!("Access token for @{} is stale, refreshing", username);
            self.oauth.refresh_credential(&credential).await?
        } else {
            credential
        };

        Ok(XClient::new(
            credential.access_token,
            self.api_base_url.clone(),
        ))
    }
}
