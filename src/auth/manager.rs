//! OAuth 2.0 authorization manager
//!
//! Drives the Authorization Code + PKCE flow against the X token endpoint
//! and keeps the credential store in sync with its outcomes.

use crate::config::OAuthAppConfig;
use crate::constants::UNBOUND_USERNAME;
use crate::error::AuthError;
use crate::model::{
    AuthorizationOutcome, BeginAuthorization, Credential, Data, PendingAuthorization,
    PlatformIdentity, TokenGrant, normalize_username,
};
use crate::storage::Storage;
use crate::{Result, XBridgeError};
use chrono::{Duration, Utc};
use oauth2::{
    AuthUrl, ClientId, CsrfToken, PkceCodeChallenge, RedirectUrl, Scope, basic::BasicClient,
};
use std::sync::Arc;

/// Manager for the OAuth 2.0 Authorization Code + PKCE flow
///
/// Holds the application's OAuth settings and a dedicated HTTP client for
/// token endpoint calls. Every flow the manager starts is recorded as a
/// pending authorization; completing a flow consumes that record exactly once.
pub struct OAuthManager {
    storage: Arc<dyn Storage>,
    config: OAuthAppConfig,
    http_client: reqwest::Client,
}

impl OAuthManager {
    /// Create a new OAuth manager
    pub fn new(storage: Arc<dyn Storage>, config: OAuthAppConfig) -> Self {
        // Disable redirects to prevent authorization code interception
        let http_client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build HTTP client for OAuth");

        Self {
            storage,
            config,
            http_client,
        }
    }

    /// Start an authorization flow, optionally bound to a username
    ///
    /// Returns the platform authorize URL (carrying the PKCE challenge and a
    /// fresh single-use state) for the user's browser, and records the
    /// matching pending authorization.
    pub async fn begin_authorization(
        &self,
        username: Option<&str>,
    ) -> Result<BeginAuthorization> {
        self.ensure_configured()?;

        let bound_username = match username.map(normalize_username) {
            Some(name) if !name.is_empty() => name,
            _ => UNBOUND_USERNAME.to_string(),
        };

        let client = BasicClient::new(ClientId::new(self.config.client_id.clone()))
            .set_auth_uri(
                AuthUrl::new(self.config.authorize_url.clone())
                    .map_err(|e| XBridgeError::config(format!("Invalid authorize URL: {}", e)))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(self.config.redirect_uri.clone())
                    .map_err(|e| XBridgeError::config(format!("Invalid redirect URI: {}", e)))?,
            );

        // Generate PKCE challenge
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (authorize_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.config.scopes.iter().map(|s| Scope::new(s.clone())))
            .set_pkce_challenge(pkce_challenge)
            .url();

        let now = Utc::now();
        let pending = PendingAuthorization {
            state: csrf_token.secret().clone(),
            username: bound_username,
            code_verifier: pkce_verifier.secret().clone(),
            created_at: now,
            expires_at: now + Duration::seconds(self.config.state_ttl_secs),
        };
        self.storage.save_pending_authorization(&pending).await?;

        tracing::info!("Started authorization flow for {}", pending.username);

        Ok(BeginAuthorization {
            authorize_url: authorize_url.to_string(),
            state: pending.state,
            expires_at: pending.expires_at,
        })
    }

    /// Complete an authorization flow from the callback's state and code
    ///
    /// Consumes the pending authorization, exchanges the code (with the
    /// stored PKCE verifier) for tokens, resolves the authorized identity,
    /// and upserts the resulting credential.
    pub async fn complete_authorization(
        &self,
        state: &str,
        code: &str,
    ) -> Result<AuthorizationOutcome> {
        self.ensure_configured()?;

        // Consume the state up front so every later failure still burns it
        let pending = self
            .storage
            .take_pending_authorization(state)
            .await?
            .ok_or(AuthError::InvalidOrExpiredState)?;

        let grant = self.exchange_code(code, &pending.code_verifier).await?;
        let identity = self.resolve_identity(&grant.access_token).await?;

        // A flow started for a specific handle stores under that handle;
        // unbound flows take the handle the platform reports
        let username = if pending.is_bound() {
            pending.username
        } else {
            normalize_username(&identity.username)
        };

        let mut scopes = grant.scopes();
        if scopes.is_empty() {
            scopes = self.config.scopes.clone();
        }

        let now = Utc::now();
        let expires_at = Some(grant.expires_at());
        let credential = Credential {
            username,
            platform_user_id: identity.id,
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_at,
            scopes: scopes.clone(),
            display_name: identity.name,
            is_active: true,
            created_at: now,
            last_used_at: now,
        };
        credential.validate()?;
        self.storage.upsert_credential(&credential).await?;

        tracing::info!(
            "Authorized @{} (platform id {})",
            credential.username,
            credential.platform_user_id
        );

        Ok(AuthorizationOutcome {
            username: credential.username,
            platform_user_id: credential.platform_user_id,
            display_name: credential.display_name,
            scopes,
            expires_at: credential.expires_at,
        })
    }

    /// Refresh a credential's access token with its refresh token
    ///
    /// Persists the rotated tokens and returns the updated credential. The
    /// platform may or may not rotate the refresh token; when it does not,
    /// the stored one is kept.
    pub async fn refresh_credential(&self, credential: &Credential) -> Result<Credential> {
        self.ensure_configured()?;

        let refresh_token = credential.refresh_token.as_deref().ok_or_else(|| {
            AuthError::RefreshFailed(format!(
                "no refresh token stored for @{}",
                credential.username
            ))
        })?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];

        let response = self
            .token_request(&params)
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::RefreshFailed(format!("{}: {}", status, body)).into());
        }

        let grant: TokenGrant = response.json().await.map_err(|e| {
            AuthError::RefreshFailed(format!("unparseable refresh response: {}", e))
        })?;

        let expires_at = Some(grant.expires_at());
        self.storage
            .apply_refreshed_token(
                &credential.username,
                &grant.access_token,
                grant.refresh_token.as_deref(),
                expires_at,
            )
            .await?;

        tracing::info!("Refreshed token for @{}", credential.username);

        let mut refreshed = credential.clone();
        refreshed.access_token = grant.access_token;
        if grant.refresh_token.is_some() {
            refreshed.refresh_token = grant.refresh_token;
        }
        refreshed.expires_at = expires_at;
        refreshed.last_used_at = Utc::now();
        Ok(refreshed)
    }

    /// Exchange an authorization code for a token grant
    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<TokenGrant> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", code_verifier),
        ];

        let response = self.token_request(&params).send().await?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenExchangeFailed { status, body }.into());
        }

        response
            .json::<TokenGrant>()
            .await
            .map_err(|e| {
                AuthError::TokenExchangeFailed {
                    status,
                    body: format!("unparseable token response: {}", e),
                }
                .into()
            })
    }

    /// Ask the platform who the new access token belongs to
    async fn resolve_identity(&self, access_token: &str) -> Result<PlatformIdentity> {
        let response = self
            .http_client
            .get(self.config.identity_url())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::IdentityResolutionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(
                AuthError::IdentityResolutionFailed(format!("{}: {}", status, body)).into(),
            );
        }

        let envelope: Data<PlatformIdentity> = response.json().await.map_err(|e| {
            AuthError::IdentityResolutionFailed(format!("unparseable identity response: {}", e))
        })?;

        Ok(envelope.data)
    }

    /// Build a token endpoint POST with the right client authentication
    fn token_request(&self, params: &[(&str, &str)]) -> reqwest::RequestBuilder {
        let mut request = self.http_client.post(&self.config.token_url).form(&params);
        // Confidential clients authenticate with HTTP Basic; public clients
        // carry only the client_id already present in the form body
        if let Some(secret) = &self.config.client_secret {
            request = request.basic_auth(&self.config.client_id, Some(secret));
        }
        request
    }

    fn ensure_configured(&self) -> Result<()> {
        if !self.config.is_configured() {
            return Err(XBridgeError::config(
                "TWITTER_CLIENT_ID is not set; cannot run authorization flows",
            ));
        }
        Ok(())
    }
}
