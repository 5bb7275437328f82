//! Shared test utilities
//!
//! Provides `TestEnvironment` for consistent test setup across all test
//! modules. Tests get a complete `Dependencies` object backed by in-memory
//! storage, with the platform endpoints optionally pointed at a stub server.

use crate::config::{Config, OAuthAppConfig};
use crate::core::Dependencies;
use crate::storage::MemoryStorage;
use crate::twitter::RateLimiter;
use std::sync::Arc;

/// Complete test environment with all dependencies wired up
///
/// # Example
///
/// ```no_run
/// use xbridge::utils::TestEnvironment;
/// use xbridge::core::OperationRegistry;
///
/// #[tokio::test]
/// async fn my_test() {
///     let env = TestEnvironment::new().await;
///     let registry = OperationRegistry::new(env.deps);
/// }
/// ```
pub struct TestEnvironment {
    /// Complete dependencies object ready to use in tests
    pub deps: Dependencies,
}

impl TestEnvironment {
    /// Create an isolated in-memory environment with the stock platform
    /// endpoints. Suitable for tests that never reach the network.
    pub async fn new() -> Self {
        let config = Config::default();
        Self::from_config(config).await
    }

    /// Create an environment with every platform endpoint (authorize, token,
    /// API base) pointed at `base`, normally a wiremock server URI.
    pub async fn with_platform(base: &str) -> Self {
        let mut config = Config::default();
        config.oauth = OAuthAppConfig {
            client_id: "client123".to_string(),
            client_secret: None,
            redirect_uri: "http://127.0.0.1:8000/auth/callback".to_string(),
            scopes: crate::constants::DEFAULT_SCOPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            authorize_url: format!("{}/i/oauth2/authorize", base),
            token_url: format!("{}/2/oauth2/token", base),
            api_base_url: format!("{}/2", base),
            state_ttl_secs: 900,
        };
        Self::from_config(config).await
    }

    async fn from_config(config: Config) -> Self {
        let storage: Arc<dyn crate::storage::Storage> = Arc::new(MemoryStorage::new());
        let oauth = Arc::new(crate::auth::OAuthManager::new(
            storage.clone(),
            config.oauth.clone(),
        ));
        let clients = Arc::new(crate::auth::ClientFactory::new(
            storage.clone(),
            oauth.clone(),
            config.oauth.api_base_url.clone(),
        ));

        let deps = Dependencies {
            storage,
            oauth,
            clients,
            rate_limiter: Arc::new(RateLimiter::new()),
            config: Arc::new(config),
        };

        TestEnvironment { deps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Credential;

    #[tokio::test]
    async fn test_environment_storage_is_functional() {
        let env = TestEnvironment::new().await;

        let credential = Credential {
            username: "probe".to_string(),
            platform_user_id: "1".to_string(),
            access_token: "token".to_string(),
            refresh_token: None,
            expires_at: None,
            scopes: Vec::new(),
            display_name: None,
            is_active: true,
            created_at: chrono::Utc::now(),
            last_used_at: chrono::Utc::now(),
        };

        env.deps
            .storage
            .upsert_credential(&credential)
            .await
            .expect("Should be able to write to storage");

        let found = env
            .deps
            .storage
            .find_credential("probe")
            .await
            .expect("Should be able to read from storage");

        assert_eq!(found.map(|c| c.access_token), Some("token".to_string()));
    }
}
