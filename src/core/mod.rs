//! Core operations module using attribute macros
//!
//! Every bridge tool is an operation in one of these groups. The
//! #[operation] and #[operation_group] macros attach metadata to each
//! operation, and the CLI, HTTP router, and MCP tool list are all generated
//! from that one definition.

pub mod accounts;
pub mod auth;
pub mod timeline;
pub mod tweets;
pub mod users;

use crate::auth::{ClientFactory, OAuthManager};
use crate::config::Config;
use crate::storage::Storage;
use crate::twitter::{RateLimiter, XClient};
use crate::{Result, XBridgeError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Dependencies that operations need access to
#[derive(Clone)]
pub struct Dependencies {
    pub storage: Arc<dyn Storage>,
    pub oauth: Arc<OAuthManager>,
    pub clients: Arc<ClientFactory>,
    pub rate_limiter: Arc<RateLimiter>,
    pub config: Arc<Config>,
}

/// Metadata for an operation (HTTP routes, CLI patterns, etc.)
#[derive(Debug, Clone)]
pub struct OperationMetadata {
    pub name: &'static str,
    pub description: &'static str,
    pub group: &'static str,
    pub http_method: Option<&'static str>,
    pub http_path: Option<&'static str>,
    pub cli_pattern: Option<&'static str>,
    pub schema: serde_json::Map<String, serde_json::Value>,
}

/// Trait for providing operation metadata
pub trait HasMetadata {
    fn metadata() -> OperationMetadata;
}

/// Core trait for all operations
#[async_trait]
pub trait Operation: Send + Sync + HasMetadata {
    type Input: for<'de> Deserialize<'de> + Send;
    type Output: Serialize + Send;

    async fn execute(&self, input: Self::Input) -> Result<Self::Output>;
}

/// Registry of all operations with dependency injection
pub struct OperationRegistry {
    operations: HashMap<String, Box<dyn OperationExecutor>>,
    metadata: HashMap<String, OperationMetadata>,
    dependencies: Arc<Dependencies>,
}

#[async_trait]
trait OperationExecutor: Send + Sync {
    async fn execute_json(&self, input: Value) -> Result<Value>;
}

impl OperationRegistry {
    pub fn new(dependencies: Dependencies) -> Self {
        let deps = Arc::new(dependencies);
        let mut registry = Self {
            operations: HashMap::new(),
            metadata: HashMap::new(),
            dependencies: deps.clone(),
        };

        // Auto-register all operations by group
        accounts::accounts::register_all(&mut registry, deps.clone());
        auth::auth::register_all(&mut registry, deps.clone());
        tweets::tweets::register_all(&mut registry, deps.clone());
        users::users::register_all(&mut registry, deps.clone());
        timeline::timeline::register_all(&mut registry, deps.clone());

        registry
    }

    fn register<Op: Operation + 'static>(&mut self, op: Op, name: &str) {
        self.metadata.insert(name.to_string(), Op::metadata());
        self.operations
            .insert(name.to_string(), Box::new(OperationWrapper(op)));
    }

    pub async fn execute(&self, name: &str, input: Value) -> Result<Value> {
        let op = self
            .operations
            .get(name)
            .ok_or_else(|| XBridgeError::config(format!("Operation not found: {}", name)))?;

        op.execute_json(input).await
    }

    pub fn get_dependencies(&self) -> Arc<Dependencies> {
        self.dependencies.clone()
    }

    /// Get all operation metadata for building interfaces
    pub fn get_all_metadata(&self) -> &HashMap<String, OperationMetadata> {
        &self.metadata
    }

    /// Get metadata for a specific operation
    pub fn get_metadata(&self, name: &str) -> Option<&OperationMetadata> {
        self.metadata.get(name)
    }
}

struct OperationWrapper<Op>(Op);

#[async_trait]
impl<Op: Operation + 'static> OperationExecutor for OperationWrapper<Op> {
    async fn execute_json(&self, input: Value) -> Result<Value> {
        let typed_input: Op::Input = serde_json::from_value(input)?;
        let output = self.0.execute(typed_input).await?;
        Ok(serde_json::to_value(output)?)
    }
}

// Helper functions for common error patterns

fn account_not_found(username: &str) -> XBridgeError {
    XBridgeError::not_found(format!("Account not found: {}", username))
}

/// Platform id for an account, probing the platform when the stored
/// credential does not carry one (manually provisioned accounts).
async fn platform_user_id(deps: &Dependencies, username: &str, client: &XClient) -> Result<String> {
    if let Some(credential) = deps.storage.find_credential(username).await? {
        if !credential.platform_user_id.is_empty() {
            return Ok(credential.platform_user_id);
        }
    }
    let me = client.me().await?;
    Ok(me.id)
}

/// Create Dependencies with shared storage and the OAuth stack
///
/// All presentation layers (CLI, HTTP, MCP) build their registry from this
/// function so they share one storage handle and one OAuth manager.
pub async fn create_dependencies(config: &Config) -> Result<Dependencies> {
    let storage = crate::storage::create_storage_from_config(&config.storage).await?;

    let oauth = Arc::new(OAuthManager::new(storage.clone(), config.oauth.clone()));
    let clients = Arc::new(ClientFactory::new(
        storage.clone(),
        oauth.clone(),
        config.oauth.api_base_url.clone(),
    ));

    Ok(Dependencies {
        storage,
        oauth,
        clients,
        rate_limiter: Arc::new(RateLimiter::new()),
        config: Arc::new(config.clone()),
    })
}
