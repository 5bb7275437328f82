//! xbridge - X (Twitter) account bridge for AI tooling
//!
//! This library connects AI assistants to X accounts. It can be:
//! - Used as a library in other Rust applications
//! - Run as a CLI tool (`xbridge` binary)
//! - Exposed as an HTTP API server
//! - Exposed as an MCP server for AI tools
//!
//! # Architecture
//!
//! Accounts authorize once through an OAuth 2.0 + PKCE browser flow; the
//! bridge stores the resulting credentials and hands out ready-to-use API
//! clients per username from then on. It features:
//! - Universal protocol across CLI, HTTP, and MCP interfaces
//! - Multi-account credential store (in-memory, SQLite, PostgreSQL)
//! - Automatic token refresh with rotation support
//! - A typed X API v2 client (tweets, users, timelines, search)
//! - In-process rate limiting per account and action class
//!
//! # Example
//!
//! ```rust,no_run
//! use xbridge::config::Config;
//! use xbridge::core::create_dependencies;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Initialize dependencies (storage, OAuth manager, client factory)
//!     let config = Config::default();
//!     let deps = create_dependencies(&config).await?;
//!
//!     // Hand out an authenticated client for a connected account
//!     let client = deps.clients.get_client("alice").await?;
//!     let profile = client.me().await?;
//!     println!("@{}", profile.username);
//!
//!     Ok(())
//! }
//! ```

// Core modules
pub mod constants;
pub mod error;
pub mod model;

// ⭐ Unified operations - the key to CLI/HTTP/MCP parity
pub mod core;

// OAuth flow, credential store, and the platform client
pub mod auth;
pub mod twitter;

// Infrastructure
pub mod config;
pub mod storage;

// Interface layers (all delegate to operations)
pub mod cli;
pub mod http;
pub mod mcp;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use error::{AuthError, Result, XBridgeError};
pub use model::{AccountSummary, AuthorizationOutcome, BeginAuthorization, Credential};

/// Initialize logging for the application
pub fn init_logging() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "xbridge=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
