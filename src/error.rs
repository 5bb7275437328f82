//! Error types for xbridge
//!
//! This module provides a comprehensive error hierarchy using thiserror.
//! All errors can be converted to XBridgeError for unified error handling.

use thiserror::Error;

/// Main error type for xbridge operations
#[derive(Error, Debug)]
pub enum XBridgeError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Authorization error: {0}")]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("X API request failed with status {status}: {body}")]
    Platform { status: u16, body: String },

    #[error("Rate limit exceeded for {action}: retry in {retry_after_secs}s")]
    RateLimited { action: String, retry_after_secs: u64 },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("MCP error: {0}")]
    Mcp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// OAuth flow errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authorization state is invalid or has expired")]
    InvalidOrExpiredState,

    #[error("Token exchange failed with status {status}: {body}")]
    TokenExchangeFailed { status: u16, body: String },

    #[error("Identity resolution failed: {0}")]
    IdentityResolutionFailed(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("No active credential stored for @{0}")]
    CredentialNotFound(String),
}

/// Storage-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// Implement From for sqlx::Error
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StorageError::NotFound("row not found".to_string()),
            other => StorageError::Database(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for XBridgeError {
    fn from(err: sqlx::Error) -> Self {
        XBridgeError::Storage(StorageError::from(err))
    }
}

impl From<reqwest::Error> for XBridgeError {
    fn from(err: reqwest::Error) -> Self {
        XBridgeError::Network(NetworkError::Reqwest(err))
    }
}

/// Network-specific errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Convenient result type for xbridge operations
pub type Result<T> = std::result::Result<T, XBridgeError>;

impl XBridgeError {
    /// Create a validation error
    #[inline]
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        XBridgeError::Validation(msg.into())
    }

    /// Create a config error
    #[inline]
    pub fn config<S: Into<String>>(msg: S) -> Self {
        XBridgeError::Config(msg.into())
    }

    /// Create a storage error
    #[inline]
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        XBridgeError::Storage(StorageError::Database(msg.into()))
    }

    /// Create a not found error
    #[inline]
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        XBridgeError::Storage(StorageError::NotFound(msg.into()))
    }

    /// Create a platform error from an X API response
    #[inline]
    pub fn platform<S: Into<String>>(status: u16, body: S) -> Self {
        XBridgeError::Platform {
            status,
            body: body.into(),
        }
    }

    /// Create an MCP error
    #[inline]
    pub fn mcp<S: Into<String>>(msg: S) -> Self {
        XBridgeError::Mcp(msg.into())
    }
}
