//! Configuration management for xbridge
//!
//! Loads xbridge configuration from xbridge.config.json and applies
//! environment overrides for deployment settings.

use crate::constants::{
    self, DEFAULT_HOST, DEFAULT_HTTP_PORT, DEFAULT_MCP_PORT, DEFAULT_SCOPES,
    DEFAULT_STATE_TTL_SECS, ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_DATABASE_URL, ENV_HOST,
    ENV_PORT, ENV_REDIRECT_URI, ENV_STATE_TTL, STORAGE_DRIVER_MEMORY, STORAGE_DRIVER_POSTGRES,
    STORAGE_DRIVER_SQLITE, X_API_BASE_URL, X_AUTHORIZE_URL, X_TOKEN_URL,
};
use crate::{Result, XBridgeError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Complete xbridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Storage configuration (required)
    pub storage: StorageConfig,

    /// HTTP server configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpConfig>,

    /// OAuth application settings
    #[serde(default)]
    pub oauth: OAuthAppConfig,

    /// Logging configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<LogConfig>,
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Driver name (sqlite, postgres, memory)
    pub driver: String,

    /// Data source name / connection string
    pub dsn: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Port for the MCP streamable HTTP transport
    #[serde(default = "default_mcp_port", rename = "mcpPort")]
    pub mcp_port: u16,

    /// Allowed CORS origins (e.g., ["https://example.com"])
    /// If not specified, defaults to localhost origins for development
    #[serde(skip_serializing_if = "Option::is_none", rename = "allowedOrigins")]
    pub allowed_origins: Option<Vec<String>>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_HTTP_PORT
}

fn default_mcp_port() -> u16 {
    DEFAULT_MCP_PORT
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            mcp_port: default_mcp_port(),
            allowed_origins: None,
        }
    }
}

/// OAuth application settings for the X developer app
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthAppConfig {
    /// OAuth 2.0 client id issued by the X developer portal
    #[serde(default)]
    pub client_id: String,

    /// Client secret; present only for confidential clients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Redirect URI registered with the app, must match exactly
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Scopes requested during authorization
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Authorization endpoint override, used by tests
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,

    /// Token endpoint override, used by tests
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// API base URL override, used by tests
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// How long a pending authorization stays valid
    #[serde(default = "default_state_ttl")]
    pub state_ttl_secs: i64,
}

fn default_redirect_uri() -> String {
    format!(
        "http://{}:{}{}",
        DEFAULT_HOST,
        DEFAULT_HTTP_PORT,
        constants::HTTP_PATH_AUTH_CALLBACK
    )
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}

fn default_authorize_url() -> String {
    X_AUTHORIZE_URL.to_string()
}

fn default_token_url() -> String {
    X_TOKEN_URL.to_string()
}

fn default_api_base_url() -> String {
    X_API_BASE_URL.to_string()
}

fn default_state_ttl() -> i64 {
    DEFAULT_STATE_TTL_SECS
}

impl Default for OAuthAppConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
            api_base_url: default_api_base_url(),
            state_ttl_secs: default_state_ttl(),
        }
    }
}

impl OAuthAppConfig {
    /// Whether a client id has been provided
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty()
    }

    /// Identity endpoint derived from the API base URL
    #[must_use]
    pub fn identity_url(&self) -> String {
        format!("{}/users/me", self.api_base_url)
    }

    /// Scopes as the space-joined wire form
    #[must_use]
    pub fn scopes_joined(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path(constants::CONFIG_FILE_NAME)
    }

    /// Load configuration from specific path
    ///
    /// Returns the default configuration when the file does not exist.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| XBridgeError::config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration and apply environment overrides
    pub fn load_and_inject<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load_from_path(path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(constants::CONFIG_FILE_NAME)
    }

    /// Save configuration to specific path
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path_ref, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.driver.is_empty() {
            return Err(XBridgeError::config("storage.driver is required"));
        }

        match self.storage.driver.as_str() {
            STORAGE_DRIVER_SQLITE | STORAGE_DRIVER_POSTGRES => {
                if self.storage.dsn.is_empty() {
                    return Err(XBridgeError::config("storage.dsn is required"));
                }
            }
            STORAGE_DRIVER_MEMORY => {}
            _ => {
                return Err(XBridgeError::config(format!(
                    "Unsupported storage driver: '{}'. Supported: sqlite, postgres, memory",
                    self.storage.driver
                )));
            }
        }

        if let Some(ref http) = self.http {
            if http.port == 0 {
                return Err(XBridgeError::config("http.port must be nonzero (1-65535)"));
            }

            if http.host.is_empty() {
                return Err(XBridgeError::config("http.host cannot be empty"));
            }

            if let Some(ref origins) = http.allowed_origins {
                for origin in origins {
                    if !origin.starts_with("http://") && !origin.starts_with("https://") {
                        return Err(XBridgeError::config(format!(
                            "Invalid CORS origin '{}': must start with http:// or https://",
                            origin
                        )));
                    }
                }
            }
        }

        if self.oauth.state_ttl_secs <= 0 {
            return Err(XBridgeError::config(
                "oauth.stateTtlSecs must be greater than 0",
            ));
        }

        if self.oauth.is_configured() && self.oauth.redirect_uri.is_empty() {
            return Err(XBridgeError::config(
                "oauth.redirectUri is required when a client id is set",
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                driver: STORAGE_DRIVER_SQLITE.to_string(),
                dsn: constants::default_sqlite_dsn().to_string(),
            },
            http: Some(HttpConfig::default()),
            oauth: OAuthAppConfig::default(),
            log: Some(LogConfig {
                level: Some("info".to_string()),
            }),
        }
    }
}

/// Infer the storage driver from a DSN scheme
pub fn infer_driver_from_dsn(dsn: &str) -> &'static str {
    if dsn.starts_with("postgres://") || dsn.starts_with("postgresql://") {
        STORAGE_DRIVER_POSTGRES
    } else if dsn == STORAGE_DRIVER_MEMORY {
        STORAGE_DRIVER_MEMORY
    } else {
        STORAGE_DRIVER_SQLITE
    }
}

/// Apply environment overrides for deployment settings
pub fn apply_env_overrides(cfg: &mut Config) -> Result<()> {
    if let Ok(v) = env::var(ENV_CLIENT_ID)
        && !v.is_empty()
    {
        cfg.oauth.client_id = v;
    }

    if let Ok(v) = env::var(ENV_CLIENT_SECRET)
        && !v.is_empty()
    {
        cfg.oauth.client_secret = Some(v);
    }

    if let Ok(v) = env::var(ENV_REDIRECT_URI)
        && !v.is_empty()
    {
        cfg.oauth.redirect_uri = v;
    }

    if let Ok(v) = env::var(ENV_DATABASE_URL)
        && !v.is_empty()
    {
        cfg.storage.driver = infer_driver_from_dsn(&v).to_string();
        cfg.storage.dsn = v;
    }

    if let Ok(v) = env::var(ENV_HOST)
        && !v.is_empty()
    {
        cfg.http.get_or_insert_with(HttpConfig::default).host = v;
    }

    if let Ok(v) = env::var(ENV_PORT)
        && !v.is_empty()
    {
        let port: u16 = v
            .parse()
            .map_err(|_| XBridgeError::config(format!("Invalid {}: '{}'", ENV_PORT, v)))?;
        cfg.http.get_or_insert_with(HttpConfig::default).port = port;
    }

    if let Ok(v) = env::var(ENV_STATE_TTL)
        && !v.is_empty()
    {
        let ttl: i64 = v
            .parse()
            .map_err(|_| XBridgeError::config(format!("Invalid {}: '{}'", ENV_STATE_TTL, v)))?;
        cfg.oauth.state_ttl_secs = ttl;
    }

    Ok(())
}
