//! Constants used throughout xbridge
//!
//! This module contains all constant values used by the bridge, including
//! configuration paths, X API endpoints, OAuth windows, and rate limits.

use once_cell::sync::Lazy;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Get the home directory with fallback to current directory
pub fn get_home_dir() -> &'static str {
    static HOME_DIR: Lazy<String> = Lazy::new(|| {
        std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string())
    });
    &HOME_DIR
}

/// Default config directory (~/.xbridge)
pub fn default_config_dir() -> &'static str {
    static CONFIG_DIR: Lazy<String> = Lazy::new(|| format!("{}/.xbridge", get_home_dir()));
    &CONFIG_DIR
}

/// Default SQLite DSN (~/.xbridge/xbridge.db)
pub fn default_sqlite_dsn() -> &'static str {
    static SQLITE_DSN: Lazy<String> = Lazy::new(|| format!("{}/xbridge.db", default_config_dir()));
    &SQLITE_DSN
}

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "xbridge.config.json";

/// Storage driver: in-memory
pub const STORAGE_DRIVER_MEMORY: &str = "memory";

/// Storage driver: SQLite
pub const STORAGE_DRIVER_SQLITE: &str = "sqlite";

/// Storage driver: PostgreSQL
pub const STORAGE_DRIVER_POSTGRES: &str = "postgres";

/// Environment variable: OAuth client id
pub const ENV_CLIENT_ID: &str = "TWITTER_CLIENT_ID";

/// Environment variable: OAuth client secret (confidential clients only)
pub const ENV_CLIENT_SECRET: &str = "TWITTER_CLIENT_SECRET";

/// Environment variable: OAuth redirect URI
pub const ENV_REDIRECT_URI: &str = "TWITTER_REDIRECT_URI";

/// Environment variable: database DSN
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Environment variable: HTTP bind host
pub const ENV_HOST: &str = "HOST";

/// Environment variable: HTTP bind port
pub const ENV_PORT: &str = "PORT";

/// Environment variable: pending authorization TTL in seconds
pub const ENV_STATE_TTL: &str = "OAUTH_STATE_EXPIRE_SECONDS";

/// Environment variable: debug mode
pub const ENV_DEBUG: &str = "XBRIDGE_DEBUG";

// ============================================================================
// X API
// ============================================================================

/// OAuth authorization endpoint (browser redirect target)
pub const X_AUTHORIZE_URL: &str = "https://twitter.com/i/oauth2/authorize";

/// OAuth token endpoint (code exchange and refresh grants)
pub const X_TOKEN_URL: &str = "https://api.twitter.com/2/oauth2/token";

/// X API v2 base URL
pub const X_API_BASE_URL: &str = "https://api.twitter.com/2";

/// Scopes requested during authorization, space-joined on the wire
pub const DEFAULT_SCOPES: &[&str] =
    &["tweet.read", "tweet.write", "users.read", "offline.access"];

/// Maximum tweet length in characters
pub const TWEET_MAX_CHARS: usize = 280;

/// Default page size for user and tweet listings
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Maximum page size accepted by the X API list endpoints
pub const MAX_PAGE_SIZE: u32 = 100;

/// Minimum page size accepted by the X API search endpoints
pub const MIN_SEARCH_PAGE_SIZE: u32 = 10;

/// How many followed accounts to sample when assembling the home timeline
pub const TIMELINE_FOLLOWING_SAMPLE: u32 = 50;

/// How many authors the timeline search query may name before it gets too long
pub const TIMELINE_AUTHOR_CAP: usize = 12;

// ============================================================================
// OAUTH WINDOWS
// ============================================================================

/// Default pending authorization TTL in seconds
pub const DEFAULT_STATE_TTL_SECS: i64 = 900;

/// Safety margin before token expiry that triggers a refresh
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Username recorded for callbacks not pre-bound to an account
pub const UNBOUND_USERNAME: &str = "__unbound__";

// ============================================================================
// HTTP & SERVER
// ============================================================================

/// Default HTTP bind host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 8000;

/// Default MCP port (over HTTP)
pub const DEFAULT_MCP_PORT: u16 = 3001;

/// HTTP path: health check
pub const HTTP_PATH_HEALTH: &str = "/healthz";

/// HTTP path: OAuth callback
pub const HTTP_PATH_AUTH_CALLBACK: &str = "/auth/callback";

/// MCP endpoint path when served over HTTP
pub const MCP_HTTP_PATH: &str = "/mcp";

// ============================================================================
// RATE LIMITS
// ============================================================================

/// Rate limit action: tweet writes (post, delete, retweet, reply, quote)
pub const ACTION_TWEET: &str = "tweet_actions";

/// Rate limit action: likes and unlikes
pub const ACTION_LIKE: &str = "like_actions";

/// Rate limit action: follows and unfollows
pub const ACTION_FOLLOW: &str = "follow_actions";

/// Rate limit action: direct messages
pub const ACTION_DM: &str = "dm_actions";

/// Tweet actions allowed per window
pub const TWEET_ACTIONS_LIMIT: u32 = 300;

/// Tweet actions window in seconds (15 minutes)
pub const TWEET_ACTIONS_WINDOW_SECS: u64 = 15 * 60;

/// Like actions allowed per window
pub const LIKE_ACTIONS_LIMIT: u32 = 1000;

/// Like actions window in seconds (24 hours)
pub const LIKE_ACTIONS_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Follow actions allowed per window
pub const FOLLOW_ACTIONS_LIMIT: u32 = 400;

/// Follow actions window in seconds (24 hours)
pub const FOLLOW_ACTIONS_WINDOW_SECS: u64 = 24 * 60 * 60;

/// DM actions allowed per window
pub const DM_ACTIONS_LIMIT: u32 = 1000;

/// DM actions window in seconds (15 minutes)
pub const DM_ACTIONS_WINDOW_SECS: u64 = 15 * 60;
