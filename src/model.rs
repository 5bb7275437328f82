//! Core data models for xbridge
//!
//! This module contains the data structures for stored account credentials,
//! pending OAuth authorizations, and the token/identity payloads exchanged
//! with the platform during the authorization flow.

use crate::constants::UNBOUND_USERNAME;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A stored X account credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Account handle, primary key (stored without the leading @)
    pub username: String,

    /// Numeric X user id; empty until resolved from the identity endpoint
    #[serde(default)]
    pub platform_user_id: String,

    /// OAuth 2.0 bearer token (REQUIRED)
    pub access_token: String,

    /// Refresh token, absent for grants without offline access
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Access token expiry; absent means treat as non-expiring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Granted permission scopes
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Human-readable account name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Inactive credentials are invisible to tool calls
    pub is_active: bool,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last time a tool call resolved this credential
    pub last_used_at: DateTime<Utc>,
}

// Validation macro for required fields
macro_rules! require_field_err {
    ($field:expr, $name:literal) => {
        if $field.is_empty() {
            return Err(crate::XBridgeError::validation(concat!(
                $name,
                " is required"
            )));
        }
    };
}

impl Credential {
    /// Validate the credential before persisting
    pub fn validate(&self) -> crate::Result<()> {
        require_field_err!(self.username, "username");
        require_field_err!(self.access_token, "access_token");
        Ok(())
    }

    /// Check whether the access token is expired or expires within
    /// `margin_secs` from now. Credentials without an expiry never expire.
    #[must_use]
    pub fn is_expired(&self, margin_secs: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Utc::now() + Duration::seconds(margin_secs) >= expires_at)
    }

    /// Display name with fallback to the handle
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }

    /// Token-free projection safe to return from account operations
    #[must_use]
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            username: self.username.clone(),
            platform_user_id: self.platform_user_id.clone(),
            display_name: self.display_name.clone(),
            scopes: self.scopes.clone(),
            is_active: self.is_active,
            expires_at: self.expires_at,
            created_at: self.created_at,
            last_used_at: self.last_used_at,
        }
    }
}

/// Credential projection without token material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    /// Account handle
    pub username: String,

    /// Numeric X user id, empty if never resolved
    pub platform_user_id: String,

    /// Human-readable account name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Granted permission scopes
    pub scopes: Vec<String>,

    /// Whether the credential is visible to tool calls
    pub is_active: bool,

    /// Access token expiry, absent for non-expiring tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last use time
    pub last_used_at: DateTime<Utc>,
}

/// A pending OAuth authorization awaiting its callback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAuthorization {
    /// Random state token, primary key, single-use
    pub state: String,

    /// Username the flow was started for, or the unbound placeholder
    pub username: String,

    /// PKCE code verifier matching the challenge sent to the platform
    pub code_verifier: String,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Expiry fixed at creation; expired records are never matched
    pub expires_at: DateTime<Utc>,
}

impl PendingAuthorization {
    /// Check whether the authorization window has closed
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Whether the flow was started for a specific username
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.username != UNBOUND_USERNAME
    }
}

/// Token endpoint response for both the code exchange and refresh grants
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    /// Bearer access token (REQUIRED)
    pub access_token: String,

    /// Rotated or newly issued refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Lifetime in seconds; 0 when the platform omits it
    #[serde(default)]
    pub expires_in: i64,

    /// Granted scopes, space-joined
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenGrant {
    /// Absolute expiry computed from `expires_in`
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(self.expires_in)
    }

    /// Granted scopes split into a list
    #[must_use]
    pub fn scopes(&self) -> Vec<String> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Envelope around X API v2 payloads, which always arrive as `{"data": ...}`
#[derive(Debug, Clone, Deserialize)]
pub struct Data<T> {
    pub data: T,
}

/// Authenticated identity returned by the platform's identity endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformIdentity {
    /// Numeric X user id
    pub id: String,

    /// Account handle
    pub username: String,

    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Result of `begin_authorization`: where to send the user's browser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeginAuthorization {
    /// Platform authorization URL with PKCE challenge and state
    pub authorize_url: String,

    /// State token identifying the pending authorization
    pub state: String,

    /// When the pending authorization stops being honored
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful `complete_authorization`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationOutcome {
    /// Username the credential was stored under
    pub username: String,

    /// Resolved X user id
    pub platform_user_id: String,

    /// Display name from the identity endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Scopes granted by the platform
    pub scopes: Vec<String>,

    /// Access token expiry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Strip the leading @ and surrounding whitespace from a handle
#[must_use]
pub fn normalize_username(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_string()
}

/// A tweet as returned by the X API v2
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_metrics: Option<TweetMetrics>,
}

/// Engagement counters attached to a tweet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TweetMetrics {
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub quote_count: u64,
}

/// An X user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_metrics: Option<UserMetrics>,
}

/// Follower and tweet counters attached to a user profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetrics {
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub following_count: u64,
    #[serde(default)]
    pub tweet_count: u64,
}

/// Paged envelope for X API v2 list endpoints
///
/// The platform omits `data` entirely when a page is empty, so it
/// deserializes to an empty list rather than failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

/// Pagination cursors on list responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newest_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oldest_id: Option<String>,
}
