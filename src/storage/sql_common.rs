//! Common SQL storage helpers for SQLite and PostgreSQL
//!
//! Column encodings the two SQL backends share: scope lists are stored as a
//! single space-separated TEXT column, SQLite timestamps as unix seconds.

use chrono::{DateTime, Utc};

// ============================================================================
// Scope Encodings (used by both backends)
// ============================================================================

/// Encode a scope list into a space-separated TEXT column
#[inline]
pub fn scopes_to_text(scopes: &[String]) -> String {
    scopes.join(" ")
}

/// Decode a space-separated TEXT column into a scope list
#[inline]
pub fn scopes_from_text(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

// ============================================================================
// SQLite-specific Helpers
// ============================================================================

/// Convert DateTime to SQLite INTEGER (unix timestamp)
#[inline]
pub fn datetime_to_unix(dt: DateTime<Utc>) -> i64 {
    dt.timestamp()
}

/// Parse DateTime from SQLite INTEGER (unix timestamp)
#[inline]
pub fn datetime_from_unix(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now)
}
