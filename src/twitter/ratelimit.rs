//! Fixed-window rate limiting for platform writes
//!
//! Counters live in process memory, keyed by `(username, action)`. Windows
//! reset in place when the first request after expiry arrives. There is no
//! cross-process coordination; each bridge instance enforces its own budget.

use std::collections::HashMap;

use chrono::Utc;
use dashmap::DashMap;

use crate::Result;
use crate::constants::{
    ACTION_DM, ACTION_FOLLOW, ACTION_LIKE, ACTION_TWEET, DM_ACTIONS_LIMIT, DM_ACTIONS_WINDOW_SECS,
    FOLLOW_ACTIONS_LIMIT, FOLLOW_ACTIONS_WINDOW_SECS, LIKE_ACTIONS_LIMIT,
    LIKE_ACTIONS_WINDOW_SECS, TWEET_ACTIONS_LIMIT, TWEET_ACTIONS_WINDOW_SECS,
};
use crate::error::XBridgeError;

#[derive(Debug, Clone, Copy)]
struct Rule {
    limit: u32,
    window_secs: u64,
}

#[derive(Debug)]
struct Window {
    count: u32,
    started_at: i64,
}

/// In-process fixed-window counters per `(username, action)`
pub struct RateLimiter {
    rules: HashMap<String, Rule>,
    windows: DashMap<(String, String), Window>,
}

impl RateLimiter {
    /// Limiter with the stock per-action budgets
    pub fn new() -> Self {
        Self::with_rules(&[
            (ACTION_TWEET, TWEET_ACTIONS_LIMIT, TWEET_ACTIONS_WINDOW_SECS),
            (ACTION_LIKE, LIKE_ACTIONS_LIMIT, LIKE_ACTIONS_WINDOW_SECS),
            (
                ACTION_FOLLOW,
                FOLLOW_ACTIONS_LIMIT,
                FOLLOW_ACTIONS_WINDOW_SECS,
            ),
            (ACTION_DM, DM_ACTIONS_LIMIT, DM_ACTIONS_WINDOW_SECS),
        ])
    }

    /// Limiter with custom `(action, limit, window_secs)` budgets
    pub fn with_rules(rules: &[(&str, u32, u64)]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|(action, limit, window_secs)| {
                    (
                        action.to_string(),
                        Rule {
                            limit: *limit,
                            window_secs: *window_secs,
                        },
                    )
                })
                .collect(),
            windows: DashMap::new(),
        }
    }

    /// Count one `action` for `username`, rejecting it when the window
    /// budget is spent
    ///
    /// Actions without a configured rule always pass.
    pub fn check(&self, username: &str, action: &str) -> Result<()> {
        let Some(rule) = self.rules.get(action).copied() else {
            return Ok(());
        };

        let now = Utc::now().timestamp();
        let mut window = self
            .windows
            .entry((username.to_string(), action.to_string()))
            .or_insert(Window {
                count: 0,
                started_at: now,
            });

        if now >= window.started_at + rule.window_secs as i64 {
            window.count = 0;
            window.started_at = now;
        }

        if window.count >= rule.limit {
            let retry_after_secs =
                (window.started_at + rule.window_secs as i64 - now).max(0) as u64;
            tracing::warn!(
                "Rate limit hit for {} on {}: retry in {}s",
                username,
                action,
                retry_after_secs
            );
            return Err(XBridgeError::RateLimited {
                action: action.to_string(),
                retry_after_secs,
            });
        }

        window.count += 1;
        Ok(())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
