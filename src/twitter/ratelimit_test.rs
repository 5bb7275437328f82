use super::*;
use crate::XBridgeError;
use crate::constants::{ACTION_LIKE, ACTION_TWEET};

#[test]
fn test_unknown_action_always_allowed() {
    let limiter = RateLimiter::with_rules(&[(ACTION_TWEET, 1, 3600)]);
    for _ in 0..10 {
        limiter.check("alice", "unmetered_action").unwrap();
    }
}

#[test]
fn test_budget_counts_per_username() {
    let limiter = RateLimiter::with_rules(&[(ACTION_TWEET, 2, 3600)]);

    limiter.check("alice", ACTION_TWEET).unwrap();
    limiter.check("alice", ACTION_TWEET).unwrap();
    assert!(limiter.check("alice", ACTION_TWEET).is_err());

    // A different account has its own window
    limiter.check("bob", ACTION_TWEET).unwrap();
}

#[test]
fn test_budget_counts_per_action() {
    let limiter = RateLimiter::with_rules(&[(ACTION_TWEET, 1, 3600), (ACTION_LIKE, 1, 3600)]);

    limiter.check("alice", ACTION_TWEET).unwrap();
    limiter.check("alice", ACTION_LIKE).unwrap();
    assert!(limiter.check("alice", ACTION_TWEET).is_err());
}

#[test]
fn test_rejection_names_action_and_wait() {
    let limiter = RateLimiter::with_rules(&[(ACTION_TWEET, 1, 3600)]);
    limiter.check("alice", ACTION_TWEET).unwrap();

    let err = limiter.check("alice", ACTION_TWEET).unwrap_err();
    match err {
        XBridgeError::RateLimited {
            action,
            retry_after_secs,
        } => {
            assert_eq!(action, ACTION_TWEET);
            assert!(retry_after_secs > 3590 && retry_after_secs <= 3600);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_zero_length_window_resets_every_check() {
    let limiter = RateLimiter::with_rules(&[(ACTION_TWEET, 1, 0)]);

    limiter.check("alice", ACTION_TWEET).unwrap();
    limiter.check("alice", ACTION_TWEET).unwrap();
    limiter.check("alice", ACTION_TWEET).unwrap();
}

#[test]
fn test_stock_tweet_budget_trips_at_limit() {
    let limiter = RateLimiter::new();

    for _ in 0..300 {
        limiter.check("alice", ACTION_TWEET).unwrap();
    }
    assert!(limiter.check("alice", ACTION_TWEET).is_err());

    // Likes draw from a separate budget
    limiter.check("alice", ACTION_LIKE).unwrap();
}
