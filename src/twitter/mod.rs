//! X API v2 access
//!
//! - [`XClient`] is a thin typed client bound to a single bearer token,
//!   handed out per call by `auth::ClientFactory`.
//! - [`RateLimiter`] applies in-process fixed-window counters to mutating
//!   actions before they reach the platform.

pub mod client;
pub mod ratelimit;

pub use client::XClient;
pub use ratelimit::RateLimiter;

#[cfg(test)]
mod ratelimit_test;
