//! OAuth 2.0 authorization for X accounts
//!
//! Client-side Authorization Code + PKCE flow:
//! - **Manager**: builds authorize URLs, completes callbacks, refreshes tokens
//! - **Factory**: hands out API clients bound to a fresh access token

pub mod factory;
pub mod manager;

pub use factory::ClientFactory;
pub use manager::OAuthManager;

#[cfg(test)]
mod manager_test;
