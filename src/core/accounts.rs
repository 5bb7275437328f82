//! Account operations module
//!
//! Managing the bridge's stored X accounts: listing, manual provisioning,
//! probing, and removal.

use super::*;
use crate::model::{AccountSummary, Credential, UserProfile, normalize_username};
use chrono::{Duration, Utc};
use schemars::JsonSchema;
use xbridge_macros::{operation, operation_group};

#[operation_group(accounts)]
pub mod accounts {
    use super::*;

    #[derive(Deserialize, JsonSchema)]
    #[schemars(description = "Empty input (no parameters required)")]
    pub struct EmptyInput {}

    #[derive(Deserialize, JsonSchema)]
    #[schemars(description = "Input naming one stored account")]
    pub struct AccountRefInput {
        #[schemars(description = "Username of the stored account")]
        pub username: String,
    }

    #[derive(Deserialize, JsonSchema)]
    #[schemars(description = "Input for manually provisioning an account with an existing token")]
    pub struct AddAccountInput {
        #[schemars(description = "Username to store the credential under")]
        pub username: String,
        #[schemars(description = "OAuth 2.0 access token")]
        pub access_token: String,
        #[schemars(description = "OAuth 2.0 refresh token, when one exists")]
        pub refresh_token: Option<String>,
        #[schemars(description = "Seconds until the access token expires; omit for non-expiring")]
        pub expires_in_secs: Option<i64>,
        #[schemars(description = "Scopes granted to the token")]
        pub scopes: Option<Vec<String>>,
        #[schemars(description = "Display name shown in account listings")]
        pub display_name: Option<String>,
    }

    /// List all active accounts without token material
    #[operation(
        name = "list_accounts",
        input = EmptyInput,
        http = "GET /accounts",
        cli = "accounts list",
        description = "List all active accounts without token material"
    )]
    pub struct List {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for List {
        type Input = EmptyInput;
        type Output = Vec<AccountSummary>;

        async fn execute(&self, _input: Self::Input) -> Result<Self::Output> {
            let credentials = self.deps.storage.list_active_credentials().await?;
            Ok(credentials.iter().map(Credential::summary).collect())
        }
    }

    /// Get one stored account by username
    #[operation(
        name = "get_account",
        input = AccountRefInput,
        http = "GET /accounts/{username}",
        cli = "accounts get <USERNAME>",
        description = "Get one stored account by username"
    )]
    pub struct Get {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Get {
        type Input = AccountRefInput;
        type Output = AccountSummary;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            let credential = self
                .deps
                .storage
                .find_credential(&username)
                .await?
                .ok_or_else(|| account_not_found(&username))?;
            Ok(credential.summary())
        }
    }

    /// Store an account from an externally obtained token
    #[operation(
        name = "add_account",
        input = AddAccountInput,
        http = "POST /accounts",
        cli = "accounts add <USERNAME> --access-token <TOKEN> [--refresh-token <TOKEN>] [--expires-in-secs <SECS>]",
        description = "Store an account from an externally obtained token"
    )]
    pub struct Add {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Add {
        type Input = AddAccountInput;
        type Output = AccountSummary;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let now = Utc::now();
            let credential = Credential {
                username: normalize_username(&input.username),
                // Resolved lazily on the first operation that needs it
                platform_user_id: String::new(),
                access_token: input.access_token,
                refresh_token: input.refresh_token,
                expires_at: input
                    .expires_in_secs
                    .map(|secs| now + Duration::seconds(secs)),
                scopes: input.scopes.unwrap_or_default(),
                display_name: input.display_name,
                is_active: true,
                created_at: now,
                last_used_at: now,
            };
            credential.validate()?;

            self.deps.storage.upsert_credential(&credential).await?;
            tracing::info!("Stored account {}", credential.username);
            Ok(credential.summary())
        }
    }

    /// Probe an account's credential against the platform
    #[operation(
        name = "test_account",
        input = AccountRefInput,
        http = "POST /accounts/{username}/test",
        cli = "accounts test <USERNAME>",
        description = "Probe an account's credential against the platform"
    )]
    pub struct Test {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Test {
        type Input = AccountRefInput;
        type Output = UserProfile;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            let client = self.deps.clients.get_client(&username).await?;
            client.me().await
        }
    }

    /// Deactivate an account without deleting its record
    #[operation(
        name = "deactivate_account",
        input = AccountRefInput,
        http = "PATCH /accounts/{username}/deactivate",
        cli = "accounts deactivate <USERNAME>",
        description = "Deactivate an account without deleting its record"
    )]
    pub struct Deactivate {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Deactivate {
        type Input = AccountRefInput;
        type Output = Value;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            if !self.deps.storage.deactivate_credential(&username).await? {
                return Err(account_not_found(&username));
            }
            Ok(serde_json::json!({ "username": username, "deactivated": true }))
        }
    }

    /// Delete an account and its credential permanently
    #[operation(
        name = "remove_account",
        input = AccountRefInput,
        http = "DELETE /accounts/{username}",
        cli = "accounts remove <USERNAME>",
        description = "Delete an account and its credential permanently"
    )]
    pub struct Remove {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Remove {
        type Input = AccountRefInput;
        type Output = Value;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            if !self.deps.storage.delete_credential(&username).await? {
                return Err(account_not_found(&username));
            }
            tracing::info!("Removed account {}", username);
            Ok(serde_json::json!({ "username": username, "removed": true }))
        }
    }
}
