//! Authorization operations module
//!
//! The OAuth flow exposed as operations: starting a flow, completing it
//! headlessly, and forcing a token refresh.

use super::*;
use crate::model::{AuthorizationOutcome, BeginAuthorization, normalize_username};
use schemars::JsonSchema;
use xbridge_macros::{operation, operation_group};

#[operation_group(auth)]
pub mod auth {
    use super::*;

    #[derive(Deserialize, JsonSchema)]
    #[schemars(description = "Input for starting an authorization flow")]
    pub struct BeginInput {
        #[schemars(description = "Username to bind the flow to; omit to adopt the platform handle")]
        pub username: Option<String>,
    }

    #[derive(Deserialize, JsonSchema)]
    #[schemars(description = "Input for completing an authorization flow")]
    pub struct CompleteInput {
        #[schemars(description = "State parameter returned by the platform redirect")]
        pub state: String,
        #[schemars(description = "Authorization code returned by the platform redirect")]
        pub code: String,
    }

    #[derive(Deserialize, JsonSchema)]
    #[schemars(description = "Input for refreshing a stored token")]
    pub struct RefreshInput {
        #[schemars(description = "Username of the stored account")]
        pub username: String,
    }

    /// Start an OAuth flow and get the URL to open in a browser
    #[operation(
        name = "begin_authorization",
        input = BeginInput,
        http = "POST /auth/begin",
        cli = "auth begin [--username <USERNAME>]",
        description = "Start an OAuth flow and get the URL to open in a browser"
    )]
    pub struct Begin {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Begin {
        type Input = BeginInput;
        type Output = BeginAuthorization;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            self.deps
                .oauth
                .begin_authorization(input.username.as_deref())
                .await
        }
    }

    /// Complete an OAuth flow from a state and code pair
    #[operation(
        name = "complete_authorization",
        input = CompleteInput,
        http = "POST /auth/complete",
        cli = "auth complete <STATE> <CODE>",
        description = "Complete an OAuth flow from a state and code pair"
    )]
    pub struct Complete {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Complete {
        type Input = CompleteInput;
        type Output = AuthorizationOutcome;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            self.deps
                .oauth
                .complete_authorization(&input.state, &input.code)
                .await
        }
    }

    /// Refresh an account's access token now
    #[operation(
        name = "refresh_token",
        input = RefreshInput,
        http = "POST /auth/refresh",
        cli = "auth refresh <USERNAME>",
        description = "Refresh an account's access token now"
    )]
    pub struct Refresh {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Refresh {
        type Input = RefreshInput;
        type Output = Value;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            let credential = self
                .deps
                .storage
                .find_credential(&username)
                .await?
                .ok_or_else(|| account_not_found(&username))?;

            let refreshed = self.deps.oauth.refresh_credential(&credential).await?;
            Ok(serde_json::json!({
                "username": refreshed.username,
                "refreshed": true,
                "expires_at": refreshed.expires_at,
            }))
        }
    }
}
