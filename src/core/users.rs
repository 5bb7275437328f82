//! User operations module
//!
//! Profile lookups and social-graph reads on behalf of a stored account.

use super::*;
use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::model::{Page, Tweet, UserProfile, normalize_username};
use schemars::JsonSchema;
use xbridge_macros::{operation, operation_group};

#[operation_group(users)]
pub mod users {
    use super::*;

    #[derive(Deserialize, JsonSchema)]
    #[schemars(description = "Input naming the acting account")]
    pub struct ProfileInput {
        #[schemars(description = "Username of the stored account")]
        pub username: String,
    }

    #[derive(Deserialize, JsonSchema)]
    #[schemars(description = "Input for looking up a user by handle")]
    pub struct UserByUsernameInput {
        #[schemars(description = "Username of the acting account")]
        pub username: String,
        #[schemars(description = "Handle to look up, with or without the leading @")]
        pub target_username: String,
    }

    #[derive(Deserialize, JsonSchema)]
    #[schemars(description = "Input for looking up a user by platform id")]
    pub struct UserByIdInput {
        #[schemars(description = "Username of the acting account")]
        pub username: String,
        #[schemars(description = "Platform id to look up")]
        pub user_id: String,
    }

    #[derive(Deserialize, JsonSchema)]
    #[schemars(description = "Input for social-graph and tweet listings")]
    pub struct UserListInput {
        #[schemars(description = "Username of the acting account")]
        pub username: String,
        #[schemars(description = "Platform id to list for; defaults to the acting account")]
        pub user_id: Option<String>,
        #[schemars(description = "Page size, 1 to 100")]
        pub max_results: Option<u32>,
    }

    #[derive(Deserialize, JsonSchema)]
    #[schemars(description = "Input for listing mentions of the acting account")]
    pub struct MentionsInput {
        #[schemars(description = "Username of the stored account")]
        pub username: String,
        #[schemars(description = "Page size, 1 to 100")]
        pub max_results: Option<u32>,
    }

    /// Profile of the authenticated account
    #[operation(
        name = "get_user_profile",
        input = ProfileInput,
        http = "GET /users/profile",
        cli = "users profile <USERNAME>",
        description = "Profile of the authenticated account"
    )]
    pub struct Profile {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Profile {
        type Input = ProfileInput;
        type Output = UserProfile;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            let client = self.deps.clients.get_client(&username).await?;
            client.me().await
        }
    }

    /// Look up any user by handle
    #[operation(
        name = "get_user_by_username",
        input = UserByUsernameInput,
        http = "GET /users/by-username",
        cli = "users by-username <USERNAME> <TARGET_USERNAME>",
        description = "Look up any user by handle"
    )]
    pub struct ByUsername {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for ByUsername {
        type Input = UserByUsernameInput;
        type Output = UserProfile;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            let target = normalize_username(&input.target_username);
            let client = self.deps.clients.get_client(&username).await?;
            client.get_user_by_username(&target).await
        }
    }

    /// Look up any user by platform id
    #[operation(
        name = "get_user_by_id",
        input = UserByIdInput,
        http = "GET /users/by-id",
        cli = "users by-id <USERNAME> <USER_ID>",
        description = "Look up any user by platform id"
    )]
    pub struct ById {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for ById {
        type Input = UserByIdInput;
        type Output = UserProfile;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            let client = self.deps.clients.get_client(&username).await?;
            client.get_user_by_id(&input.user_id).await
        }
    }

    /// Followers of a user, defaulting to the acting account
    #[operation(
        name = "get_followers",
        input = UserListInput,
        http = "GET /users/followers",
        cli = "users followers <USERNAME> [--user-id <ID>] [--max-results <N>]",
        description = "Followers of a user, defaulting to the acting account"
    )]
    pub struct Followers {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Followers {
        type Input = UserListInput;
        type Output = Page<UserProfile>;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            let client = self.deps.clients.get_client(&username).await?;
            let target = match input.user_id {
                Some(id) => id,
                None => platform_user_id(&self.deps, &username, &client).await?,
            };
            client.followers(&target, page_size(input.max_results)).await
        }
    }

    /// Accounts a user follows, defaulting to the acting account
    #[operation(
        name = "get_following",
        input = UserListInput,
        http = "GET /users/following",
        cli = "users following <USERNAME> [--user-id <ID>] [--max-results <N>]",
        description = "Accounts a user follows, defaulting to the acting account"
    )]
    pub struct Following {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Following {
        type Input = UserListInput;
        type Output = Page<UserProfile>;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            let client = self.deps.clients.get_client(&username).await?;
            let target = match input.user_id {
                Some(id) => id,
                None => platform_user_id(&self.deps, &username, &client).await?,
            };
            client.following(&target, page_size(input.max_results)).await
        }
    }

    /// Recent tweets by a user, defaulting to the acting account
    #[operation(
        name = "get_user_tweets",
        input = UserListInput,
        http = "GET /users/tweets",
        cli = "users tweets <USERNAME> [--user-id <ID>] [--max-results <N>]",
        description = "Recent tweets by a user, defaulting to the acting account"
    )]
    pub struct UserTweets {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for UserTweets {
        type Input = UserListInput;
        type Output = Page<Tweet>;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            let client = self.deps.clients.get_client(&username).await?;
            let target = match input.user_id {
                Some(id) => id,
                None => platform_user_id(&self.deps, &username, &client).await?,
            };
            client.user_tweets(&target, page_size(input.max_results)).await
        }
    }

    /// Recent tweets mentioning the acting account
    #[operation(
        name = "get_mentions",
        input = MentionsInput,
        http = "GET /users/mentions",
        cli = "users mentions <USERNAME> [--max-results <N>]",
        description = "Recent tweets mentioning the acting account"
    )]
    pub struct Mentions {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Mentions {
        type Input = MentionsInput;
        type Output = Page<Tweet>;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            let client = self.deps.clients.get_client(&username).await?;
            let me_id = platform_user_id(&self.deps, &username, &client).await?;
            client.mentions(&me_id, page_size(input.max_results)).await
        }
    }
}

fn page_size(requested: Option<u32>) -> u32 {
    requested.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}
