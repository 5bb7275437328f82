//! Tweet operations module
//!
//! Posting, deleting, and engaging with tweets on behalf of a stored
//! account. Mutating operations draw from the per-account rate budgets
//! before touching the platform.

use super::*;
use crate::constants::{ACTION_LIKE, ACTION_TWEET};
use crate::model::{Tweet, normalize_username};
use schemars::JsonSchema;
use xbridge_macros::{operation, operation_group};

#[operation_group(tweets)]
pub mod tweets {
    use super::*;

    #[derive(Deserialize, JsonSchema)]
    #[schemars(description = "Input for posting a tweet")]
    pub struct PostTweetInput {
        #[schemars(description = "Username of the posting account")]
        pub username: String,
        #[schemars(description = "Tweet text, at most 280 characters after tags are appended")]
        pub text: String,
        #[schemars(description = "Tweet id to reply to")]
        pub reply_to: Option<String>,
        #[schemars(description = "Hashtags appended to the text, with or without the leading #")]
        pub tags: Option<Vec<String>>,
    }

    #[derive(Deserialize, JsonSchema)]
    #[schemars(description = "Input naming an account and a tweet")]
    pub struct TweetRefInput {
        #[schemars(description = "Username of the acting account")]
        pub username: String,
        #[schemars(description = "Id of the target tweet")]
        pub tweet_id: String,
    }

    #[derive(Deserialize, JsonSchema)]
    #[schemars(description = "Input for posting a tweet carrying a poll")]
    pub struct CreatePollInput {
        #[schemars(description = "Username of the posting account")]
        pub username: String,
        #[schemars(description = "Tweet text accompanying the poll")]
        pub text: String,
        #[schemars(description = "Poll options, between 2 and 4")]
        pub options: Vec<String>,
        #[schemars(description = "How long the poll runs, in minutes")]
        pub duration_minutes: u32,
    }

    /// Post a tweet, optionally as a reply and with appended hashtags
    #[operation(
        name = "post_tweet",
        input = PostTweetInput,
        http = "POST /tweets",
        cli = "tweets post <USERNAME> <TEXT> [--reply-to <ID>] [--tags <TAGS>]",
        description = "Post a tweet, optionally as a reply and with appended hashtags"
    )]
    pub struct Post {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Post {
        type Input = PostTweetInput;
        type Output = Tweet;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            self.deps.rate_limiter.check(&username, ACTION_TWEET)?;

            let text = match &input.tags {
                Some(tags) => append_tags(&input.text, tags),
                None => input.text.clone(),
            };

            let client = self.deps.clients.get_client(&username).await?;
            client.post_tweet(&text, input.reply_to.as_deref()).await
        }
    }

    /// Delete a tweet owned by the account
    #[operation(
        name = "delete_tweet",
        input = TweetRefInput,
        http = "DELETE /tweets",
        cli = "tweets delete <USERNAME> <TWEET_ID>",
        description = "Delete a tweet owned by the account"
    )]
    pub struct Delete {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Delete {
        type Input = TweetRefInput;
        type Output = Value;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            self.deps.rate_limiter.check(&username, ACTION_TWEET)?;

            let client = self.deps.clients.get_client(&username).await?;
            let deleted = client.delete_tweet(&input.tweet_id).await?;
            Ok(serde_json::json!({ "tweet_id": input.tweet_id, "deleted": deleted }))
        }
    }

    /// Fetch a single tweet with its engagement counters
    #[operation(
        name = "get_tweet",
        input = TweetRefInput,
        http = "GET /tweets",
        cli = "tweets get <USERNAME> <TWEET_ID>",
        description = "Fetch a single tweet with its engagement counters"
    )]
    pub struct Get {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Get {
        type Input = TweetRefInput;
        type Output = Tweet;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            let client = self.deps.clients.get_client(&username).await?;
            client.get_tweet(&input.tweet_id).await
        }
    }

    /// Like a tweet
    #[operation(
        name = "like_tweet",
        input = TweetRefInput,
        http = "POST /tweets/like",
        cli = "tweets like <USERNAME> <TWEET_ID>",
        description = "Like a tweet"
    )]
    pub struct Like {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Like {
        type Input = TweetRefInput;
        type Output = Value;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            self.deps.rate_limiter.check(&username, ACTION_LIKE)?;

            let client = self.deps.clients.get_client(&username).await?;
            let user_id = platform_user_id(&self.deps, &username, &client).await?;
            let liked = client.like(&user_id, &input.tweet_id).await?;
            Ok(serde_json::json!({ "tweet_id": input.tweet_id, "liked": liked }))
        }
    }

    /// Remove a like from a tweet
    #[operation(
        name = "unlike_tweet",
        input = TweetRefInput,
        http = "POST /tweets/unlike",
        cli = "tweets unlike <USERNAME> <TWEET_ID>",
        description = "Remove a like from a tweet"
    )]
    pub struct Unlike {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Unlike {
        type Input = TweetRefInput;
        type Output = Value;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            self.deps.rate_limiter.check(&username, ACTION_LIKE)?;

            let client = self.deps.clients.get_client(&username).await?;
            let user_id = platform_user_id(&self.deps, &username, &client).await?;
            let unliked = client.unlike(&user_id, &input.tweet_id).await?;
            Ok(serde_json::json!({ "tweet_id": input.tweet_id, "unliked": unliked }))
        }
    }

    /// Retweet a tweet
    #[operation(
        name = "retweet",
        input = TweetRefInput,
        http = "POST /tweets/retweet",
        cli = "tweets retweet <USERNAME> <TWEET_ID>",
        description = "Retweet a tweet"
    )]
    pub struct Retweet {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Retweet {
        type Input = TweetRefInput;
        type Output = Value;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            self.deps.rate_limiter.check(&username, ACTION_TWEET)?;

            let client = self.deps.clients.get_client(&username).await?;
            let user_id = platform_user_id(&self.deps, &username, &client).await?;
            let retweeted = client.retweet(&user_id, &input.tweet_id).await?;
            Ok(serde_json::json!({ "tweet_id": input.tweet_id, "retweeted": retweeted }))
        }
    }

    /// Undo a retweet
    #[operation(
        name = "unretweet",
        input = TweetRefInput,
        http = "POST /tweets/unretweet",
        cli = "tweets unretweet <USERNAME> <TWEET_ID>",
        description = "Undo a retweet"
    )]
    pub struct Unretweet {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Unretweet {
        type Input = TweetRefInput;
        type Output = Value;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            self.deps.rate_limiter.check(&username, ACTION_TWEET)?;

            let client = self.deps.clients.get_client(&username).await?;
            let user_id = platform_user_id(&self.deps, &username, &client).await?;
            let unretweeted = client.unretweet(&user_id, &input.tweet_id).await?;
            Ok(serde_json::json!({ "tweet_id": input.tweet_id, "unretweeted": unretweeted }))
        }
    }

    /// Bookmark a tweet
    #[operation(
        name = "bookmark_tweet",
        input = TweetRefInput,
        http = "POST /tweets/bookmark",
        cli = "tweets bookmark <USERNAME> <TWEET_ID>",
        description = "Bookmark a tweet"
    )]
    pub struct Bookmark {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Bookmark {
        type Input = TweetRefInput;
        type Output = Value;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            let client = self.deps.clients.get_client(&username).await?;
            let user_id = platform_user_id(&self.deps, &username, &client).await?;
            let bookmarked = client.bookmark(&user_id, &input.tweet_id).await?;
            Ok(serde_json::json!({ "tweet_id": input.tweet_id, "bookmarked": bookmarked }))
        }
    }

    /// Remove a bookmark
    #[operation(
        name = "remove_bookmark",
        input = TweetRefInput,
        http = "DELETE /tweets/bookmark",
        cli = "tweets unbookmark <USERNAME> <TWEET_ID>",
        description = "Remove a bookmark"
    )]
    pub struct RemoveBookmark {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for RemoveBookmark {
        type Input = TweetRefInput;
        type Output = Value;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            let client = self.deps.clients.get_client(&username).await?;
            let user_id = platform_user_id(&self.deps, &username, &client).await?;
            let removed = client.remove_bookmark(&user_id, &input.tweet_id).await?;
            Ok(serde_json::json!({ "tweet_id": input.tweet_id, "removed": removed }))
        }
    }

    /// Post a tweet carrying a poll
    #[operation(
        name = "create_poll",
        input = CreatePollInput,
        http = "POST /tweets/poll",
        cli = "tweets poll <USERNAME> <TEXT> --options <OPTIONS> --duration-minutes <MINUTES>",
        description = "Post a tweet carrying a poll"
    )]
    pub struct CreatePoll {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for CreatePoll {
        type Input = CreatePollInput;
        type Output = Tweet;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            self.deps.rate_limiter.check(&username, ACTION_TWEET)?;

            let client = self.deps.clients.get_client(&username).await?;
            client
                .post_poll(&input.text, &input.options, input.duration_minutes)
                .await
        }
    }
}

/// Append hashtags to tweet text, tolerating tags given with a leading `#`
fn append_tags(text: &str, tags: &[String]) -> String {
    let mut out = text.to_string();
    for tag in tags {
        let tag = tag.trim().trim_start_matches('#');
        if tag.is_empty() {
            continue;
        }
        out.push_str(" #");
        out.push_str(tag);
    }
    out
}
