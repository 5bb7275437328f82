//! Typed client for the X API v2
//!
//! Each instance is bound to one bearer token. Handles are built per call
//! by the client factory and never cached, so a token refresh always takes
//! effect on the next operation.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::Result;
use crate::constants::TWEET_MAX_CHARS;
use crate::error::XBridgeError;
use crate::model::{Data, Page, Tweet, UserProfile};

/// Tweet expansions requested on every tweet read
const TWEET_FIELDS: &str = "created_at,public_metrics,author_id";

/// User expansions requested on every profile read
const USER_FIELDS: &str = "description,location,verified,created_at,public_metrics";

/// X API v2 client bound to a single bearer token
#[derive(Debug)]
pub struct XClient {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl XClient {
    /// Create a client for one access token against the given API base URL
    pub fn new(access_token: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token,
            base_url,
        }
    }

    // ========================================================================
    // USERS
    // ========================================================================

    /// Profile of the authenticated user
    pub async fn me(&self) -> Result<UserProfile> {
        let envelope: Data<UserProfile> = self
            .get("/users/me", &[("user.fields", USER_FIELDS.to_string())])
            .await?;
        Ok(envelope.data)
    }

    /// Look up a user by handle
    pub async fn get_user_by_username(&self, handle: &str) -> Result<UserProfile> {
        let envelope: Data<UserProfile> = self
            .get(
                &format!("/users/by/username/{}", handle),
                &[("user.fields", USER_FIELDS.to_string())],
            )
            .await?;
        Ok(envelope.data)
    }

    /// Look up a user by platform id
    pub async fn get_user_by_id(&self, user_id: &str) -> Result<UserProfile> {
        let envelope: Data<UserProfile> = self
            .get(
                &format!("/users/{}", user_id),
                &[("user.fields", USER_FIELDS.to_string())],
            )
            .await?;
        Ok(envelope.data)
    }

    /// Followers of a user, newest first
    pub async fn followers(&self, user_id: &str, max_results: u32) -> Result<Page<UserProfile>> {
        self.get(
            &format!("/users/{}/followers", user_id),
            &[
                ("max_results", max_results.to_string()),
                ("user.fields", USER_FIELDS.to_string()),
            ],
        )
        .await
    }

    /// Accounts a user follows
    pub async fn following(&self, user_id: &str, max_results: u32) -> Result<Page<UserProfile>> {
        self.get(
            &format!("/users/{}/following", user_id),
            &[
                ("max_results", max_results.to_string()),
                ("user.fields", USER_FIELDS.to_string()),
            ],
        )
        .await
    }

    // ========================================================================
    // TWEETS
    // ========================================================================

    /// Post a tweet, optionally as a reply
    pub async fn post_tweet(&self, text: &str, reply_to: Option<&str>) -> Result<Tweet> {
        validate_tweet_text(text)?;

        let mut body = serde_json::json!({ "text": text });
        if let Some(reply_id) = reply_to {
            body["reply"] = serde_json::json!({ "in_reply_to_tweet_id": reply_id });
        }

        tracing::info!("Posting tweet ({} chars)", text.chars().count());
        let envelope: Data<Tweet> = self.post("/tweets", &body).await?;
        Ok(envelope.data)
    }

    /// Post a tweet carrying a poll with 2 to 4 options
    pub async fn post_poll(
        &self,
        text: &str,
        options: &[String],
        duration_minutes: u32,
    ) -> Result<Tweet> {
        validate_tweet_text(text)?;
        if !(2..=4).contains(&options.len()) {
            return Err(XBridgeError::validation(format!(
                "Polls need between 2 and 4 options (got {})",
                options.len()
            )));
        }

        let body = serde_json::json!({
            "text": text,
            "poll": {
                "options": options,
                "duration_minutes": duration_minutes,
            }
        });
        let envelope: Data<Tweet> = self.post("/tweets", &body).await?;
        Ok(envelope.data)
    }

    /// Delete a tweet owned by the authenticated user
    pub async fn delete_tweet(&self, tweet_id: &str) -> Result<bool> {
        let envelope: Data<Deleted> = self.delete(&format!("/tweets/{}", tweet_id)).await?;
        Ok(envelope.data.deleted)
    }

    /// Fetch a single tweet with its engagement counters
    pub async fn get_tweet(&self, tweet_id: &str) -> Result<Tweet> {
        let envelope: Data<Tweet> = self
            .get(
                &format!("/tweets/{}", tweet_id),
                &[("tweet.fields", TWEET_FIELDS.to_string())],
            )
            .await?;
        Ok(envelope.data)
    }

    /// Tweets authored by a user, newest first
    pub async fn user_tweets(&self, user_id: &str, max_results: u32) -> Result<Page<Tweet>> {
        self.get(
            &format!("/users/{}/tweets", user_id),
            &[
                ("max_results", max_results.to_string()),
                ("tweet.fields", TWEET_FIELDS.to_string()),
            ],
        )
        .await
    }

    /// Tweets mentioning a user
    pub async fn mentions(&self, user_id: &str, max_results: u32) -> Result<Page<Tweet>> {
        self.get(
            &format!("/users/{}/mentions", user_id),
            &[
                ("max_results", max_results.to_string()),
                ("tweet.fields", TWEET_FIELDS.to_string()),
            ],
        )
        .await
    }

    /// Search tweets from the last seven days
    pub async fn search_recent(
        &self,
        query: &str,
        max_results: u32,
        sort_order: Option<&str>,
    ) -> Result<Page<Tweet>> {
        let mut params = vec![
            ("query", query.to_string()),
            ("max_results", max_results.to_string()),
            ("tweet.fields", TWEET_FIELDS.to_string()),
        ];
        if let Some(order) = sort_order {
            params.push(("sort_order", order.to_string()));
        }
        self.get("/tweets/search/recent", &params).await
    }

    // ========================================================================
    // ENGAGEMENT
    // ========================================================================

    /// Like a tweet on behalf of `user_id`
    pub async fn like(&self, user_id: &str, tweet_id: &str) -> Result<bool> {
        let body = serde_json::json!({ "tweet_id": tweet_id });
        let envelope: Data<Liked> = self
            .post(&format!("/users/{}/likes", user_id), &body)
            .await?;
        Ok(envelope.data.liked)
    }

    /// Remove a like; true means the tweet is no longer liked
    pub async fn unlike(&self, user_id: &str, tweet_id: &str) -> Result<bool> {
        let envelope: Data<Liked> = self
            .delete(&format!("/users/{}/likes/{}", user_id, tweet_id))
            .await?;
        Ok(!envelope.data.liked)
    }

    /// Retweet on behalf of `user_id`
    pub async fn retweet(&self, user_id: &str, tweet_id: &str) -> Result<bool> {
        let body = serde_json::json!({ "tweet_id": tweet_id });
        let envelope: Data<Retweeted> = self
            .post(&format!("/users/{}/retweets", user_id), &body)
            .await?;
        Ok(envelope.data.retweeted)
    }

    /// Undo a retweet; true means the retweet is gone
    pub async fn unretweet(&self, user_id: &str, tweet_id: &str) -> Result<bool> {
        let envelope: Data<Retweeted> = self
            .delete(&format!("/users/{}/retweets/{}", user_id, tweet_id))
            .await?;
        Ok(!envelope.data.retweeted)
    }

    /// Bookmark a tweet
    pub async fn bookmark(&self, user_id: &str, tweet_id: &str) -> Result<bool> {
        let body = serde_json::json!({ "tweet_id": tweet_id });
        let envelope: Data<Bookmarked> = self
            .post(&format!("/users/{}/bookmarks", user_id), &body)
            .await?;
        Ok(envelope.data.bookmarked)
    }

    /// Remove a bookmark; true means the bookmark is gone
    pub async fn remove_bookmark(&self, user_id: &str, tweet_id: &str) -> Result<bool> {
        let envelope: Data<Bookmarked> = self
            .delete(&format!("/users/{}/bookmarks/{}", user_id, tweet_id))
            .await?;
        Ok(!envelope.data.bookmarked)
    }

    // ========================================================================
    // REQUEST PLUMBING
    // ========================================================================

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &serde_json::Value) -> Result<T> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .delete(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(XBridgeError::platform(status.as_u16(), body));
        }
        Ok(response.json().await?)
    }
}

fn validate_tweet_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(XBridgeError::validation("Tweet text is empty"));
    }
    let chars = text.chars().count();
    if chars > TWEET_MAX_CHARS {
        return Err(XBridgeError::validation(format!(
            "Tweet exceeds {} characters (got {})",
            TWEET_MAX_CHARS, chars
        )));
    }
    Ok(())
}

// Per-action confirmation envelopes returned by the platform.

#[derive(Debug, Deserialize)]
struct Deleted {
    #[serde(default)]
    deleted: bool,
}

#[derive(Debug, Deserialize)]
struct Liked {
    #[serde(default)]
    liked: bool,
}

#[derive(Debug, Deserialize)]
struct Retweeted {
    #[serde(default)]
    retweeted: bool,
}

#[derive(Debug, Deserialize)]
struct Bookmarked {
    #[serde(default)]
    bookmarked: bool,
}
