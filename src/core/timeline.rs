//! Timeline operations module
//!
//! The home timeline is approximated with v2 primitives only: sample the
//! accounts the user follows, then run a `from:` OR-query through recent
//! search sorted by recency.

use super::*;
use crate::constants::{
    MAX_PAGE_SIZE, MIN_SEARCH_PAGE_SIZE, TIMELINE_AUTHOR_CAP, TIMELINE_FOLLOWING_SAMPLE,
};
use crate::model::{Tweet, normalize_username};
use itertools::Itertools;
use schemars::JsonSchema;
use xbridge_macros::{operation, operation_group};

#[operation_group(timeline)]
pub mod timeline {
    use super::*;

    #[derive(Deserialize, JsonSchema)]
    #[schemars(description = "Input for reading the home timeline")]
    pub struct TimelineInput {
        #[schemars(description = "Username of the stored account")]
        pub username: String,
        #[schemars(description = "Number of tweets, 10 to 100")]
        pub count: Option<u32>,
    }

    #[derive(Deserialize, JsonSchema)]
    #[schemars(description = "Input for searching recent tweets")]
    pub struct SearchInput {
        #[schemars(description = "Username of the stored account")]
        pub username: String,
        #[schemars(description = "Search query; supports operators like #hashtag and from:user")]
        pub query: String,
        #[schemars(description = "Number of tweets, 10 to 100")]
        pub count: Option<u32>,
        #[schemars(description = "Sorting preference: Top for relevancy, Latest for recency")]
        pub product: Option<String>,
    }

    /// Home timeline approximated from the accounts the user follows
    #[operation(
        name = "get_timeline",
        input = TimelineInput,
        http = "GET /timeline",
        cli = "timeline get <USERNAME> [--count <N>]",
        description = "Home timeline approximated from the accounts the user follows"
    )]
    pub struct Timeline {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Timeline {
        type Input = TimelineInput;
        type Output = Vec<Tweet>;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            let client = self.deps.clients.get_client(&username).await?;

            let me_id = platform_user_id(&self.deps, &username, &client).await?;
            let following = client.following(&me_id, TIMELINE_FOLLOWING_SAMPLE).await?;
            if following.data.is_empty() {
                return Ok(Vec::new());
            }

            // A `from:` clause per author; capped to keep the query short
            let query = following
                .data
                .iter()
                .take(TIMELINE_AUTHOR_CAP)
                .map(|user| format!("from:{}", user.id))
                .join(" OR ");

            let page = client
                .search_recent(&query, effective_count(input.count), Some("recency"))
                .await?;
            Ok(page.data)
        }
    }

    /// Search recent tweets with Top or Latest ordering
    #[operation(
        name = "search_tweets",
        input = SearchInput,
        http = "GET /timeline/search",
        cli = "timeline search <USERNAME> <QUERY> [--count <N>] [--product <PRODUCT>]",
        description = "Search recent tweets with Top or Latest ordering"
    )]
    pub struct Search {
        pub deps: Arc<Dependencies>,
    }

    #[async_trait]
    impl Operation for Search {
        type Input = SearchInput;
        type Output = Vec<Tweet>;

        async fn execute(&self, input: Self::Input) -> Result<Self::Output> {
            let username = normalize_username(&input.username);
            let client = self.deps.clients.get_client(&username).await?;

            let sort_order = match input.product.as_deref() {
                Some("Top") | None => "relevancy",
                _ => "recency",
            };

            let page = client
                .search_recent(&input.query, effective_count(input.count), Some(sort_order))
                .await?;
            Ok(page.data)
        }
    }
}

/// Clamp a requested count into the window the search API accepts
fn effective_count(count: Option<u32>) -> u32 {
    match count {
        None => MAX_PAGE_SIZE,
        Some(n) => n.clamp(MIN_SEARCH_PAGE_SIZE, MAX_PAGE_SIZE),
    }
}

#[cfg(test)]
mod tests {
    use super::effective_count;

    #[test]
    fn test_effective_count_defaults_to_max() {
        assert_eq!(effective_count(None), 100);
    }

    #[test]
    fn test_effective_count_clamps_both_ends() {
        assert_eq!(effective_count(Some(3)), 10);
        assert_eq!(effective_count(Some(50)), 50);
        assert_eq!(effective_count(Some(500)), 100);
    }
}
