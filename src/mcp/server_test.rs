use super::McpServer;
use crate::core::OperationRegistry;
use crate::utils::TestEnvironment;
use std::sync::Arc;

async fn test_server() -> McpServer {
    let env = TestEnvironment::new().await;
    McpServer::new(Arc::new(OperationRegistry::new(env.deps)))
}

#[tokio::test]
async fn tools_list_covers_every_group() {
    let server = test_server().await;
    let tools = server.get_tools_list();

    assert!(!tools.is_empty());
    for expected in [
        "list_accounts",
        "begin_authorization",
        "post_tweet",
        "get_user_profile",
        "get_timeline",
    ] {
        assert!(
            tools.iter().any(|t| t.name == expected),
            "missing tool {expected}"
        );
    }
}

#[tokio::test]
async fn tools_list_is_sorted_by_name() {
    let server = test_server().await;
    let tools = server.get_tools_list();

    assert!(tools.windows(2).all(|pair| pair[0].name <= pair[1].name));
}

#[tokio::test]
async fn tool_schema_names_input_fields() {
    let server = test_server().await;
    let tools = server.get_tools_list();

    let post_tweet = tools
        .iter()
        .find(|t| t.name == "post_tweet")
        .expect("post_tweet tool registered");

    let properties = post_tweet
        .input_schema
        .get("properties")
        .and_then(|v| v.as_object())
        .expect("schema has properties");
    assert!(properties.contains_key("username"));
    assert!(properties.contains_key("text"));
}

#[tokio::test]
async fn tool_descriptions_are_present() {
    let server = test_server().await;
    let tools = server.get_tools_list();

    for tool in &tools {
        let description = tool.description.as_deref().unwrap_or_default();
        assert!(!description.is_empty(), "tool {} lacks description", tool.name);
    }
}

#[tokio::test]
async fn unknown_operation_is_reported_not_a_fault() {
    let env = TestEnvironment::new().await;
    let registry = OperationRegistry::new(env.deps);

    let err = registry
        .execute("vote_in_poll", serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Operation not found"));
}
