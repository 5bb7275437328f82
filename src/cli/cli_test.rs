use super::*;
use crate::core::OperationRegistry;
use crate::utils::TestEnvironment;

async fn test_registry() -> OperationRegistry {
    let env = TestEnvironment::new().await;
    OperationRegistry::new(env.deps)
}

#[tokio::test]
async fn cli_builds_group_subcommands_from_metadata() {
    let registry = test_registry().await;
    let app = build_cli(&registry);

    let groups: Vec<&str> = app.get_subcommands().map(|c| c.get_name()).collect();
    for expected in ["accounts", "auth", "tweets", "users", "timeline", "serve", "mcp"] {
        assert!(groups.contains(&expected), "missing subcommand {expected}");
    }
}

#[tokio::test]
async fn positional_and_flag_args_become_operation_input() {
    let registry = test_registry().await;
    let app = build_cli(&registry);

    let matches = app
        .try_get_matches_from([
            "xbridge", "tweets", "post", "alice", "hello world", "--tags", "rust,async",
        ])
        .unwrap();

    let (op_name, input) = dispatch_to_operation(&matches, &registry)
        .unwrap()
        .expect("tweets post should dispatch");

    assert_eq!(op_name, "post_tweet");
    assert_eq!(input["username"], "alice");
    assert_eq!(input["text"], "hello world");
    assert_eq!(input["tags"], serde_json::json!(["rust", "async"]));
}

#[tokio::test]
async fn array_flags_accept_json_form() {
    let registry = test_registry().await;
    let app = build_cli(&registry);

    let matches = app
        .try_get_matches_from([
            "xbridge",
            "tweets",
            "poll",
            "alice",
            "Which one?",
            "--options",
            r#"["yes","no"]"#,
            "--duration-minutes",
            "60",
        ])
        .unwrap();

    let (op_name, input) = dispatch_to_operation(&matches, &registry)
        .unwrap()
        .expect("tweets poll should dispatch");

    assert_eq!(op_name, "create_poll");
    assert_eq!(input["options"], serde_json::json!(["yes", "no"]));
    assert_eq!(input["duration_minutes"], 60);
}

#[tokio::test]
async fn absent_optional_flags_stay_absent() {
    let registry = test_registry().await;
    let app = build_cli(&registry);

    let matches = app
        .try_get_matches_from(["xbridge", "timeline", "get", "alice"])
        .unwrap();

    let (op_name, input) = dispatch_to_operation(&matches, &registry)
        .unwrap()
        .expect("timeline get should dispatch");

    assert_eq!(op_name, "get_timeline");
    assert_eq!(input["username"], "alice");
    assert!(input.get("count").is_none());
}

#[tokio::test]
async fn numeric_flags_are_parsed_as_numbers() {
    let registry = test_registry().await;
    let app = build_cli(&registry);

    let matches = app
        .try_get_matches_from(["xbridge", "timeline", "get", "alice", "--count", "50"])
        .unwrap();

    let (_, input) = dispatch_to_operation(&matches, &registry)
        .unwrap()
        .expect("timeline get should dispatch");

    assert_eq!(input["count"], 50);
}

#[tokio::test]
async fn required_positionals_are_enforced() {
    let registry = test_registry().await;
    let app = build_cli(&registry);

    let result = app.try_get_matches_from(["xbridge", "tweets", "post", "alice"]);
    assert!(result.is_err(), "missing <TEXT> should be a parse error");
}

#[tokio::test]
async fn kebab_case_flags_map_to_snake_case_fields() {
    let registry = test_registry().await;
    let app = build_cli(&registry);

    let matches = app
        .try_get_matches_from([
            "xbridge",
            "tweets",
            "post",
            "alice",
            "hi",
            "--reply-to",
            "123",
        ])
        .unwrap();

    let (_, input) = dispatch_to_operation(&matches, &registry)
        .unwrap()
        .expect("tweets post should dispatch");

    assert_eq!(input["reply_to"], "123");
}
