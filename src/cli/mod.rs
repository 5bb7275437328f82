//! Command-line interface for xbridge
//!
//! Provides CLI access to all operations via auto-generated commands from
//! metadata. Uses the same DRY approach as HTTP routes and MCP tools.

use crate::Result;
use crate::config::Config;
use crate::core::{OperationMetadata, OperationRegistry};
use clap::{Arg, ArgAction, ArgMatches, Command, ValueEnum};
use serde_json::Value;
use std::collections::HashMap;

/// MCP transport options
#[derive(ValueEnum, Clone, Debug)]
enum McpTransport {
    /// stdio transport for local process communication (Claude Desktop)
    Stdio,
    /// Streamable HTTP transport (MCP 2025-03-26 spec) for remote access
    Http,
}

/// Convert String to 'static str for CLI command building
///
/// Commands are built once at program startup and the process exits right
/// after the dispatched operation, so leaking is the standard clap pattern
/// for metadata-driven command trees.
fn to_static_str(s: String) -> &'static str {
    s.leak()
}

/// Flags use kebab-case on the command line while schema fields stay
/// snake_case in operation inputs
fn arg_id(field_name: &str) -> String {
    field_name.replace('_', "-")
}

/// Create operation registry with dependencies
async fn create_registry() -> Result<OperationRegistry> {
    let config = Config::load_and_inject(crate::constants::CONFIG_FILE_NAME)?;
    let deps = crate::core::create_dependencies(&config).await?;
    Ok(OperationRegistry::new(deps))
}

/// Main CLI entry point
pub async fn run() -> Result<()> {
    // Create registry for operation access
    let registry = create_registry().await?;

    // Build CLI from operation metadata (same pattern as HTTP/MCP use metadata)
    let app = build_cli(&registry);
    let matches = app.get_matches();

    // Handle special commands (not operations)
    match matches.subcommand() {
        Some(("serve", sub_matches)) => {
            return handle_serve_command(sub_matches).await;
        }
        Some(("mcp", sub_matches)) => {
            if let Some(("serve", mcp_serve_matches)) = sub_matches.subcommand() {
                let transport = mcp_serve_matches
                    .get_one::<McpTransport>("transport")
                    .cloned()
                    .unwrap_or(McpTransport::Stdio);
                let host = mcp_serve_matches
                    .get_one::<String>("host")
                    .map(|s| s.as_str())
                    .unwrap_or(crate::constants::DEFAULT_HOST);
                let port = mcp_serve_matches
                    .get_one::<String>("port")
                    .and_then(|s| s.parse::<u16>().ok())
                    .unwrap_or(crate::constants::DEFAULT_MCP_PORT);
                return serve_mcp(registry, transport, host, port).await;
            }
        }
        _ => {}
    }

    // Try to dispatch to an operation (uses registry.execute() like MCP does)
    if let Some((op_name, input)) = dispatch_to_operation(&matches, &registry)? {
        let result = registry.execute(&op_name, input).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    // No command matched
    eprintln!("No command specified. Use --help for usage information.");
    std::process::exit(1);
}

// ============================================================================
// CLI Building (from operation metadata)
// ============================================================================

/// Build CLI from operations metadata (same DRY principle as HTTP/MCP)
fn build_cli(registry: &OperationRegistry) -> Command {
    let mut app = Command::new("xbridge")
        .about("xbridge - bridge AI assistants to X (Twitter) accounts")
        .version(env!("CARGO_PKG_VERSION"));

    // Add special commands that aren't operations
    app = app
        .subcommand(
            Command::new("serve")
                .about("Start the HTTP server (REST API with MCP mounted at /mcp)")
                .arg(
                    Arg::new("host")
                        .long("host")
                        .help("Server host (overrides config)"),
                )
                .arg(
                    Arg::new("port")
                        .long("port")
                        .short('p')
                        .help("Server port (overrides config)"),
                ),
        )
        .subcommand(
            Command::new("mcp").about("MCP server").subcommand(
                Command::new("serve")
                    .about("Start the MCP server")
                    .arg(
                        Arg::new("transport")
                            .long("transport")
                            .value_parser(clap::value_parser!(McpTransport))
                            .default_value("stdio")
                            .help("Transport: stdio or http"),
                    )
                    .arg(
                        Arg::new("host")
                            .long("host")
                            .default_value(crate::constants::DEFAULT_HOST),
                    )
                    .arg(Arg::new("port").long("port").default_value("3001")),
            ),
        );

    // Build operation commands from metadata
    add_operation_commands(app, registry)
}

/// Build commands from operation metadata (mirrors HTTP route generation)
fn add_operation_commands(mut app: Command, registry: &OperationRegistry) -> Command {
    let metadata = registry.get_all_metadata();

    // Group operations by CLI structure
    let mut grouped: HashMap<String, Vec<(&String, &OperationMetadata)>> = HashMap::new();

    for (op_name, meta) in metadata {
        if let Some(cli_pattern) = meta.cli_pattern {
            let words: Vec<&str> = cli_pattern
                .split_whitespace()
                .take_while(|w| !w.starts_with('<') && !w.starts_with('['))
                .collect();

            let group = words.first().map(|s| s.to_string()).unwrap_or_default();
            grouped.entry(group).or_default().push((op_name, meta));
        }
    }

    // Build subcommands for each group
    for (group_name, ops) in grouped {
        if group_name.is_empty() {
            continue;
        }

        // Use to_static_str to satisfy clap's 'static lifetime requirement
        let group_name_static = to_static_str(group_name.clone());
        let group_about = to_static_str(format!("{} operations", group_name));
        let mut group_cmd = Command::new(group_name_static).about(group_about);

        for (op_name, meta) in ops {
            if let Some(cli_pattern) = meta.cli_pattern {
                // cli_pattern has 'static lifetime, so words do too
                let words: Vec<&'static str> = cli_pattern.split_whitespace().collect();
                let subcmd_name = words.get(1).copied().unwrap_or(words[0]);

                let cmd = build_operation_command(op_name, meta, subcmd_name);
                group_cmd = group_cmd.subcommand(cmd);
            }
        }

        app = app.subcommand(group_cmd);
    }

    app
}

/// Build a clap Command for an operation using its schema
fn build_operation_command(
    _op_name: &str,
    meta: &OperationMetadata,
    cmd_name: &'static str,
) -> Command {
    let mut cmd = Command::new(cmd_name).about(meta.description);

    // Extract field information from JSON schema
    if let Some(properties) = meta.schema.get("properties").and_then(|p| p.as_object()) {
        let required: Vec<&str> = meta
            .schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();

        let cli_pattern = meta.cli_pattern.unwrap_or("");
        let mut positional_index = 1;

        for (field_name, field_schema) in properties {
            let is_required = required.contains(&field_name.as_str());
            let field_type = schema_field_type(field_schema);

            let description = field_schema
                .get("description")
                .and_then(|d| d.as_str())
                .unwrap_or("");

            // Check if this is a positional arg in the pattern
            // It's positional if it appears as <FIELD> but NOT as --flag <FIELD>
            let uppercase_field = format!("<{}>", field_name.to_uppercase());
            let flag_pattern = format!("--{} {}", field_name, uppercase_field);
            let is_positional =
                cli_pattern.contains(&uppercase_field) && !cli_pattern.contains(&flag_pattern);

            // Use to_static_str for clap's 'static lifetime requirement
            let arg_id_static = to_static_str(arg_id(field_name));
            let description_static = to_static_str(description.to_string());

            if is_positional {
                cmd = cmd.arg(
                    Arg::new(arg_id_static)
                        .required(is_required)
                        .index(positional_index)
                        .help(description_static),
                );
                positional_index += 1;
            } else if field_type == "boolean" {
                cmd = cmd.arg(
                    Arg::new(arg_id_static)
                        .long(arg_id_static)
                        .action(ArgAction::SetTrue)
                        .help(description_static),
                );
            } else {
                cmd = cmd.arg(
                    Arg::new(arg_id_static)
                        .long(arg_id_static)
                        .required(is_required)
                        .help(description_static),
                );
            }
        }
    }

    cmd
}

/// Schema type for a field, handling both plain types and nullable arrays
/// like ["string", "null"] that schemars emits for Option fields
fn schema_field_type(field_schema: &Value) -> &str {
    match field_schema.get("type") {
        Some(Value::String(s)) => s.as_str(),
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str())
            .find(|&s| s != "null")
            .unwrap_or("string"),
        _ => "string",
    }
}

/// Dispatch CLI matches to operation (uses registry.execute() like MCP)
fn dispatch_to_operation(
    matches: &ArgMatches,
    registry: &OperationRegistry,
) -> Result<Option<(String, Value)>> {
    let metadata = registry.get_all_metadata();

    // Check for two-level subcommands (group subcmd)
    if let Some((group, group_matches)) = matches.subcommand()
        && let Some((subcmd, subcmd_matches)) = group_matches.subcommand()
    {
        let prefix = format!("{} {}", group, subcmd);

        // Find matching operation
        for (op_name, meta) in metadata {
            if let Some(cli_pattern) = meta.cli_pattern
                && (cli_pattern == prefix || cli_pattern.starts_with(&format!("{} ", prefix)))
            {
                let input = extract_input_from_matches(subcmd_matches, meta)?;
                return Ok(Some((op_name.clone(), input)));
            }
        }
    }

    Ok(None)
}

/// Extract operation input from CLI arguments using schema
fn extract_input_from_matches(matches: &ArgMatches, meta: &OperationMetadata) -> Result<Value> {
    let mut input = serde_json::Map::new();

    if let Some(properties) = meta.schema.get("properties").and_then(|p| p.as_object()) {
        for (field_name, field_schema) in properties {
            let field_type = schema_field_type(field_schema);
            let id = arg_id(field_name);

            if field_type == "boolean" {
                if matches.get_flag(&id) {
                    input.insert(field_name.clone(), serde_json::json!(true));
                }
            } else if let Some(value_str) = matches.get_one::<String>(&id) {
                let parsed = match field_type {
                    "integer" | "number" => value_str
                        .parse::<i64>()
                        .map(|n| serde_json::json!(n))
                        .unwrap_or_else(|_| serde_json::json!(value_str)),
                    // Arrays accept JSON or a comma-separated shorthand
                    "array" => serde_json::from_str(value_str).unwrap_or_else(|_| {
                        serde_json::json!(
                            value_str
                                .split(',')
                                .map(|s| s.trim().to_string())
                                .collect::<Vec<String>>()
                        )
                    }),
                    "object" => serde_json::from_str(value_str)
                        .unwrap_or_else(|_| serde_json::json!(value_str)),
                    _ => serde_json::json!(value_str),
                };
                input.insert(field_name.clone(), parsed);
            }
        }
    }

    Ok(serde_json::json!(input))
}

// ============================================================================
// Special Commands (not operations)
// ============================================================================

/// Handle the serve command
async fn handle_serve_command(matches: &ArgMatches) -> Result<()> {
    let mut config =
        Config::load_and_inject(crate::constants::CONFIG_FILE_NAME).unwrap_or_default();

    // CLI overrides config
    let host = matches
        .get_one::<String>("host")
        .cloned()
        .or_else(|| config.http.as_ref().map(|c| c.host.clone()))
        .unwrap_or_else(|| crate::constants::DEFAULT_HOST.to_string());
    let port = matches
        .get_one::<String>("port")
        .and_then(|s| s.parse::<u16>().ok())
        .or_else(|| config.http.as_ref().map(|c| c.port))
        .unwrap_or(crate::constants::DEFAULT_HTTP_PORT);

    if let Some(http_config) = config.http.as_mut() {
        http_config.host = host.clone();
        http_config.port = port;
    } else {
        config.http = Some(crate::config::HttpConfig {
            host: host.clone(),
            port,
            mcp_port: crate::constants::DEFAULT_MCP_PORT,
            allowed_origins: None,
        });
    }

    // Print startup message
    println!("🚀 Starting xbridge server on {}:{}", host, port);
    println!("   ✓ HTTP REST API enabled");
    println!(
        "   ✓ MCP endpoint at http://{}:{}{}",
        host,
        port,
        crate::constants::MCP_HTTP_PATH
    );
    println!("   Press Ctrl+C to stop\n");

    crate::http::start_server(config).await?;

    Ok(())
}

/// Start MCP server (special command - not an operation)
async fn serve_mcp(
    registry: OperationRegistry,
    transport: McpTransport,
    host: &str,
    port: u16,
) -> Result<()> {
    let mcp_server = crate::mcp::McpServer::new(std::sync::Arc::new(registry));

    match transport {
        McpTransport::Stdio => {
            // For stdio transport, stdout is reserved for JSON-RPC messages.
            // All diagnostic output MUST go to stderr to avoid corrupting the
            // protocol. Use eprintln!() or tracing (which logs to stderr).
            eprintln!("Starting MCP server (stdio transport)");
            eprintln!("Ready for JSON-RPC messages on stdin/stdout");

            mcp_server.serve_stdio().await?;
        }
        McpTransport::Http => {
            println!("🚀 Starting MCP server (Streamable HTTP transport)");
            println!("   Using MCP 2025-03-26 Streamable HTTP transport");

            mcp_server.serve_http(host, port).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod cli_test;
