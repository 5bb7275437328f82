//! MCP Server implementation
//!
//! Exposes bridge operations as MCP tools for AI assistants (Claude Desktop,
//! ChatGPT, etc.) Uses the official `rmcp` SDK with auto-generation from
//! operation metadata.

use crate::Result;
use crate::constants::MCP_HTTP_PATH;
use crate::core::OperationRegistry;
use axum::{Router, routing::any};
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, ListToolsResult, PaginatedRequestParam,
        ServerCapabilities, ServerInfo, Tool, ToolsCapability,
    },
    service::{RequestContext, RoleServer, ServiceExt},
    transport::streamable_http_server::{
        StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
    },
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// MCP server that exposes bridge operations as tools
pub struct McpServer {
    operations: Arc<OperationRegistry>,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(operations: Arc<OperationRegistry>) -> Self {
        Self { operations }
    }

    /// Serve over stdio (for Claude Desktop, etc.)
    ///
    /// stdout is reserved for JSON-RPC frames; all diagnostics go to stderr
    /// through the tracing subscriber.
    pub async fn serve_stdio(&self) -> Result<()> {
        tracing::info!("Starting MCP server on stdio using official rmcp SDK");

        // Use official SDK's stdio transport and serve
        let service = self
            .clone()
            .serve(rmcp::transport::io::stdio())
            .await
            .map_err(|e| {
                crate::XBridgeError::mcp(format!("Failed to start MCP server: {}", e))
            })?;

        // Wait for completion
        service
            .waiting()
            .await
            .map_err(|e| crate::XBridgeError::mcp(format!("MCP server error: {}", e)))?;

        tracing::info!("MCP server shutdown");
        Ok(())
    }

    /// Serve over Streamable HTTP on a dedicated port.
    ///
    /// Uses the MCP 2025-03-26 Streamable HTTP transport specification, which
    /// replaces the deprecated HTTP+SSE transport. The single endpoint
    /// handles:
    /// - POST: Send JSON-RPC messages, receive JSON responses or event streams
    /// - GET: Open event stream for server-initiated messages
    /// - DELETE: Close session and clean up resources
    pub async fn serve_http(&self, host: &str, port: u16) -> Result<()> {
        tracing::info!("Starting MCP server (Streamable HTTP) on {}:{}", host, port);

        let addr: std::net::SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|e| crate::XBridgeError::config(format!("Invalid address: {}", e)))?;

        let streamable_service = create_streamable_service(self.clone());
        let app = Router::new().route(
            MCP_HTTP_PATH,
            any(move |req| async move { streamable_service.clone().handle(req).await }),
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| crate::XBridgeError::config(format!("Failed to bind {}: {}", addr, e)))?;

        tracing::info!(
            "MCP Streamable HTTP server running on http://{}{} (POST/GET/DELETE)",
            addr,
            MCP_HTTP_PATH
        );

        axum::serve(listener, app)
            .await
            .map_err(|e| crate::XBridgeError::mcp(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Auto-generate MCP tools from operation metadata using generated
    /// registration functions
    pub fn get_tools_list(&self) -> Vec<Tool> {
        let deps = self.operations.get_dependencies();

        // Call generated registration functions from each operation group
        let mut tools: Vec<Tool> = [
            crate::core::accounts::accounts::register_mcp_tools,
            crate::core::auth::auth::register_mcp_tools,
            crate::core::tweets::tweets::register_mcp_tools,
            crate::core::users::users::register_mcp_tools,
            crate::core::timeline::timeline::register_mcp_tools,
        ]
        .into_iter()
        .flat_map(|register_fn| register_fn(deps.clone()))
        .collect();

        // Sort tools by name for consistent output
        tools.sort_by(|a, b| a.name.cmp(&b.name));

        tracing::debug!(
            "Auto-generated {} MCP tools from operation metadata",
            tools.len()
        );
        tools
    }
}

impl Clone for McpServer {
    fn clone(&self) -> Self {
        Self {
            operations: Arc::clone(&self.operations),
        }
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
                ..Default::default()
            },
            instructions: Some(
                "Bridge to X (Twitter) accounts. Every tool takes a username \
                 identifying which connected account to act as."
                    .to_string(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, McpError> {
        let tools = self.get_tools_list();

        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let tool_name = request.name.as_ref();
        let arguments_map = request.arguments.clone().unwrap_or_default();
        let arguments = Value::Object(arguments_map);

        tracing::debug!("Calling tool: {} with args: {:?}", tool_name, arguments);

        // Execute operation via registry; operation failures become tool
        // errors, never protocol faults
        match self.operations.execute(tool_name, arguments).await {
            Ok(result) => {
                let result_text =
                    serde_json::to_string_pretty(&result).unwrap_or_else(|_| "{}".to_string());

                Ok(CallToolResult::success(vec![Content::text(result_text)]))
            }
            Err(e) => {
                let error_msg = format!("Tool execution failed: {}", e);
                tracing::warn!("{}", error_msg);

                Ok(CallToolResult::error(vec![Content::text(error_msg)]))
            }
        }
    }
}

// ============================================================================
// Route Builders (for integration into main HTTP server)
// ============================================================================

/// Create the unified MCP endpoint (POST/GET/DELETE) for mounting into the
/// main HTTP server.
///
/// The single endpoint multiplexes all operations via JSON-RPC, unlike the
/// REST surface which creates separate routes per operation.
pub fn create_mcp_routes(registry: Arc<OperationRegistry>) -> Router {
    let mcp_server = McpServer::new(registry);
    let streamable_service = create_streamable_service(mcp_server);

    Router::new().route(
        MCP_HTTP_PATH,
        any(move |req| async move { streamable_service.clone().handle(req).await }),
    )
}

/// Create StreamableHttpService from McpServer
fn create_streamable_service(
    mcp_server: McpServer,
) -> StreamableHttpService<McpServer, LocalSessionManager> {
    let config = StreamableHttpServerConfig {
        sse_keep_alive: Some(Duration::from_secs(15)),
        stateful_mode: true,
    };

    StreamableHttpService::new(
        move || Ok(mcp_server.clone()),
        Arc::new(LocalSessionManager::default()),
        config,
    )
}
