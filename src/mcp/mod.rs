//! MCP (Model Context Protocol) server
//!
//! Exposes every registered bridge operation as an MCP tool over stdio or
//! Streamable HTTP.

mod server;

pub use server::{McpServer, create_mcp_routes};

#[cfg(test)]
mod server_test;
