//! MCP (Model Context Protocol) server for gerrit-mcp.
//!
//! This crate implements the MCP server that exposes Gerrit code review
//! operations to AI assistants like Claude.

pub mod handlers;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use handlers::ToolHandler;
pub use server::McpServer;
