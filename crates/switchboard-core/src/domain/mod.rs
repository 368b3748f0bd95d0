//! Core domain types.
//!
//! These types represent the pure domain model, independent of any
//! infrastructure concerns (database, process management, etc.).
//!
//! # Structure
//!
//! - `server` - MCP server types (`McpServer`, `NewMcpServer`, etc.)
//! - `tool` - Tool descriptors and invocation outcomes
//! - `schema` - Agent-facing invocation schema nodes and the JSON Schema conversion

mod schema;
mod server;
mod tool;

// Re-export at the domain level for convenience
pub use schema::{ObjectField, SchemaKind, ToolSchema};
pub use server::{
    McpEnvEntry, McpServer, McpServerConfig, McpServerType, NewMcpServer, UpdateMcpServer,
};
pub use tool::{McpTool, ToolInvocationOutcome};
