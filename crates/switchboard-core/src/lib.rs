//! Core domain types and port definitions for switchboard.
//!
//! This crate holds the pure domain model (MCP server configurations, tool
//! descriptors, invocation schemas), the port traits implemented by
//! infrastructure adapters, and the canonical application event union.
//! No I/O and no transport code live here.

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod events;
pub mod ports;

// Re-export commonly used types for convenience
pub use domain::{
    McpEnvEntry, McpServer, McpServerConfig, McpServerType, McpTool, NewMcpServer, ObjectField,
    SchemaKind, ToolInvocationOutcome, ToolSchema, UpdateMcpServer,
};
pub use events::{AppEvent, McpServerSummary};
pub use ports::{
    AppEventEmitter, McpConnectionStatus, McpErrorCategory, McpErrorInfo, McpRepositoryError,
    McpServerRepository, McpServiceError, McpTestReport, NoopEmitter,
};
