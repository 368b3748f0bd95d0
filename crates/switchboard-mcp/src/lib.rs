//! MCP (Model Context Protocol) client connection management for switchboard.
//!
//! This crate owns the client side of MCP: transport negotiation (stdio
//! subprocess, SSE, streamable HTTP), the initialize handshake, a keyed
//! table of live connections with idle eviction, launch-configuration
//! safety gates, and the bridge that turns discovered remote tools into
//! invocable tools for the agent runtime.
//!
//! Persistence stays behind the `McpServerRepository` port from
//! `switchboard-core`; this crate never talks to storage directly.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub(crate) mod client;
pub(crate) mod protocol;
pub(crate) mod transport;

pub mod bridge;
pub mod manager;
pub mod service;
pub mod validate;

// Re-export domain types from core for convenience
pub use switchboard_core::{
    McpConnectionStatus, McpEnvEntry, McpServer, McpServerConfig, McpServerType, McpTestReport,
    McpTool, NewMcpServer, ToolInvocationOutcome, ToolSchema, UpdateMcpServer,
};

// Re-export this crate's public types
pub use bridge::{BridgedTool, bridged_tool_id, bridged_tools};
pub use client::McpClientError;
pub use manager::{McpConnection, McpConnectionManager, McpManagerConfig, McpManagerError};
pub use service::McpService;

// Silence unused dev-dependency warnings - these are exercised by the
// integration tests under tests/
#[cfg(test)]
use axum as _;
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_stream as _;
