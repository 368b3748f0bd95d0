//! Canonical event union for all cross-adapter events.
//!
//! This module is the single source of truth for events consumed by UI
//! listeners and produced by backend emitters.
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag for TypeScript compatibility:
//!
//! ```json
//! { "type": "mcp_server_connected", "serverId": 3, "serverName": "Notes" }
//! ```

mod mcp;

use serde::{Deserialize, Serialize};

use crate::ports::McpErrorInfo;

// Re-export event types
pub use mcp::McpServerSummary;

/// Canonical event types for all adapters.
///
/// Each variant includes all necessary context for the event to be
/// self-describing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// An MCP server was added to the configuration.
    McpServerAdded {
        /// Summary of the added server.
        server: McpServerSummary,
    },

    /// An MCP server was removed from the configuration.
    McpServerRemoved {
        /// ID of the removed server.
        #[serde(rename = "serverId")]
        server_id: i64,
    },

    /// A connection to an MCP server was established.
    McpServerConnected {
        /// ID of the server.
        #[serde(rename = "serverId")]
        server_id: i64,
        /// Name of the server.
        #[serde(rename = "serverName")]
        server_name: String,
    },

    /// A connection to an MCP server was closed (explicitly or by idle
    /// eviction).
    McpServerDisconnected {
        /// ID of the server.
        #[serde(rename = "serverId")]
        server_id: i64,
        /// Name of the server.
        #[serde(rename = "serverName")]
        server_name: String,
    },

    /// An MCP server operation failed.
    McpServerError {
        /// User-safe error information.
        error: McpErrorInfo,
    },
}

impl AppEvent {
    /// Get the event name for wire protocols.
    ///
    /// This provides consistent event naming across adapters.
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::McpServerAdded { .. } => "mcp:added",
            Self::McpServerRemoved { .. } => "mcp:removed",
            Self::McpServerConnected { .. } => "mcp:connected",
            Self::McpServerDisconnected { .. } => "mcp:disconnected",
            Self::McpServerError { .. } => "mcp:error",
        }
    }
}
