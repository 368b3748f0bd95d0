//! MCP DTOs for cross-boundary communication (desktop shell, HTTP, UI).
//!
//! These types are designed to be serde-stable and to avoid internal
//! implementation details crossing the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::McpTool;

/// Connection status summary for one configured server.
///
/// Read-only snapshot reported by the connection manager; producing one has
/// no side effects and triggers no connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpConnectionStatus {
    /// Database ID of the server.
    pub server_id: i64,

    /// User-friendly name of the server.
    pub server_name: String,

    /// Whether a live connection currently exists.
    pub is_connected: bool,

    /// Number of discovered tools (0 when not connected).
    pub tool_count: usize,

    /// When the connection was last used (absent when not connected).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

/// Result of a connectivity test against one server.
///
/// The test endpoint catches failures locally and reports them here rather
/// than raising to the UI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTestReport {
    /// Whether the server connected and listed tools.
    pub success: bool,

    /// Number of tools discovered.
    pub tool_count: usize,

    /// The discovered tools (present on success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<McpTool>>,

    /// Failure description (present on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl McpTestReport {
    /// Create a passing report from the discovered tools.
    #[must_use]
    pub fn passed(tools: Vec<McpTool>) -> Self {
        Self {
            success: true,
            tool_count: tools.len(),
            tools: Some(tools),
            error: None,
        }
    }

    /// Create a failing report.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            tool_count: 0,
            tools: None,
            error: Some(error.into()),
        }
    }
}
