//! Tool descriptors and invocation outcomes.

use serde::{Deserialize, Serialize};

/// Tool definition discovered from an MCP server.
///
/// Stamped with the owning server's id and name at discovery time; those two
/// fields feed bridged-tool-id construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpTool {
    /// Tool name as advertised by the remote server (unique per server only).
    pub name: String,

    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for input parameters, as sent by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,

    /// ID of the owning server.
    pub server_id: i64,

    /// Name of the owning server.
    pub server_name: String,
}

impl McpTool {
    /// Create a new tool definition.
    pub fn new(name: impl Into<String>, server_id: i64, server_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
            server_id,
            server_name: server_name.into(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Set the input schema.
    #[must_use]
    pub fn with_input_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

/// Structured outcome of a bridged tool invocation.
///
/// Bridged tools never raise to the agent runtime; every invocation resolves
/// to one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocationOutcome {
    /// Whether the call succeeded.
    pub success: bool,

    /// Extracted result: concatenated text content when the remote payload
    /// carried any, otherwise the raw payload itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// Raw remote payload, retained when `result` holds extracted text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_result: Option<serde_json::Value>,

    /// Error message (if failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolInvocationOutcome {
    /// Create a success outcome.
    #[must_use]
    pub const fn success(result: serde_json::Value, raw_result: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            result: Some(result),
            raw_result,
            error: None,
        }
    }

    /// Create an error outcome.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            raw_result: None,
            error: Some(message.into()),
        }
    }
}
