//! MCP wire protocol types (JSON-RPC 2.0).
//!
//! Message shapes shared by every transport binding.
//! Reference: <https://spec.modelcontextprotocol.io/>
#![allow(dead_code)] // Some protocol fields are kept for wire-format completeness

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol revision sent in the initialize request.
pub(crate) const PROTOCOL_VERSION: &str = "2025-03-26";

/// JSON-RPC version marker on every frame.
pub(crate) const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request.
#[derive(Debug, Serialize)]
pub(crate) struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub(crate) fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 notification (no id, no response expected).
#[derive(Debug, Serialize)]
pub(crate) struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub(crate) fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response.
///
/// Frames missing both `result` and `error` are not responses (for example
/// server-initiated requests) and are skipped by the readers.
#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Whether this frame carries a response payload at all.
    pub(crate) const fn is_response(&self) -> bool {
        self.result.is_some() || self.error.is_some()
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(rename = "data")]
    pub _data: Option<Value>,
}

/// MCP initialize result.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    #[serde(default)]
    pub capabilities: ServerCapabilities,
}

/// Server information from initialize.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ServerInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Server capabilities advertised during initialize.
#[derive(Debug, Clone, Deserialize, Default)]
pub(crate) struct ServerCapabilities {
    #[serde(default)]
    pub tools: Option<ToolsCapability>,
}

/// Tools capability marker.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ToolsCapability {
    #[serde(default, rename = "listChanged")]
    pub list_changed: Option<bool>,
}

/// One page of a tools/list result.
#[derive(Debug, Deserialize)]
pub(crate) struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<WireTool>,
    #[serde(default, rename = "nextCursor")]
    pub next_cursor: Option<String>,
}

/// Tool descriptor as advertised by the server.
#[derive(Debug, Deserialize)]
pub(crate) struct WireTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Option<Value>,
}

/// Concatenate the `text` entries of a tools/call content array.
///
/// Returns `None` when the payload has no content array or the array holds
/// no text entries; non-text entries (images, resources) are skipped.
pub(crate) fn collect_text_content(result: &Value) -> Option<String> {
    let entries = result.get("content")?.as_array()?;
    let texts: Vec<&str> = entries
        .iter()
        .filter(|entry| entry.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|entry| entry.get("text").and_then(Value::as_str))
        .collect();

    if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n"))
    }
}
