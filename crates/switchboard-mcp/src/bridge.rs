//! Agent-facing tool bridge.
//!
//! Wraps discovered MCP tools in globally-unique ids and a uniform
//! invocation surface. Bridged tools never raise to the caller: transport,
//! protocol and remote failures all resolve to an error
//! [`ToolInvocationOutcome`], so one broken server cannot take the agent
//! loop down with it.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use switchboard_core::{McpTool, ToolInvocationOutcome, ToolSchema};

use crate::manager::McpConnectionManager;
use crate::protocol::collect_text_content;

/// Globally-unique id for a bridged tool.
///
/// Tool names are only unique per server, so the id folds the server name
/// in: `mcp_{server}_{tool}`, with every character outside `[A-Za-z0-9]`
/// replaced by an underscore.
pub fn bridged_tool_id(server_name: &str, tool_name: &str) -> String {
    format!("mcp_{}_{}", sanitize(server_name), sanitize(tool_name))
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// One MCP tool wrapped for the agent runtime.
#[derive(Clone)]
pub struct BridgedTool {
    id: String,
    tool: McpTool,
    schema: ToolSchema,
    manager: Arc<McpConnectionManager>,
}

impl BridgedTool {
    /// Wrap a discovered tool. The invocation schema is converted eagerly;
    /// tools without one accept anything.
    pub fn new(tool: McpTool, manager: Arc<McpConnectionManager>) -> Self {
        Self {
            id: bridged_tool_id(&tool.server_name, &tool.name),
            schema: schema_for(&tool),
            tool,
            manager,
        }
    }

    /// Bridged id, unique across servers.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Tool name as the remote server advertises it.
    pub fn name(&self) -> &str {
        &self.tool.name
    }

    /// Human-readable description, when the server provided one.
    pub fn description(&self) -> Option<&str> {
        self.tool.description.as_deref()
    }

    /// Converted invocation schema.
    pub const fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    /// Id of the owning server.
    pub const fn server_id(&self) -> i64 {
        self.tool.server_id
    }

    /// Name of the owning server.
    pub fn server_name(&self) -> &str {
        &self.tool.server_name
    }

    /// Invoke the tool, reconnecting to its server if needed.
    ///
    /// Remote `isError` payloads and local failures both come back as
    /// error outcomes; this never panics and never returns `Err`.
    pub async fn execute(&self, args: Value) -> ToolInvocationOutcome {
        match self
            .manager
            .call_tool(self.tool.server_id, &self.tool.name, args)
            .await
        {
            Ok(raw) => outcome_from_result(raw),
            Err(e) => {
                tracing::warn!(tool_id = %self.id, error = %e, "bridged tool invocation failed");
                ToolInvocationOutcome::error(e.to_string())
            }
        }
    }
}

fn schema_for(tool: &McpTool) -> ToolSchema {
    tool.input_schema
        .as_ref()
        .map_or_else(ToolSchema::any, ToolSchema::from_json_schema)
}

/// Classify a raw tool result into an invocation outcome.
///
/// An `isError: true` payload maps to an error outcome carrying the
/// payload's text content. Otherwise text content becomes the extracted
/// result with the raw payload retained alongside; payloads without text
/// pass through unchanged.
fn outcome_from_result(result: Value) -> ToolInvocationOutcome {
    let is_error = result
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if is_error {
        let message = collect_text_content(&result)
            .unwrap_or_else(|| "tool execution failed".to_string());
        return ToolInvocationOutcome::error(message);
    }

    match collect_text_content(&result) {
        Some(text) => ToolInvocationOutcome::success(Value::String(text), Some(result)),
        None => ToolInvocationOutcome::success(result, None),
    }
}

/// Discover every enabled server's tools and wrap them.
///
/// Discovery failure is survivable: the map starts empty and servers can
/// still be connected individually later. Across servers, a colliding
/// bridged id keeps the last tool seen.
pub async fn bridged_tools(
    manager: &Arc<McpConnectionManager>,
) -> HashMap<String, BridgedTool> {
    let tools = match manager.get_all_enabled_tools().await {
        Ok(tools) => tools,
        Err(e) => {
            tracing::warn!(error = %e, "tool discovery failed, starting with no MCP tools");
            return HashMap::new();
        }
    };

    let mut bridged = HashMap::with_capacity(tools.len());
    for tool in tools {
        let entry = BridgedTool::new(tool, Arc::clone(manager));
        if let Some(previous) = bridged.insert(entry.id.clone(), entry) {
            tracing::debug!(tool_id = %previous.id(), "bridged tool id collision, keeping latest");
        }
    }

    bridged
}
