//! MCP server domain types.
//!
//! These types describe persisted tool-server configurations, independent of
//! any infrastructure concerns (database, process management, etc.).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transport type of an MCP server connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpServerType {
    /// Stdio-based server - switchboard spawns and manages the process
    #[default]
    Stdio,
    /// SSE-based server - external process, switchboard connects via HTTP
    Sse,
    /// Streamable-HTTP server - external process, one HTTP POST per request
    #[serde(rename = "streamable-http")]
    StreamableHttp,
}

impl McpServerType {
    /// Wire tag for this type, matching the serde representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Sse => "sse",
            Self::StreamableHttp => "streamable-http",
        }
    }
}

/// Environment variable entry for stdio MCP servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpEnvEntry {
    /// Environment variable key
    pub key: String,
    /// Environment variable value
    pub value: String,
}

impl McpEnvEntry {
    /// Create a new environment variable entry.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Execution configuration for an MCP server.
///
/// For stdio servers, `command` is required. For SSE and streamable-HTTP
/// servers, `url` is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpServerConfig {
    // --- Stdio server fields ---
    /// Command to execute (e.g., "npx"). Required for stdio servers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Arguments to pass to the executable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,

    // --- SSE / streamable-HTTP fields ---
    /// Endpoint URL (e.g., `http://localhost:3001/sse`).
    /// Required for sse and streamable-http servers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Extra HTTP headers attached to every request against `url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

impl McpServerConfig {
    /// Create a stdio server configuration.
    #[must_use]
    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: Some(command.into()),
            args: Some(args),
            url: None,
            headers: None,
        }
    }

    /// Create an SSE or streamable-HTTP server configuration.
    #[must_use]
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            command: None,
            args: None,
            url: Some(url.into()),
            headers: None,
        }
    }

    /// Validate configuration based on server type.
    ///
    /// Returns an error if required fields are missing or empty for the type.
    pub fn validate(&self, server_type: McpServerType) -> Result<(), String> {
        match server_type {
            McpServerType::Stdio => {
                let command = self
                    .command
                    .as_ref()
                    .ok_or_else(|| "Stdio server requires command".to_string())?;

                if command.is_empty() {
                    return Err("Stdio server command cannot be empty".to_string());
                }

                Ok(())
            }
            McpServerType::Sse | McpServerType::StreamableHttp => {
                let url = self
                    .url
                    .as_ref()
                    .ok_or_else(|| format!("{} server requires url", server_type.as_str()))?;

                if url.is_empty() {
                    return Err(format!("{} server url cannot be empty", server_type.as_str()));
                }

                Ok(())
            }
        }
    }
}

/// An MCP server that exists in the system with a database ID.
///
/// This represents a persisted MCP server with all its metadata.
/// Use `NewMcpServer` for servers that haven't been persisted yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServer {
    /// Database ID of the server (always present for persisted servers).
    pub id: i64,

    /// User-friendly name, also used to namespace bridged tool ids.
    pub name: String,

    /// Connection type (stdio, SSE or streamable-HTTP).
    pub server_type: McpServerType,

    /// Execution configuration (command, args, URL, headers).
    pub config: McpServerConfig,

    /// Whether tools from this server are offered to the agent.
    pub enabled: bool,

    /// Whether to connect this server when the application launches.
    pub auto_start: bool,

    /// Environment variables for the server process.
    pub env: Vec<McpEnvEntry>,

    /// When the server was added.
    pub created_at: DateTime<Utc>,

    /// Last successful connection time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_connected_at: Option<DateTime<Utc>>,
}

/// An MCP server to be inserted into the system (no ID yet).
///
/// After insertion, the repository returns an `McpServer` with the assigned ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMcpServer {
    /// User-friendly name for the server.
    pub name: String,

    /// Connection type (stdio, SSE or streamable-HTTP).
    pub server_type: McpServerType,

    /// Execution configuration (command, args, URL, headers).
    pub config: McpServerConfig,

    /// Whether tools from this server are offered to the agent.
    pub enabled: bool,

    /// Whether to connect this server when the application launches.
    pub auto_start: bool,

    /// Environment variables for the server process.
    pub env: Vec<McpEnvEntry>,
}

impl NewMcpServer {
    /// Create a new stdio-based MCP server.
    #[must_use]
    pub fn new_stdio(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            server_type: McpServerType::Stdio,
            config: McpServerConfig::stdio(command, args),
            enabled: true,
            auto_start: false,
            env: Vec::new(),
        }
    }

    /// Create a new SSE-based MCP server.
    #[must_use]
    pub fn new_sse(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server_type: McpServerType::Sse,
            config: McpServerConfig::remote(url),
            enabled: true,
            auto_start: false,
            env: Vec::new(),
        }
    }

    /// Create a new streamable-HTTP-based MCP server.
    #[must_use]
    pub fn new_streamable_http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server_type: McpServerType::StreamableHttp,
            config: McpServerConfig::remote(url),
            enabled: true,
            auto_start: false,
            env: Vec::new(),
        }
    }

    /// Add an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push(McpEnvEntry::new(key, value));
        self
    }

    /// Add an HTTP header (SSE and streamable-HTTP servers).
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set auto-start.
    #[must_use]
    pub const fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Set enabled status.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Request for updating an existing MCP server.
///
/// All fields are optional - only provided fields are updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMcpServer {
    /// New user-friendly name for the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// New connection type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_type: Option<McpServerType>,

    /// New execution configuration (replaced wholesale).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<McpServerConfig>,

    /// Whether tools from this server are offered to the agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Whether to connect this server when the application launches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_start: Option<bool>,

    /// Environment variables for the server process (replaced wholesale).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<McpEnvEntry>>,
}

impl UpdateMcpServer {
    /// Merge this partial update onto an existing server record.
    ///
    /// Fields left as `None` keep the existing value; `config` and `env`
    /// replace wholesale, matching the repository's atomic-update contract.
    /// Validation gates run against the merged record, never the partial.
    #[must_use]
    pub fn apply_to(&self, existing: &McpServer) -> McpServer {
        McpServer {
            id: existing.id,
            name: self.name.clone().unwrap_or_else(|| existing.name.clone()),
            server_type: self.server_type.unwrap_or(existing.server_type),
            config: self
                .config
                .clone()
                .unwrap_or_else(|| existing.config.clone()),
            enabled: self.enabled.unwrap_or(existing.enabled),
            auto_start: self.auto_start.unwrap_or(existing.auto_start),
            env: self.env.clone().unwrap_or_else(|| existing.env.clone()),
            created_at: existing.created_at,
            last_connected_at: existing.last_connected_at,
        }
    }
}
