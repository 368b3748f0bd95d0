//! MCP JSON-RPC client for communicating with MCP servers.
//!
//! Drives one protocol session over an opened transport: the
//! initialize/initialized exchange, tool discovery with cursor pagination,
//! and tool invocation.
//! Reference: <https://spec.modelcontextprotocol.io/>

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::time::timeout;

use crate::protocol::{
    self, InitializeResult, JsonRpcNotification, JsonRpcRequest, ListToolsResult,
    ServerCapabilities, WireTool,
};
use crate::transport::{Transport, TransportConfig};

/// Errors that can occur during MCP client operations.
#[derive(Debug, Error)]
pub enum McpClientError {
    #[error("Invalid server configuration: {0}")]
    Configuration(String),

    #[error("Failed to spawn MCP server process: {0}")]
    SpawnFailed(String),

    #[error("Failed to communicate with MCP server: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP transport error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("MCP protocol error: {0}")]
    ProtocolError(String),

    #[error("Timeout waiting for MCP server handshake")]
    Timeout,

    #[error("MCP server returned error: code={code}, message={message}")]
    ServerError { code: i64, message: String },

    #[error("Server not connected")]
    NotConnected,
}

/// Client for one MCP session.
#[derive(Debug)]
pub(crate) struct McpClient {
    server_name: String,
    transport: Transport,
    request_id: AtomicU64,
    capabilities: ServerCapabilities,
}

impl McpClient {
    /// Open the transport and complete the MCP handshake.
    ///
    /// The whole sequence (spawn/stream open plus initialize exchange) is
    /// bounded by `handshake_timeout`; a timed-out or failed handshake
    /// closes the partially-opened binding best-effort before returning.
    pub(crate) async fn connect(
        config: TransportConfig,
        server_name: impl Into<String>,
        handshake_timeout: Duration,
    ) -> Result<Self, McpClientError> {
        let server_name = server_name.into();
        match timeout(
            handshake_timeout,
            Self::open_and_initialize(config, server_name),
        )
        .await
        {
            Ok(result) => result,
            // The dropped future tears down the half-open binding
            Err(_) => Err(McpClientError::Timeout),
        }
    }

    async fn open_and_initialize(
        config: TransportConfig,
        server_name: String,
    ) -> Result<Self, McpClientError> {
        let transport = config.open().await?;
        let mut client = Self {
            server_name,
            transport,
            request_id: AtomicU64::new(1),
            capabilities: ServerCapabilities::default(),
        };

        if let Err(e) = client.initialize().await {
            client.close().await;
            return Err(e);
        }

        Ok(client)
    }

    /// Send the initialize request and the initialized notification.
    async fn initialize(&mut self) -> Result<(), McpClientError> {
        let params = json!({
            "protocolVersion": protocol::PROTOCOL_VERSION,
            "clientInfo": {
                "name": "switchboard",
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {}
        });

        let result: InitializeResult = self.request("initialize", Some(params)).await?;

        tracing::debug!(
            server_name = %self.server_name,
            remote_name = %result.server_info.name,
            protocol_version = %result.protocol_version,
            "MCP session initialized"
        );

        self.capabilities = result.capabilities;

        self.transport
            .notify(JsonRpcNotification::new("notifications/initialized", None))
            .await?;

        Ok(())
    }

    /// List every tool advertised by the server, following cursor
    /// pagination until the catalog is exhausted.
    ///
    /// Servers that did not advertise the tools capability yield an empty
    /// catalog without a request being issued.
    pub(crate) async fn list_tools(&self) -> Result<Vec<WireTool>, McpClientError> {
        if self.capabilities.tools.is_none() {
            return Ok(Vec::new());
        }

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor.take().map(|cursor| json!({ "cursor": cursor }));
            let page: ListToolsResult = self.request("tools/list", params).await?;

            tools.extend(page.tools);
            if page.next_cursor.is_none() {
                break;
            }
            cursor = page.next_cursor;
        }

        Ok(tools)
    }

    /// Invoke a tool, returning the raw result payload.
    ///
    /// `isError`-flagged payloads come back as ordinary results here;
    /// interpreting them is the bridge's concern. Remote JSON-RPC errors
    /// surface as `ServerError`.
    pub(crate) async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<Value, McpClientError> {
        let params = json!({
            "name": name,
            "arguments": arguments
        });

        self.request("tools/call", Some(params)).await
    }

    /// Close the underlying binding. Best-effort.
    pub(crate) async fn close(&self) {
        self.transport.close().await;
    }

    /// Send a JSON-RPC request and decode its result.
    async fn request<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, McpClientError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(id, method, params);

        let response = self.transport.request(request).await?;

        if let Some(error) = response.error {
            return Err(McpClientError::ServerError {
                code: error.code,
                message: error.message,
            });
        }

        let result = response.result.ok_or_else(|| {
            McpClientError::ProtocolError(format!("missing result for '{method}'"))
        })?;

        serde_json::from_value(result).map_err(Into::into)
    }
}
