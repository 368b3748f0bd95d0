//! MCP connection lifecycle management.
//!
//! Owns the keyed table of live connections, de-duplicates concurrent
//! connection attempts per server, and runs the periodic idle-eviction
//! sweep. Persistence stays behind the repository port: the manager reads
//! server records and writes nothing back except the narrow
//! last-connected-at stamp.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use switchboard_core::{
    AppEvent, AppEventEmitter, McpConnectionStatus, McpRepositoryError, McpServerRepository,
    McpTool,
};

use crate::client::{McpClient, McpClientError};
use crate::protocol::WireTool;
use crate::transport::TransportConfig;

/// Errors that can occur during connection manager operations.
#[derive(Debug, Error)]
pub enum McpManagerError {
    #[error("No MCP server configured with id {0}")]
    NotFound(i64),

    #[error("MCP server '{name}' (id {id}) is disabled")]
    Disabled { id: i64, name: String },

    #[error("Failed to connect to MCP server '{name}': {source}")]
    ConnectionFailed {
        name: String,
        #[source]
        source: McpClientError,
    },

    #[error("MCP server {0} is not connected")]
    NotConnected(i64),

    #[error(transparent)]
    Client(#[from] McpClientError),

    #[error(transparent)]
    Repository(#[from] McpRepositoryError),
}

/// Tunable timing for the connection manager.
///
/// Tests compress these to keep eviction scenarios fast.
#[derive(Debug, Clone, Copy)]
pub struct McpManagerConfig {
    /// How often the idle sweep runs.
    pub sweep_interval: Duration,
    /// Connections idle at least this long are evicted by the sweep.
    pub idle_threshold: Duration,
    /// Upper bound on transport open plus MCP handshake.
    pub handshake_timeout: Duration,
}

impl Default for McpManagerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            idle_threshold: Duration::from_secs(300),
            handshake_timeout: Duration::from_secs(30),
        }
    }
}

/// Last-use bookkeeping for one connection.
///
/// The monotonic instant drives eviction; the wall-clock mirror is what
/// status reporting exposes.
#[derive(Debug)]
struct TouchStamp {
    instant: Instant,
    wall: DateTime<Utc>,
}

impl TouchStamp {
    fn now() -> Self {
        Self {
            instant: Instant::now(),
            wall: Utc::now(),
        }
    }
}

/// One live session to an MCP server.
#[derive(Debug)]
pub struct McpConnection {
    server_id: i64,
    server_name: String,
    client: McpClient,
    tools: RwLock<Vec<McpTool>>,
    last_used: RwLock<TouchStamp>,
}

impl McpConnection {
    fn new(server_id: i64, server_name: String, client: McpClient, tools: Vec<McpTool>) -> Self {
        Self {
            server_id,
            server_name,
            client,
            tools: RwLock::new(tools),
            last_used: RwLock::new(TouchStamp::now()),
        }
    }

    /// Database id of the server this session belongs to.
    pub const fn server_id(&self) -> i64 {
        self.server_id
    }

    /// Configured name of the server.
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Snapshot of the cached tool catalog.
    pub async fn tools(&self) -> Vec<McpTool> {
        self.tools.read().await.clone()
    }

    /// Wall-clock time of the last use.
    pub async fn last_used(&self) -> DateTime<Utc> {
        self.last_used.read().await.wall
    }

    async fn touch(&self) {
        *self.last_used.write().await = TouchStamp::now();
    }

    async fn idle_for(&self) -> Duration {
        self.last_used.read().await.instant.elapsed()
    }
}

/// Manager for MCP connection lifecycle.
///
/// Connections are created lazily on first use, shared by everyone who
/// asks while they live, and torn down explicitly or by the idle sweep.
/// The manager never touches server configuration; that is the service's
/// responsibility.
pub struct McpConnectionManager {
    repository: Arc<dyn McpServerRepository>,
    emitter: Arc<dyn AppEventEmitter>,
    config: McpManagerConfig,
    /// Live connections indexed by server id.
    connections: RwLock<HashMap<i64, Arc<McpConnection>>>,
    /// Per-server connect gates, so concurrent callers share one attempt.
    gates: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
    sweep_cancel: Mutex<Option<CancellationToken>>,
}

impl McpConnectionManager {
    /// Create a manager with default timing.
    pub fn new(
        repository: Arc<dyn McpServerRepository>,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Self {
        Self::with_config(repository, emitter, McpManagerConfig::default())
    }

    /// Create a manager with explicit timing.
    pub fn with_config(
        repository: Arc<dyn McpServerRepository>,
        emitter: Arc<dyn AppEventEmitter>,
        config: McpManagerConfig,
    ) -> Self {
        Self {
            repository,
            emitter,
            config,
            connections: RwLock::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            sweep_cancel: Mutex::new(None),
        }
    }

    /// Start the periodic idle-eviction sweep. Idempotent.
    pub async fn start(self: &Arc<Self>) {
        let mut guard = self.sweep_cancel.lock().await;
        if guard.is_some() {
            tracing::debug!("idle sweep already running");
            return;
        }

        let cancel = CancellationToken::new();
        *guard = Some(cancel.clone());
        drop(guard);

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(manager.config.sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => manager.sweep_idle().await,
                    _ = cancel.cancelled() => {
                        tracing::debug!("idle sweep stopped");
                        break;
                    }
                }
            }
        });
    }

    /// Stop the sweep and close every connection.
    pub async fn shutdown(&self) {
        if let Some(cancel) = self.sweep_cancel.lock().await.take() {
            cancel.cancel();
        }
        self.disconnect_all().await;
    }

    /// Get the live connection for a server, establishing one if needed.
    ///
    /// Reuse refreshes the last-used stamp. Concurrent callers for the
    /// same server serialize on a per-server gate, so exactly one
    /// handshake runs and the rest share its outcome; callers for other
    /// servers proceed in parallel.
    pub async fn connect(&self, server_id: i64) -> Result<Arc<McpConnection>, McpManagerError> {
        if let Some(connection) = self.lookup_and_touch(server_id).await {
            return Ok(connection);
        }

        let gate = self.gate_for(server_id).await;
        let _permit = gate.lock().await;

        // A concurrent caller may have finished connecting while we waited
        if let Some(connection) = self.lookup_and_touch(server_id).await {
            return Ok(connection);
        }

        let connection = self.establish(server_id).await?;
        self.connections
            .write()
            .await
            .insert(server_id, Arc::clone(&connection));

        Ok(connection)
    }

    /// Close and remove a connection. No-op when absent; close failures
    /// are swallowed by the transport layer.
    pub async fn disconnect(&self, server_id: i64) {
        let connection = self.connections.write().await.remove(&server_id);
        let Some(connection) = connection else {
            return;
        };

        connection.client.close().await;

        tracing::info!(server_id, server_name = %connection.server_name, "MCP server disconnected");
        self.emitter.emit(AppEvent::mcp_server_disconnected(
            server_id,
            connection.server_name.as_str(),
        ));
    }

    /// Close every live connection.
    pub async fn disconnect_all(&self) {
        let ids: Vec<i64> = self.connections.read().await.keys().copied().collect();
        for id in ids {
            self.disconnect(id).await;
        }
    }

    /// Cached tool catalog for one server, connecting first if needed.
    pub async fn get_tools(&self, server_id: i64) -> Result<Vec<McpTool>, McpManagerError> {
        let connection = self.connect(server_id).await?;
        Ok(connection.tools().await)
    }

    /// Tool catalogs across every enabled server.
    ///
    /// A server that fails to connect is logged and skipped so one broken
    /// server cannot empty the aggregate; only a repository failure makes
    /// the whole call fail.
    pub async fn get_all_enabled_tools(&self) -> Result<Vec<McpTool>, McpManagerError> {
        let servers = self.repository.list_enabled().await?;
        let mut all = Vec::new();

        for server in servers {
            match self.get_tools(server.id).await {
                Ok(tools) => all.extend(tools),
                Err(e) => {
                    tracing::warn!(
                        server_id = server.id,
                        server_name = %server.name,
                        error = %e,
                        "skipping MCP server during tool discovery"
                    );
                    // Drop anything the failed attempt left in the table
                    self.disconnect(server.id).await;
                }
            }
        }

        Ok(all)
    }

    /// Invoke a tool through the server's connection, connecting if
    /// needed. The raw result payload is returned untouched; remote
    /// JSON-RPC errors propagate as `Client` errors.
    pub async fn call_tool(
        &self,
        server_id: i64,
        tool_name: &str,
        args: Value,
    ) -> Result<Value, McpManagerError> {
        let connection = self.connect(server_id).await?;

        tracing::debug!(server_id, tool_name, "calling MCP tool");
        let result = connection.client.call_tool(tool_name, args).await?;

        connection.touch().await;
        Ok(result)
    }

    /// Pure table-membership check; never triggers a connection.
    pub async fn is_connected(&self, server_id: i64) -> bool {
        self.connections.read().await.contains_key(&server_id)
    }

    /// Status summary for every enabled server, connected or not.
    pub async fn connection_status(&self) -> Result<Vec<McpConnectionStatus>, McpManagerError> {
        let servers = self.repository.list_enabled().await?;
        let snapshot = self.connections.read().await.clone();

        let mut statuses = Vec::with_capacity(servers.len());
        for server in servers {
            let status = match snapshot.get(&server.id) {
                Some(connection) => McpConnectionStatus {
                    server_id: server.id,
                    server_name: server.name,
                    is_connected: true,
                    tool_count: connection.tools.read().await.len(),
                    last_used: Some(connection.last_used().await),
                },
                None => McpConnectionStatus {
                    server_id: server.id,
                    server_name: server.name,
                    is_connected: false,
                    tool_count: 0,
                    last_used: None,
                },
            };
            statuses.push(status);
        }

        Ok(statuses)
    }

    /// Re-query the remote catalog and replace the cached tool list
    /// wholesale. Requires a live connection; refreshing is never an
    /// excuse to dial out.
    pub async fn refresh_tools(&self, server_id: i64) -> Result<Vec<McpTool>, McpManagerError> {
        let connection = self
            .connections
            .read()
            .await
            .get(&server_id)
            .cloned()
            .ok_or(McpManagerError::NotConnected(server_id))?;

        let wire_tools = connection.client.list_tools().await?;
        let tools: Vec<McpTool> = wire_tools
            .into_iter()
            .map(|tool| tool_from_wire(tool, connection.server_id, &connection.server_name))
            .collect();

        *connection.tools.write().await = tools.clone();
        connection.touch().await;

        tracing::debug!(server_id, tool_count = tools.len(), "refreshed MCP tools");
        Ok(tools)
    }

    async fn lookup_and_touch(&self, server_id: i64) -> Option<Arc<McpConnection>> {
        let connection = self.connections.read().await.get(&server_id).cloned()?;
        connection.touch().await;
        Some(connection)
    }

    async fn gate_for(&self, server_id: i64) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().await;
        Arc::clone(gates.entry(server_id).or_default())
    }

    /// Load, check, open and catalog. Runs under the per-server gate.
    async fn establish(&self, server_id: i64) -> Result<Arc<McpConnection>, McpManagerError> {
        let server = match self.repository.get_by_id(server_id).await {
            Ok(server) => server,
            Err(McpRepositoryError::NotFound(_)) => {
                return Err(McpManagerError::NotFound(server_id));
            }
            Err(e) => return Err(e.into()),
        };

        if !server.enabled {
            return Err(McpManagerError::Disabled {
                id: server.id,
                name: server.name,
            });
        }

        let transport = TransportConfig::from_server(&server)?;

        tracing::info!(
            server_id,
            server_name = %server.name,
            server_type = server.server_type.as_str(),
            "connecting MCP server"
        );

        let client = McpClient::connect(
            transport,
            server.name.as_str(),
            self.config.handshake_timeout,
        )
        .await
        .map_err(|source| McpManagerError::ConnectionFailed {
            name: server.name.clone(),
            source,
        })?;

        let wire_tools = match client.list_tools().await {
            Ok(tools) => tools,
            Err(source) => {
                client.close().await;
                return Err(McpManagerError::ConnectionFailed {
                    name: server.name,
                    source,
                });
            }
        };

        let tools: Vec<McpTool> = wire_tools
            .into_iter()
            .map(|tool| tool_from_wire(tool, server.id, &server.name))
            .collect();

        tracing::info!(
            server_id,
            server_name = %server.name,
            tool_count = tools.len(),
            "MCP server connected"
        );

        // Best-effort stamp; a storage hiccup must not fail the connect
        if let Err(e) = self.repository.update_last_connected(server_id).await {
            tracing::debug!(server_id, error = %e, "failed to record connection time");
        }

        self.emitter.emit(AppEvent::mcp_server_connected(
            server_id,
            server.name.as_str(),
        ));

        Ok(Arc::new(McpConnection::new(
            server.id,
            server.name,
            client,
            tools,
        )))
    }

    /// Disconnect every connection idle past the threshold.
    async fn sweep_idle(&self) {
        let snapshot: Vec<(i64, Arc<McpConnection>)> = self
            .connections
            .read()
            .await
            .iter()
            .map(|(id, connection)| (*id, Arc::clone(connection)))
            .collect();

        for (server_id, connection) in snapshot {
            if connection.idle_for().await >= self.config.idle_threshold {
                tracing::info!(
                    server_id,
                    server_name = %connection.server_name,
                    "evicting idle MCP connection"
                );
                self.disconnect(server_id).await;
            }
        }
    }
}

fn tool_from_wire(tool: WireTool, server_id: i64, server_name: &str) -> McpTool {
    McpTool {
        name: tool.name,
        description: tool.description,
        input_schema: tool.input_schema,
        server_id,
        server_name: server_name.to_string(),
    }
}
