//! High-level MCP service for managing MCP servers.
//!
//! This service provides the main API used by host shells (desktop
//! commands, REST endpoints). It uses dependency injection for the
//! repository and event emitter; the connection manager is owned here and
//! shared with the tool bridge.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use switchboard_core::{
    AppEvent, AppEventEmitter, McpConnectionStatus, McpErrorInfo, McpRepositoryError, McpServer,
    McpServerConfig, McpServerRepository, McpServerSummary, McpServerType, McpServiceError,
    McpTestReport, McpTool, NewMcpServer, UpdateMcpServer,
};

use crate::bridge::{self, BridgedTool};
use crate::manager::{McpConnectionManager, McpManagerConfig, McpManagerError};
use crate::validate;

/// MCP service providing unified access to MCP server management.
///
/// Configuration mutations run the launch-safety validator before
/// anything is persisted, and force a disconnect so no live session keeps
/// running on stale configuration.
pub struct McpService {
    repository: Arc<dyn McpServerRepository>,
    manager: Arc<McpConnectionManager>,
    emitter: Arc<dyn AppEventEmitter>,
}

impl McpService {
    /// Create a new MCP service with injected dependencies.
    pub fn new(
        repository: Arc<dyn McpServerRepository>,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Self {
        Self::with_config(repository, emitter, McpManagerConfig::default())
    }

    /// Create a service with explicit manager timing.
    pub fn with_config(
        repository: Arc<dyn McpServerRepository>,
        emitter: Arc<dyn AppEventEmitter>,
        config: McpManagerConfig,
    ) -> Self {
        let manager = Arc::new(McpConnectionManager::with_config(
            Arc::clone(&repository),
            Arc::clone(&emitter),
            config,
        ));

        Self {
            repository,
            manager,
            emitter,
        }
    }

    /// The connection manager, for callers that hold bridged tools.
    pub const fn manager(&self) -> &Arc<McpConnectionManager> {
        &self.manager
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Initialize the MCP service: start the idle sweep and connect every
    /// enabled auto-start server. Auto-start failures are logged, not
    /// raised; one broken server must not block application startup.
    pub async fn initialize(&self) -> Result<(), McpServiceError> {
        self.manager.start().await;

        let servers = self.repository.list_enabled().await?;
        for server in servers {
            if !server.auto_start {
                continue;
            }
            if let Err(e) = self.connect_server(server.id).await {
                tracing::warn!(
                    server_name = %server.name,
                    error = %e,
                    "Failed to auto-start MCP server"
                );
            }
        }

        Ok(())
    }

    /// Stop the idle sweep and close every connection.
    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
    }

    // =========================================================================
    // Server Configuration
    // =========================================================================

    /// Add a new MCP server configuration.
    ///
    /// Validates the configuration for its type and, for stdio servers,
    /// runs the launch-safety gate. Nothing is persisted on rejection.
    pub async fn add_server(&self, new_server: NewMcpServer) -> Result<McpServer, McpServiceError> {
        new_server
            .config
            .validate(new_server.server_type)
            .map_err(McpServiceError::InvalidConfig)?;

        if new_server.server_type == McpServerType::Stdio {
            Self::check_launch_safety(&new_server.config)?;
        }

        let server = self.repository.insert(new_server).await?;

        tracing::info!(server_id = server.id, server_name = %server.name, "added MCP server");
        self.emitter
            .emit(AppEvent::mcp_server_added(McpServerSummary::new(
                server.id,
                server.name.as_str(),
                server.server_type.as_str(),
            )));

        Ok(server)
    }

    /// Get a server configuration by ID.
    pub async fn get_server(&self, server_id: i64) -> Result<McpServer, McpServiceError> {
        Ok(self.repository.get_by_id(server_id).await?)
    }

    /// List all configured servers.
    pub async fn list_servers(&self) -> Result<Vec<McpServer>, McpServiceError> {
        Ok(self.repository.list().await?)
    }

    /// Apply a partial update to a server configuration.
    ///
    /// The merged configuration is re-validated as a whole, so an update
    /// cannot sneak a record past the gates piecewise. Any live connection
    /// is dropped before the new configuration is persisted.
    pub async fn update_server(
        &self,
        server_id: i64,
        update: UpdateMcpServer,
    ) -> Result<McpServer, McpServiceError> {
        let existing = self.repository.get_by_id(server_id).await?;
        let merged = update.apply_to(&existing);

        merged
            .config
            .validate(merged.server_type)
            .map_err(McpServiceError::InvalidConfig)?;

        if merged.server_type == McpServerType::Stdio {
            Self::check_launch_safety(&merged.config)?;
        }

        self.manager.disconnect(server_id).await;
        self.repository.update(&merged).await?;

        tracing::info!(server_id, server_name = %merged.name, "updated MCP server");
        Ok(merged)
    }

    /// Remove a server configuration, disconnecting it first.
    pub async fn remove_server(&self, server_id: i64) -> Result<(), McpServiceError> {
        self.manager.disconnect(server_id).await;
        self.repository.delete(server_id).await?;

        tracing::info!(server_id, "removed MCP server");
        self.emitter.emit(AppEvent::mcp_server_removed(server_id));

        Ok(())
    }

    // =========================================================================
    // Connections
    // =========================================================================

    /// Connect a server and return its tool catalog.
    ///
    /// Reuses an existing connection when one is live. Connection failures
    /// are emitted as error events so UI surfaces can react.
    pub async fn connect_server(&self, server_id: i64) -> Result<Vec<McpTool>, McpServiceError> {
        match self.manager.get_tools(server_id).await {
            Ok(tools) => Ok(tools),
            Err(McpManagerError::Repository(e)) => Err(e.into()),
            Err(McpManagerError::NotFound(id)) => {
                Err(McpRepositoryError::NotFound(id.to_string()).into())
            }
            Err(e) => {
                let server_name = self.server_name_for(server_id).await;
                self.emitter
                    .emit(AppEvent::mcp_server_error(McpErrorInfo::connection(
                        Some(server_id),
                        server_name,
                        e.to_string(),
                    )));
                Err(McpServiceError::ConnectFailed(e.to_string()))
            }
        }
    }

    /// Disconnect a server. No-op when it is not connected.
    pub async fn disconnect_server(&self, server_id: i64) {
        self.manager.disconnect(server_id).await;
    }

    /// Connection status for every enabled server.
    pub async fn connection_status(&self) -> Result<Vec<McpConnectionStatus>, McpServiceError> {
        match self.manager.connection_status().await {
            Ok(statuses) => Ok(statuses),
            Err(McpManagerError::Repository(e)) => Err(e.into()),
            Err(e) => Err(McpServiceError::Internal(e.to_string())),
        }
    }

    /// Re-query the tool catalog of a connected server.
    pub async fn refresh_tools(&self, server_id: i64) -> Result<Vec<McpTool>, McpServiceError> {
        match self.manager.refresh_tools(server_id).await {
            Ok(tools) => Ok(tools),
            Err(McpManagerError::NotConnected(id)) => {
                Err(McpServiceError::NotConnected(id.to_string()))
            }
            Err(McpManagerError::Repository(e)) => Err(e.into()),
            Err(e) => Err(McpServiceError::Protocol(e.to_string())),
        }
    }

    // =========================================================================
    // Tool Operations
    // =========================================================================

    /// Call a tool on a server, connecting it first if needed.
    pub async fn call_tool(
        &self,
        server_id: i64,
        tool_name: &str,
        args: Value,
    ) -> Result<Value, McpServiceError> {
        match self.manager.call_tool(server_id, tool_name, args).await {
            Ok(result) => Ok(result),
            Err(McpManagerError::Repository(e)) => Err(e.into()),
            Err(McpManagerError::NotFound(id)) => {
                Err(McpRepositoryError::NotFound(id.to_string()).into())
            }
            Err(e) => Err(McpServiceError::ToolError(e.to_string())),
        }
    }

    /// Discover and wrap every enabled server's tools for the agent
    /// runtime.
    pub async fn bridged_tools(&self) -> HashMap<String, BridgedTool> {
        bridge::bridged_tools(&self.manager).await
    }

    // =========================================================================
    // Utilities
    // =========================================================================

    /// Test connectivity for a configured server.
    ///
    /// Connects (or reuses a connection) and lists tools, reporting the
    /// outcome instead of raising. A successful test leaves the connection
    /// in the table; the idle sweep reclaims it.
    pub async fn test_server(&self, server_id: i64) -> McpTestReport {
        match self.manager.get_tools(server_id).await {
            Ok(tools) => McpTestReport::passed(tools),
            Err(e) => McpTestReport::failed(e.to_string()),
        }
    }

    fn check_launch_safety(config: &McpServerConfig) -> Result<(), McpServiceError> {
        let Some(command) = config.command.as_deref() else {
            return Ok(());
        };

        if !validate::is_command_allowed(command) {
            return Err(McpServiceError::InvalidConfig(format!(
                "command '{command}' is not allowed; allowed commands: {}",
                validate::ALLOWED_COMMANDS.join(", ")
            )));
        }

        if let Some(args) = &config.args {
            for arg in args {
                if let Some(pattern) = validate::unsafe_arg_pattern(arg) {
                    return Err(McpServiceError::InvalidConfig(format!(
                        "argument '{arg}' contains {pattern}"
                    )));
                }
            }
        }

        Ok(())
    }

    async fn server_name_for(&self, server_id: i64) -> String {
        match self.repository.get_by_id(server_id).await {
            Ok(server) => server.name,
            Err(_) => format!("server-{server_id}"),
        }
    }
}
