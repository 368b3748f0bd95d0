//! Shared test infrastructure for switchboard-mcp integration tests.
//!
//! Provides an in-memory repository and a recording event emitter so the
//! tests can drive the full service/manager stack without a database.

#![allow(dead_code)] // Not every test binary uses every helper

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use switchboard_core::{
    AppEvent, AppEventEmitter, McpRepositoryError, McpServer, McpServerRepository, NewMcpServer,
};

/// In-memory MCP server repository.
pub struct InMemoryRepository {
    servers: Mutex<Vec<McpServer>>,
    next_id: Mutex<i64>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            servers: Mutex::new(Vec::new()),
            next_id: Mutex::new(1),
        }
    }
}

#[async_trait]
impl McpServerRepository for InMemoryRepository {
    async fn insert(&self, new_server: NewMcpServer) -> Result<McpServer, McpRepositoryError> {
        let id = {
            let mut next_id = self.next_id.lock().unwrap();
            let id = *next_id;
            *next_id += 1;
            id
        };

        let server = McpServer {
            id,
            name: new_server.name,
            server_type: new_server.server_type,
            config: new_server.config,
            enabled: new_server.enabled,
            auto_start: new_server.auto_start,
            env: new_server.env,
            created_at: chrono::Utc::now(),
            last_connected_at: None,
        };

        self.servers.lock().unwrap().push(server.clone());
        Ok(server)
    }

    async fn get_by_id(&self, id: i64) -> Result<McpServer, McpRepositoryError> {
        self.servers
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| McpRepositoryError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<McpServer>, McpRepositoryError> {
        Ok(self.servers.lock().unwrap().clone())
    }

    async fn list_enabled(&self) -> Result<Vec<McpServer>, McpRepositoryError> {
        Ok(self
            .servers
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.enabled)
            .cloned()
            .collect())
    }

    async fn update(&self, server: &McpServer) -> Result<(), McpRepositoryError> {
        let mut servers = self.servers.lock().unwrap();
        servers.iter_mut().find(|s| s.id == server.id).map_or_else(
            || Err(McpRepositoryError::NotFound(server.id.to_string())),
            |s| {
                *s = server.clone();
                Ok(())
            },
        )
    }

    async fn delete(&self, id: i64) -> Result<(), McpRepositoryError> {
        let mut servers = self.servers.lock().unwrap();
        let len_before = servers.len();
        servers.retain(|s| s.id != id);
        if servers.len() < len_before {
            Ok(())
        } else {
            Err(McpRepositoryError::NotFound(id.to_string()))
        }
    }

    async fn update_last_connected(&self, id: i64) -> Result<(), McpRepositoryError> {
        let mut servers = self.servers.lock().unwrap();
        if let Some(s) = servers.iter_mut().find(|s| s.id == id) {
            s.last_connected_at = Some(chrono::Utc::now());
            Ok(())
        } else {
            Err(McpRepositoryError::NotFound(id.to_string()))
        }
    }
}

/// Event emitter that records everything it is handed.
#[derive(Clone, Default)]
pub struct RecordingEmitter {
    events: Arc<Mutex<Vec<AppEvent>>>,
}

impl RecordingEmitter {
    pub fn events(&self) -> Vec<AppEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Wire names of the recorded events, in emission order.
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(AppEvent::event_name)
            .collect()
    }
}

impl AppEventEmitter for RecordingEmitter {
    fn emit(&self, event: AppEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn clone_box(&self) -> Box<dyn AppEventEmitter> {
        Box::new(self.clone())
    }
}
