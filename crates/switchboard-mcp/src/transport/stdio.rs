//! Stdio transport: a local subprocess speaking line-delimited JSON-RPC.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, oneshot};

use crate::client::McpClientError;
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::transport::{PendingMap, resolve_pending};

/// Live subprocess binding.
///
/// Requests are written as single lines to the child's stdin; a background
/// reader task parses stdout lines and resolves the pending-request map, so
/// any number of in-flight requests correlate by id. Stderr is drained to
/// debug logs to keep the child from blocking on a full pipe.
#[derive(Debug)]
pub(crate) struct StdioTransport {
    child: Arc<Mutex<Option<Child>>>,
    stdin: Arc<Mutex<Option<ChildStdin>>>,
    pending: PendingMap,
}

impl StdioTransport {
    /// Spawn the subprocess and start the reader tasks.
    ///
    /// The child inherits the parent environment with the configured
    /// entries applied on top, so a configured key wins on conflict.
    pub(crate) fn spawn(
        program: &str,
        args: &[String],
        env: &[(String, String)],
    ) -> Result<Self, McpClientError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|e| {
            McpClientError::SpawnFailed(format!("failed to spawn '{program}': {e}"))
        })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            McpClientError::SpawnFailed("failed to capture child stdout".to_string())
        })?;
        let stdin = child.stdin.take().ok_or_else(|| {
            McpClientError::SpawnFailed("failed to capture child stdin".to_string())
        })?;
        let stderr = child.stderr.take();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        spawn_stdout_reader(stdout, Arc::clone(&pending));
        if let Some(stderr) = stderr {
            spawn_stderr_drain(stderr);
        }

        Ok(Self {
            child: Arc::new(Mutex::new(Some(child))),
            stdin: Arc::new(Mutex::new(Some(stdin))),
            pending,
        })
    }

    /// Send a request and await the correlated response from the reader.
    pub(crate) async fn request(
        &self,
        request: JsonRpcRequest,
    ) -> Result<JsonRpcResponse, McpClientError> {
        let id = request.id;
        let (sender, receiver) = oneshot::channel();
        self.pending.lock().await.insert(id, sender);

        let line = serde_json::to_string(&request)?;
        if let Err(e) = self.write_line(&line).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        receiver.await.map_err(|_| {
            McpClientError::ProtocolError("connection closed before response".to_string())
        })
    }

    pub(crate) async fn notify(
        &self,
        notification: &JsonRpcNotification,
    ) -> Result<(), McpClientError> {
        let line = serde_json::to_string(notification)?;
        self.write_line(&line).await
    }

    async fn write_line(&self, line: &str) -> Result<(), McpClientError> {
        let mut guard = self.stdin.lock().await;
        let stdin = guard.as_mut().ok_or(McpClientError::NotConnected)?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Close stdin so well-behaved servers exit on EOF, then kill whatever
    /// is left. Never fails.
    pub(crate) async fn close(&self) {
        if let Some(mut stdin) = self.stdin.lock().await.take() {
            let _ = stdin.shutdown().await;
        }
        if let Some(mut child) = self.child.lock().await.take() {
            let _ = child.kill().await;
            let _ = child.wait().await;
        }
        self.pending.lock().await.clear();
    }
}

fn spawn_stdout_reader(stdout: ChildStdout, pending: PendingMap) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<JsonRpcResponse>(trimmed) {
                Ok(response) => resolve_pending(&pending, response).await,
                Err(_) => {
                    // Startup banners from npx and friends are not JSON-RPC
                    tracing::debug!(line = %trimmed, "skipping non-JSON-RPC stdout line");
                }
            }
        }

        // EOF or read error: fail whatever is still waiting
        pending.lock().await.clear();
        tracing::debug!("stdio reader exited");
    });
}

fn spawn_stderr_drain(stderr: ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                tracing::debug!(line = %trimmed, "mcp server stderr");
            }
        }
    });
}
