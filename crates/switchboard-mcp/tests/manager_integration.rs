//! Integration tests for the connection manager against stdio servers.
//!
//! The fixture servers are small shell scripts speaking line-delimited
//! JSON-RPC over stdio, so every test exercises the real spawn, handshake,
//! discovery and teardown path without any network dependency.

#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde_json::json;
use tempfile::TempDir;

use common::{InMemoryRepository, RecordingEmitter};
use switchboard_core::McpServerRepository;
use switchboard_mcp::{
    McpClientError, McpConnectionManager, McpManagerConfig, McpManagerError, McpService,
    NewMcpServer, bridged_tools,
};

/// One tool, fixed responses. Appends to `$HANDSHAKE_LOG` (when set) on
/// every initialize so tests can count handshakes.
const BASIC_SERVER: &str = r#"#!/bin/sh
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  case "$line" in
    *'"method":"initialize"'*)
      if [ -n "$HANDSHAKE_LOG" ]; then
        printf 'handshake\n' >> "$HANDSHAKE_LOG"
      fi
      printf '{"jsonrpc":"2.0","id":%s,"result":{"protocolVersion":"2025-03-26","serverInfo":{"name":"fixture","version":"0.1.0"},"capabilities":{"tools":{}}}}\n' "$id"
      ;;
    *'"method":"tools/list"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"echo_text","description":"Echoes text back","inputSchema":{"type":"object","properties":{"text":{"type":"string"}},"required":["text"]}}]}}\n' "$id"
      ;;
    *'"method":"tools/call"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"first"},{"type":"text","text":"second"}]}}\n' "$id"
      ;;
  esac
done
"#;

/// Returns `$FIXTURE_GREETING` as the tool result text.
const ENV_SERVER: &str = r#"#!/bin/sh
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  case "$line" in
    *'"method":"initialize"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"protocolVersion":"2025-03-26","serverInfo":{"name":"fixture"},"capabilities":{"tools":{}}}}\n' "$id"
      ;;
    *'"method":"tools/list"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"greet"}]}}\n' "$id"
      ;;
    *'"method":"tools/call"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"%s"}]}}\n' "$id" "$FIXTURE_GREETING"
      ;;
  esac
done
"#;

/// Serves the catalog in two pages linked by a cursor.
const PAGINATED_SERVER: &str = r#"#!/bin/sh
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  case "$line" in
    *'"method":"initialize"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"protocolVersion":"2025-03-26","serverInfo":{"name":"fixture"},"capabilities":{"tools":{}}}}\n' "$id"
      ;;
    *'"method":"tools/list"'*'"cursor"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"beta_tool"}]}}\n' "$id"
      ;;
    *'"method":"tools/list"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"alpha_tool"}],"nextCursor":"page-2"}}\n' "$id"
      ;;
  esac
done
"#;

/// First tools/list returns one tool, later calls return two.
const GROWING_SERVER: &str = r#"#!/bin/sh
LISTED=0
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  case "$line" in
    *'"method":"initialize"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"protocolVersion":"2025-03-26","serverInfo":{"name":"fixture"},"capabilities":{"tools":{}}}}\n' "$id"
      ;;
    *'"method":"tools/list"'*)
      if [ "$LISTED" = "0" ]; then
        LISTED=1
        printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"old_tool"}]}}\n' "$id"
      else
        printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"old_tool"},{"name":"new_tool"}]}}\n' "$id"
      fi
      ;;
  esac
done
"#;

/// Every tool call fails with an isError payload.
const FAILING_TOOL_SERVER: &str = r#"#!/bin/sh
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  case "$line" in
    *'"method":"initialize"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"protocolVersion":"2025-03-26","serverInfo":{"name":"fixture"},"capabilities":{"tools":{}}}}\n' "$id"
      ;;
    *'"method":"tools/list"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"always_fails"}]}}\n' "$id"
      ;;
    *'"method":"tools/call"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"isError":true,"content":[{"type":"text","text":"boom"}]}}\n' "$id"
      ;;
  esac
done
"#;

/// Never answers anything.
const HANGING_SERVER: &str = "#!/bin/sh\nsleep 60\n";

fn write_script(dir: &TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

fn sh_server(name: &str, script: &str) -> NewMcpServer {
    NewMcpServer::new_stdio(name, "sh", vec![script.to_string()])
}

/// Timing for eviction tests; handshakes stay generous.
fn sweep_config(sweep: Duration, idle: Duration) -> McpManagerConfig {
    McpManagerConfig {
        sweep_interval: sweep,
        idle_threshold: idle,
        handshake_timeout: Duration::from_secs(10),
    }
}

async fn manager_for(
    servers: Vec<NewMcpServer>,
    config: McpManagerConfig,
) -> (Arc<McpConnectionManager>, Vec<i64>, RecordingEmitter) {
    let repo = Arc::new(InMemoryRepository::new());
    let mut ids = Vec::new();
    for server in servers {
        ids.push(repo.insert(server).await.unwrap().id);
    }

    let emitter = RecordingEmitter::default();
    let manager = Arc::new(McpConnectionManager::with_config(
        repo,
        Arc::new(emitter.clone()),
        config,
    ));

    (manager, ids, emitter)
}

#[tokio::test]
async fn test_connect_discovers_tools_and_reuses_connection() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "server.sh", BASIC_SERVER);
    let log = dir.path().join("handshakes.log");

    let server =
        sh_server("Notes", &script).with_env("HANDSHAKE_LOG", log.to_string_lossy());
    let (manager, ids, emitter) = manager_for(vec![server], McpManagerConfig::default()).await;
    let id = ids[0];

    let tools = manager.get_tools(id).await.unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "echo_text");
    assert_eq!(tools[0].server_id, id);
    assert_eq!(tools[0].server_name, "Notes");
    assert!(manager.is_connected(id).await);

    // Second call reuses the live connection
    manager.get_tools(id).await.unwrap();
    let handshakes = std::fs::read_to_string(&log).unwrap();
    assert_eq!(handshakes.lines().count(), 1);

    assert_eq!(emitter.event_names(), vec!["mcp:connected"]);
    manager.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_connects_share_one_handshake() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "server.sh", BASIC_SERVER);
    let log = dir.path().join("handshakes.log");

    let server =
        sh_server("Notes", &script).with_env("HANDSHAKE_LOG", log.to_string_lossy());
    let (manager, ids, _emitter) = manager_for(vec![server], McpManagerConfig::default()).await;
    let id = ids[0];

    let results = join_all((0..5).map(|_| manager.get_tools(id))).await;
    for result in results {
        assert_eq!(result.unwrap().len(), 1);
    }

    let handshakes = std::fs::read_to_string(&log).unwrap();
    assert_eq!(handshakes.lines().count(), 1);
    manager.shutdown().await;
}

#[tokio::test]
async fn test_handshake_timeout_fails_the_connect() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "hang.sh", HANGING_SERVER);

    let config = McpManagerConfig {
        handshake_timeout: Duration::from_millis(300),
        ..Default::default()
    };
    let (manager, ids, _emitter) = manager_for(vec![sh_server("Hang", &script)], config).await;

    let err = manager.connect(ids[0]).await.unwrap_err();
    match err {
        McpManagerError::ConnectionFailed { name, source } => {
            assert_eq!(name, "Hang");
            assert!(matches!(source, McpClientError::Timeout));
        }
        other => panic!("expected ConnectionFailed, got {other}"),
    }
    assert!(!manager.is_connected(ids[0]).await);
}

#[tokio::test]
async fn test_idle_connection_is_evicted() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "server.sh", BASIC_SERVER);

    let config = sweep_config(Duration::from_millis(100), Duration::from_millis(300));
    let (manager, ids, emitter) = manager_for(vec![sh_server("Notes", &script)], config).await;
    let id = ids[0];

    manager.start().await;
    manager.connect(id).await.unwrap();
    assert!(manager.is_connected(id).await);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(!manager.is_connected(id).await);
    assert!(emitter.event_names().contains(&"mcp:disconnected"));

    manager.shutdown().await;
}

#[tokio::test]
async fn test_recently_used_connection_survives_sweep() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "server.sh", BASIC_SERVER);

    let config = sweep_config(Duration::from_millis(100), Duration::from_millis(600));
    let (manager, ids, _emitter) = manager_for(vec![sh_server("Notes", &script)], config).await;
    let id = ids[0];

    manager.start().await;
    manager.connect(id).await.unwrap();

    // Keep touching well inside the idle threshold
    for _ in 0..4 {
        tokio::time::sleep(Duration::from_millis(200)).await;
        manager.get_tools(id).await.unwrap();
    }
    assert!(manager.is_connected(id).await);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!manager.is_connected(id).await);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_call_tool_returns_raw_payload() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "server.sh", BASIC_SERVER);

    let (manager, ids, _emitter) =
        manager_for(vec![sh_server("Notes", &script)], McpManagerConfig::default()).await;

    let result = manager
        .call_tool(ids[0], "echo_text", json!({"text": "hi"}))
        .await
        .unwrap();

    assert_eq!(result["content"][0]["text"], "first");
    assert_eq!(result["content"][1]["text"], "second");
    manager.shutdown().await;
}

#[tokio::test]
async fn test_bridged_tool_extracts_text_content() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "server.sh", BASIC_SERVER);

    let (manager, _ids, _emitter) =
        manager_for(vec![sh_server("Notes", &script)], McpManagerConfig::default()).await;

    let tools = bridged_tools(&manager).await;
    let tool = tools.get("mcp_Notes_echo_text").unwrap();
    assert_eq!(tool.name(), "echo_text");
    assert_eq!(tool.server_name(), "Notes");

    let outcome = tool.execute(json!({"text": "hi"})).await;
    assert!(outcome.success);
    assert_eq!(outcome.result, Some(json!("first\nsecond")));
    assert!(outcome.raw_result.is_some());

    manager.shutdown().await;
}

#[tokio::test]
async fn test_bridged_tool_maps_remote_error_payload() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "failing.sh", FAILING_TOOL_SERVER);

    let (manager, _ids, _emitter) =
        manager_for(vec![sh_server("Flaky", &script)], McpManagerConfig::default()).await;

    let tools = bridged_tools(&manager).await;
    let outcome = tools
        .get("mcp_Flaky_always_fails")
        .unwrap()
        .execute(json!({}))
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.error, Some("boom".to_string()));
    assert!(outcome.result.is_none());

    manager.shutdown().await;
}

#[tokio::test]
async fn test_tools_list_pagination_is_followed() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "paged.sh", PAGINATED_SERVER);

    let (manager, ids, _emitter) = manager_for(
        vec![sh_server("Paged", &script)],
        McpManagerConfig::default(),
    )
    .await;

    let tools = manager.get_tools(ids[0]).await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["alpha_tool", "beta_tool"]);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_refresh_tools_picks_up_new_catalog() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "growing.sh", GROWING_SERVER);

    let (manager, ids, _emitter) = manager_for(
        vec![sh_server("Growing", &script)],
        McpManagerConfig::default(),
    )
    .await;
    let id = ids[0];

    assert_eq!(manager.get_tools(id).await.unwrap().len(), 1);

    let refreshed = manager.refresh_tools(id).await.unwrap();
    assert_eq!(refreshed.len(), 2);
    // The cache was replaced wholesale
    assert_eq!(manager.get_tools(id).await.unwrap().len(), 2);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_env_entries_reach_the_server_process() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "env.sh", ENV_SERVER);

    let server = sh_server("Greeter", &script).with_env("FIXTURE_GREETING", "hello-from-env");
    let (manager, ids, _emitter) = manager_for(vec![server], McpManagerConfig::default()).await;

    let result = manager.call_tool(ids[0], "greet", json!({})).await.unwrap();
    assert_eq!(result["content"][0]["text"], "hello-from-env");

    manager.shutdown().await;
}

#[tokio::test]
async fn test_aggregate_discovery_skips_broken_server() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "server.sh", BASIC_SERVER);

    let good = sh_server("Notes", &script);
    let ghost = NewMcpServer::new_stdio("Ghost", "definitely-not-a-real-binary-xyz", vec![]);
    let (manager, _ids, _emitter) =
        manager_for(vec![good, ghost], McpManagerConfig::default()).await;

    let tools = manager.get_all_enabled_tools().await.unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].server_name, "Notes");

    manager.shutdown().await;
}

#[tokio::test]
async fn test_connection_status_reflects_live_connection() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "server.sh", BASIC_SERVER);

    let (manager, ids, _emitter) =
        manager_for(vec![sh_server("Notes", &script)], McpManagerConfig::default()).await;
    manager.connect(ids[0]).await.unwrap();

    let statuses = manager.connection_status().await.unwrap();
    assert_eq!(statuses.len(), 1);
    assert!(statuses[0].is_connected);
    assert_eq!(statuses[0].tool_count, 1);
    assert!(statuses[0].last_used.is_some());

    manager.shutdown().await;
}

#[tokio::test]
async fn test_explicit_disconnect_emits_event() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "server.sh", BASIC_SERVER);

    let (manager, ids, emitter) =
        manager_for(vec![sh_server("Notes", &script)], McpManagerConfig::default()).await;
    let id = ids[0];

    manager.connect(id).await.unwrap();
    manager.disconnect(id).await;

    assert!(!manager.is_connected(id).await);
    assert_eq!(emitter.event_names(), vec!["mcp:connected", "mcp:disconnected"]);
}

#[tokio::test]
async fn test_service_initialize_auto_starts_enabled_servers() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "server.sh", BASIC_SERVER);

    let repo = Arc::new(InMemoryRepository::new());
    let auto = repo
        .insert(sh_server("Auto", &script).with_auto_start(true))
        .await
        .unwrap();
    let manual = repo.insert(sh_server("Manual", &script)).await.unwrap();

    let emitter = RecordingEmitter::default();
    let service = McpService::new(repo, Arc::new(emitter.clone()));

    service.initialize().await.unwrap();
    assert!(service.manager().is_connected(auto.id).await);
    assert!(!service.manager().is_connected(manual.id).await);

    service.shutdown().await;
    assert!(!service.manager().is_connected(auto.id).await);
}

#[tokio::test]
async fn test_service_test_server_reports_tool_count() {
    let dir = TempDir::new().unwrap();
    let script = write_script(&dir, "server.sh", BASIC_SERVER);

    let repo = Arc::new(InMemoryRepository::new());
    let server = repo.insert(sh_server("Notes", &script)).await.unwrap();

    let service = McpService::new(repo, Arc::new(RecordingEmitter::default()));

    let report = service.test_server(server.id).await;
    assert!(report.success);
    assert_eq!(report.tool_count, 1);
    assert!(report.tools.is_some());
    assert!(report.error.is_none());

    service.shutdown().await;
}
