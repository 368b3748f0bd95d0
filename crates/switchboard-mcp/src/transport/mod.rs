//! Transport bindings for MCP sessions.
//!
//! `TransportConfig` is the factory output: building one validates the
//! server configuration but performs no I/O, so it can be constructed and
//! inspected freely. `Transport` is the live binding opened at connect
//! time. All three variants expose the same capability surface
//! (`request`, `notify`, `close`), so callers never branch on server type
//! after construction.

mod http;
mod sse;
mod stdio;

use std::collections::HashMap;
use std::sync::Arc;

use bytes::BytesMut;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::sync::{Mutex, oneshot};

use switchboard_core::{McpServer, McpServerType};

use crate::client::McpClientError;
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

pub(crate) use http::StreamableHttpTransport;
pub(crate) use sse::SseTransport;
pub(crate) use stdio::StdioTransport;

/// In-flight requests awaiting their correlated response.
pub(crate) type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// Validated transport parameters for one server, ready to open.
#[derive(Debug, Clone)]
pub(crate) enum TransportConfig {
    /// Local subprocess speaking line-delimited JSON-RPC over stdio.
    Stdio {
        program: String,
        args: Vec<String>,
        env: Vec<(String, String)>,
    },
    /// Long-lived SSE stream for responses, HTTP POST for requests.
    Sse {
        url: String,
        headers: HashMap<String, String>,
    },
    /// One HTTP POST per message; responses arrive as JSON or a short SSE
    /// body on the same exchange.
    StreamableHttp {
        url: String,
        headers: HashMap<String, String>,
    },
}

impl TransportConfig {
    /// Build the transport configuration for a server record.
    ///
    /// Pure: no process is spawned and no request is issued here.
    pub(crate) fn from_server(server: &McpServer) -> Result<Self, McpClientError> {
        match server.server_type {
            McpServerType::Stdio => {
                let program = server
                    .config
                    .command
                    .clone()
                    .filter(|command| !command.is_empty())
                    .ok_or_else(|| {
                        McpClientError::Configuration("Stdio server requires command".to_string())
                    })?;

                Ok(Self::Stdio {
                    program,
                    args: server.config.args.clone().unwrap_or_default(),
                    env: server
                        .env
                        .iter()
                        .map(|entry| (entry.key.clone(), entry.value.clone()))
                        .collect(),
                })
            }
            McpServerType::Sse => Ok(Self::Sse {
                url: require_url(server)?,
                headers: header_entries(server),
            }),
            McpServerType::StreamableHttp => Ok(Self::StreamableHttp {
                url: require_url(server)?,
                headers: header_entries(server),
            }),
        }
    }

    /// Open the live binding.
    ///
    /// For stdio this spawns the subprocess; for SSE it opens the event
    /// stream and waits for the endpoint announcement; streamable HTTP
    /// defers all I/O to the first request.
    pub(crate) async fn open(self) -> Result<Transport, McpClientError> {
        match self {
            Self::Stdio { program, args, env } => Ok(Transport::Stdio(StdioTransport::spawn(
                &program, &args, &env,
            )?)),
            Self::Sse { url, headers } => {
                Ok(Transport::Sse(SseTransport::open(&url, &headers).await?))
            }
            Self::StreamableHttp { url, headers } => Ok(Transport::StreamableHttp(
                StreamableHttpTransport::new(&url, &headers)?,
            )),
        }
    }
}

fn require_url(server: &McpServer) -> Result<String, McpClientError> {
    server
        .config
        .url
        .clone()
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            McpClientError::Configuration(format!(
                "{} server requires url",
                server.server_type.as_str()
            ))
        })
}

fn header_entries(server: &McpServer) -> HashMap<String, String> {
    server.config.headers.clone().unwrap_or_default()
}

/// Live transport binding with a uniform capability surface.
#[derive(Debug)]
pub(crate) enum Transport {
    Stdio(StdioTransport),
    Sse(SseTransport),
    StreamableHttp(StreamableHttpTransport),
}

impl Transport {
    /// Send a request and await its correlated response.
    pub(crate) async fn request(
        &self,
        request: JsonRpcRequest,
    ) -> Result<JsonRpcResponse, McpClientError> {
        match self {
            Self::Stdio(transport) => transport.request(request).await,
            Self::Sse(transport) => transport.request(request).await,
            Self::StreamableHttp(transport) => transport.request(request).await,
        }
    }

    /// Send a notification; no response is expected or awaited.
    pub(crate) async fn notify(
        &self,
        notification: JsonRpcNotification,
    ) -> Result<(), McpClientError> {
        match self {
            Self::Stdio(transport) => transport.notify(&notification).await,
            Self::Sse(transport) => transport.notify(&notification).await,
            Self::StreamableHttp(transport) => transport.notify(&notification).await,
        }
    }

    /// Close the binding, releasing the process or stream. Best-effort:
    /// failures are logged, never raised.
    pub(crate) async fn close(&self) {
        match self {
            Self::Stdio(transport) => transport.close().await,
            Self::Sse(transport) => transport.close().await,
            Self::StreamableHttp(transport) => transport.close().await,
        }
    }
}

/// Route a decoded frame to the request that is waiting on it.
///
/// Frames without a numeric id or without a result/error payload are not
/// responses (server-initiated traffic) and are dropped with a debug log.
pub(crate) async fn resolve_pending(pending: &PendingMap, response: JsonRpcResponse) {
    if !response.is_response() {
        tracing::debug!("skipping frame without result or error");
        return;
    }
    let Some(id) = response.id else {
        tracing::debug!("skipping response frame without numeric id");
        return;
    };

    if let Some(sender) = pending.lock().await.remove(&id) {
        let _ = sender.send(response);
    } else {
        tracing::warn!(id, "response for unknown request id");
    }
}

/// Convert configured headers into a reqwest header map.
pub(crate) fn build_header_map(
    headers: &HashMap<String, String>,
) -> Result<HeaderMap, McpClientError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
            McpClientError::Configuration(format!("invalid header name '{key}': {e}"))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            McpClientError::Configuration(format!("invalid header value for '{key}': {e}"))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

/// One parsed Server-Sent-Events frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental SSE frame parser over raw response bytes.
///
/// Chunks are appended as they arrive off the wire; events completed by a
/// blank line are drained out. Comment lines and unknown fields are skipped
/// per the SSE spec, and multi-line data fields are joined with newlines.
#[derive(Debug, Default)]
pub(crate) struct SseParser {
    buf: BytesMut,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every event it completed.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(newline_pos) = find_newline(&self.buf) {
            let raw = self.buf.split_to(newline_pos + 1);
            let text = String::from_utf8_lossy(&raw);
            let line = text.trim_end_matches(['\r', '\n']);

            if line.is_empty() {
                if let Some(event) = self.take_event() {
                    events.push(event);
                }
                continue;
            }
            // Comment lines keep the connection alive; nothing to parse
            if line.starts_with(':') {
                continue;
            }

            if let Some(value) = line.strip_prefix("event:") {
                self.event = Some(strip_field_space(value).to_string());
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data.push(strip_field_space(value).to_string());
            }
            // id: and retry: fields are not used by MCP
        }

        events
    }

    fn take_event(&mut self) -> Option<SseEvent> {
        if self.event.is_none() && self.data.is_empty() {
            return None;
        }
        Some(SseEvent {
            event: self
                .event
                .take()
                .unwrap_or_else(|| "message".to_string()),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

fn find_newline(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

// The SSE spec strips exactly one leading space after the field colon
fn strip_field_space(value: &str) -> &str {
    value.strip_prefix(' ').unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::{McpServer, McpServerConfig, McpServerType};

    fn stdio_server() -> McpServer {
        McpServer {
            id: 1,
            name: "Notes".to_string(),
            server_type: McpServerType::Stdio,
            config: McpServerConfig::stdio("npx", vec!["-y".to_string(), "notes-mcp".to_string()]),
            enabled: true,
            auto_start: false,
            env: Vec::new(),
            created_at: chrono::Utc::now(),
            last_connected_at: None,
        }
    }

    #[test]
    fn test_from_server_stdio() {
        let mut server = stdio_server();
        server.env.push(switchboard_core::McpEnvEntry::new("API_KEY", "secret"));

        let config = TransportConfig::from_server(&server).unwrap();
        match config {
            TransportConfig::Stdio { program, args, env } => {
                assert_eq!(program, "npx");
                assert_eq!(args, vec!["-y".to_string(), "notes-mcp".to_string()]);
                assert_eq!(env, vec![("API_KEY".to_string(), "secret".to_string())]);
            }
            other => panic!("expected stdio config, got {other:?}"),
        }
    }

    #[test]
    fn test_from_server_stdio_without_command() {
        let mut server = stdio_server();
        server.config.command = None;

        let result = TransportConfig::from_server(&server);
        assert!(matches!(result, Err(McpClientError::Configuration(_))));
    }

    #[test]
    fn test_from_server_sse_requires_url() {
        let mut server = stdio_server();
        server.server_type = McpServerType::Sse;
        server.config = McpServerConfig::remote("");

        let result = TransportConfig::from_server(&server);
        assert!(matches!(result, Err(McpClientError::Configuration(_))));
    }

    #[test]
    fn test_from_server_streamable_http_carries_headers() {
        let mut server = stdio_server();
        server.server_type = McpServerType::StreamableHttp;
        server.config = McpServerConfig::remote("http://localhost:3000/mcp");
        server
            .config
            .headers
            .get_or_insert_with(HashMap::new)
            .insert("Authorization".to_string(), "Bearer tok".to_string());

        let config = TransportConfig::from_server(&server).unwrap();
        match config {
            TransportConfig::StreamableHttp { url, headers } => {
                assert_eq!(url, "http://localhost:3000/mcp");
                assert_eq!(headers.get("Authorization").map(String::as_str), Some("Bearer tok"));
            }
            other => panic!("expected streamable-http config, got {other:?}"),
        }
    }

    #[test]
    fn test_build_header_map_rejects_invalid_name() {
        let mut headers = HashMap::new();
        headers.insert("bad header".to_string(), "v".to_string());

        assert!(matches!(
            build_header_map(&headers),
            Err(McpClientError::Configuration(_))
        ));
    }

    #[test]
    fn test_sse_parser_single_event() {
        let mut parser = SseParser::new();
        let events = parser.push(b"data: {\"ok\":true}\n\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "message");
        assert_eq!(events[0].data, "{\"ok\":true}");
    }

    #[test]
    fn test_sse_parser_named_event() {
        let mut parser = SseParser::new();
        let events = parser.push(b"event: endpoint\ndata: /messages?session=abc\n\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "endpoint");
        assert_eq!(events[0].data, "/messages?session=abc");
    }

    #[test]
    fn test_sse_parser_event_split_across_chunks() {
        let mut parser = SseParser::new();

        assert!(parser.push(b"data: par").is_empty());
        assert!(parser.push(b"tial\n").is_empty());
        let events = parser.push(b"\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "partial");
    }

    #[test]
    fn test_sse_parser_multiline_data_joined() {
        let mut parser = SseParser::new();
        let events = parser.push(b"data: line one\ndata: line two\n\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "line one\nline two");
    }

    #[test]
    fn test_sse_parser_skips_comments_and_blank_frames() {
        let mut parser = SseParser::new();
        let events = parser.push(b": keep-alive\n\n: another\n\ndata: real\n\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "real");
    }

    #[test]
    fn test_sse_parser_handles_crlf() {
        let mut parser = SseParser::new();
        let events = parser.push(b"event: message\r\ndata: hi\r\n\r\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "message");
        assert_eq!(events[0].data, "hi");
    }

    #[test]
    fn test_sse_parser_multiple_events_in_one_chunk() {
        let mut parser = SseParser::new();
        let events = parser.push(b"data: a\n\ndata: b\n\n");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "a");
        assert_eq!(events[1].data, "b");
    }
}
