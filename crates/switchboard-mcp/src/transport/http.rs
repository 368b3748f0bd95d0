//! Streamable HTTP transport: one POST per message.
//!
//! Every JSON-RPC message is POSTed to the server URL. The server answers
//! either with a plain JSON body or with a short SSE body carrying the
//! response frame; both are accepted. The initialize response may assign a
//! session id via the `Mcp-Session-Id` header, which is echoed on every
//! later message and released with a DELETE on close.

use std::collections::HashMap;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap};
use reqwest::{Client, Url};
use tokio::sync::Mutex;

use crate::client::McpClientError;
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::transport::{SseParser, build_header_map};

const SESSION_HEADER: &str = "Mcp-Session-Id";
const ACCEPT_BOTH: &str = "application/json, text/event-stream";

/// Streamable HTTP binding. No connection is held between messages.
#[derive(Debug)]
pub(crate) struct StreamableHttpTransport {
    http: Client,
    url: Url,
    headers: HeaderMap,
    session_id: Mutex<Option<String>>,
}

impl StreamableHttpTransport {
    /// Validate the URL and headers. Performs no I/O.
    pub(crate) fn new(
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<Self, McpClientError> {
        let parsed = Url::parse(url).map_err(|e| {
            McpClientError::Configuration(format!("invalid url '{url}': {e}"))
        })?;

        Ok(Self {
            http: Client::new(),
            url: parsed,
            headers: build_header_map(headers)?,
            session_id: Mutex::new(None),
        })
    }

    /// POST a request and decode the response from the exchange body.
    pub(crate) async fn request(
        &self,
        request: JsonRpcRequest,
    ) -> Result<JsonRpcResponse, McpClientError> {
        let id = request.id;
        let response = self.post(&serde_json::to_value(&request)?).await?;

        if !response.status().is_success() {
            return Err(McpClientError::ProtocolError(format!(
                "request POST failed with status {}",
                response.status()
            )));
        }

        self.capture_session(&response).await;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if content_type.starts_with("text/event-stream") {
            read_response_from_events(Box::pin(response.bytes_stream()), id).await
        } else {
            Ok(response.json().await?)
        }
    }

    /// POST a notification; the body of the acknowledgement is discarded.
    pub(crate) async fn notify(
        &self,
        notification: &JsonRpcNotification,
    ) -> Result<(), McpClientError> {
        let response = self.post(&serde_json::to_value(notification)?).await?;

        if !response.status().is_success() {
            return Err(McpClientError::ProtocolError(format!(
                "notification POST failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Release the server-side session, if one was assigned. Best-effort.
    pub(crate) async fn close(&self) {
        let session = self.session_id.lock().await.take();
        let Some(session) = session else { return };

        let result = self
            .http
            .delete(self.url.clone())
            .headers(self.headers.clone())
            .header(SESSION_HEADER, session)
            .send()
            .await;

        if let Err(e) = result {
            tracing::debug!(error = %e, "session DELETE failed");
        }
    }

    async fn post(&self, body: &serde_json::Value) -> Result<reqwest::Response, McpClientError> {
        let mut builder = self
            .http
            .post(self.url.clone())
            .headers(self.headers.clone())
            .header(ACCEPT, ACCEPT_BOTH)
            .json(body);

        if let Some(session) = self.session_id.lock().await.clone() {
            builder = builder.header(SESSION_HEADER, session);
        }

        Ok(builder.send().await?)
    }

    async fn capture_session(&self, response: &reqwest::Response) {
        let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
        else {
            return;
        };

        let mut guard = self.session_id.lock().await;
        if guard.as_deref() != Some(session) {
            tracing::debug!("MCP session established");
            *guard = Some(session.to_string());
        }
    }
}

/// Scan a per-exchange SSE body for the response frame matching `id`.
async fn read_response_from_events<S>(
    mut stream: S,
    id: u64,
) -> Result<JsonRpcResponse, McpClientError>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
{
    let mut parser = SseParser::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        for event in parser.push(&chunk) {
            if event.event != "message" {
                continue;
            }
            let Ok(frame) = serde_json::from_str::<JsonRpcResponse>(&event.data) else {
                tracing::debug!("ignoring non-JSON-RPC SSE payload");
                continue;
            };
            if frame.id == Some(id) && frame.is_response() {
                return Ok(frame);
            }
        }
    }

    Err(McpClientError::ProtocolError(
        "response stream ended before matching response".to_string(),
    ))
}
