//! SSE transport: long-lived event stream down, HTTP POST up.
//!
//! The session opens with a GET carrying `Accept: text/event-stream`. The
//! server's first frame is an `endpoint` event naming the URL requests
//! must be POSTed to (possibly relative to the stream URL); responses then
//! arrive as `message` events on the stream and are correlated back to
//! their requests by id.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::header::{ACCEPT, HeaderMap};
use reqwest::{Client, Url};
use tokio::sync::{Mutex, oneshot};
use tokio_util::sync::CancellationToken;

use crate::client::McpClientError;
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::transport::{PendingMap, SseEvent, SseParser, build_header_map, resolve_pending};

const EVENT_STREAM: &str = "text/event-stream";

/// Live SSE session binding.
#[derive(Debug)]
pub(crate) struct SseTransport {
    http: Client,
    post_url: Url,
    headers: HeaderMap,
    pending: PendingMap,
    cancel: CancellationToken,
}

impl SseTransport {
    /// Open the event stream and wait for the endpoint announcement.
    ///
    /// The stream stays open for the life of the transport; a background
    /// task keeps draining it and resolving responses.
    pub(crate) async fn open(
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<Self, McpClientError> {
        let header_map = build_header_map(headers)?;
        let stream_url = Url::parse(url).map_err(|e| {
            McpClientError::Configuration(format!("invalid url '{url}': {e}"))
        })?;

        let http = Client::new();
        let response = http
            .get(stream_url.clone())
            .headers(header_map.clone())
            .header(ACCEPT, EVENT_STREAM)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(McpClientError::ProtocolError(format!(
                "SSE stream request failed with status {}",
                response.status()
            )));
        }

        let mut stream = Box::pin(response.bytes_stream());
        let mut parser = SseParser::new();
        let mut post_url: Option<Url> = None;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for event in parser.push(&chunk) {
                if post_url.is_none() && event.event == "endpoint" {
                    post_url = Some(resolve_endpoint(&stream_url, event.data.trim())?);
                } else {
                    // Nothing can be in flight yet, so stray frames are noise
                    tracing::debug!(event = %event.event, "ignoring SSE event before endpoint");
                }
            }
            if post_url.is_some() {
                break;
            }
        }

        let Some(post_url) = post_url else {
            return Err(McpClientError::ProtocolError(
                "SSE stream ended before endpoint event".to_string(),
            ));
        };

        tracing::debug!(endpoint = %post_url, "SSE endpoint established");

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let cancel = CancellationToken::new();
        spawn_stream_reader(stream, parser, Arc::clone(&pending), cancel.clone());

        Ok(Self {
            http,
            post_url,
            headers: header_map,
            pending,
            cancel,
        })
    }

    /// POST a request to the endpoint and await its response on the stream.
    pub(crate) async fn request(
        &self,
        request: JsonRpcRequest,
    ) -> Result<JsonRpcResponse, McpClientError> {
        if self.cancel.is_cancelled() {
            return Err(McpClientError::NotConnected);
        }

        let id = request.id;
        let (sender, receiver) = oneshot::channel();
        self.pending.lock().await.insert(id, sender);

        if let Err(e) = self.post(&serde_json::to_value(&request)?).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        receiver.await.map_err(|_| {
            McpClientError::ProtocolError("SSE stream closed before response".to_string())
        })
    }

    pub(crate) async fn notify(
        &self,
        notification: &JsonRpcNotification,
    ) -> Result<(), McpClientError> {
        if self.cancel.is_cancelled() {
            return Err(McpClientError::NotConnected);
        }
        self.post(&serde_json::to_value(notification)?).await
    }

    async fn post(&self, body: &serde_json::Value) -> Result<(), McpClientError> {
        let response = self
            .http
            .post(self.post_url.clone())
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(McpClientError::ProtocolError(format!(
                "message POST failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Stop the stream reader and fail anything still in flight.
    pub(crate) async fn close(&self) {
        self.cancel.cancel();
        self.pending.lock().await.clear();
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        // Stops the reader task, which releases the HTTP connection
        self.cancel.cancel();
    }
}

fn resolve_endpoint(base: &Url, raw: &str) -> Result<Url, McpClientError> {
    base.join(raw).map_err(|e| {
        McpClientError::ProtocolError(format!("invalid endpoint '{raw}' from SSE server: {e}"))
    })
}

fn spawn_stream_reader<S>(
    mut stream: S,
    mut parser: SseParser,
    pending: PendingMap,
    cancel: CancellationToken,
) where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        for event in parser.push(&bytes) {
                            handle_stream_event(&pending, event).await;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "SSE stream error");
                        break;
                    }
                    None => {
                        tracing::debug!("SSE stream ended");
                        break;
                    }
                },
                _ = cancel.cancelled() => break,
            }
        }
        pending.lock().await.clear();
    });
}

async fn handle_stream_event(pending: &PendingMap, event: SseEvent) {
    if event.event != "message" {
        tracing::debug!(event = %event.event, "ignoring SSE event");
        return;
    }
    match serde_json::from_str::<JsonRpcResponse>(&event.data) {
        Ok(response) => resolve_pending(pending, response).await,
        Err(e) => tracing::debug!(error = %e, "ignoring non-JSON-RPC SSE payload"),
    }
}
