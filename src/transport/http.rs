//! Streamable HTTP transport with SSE response parsing
//!
//! [`HttpTransport`] sends every outbound JSON-RPC message as an HTTP POST to
//! the configured endpoint. The server may answer with:
//!
//! - `application/json` -- a direct JSON body, forwarded as one message
//! - `text/event-stream` -- an SSE stream carrying one or more messages
//! - `202 Accepted` -- a bodyless acknowledgement (notifications)
//!
//! One implementation serves both the `sse` and `http` configuration
//! variants; the SSE variant simply opens the long-lived GET stream
//! ([`HttpTransport::open_event_stream`]) right after construction so the
//! server can push unsolicited notifications.
//!
//! # Session management
//!
//! The server may return an `MCP-Session-Id` header on the `initialize`
//! response. Once captured it is attached to every subsequent request, and a
//! `404` while a session is active means the session expired. SSE `id:`
//! fields are remembered and replayed as `Last-Event-ID` so a reconnect can
//! resume the stream. Dropping the transport issues a best-effort DELETE
//! with the session header, the spec's session-termination handshake.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use tokio::sync::{mpsc, RwLock};
use url::Url;

use crate::error::{McprobeError, Result};
use crate::transport::Transport;
use crate::types::LATEST_PROTOCOL_VERSION;

/// Streamable HTTP transport.
///
/// # Examples
///
/// ```no_run
/// use std::collections::HashMap;
/// use std::time::Duration;
/// use url::Url;
/// use mcprobe::transport::http::HttpTransport;
///
/// # fn main() -> anyhow::Result<()> {
/// let transport = HttpTransport::new(
///     Url::parse("http://localhost:8080/mcp")?,
///     HashMap::new(),
///     Duration::from_secs(30),
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpTransport {
    /// Underlying reqwest client, shared with spawned stream tasks.
    client: Arc<reqwest::Client>,
    /// POST target.
    endpoint: Url,
    /// Session ID captured from the `initialize` response, if any.
    session_id: Arc<RwLock<Option<String>>>,
    /// Extra headers merged into every request.
    headers: HashMap<String, String>,
    /// Sender for inbound JSON-RPC message strings.
    inbound_tx: mpsc::UnboundedSender<String>,
    /// Shared receiver exposed via `receive()`.
    inbound_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>>,
    /// Shared receiver exposed via `receive_err()`; HTTP produces nothing
    /// here, but the sender must stay alive so the stream stays open.
    #[allow(dead_code)]
    diag_tx: mpsc::UnboundedSender<String>,
    diag_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>>,
    /// Last SSE event ID, replayed as `Last-Event-ID` on reconnect.
    last_event_id: Arc<RwLock<Option<String>>>,
}

impl HttpTransport {
    /// Build a transport targeting `endpoint`. No network I/O happens here.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The server URL, query folding already applied
    /// * `headers` - Extra headers for every request; auth tokens go here
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed (TLS
    /// backend initialization failure).
    pub fn new(endpoint: Url, headers: HashMap<String, String>, timeout: Duration) -> Result<Self> {
        let client = Arc::new(
            reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(McprobeError::Http)?,
        );

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (diag_tx, diag_rx) = mpsc::unbounded_channel();

        Ok(Self {
            client,
            endpoint,
            session_id: Arc::new(RwLock::new(None)),
            headers,
            inbound_tx,
            inbound_rx: Arc::new(tokio::sync::Mutex::new(inbound_rx)),
            diag_tx,
            diag_rx: Arc::new(tokio::sync::Mutex::new(diag_rx)),
            last_event_id: Arc::new(RwLock::new(None)),
        })
    }

    async fn apply_session_headers(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        {
            let sid = self.session_id.read().await;
            if let Some(id) = sid.as_deref() {
                req = req.header("MCP-Session-Id", id);
            }
        }
        {
            let lei = self.last_event_id.read().await;
            if let Some(id) = lei.as_deref() {
                req = req.header("Last-Event-ID", id);
            }
        }
        for (k, v) in &self.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        req
    }

    /// Open a long-lived SSE GET stream for unsolicited server messages.
    ///
    /// Spawns a background task that parses the stream until it ends;
    /// returns as soon as the stream is established.
    ///
    /// # Errors
    ///
    /// Returns [`McprobeError::Transport`] if the GET fails or the server
    /// answers with a non-success status.
    pub async fn open_event_stream(&self) -> Result<()> {
        let req = self
            .client
            .get(self.endpoint.as_str())
            .header("Accept", "text/event-stream");
        let req = self.apply_session_headers(req).await;

        let response = req.send().await.map_err(|e| {
            anyhow::anyhow!(McprobeError::Transport(format!(
                "event stream request failed: {e}"
            )))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!(McprobeError::Transport(format!(
                "event stream returned HTTP {status}"
            ))));
        }

        let byte_stream = response.bytes_stream();
        let inbound_tx = self.inbound_tx.clone();
        let last_event_id = Arc::clone(&self.last_event_id);
        tokio::spawn(async move {
            pump_sse_stream(byte_stream, inbound_tx, last_event_id).await;
        });

        Ok(())
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    /// POST a JSON-RPC message to the endpoint.
    ///
    /// Every POST carries `Content-Type: application/json`,
    /// `Accept: application/json, text/event-stream`, and
    /// `MCP-Protocol-Version`; session headers are attached when known.
    /// JSON bodies and SSE events both land on the `receive()` stream, in
    /// arrival order.
    ///
    /// # Errors
    ///
    /// Returns [`McprobeError::Transport`] for I/O failures, `401`, and
    /// other non-success statuses; a `404` while a session is active clears
    /// the session and reports it as expired.
    async fn send(&self, message: String) -> Result<()> {
        let req = self
            .client
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream")
            .header("MCP-Protocol-Version", LATEST_PROTOCOL_VERSION)
            .body(message);
        let req = self.apply_session_headers(req).await;

        let response = req
            .send()
            .await
            .map_err(|e| anyhow::anyhow!(McprobeError::Transport(format!("HTTP POST failed: {e}"))))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            let challenge = response
                .headers()
                .get("WWW-Authenticate")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            return Err(anyhow::anyhow!(McprobeError::Transport(format!(
                "HTTP 401 Unauthorized: {challenge}"
            ))));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            let mut sid = self.session_id.write().await;
            if sid.take().is_some() {
                return Err(anyhow::anyhow!(McprobeError::Transport(
                    "session expired (HTTP 404 with active session)".into()
                )));
            }
            return Err(anyhow::anyhow!(McprobeError::Transport(
                "HTTP 404 Not Found".into()
            )));
        }

        // Notification acknowledgement; nothing to read.
        if status == reqwest::StatusCode::ACCEPTED {
            return Ok(());
        }

        if !status.is_success() {
            return Err(anyhow::anyhow!(McprobeError::Transport(format!(
                "HTTP POST returned status {status}"
            ))));
        }

        // The initialize response is where the session ID first appears.
        if let Some(new_id) = response
            .headers()
            .get("MCP-Session-Id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
        {
            let mut sid = self.session_id.write().await;
            sid.get_or_insert(new_id);
        }

        let content_type = response
            .headers()
            .get("Content-Type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.contains("text/event-stream") {
            let byte_stream = response.bytes_stream();
            let inbound_tx = self.inbound_tx.clone();
            let last_event_id = Arc::clone(&self.last_event_id);
            tokio::spawn(async move {
                pump_sse_stream(byte_stream, inbound_tx, last_event_id).await;
            });
        } else {
            let body = response.text().await.map_err(|e| {
                anyhow::anyhow!(McprobeError::Transport(format!(
                    "failed to read response body: {e}"
                )))
            })?;
            if !body.is_empty() {
                let _ = self.inbound_tx.send(body);
            }
        }

        Ok(())
    }

    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        let rx = Arc::clone(&self.inbound_rx);
        Box::pin(futures::stream::unfold(rx, |rx| async move {
            let mut guard = rx.lock().await;
            let item = guard.recv().await?;
            drop(guard);
            Some((item, rx))
        }))
    }

    fn receive_err(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        let rx = Arc::clone(&self.diag_rx);
        Box::pin(futures::stream::unfold(rx, |rx| async move {
            let mut guard = rx.lock().await;
            let item = guard.recv().await?;
            drop(guard);
            Some((item, rx))
        }))
    }
}

impl Drop for HttpTransport {
    /// Best-effort session termination via HTTP DELETE.
    ///
    /// Runs on its own thread with a blocking client so `drop` never stalls
    /// the async runtime; failures are ignored because `drop` cannot report
    /// them.
    fn drop(&mut self) {
        let session_id = match self.session_id.try_read() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };

        if let Some(sid) = session_id {
            let endpoint = self.endpoint.as_str().to_string();
            let mut headers = self.headers.clone();
            headers.insert("MCP-Session-Id".to_string(), sid);

            let _ = std::thread::spawn(move || {
                if let Ok(client) = reqwest::blocking::Client::builder()
                    .timeout(Duration::from_secs(5))
                    .build()
                {
                    let mut req = client.delete(&endpoint);
                    for (k, v) in &headers {
                        req = req.header(k.as_str(), v.as_str());
                    }
                    let _ = req.send();
                }
            });
        }
    }
}

// ---------------------------------------------------------------------------
// SSE parsing
// ---------------------------------------------------------------------------

/// Consume an SSE byte stream, forwarding each complete `data:` payload.
///
/// Runs until the stream ends or errors; intended for `tokio::spawn`. Field
/// handling:
///
/// - `id:` updates `last_event_id` for reconnect headers.
/// - `event: ping` and `data: [PING]` keepalives are dropped silently.
/// - remaining `data:` lines of an event are joined with `\n` and forwarded.
/// - `retry:` and comment lines (`:`) are ignored.
pub async fn pump_sse_stream(
    byte_stream: impl Stream<Item = reqwest::Result<Bytes>>,
    inbound_tx: mpsc::UnboundedSender<String>,
    last_event_id: Arc<RwLock<Option<String>>>,
) {
    use futures::StreamExt;

    let mut buffer = String::new();
    tokio::pin!(byte_stream);

    while let Some(chunk) = byte_stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(_) => break,
        };
        match std::str::from_utf8(&chunk) {
            Ok(text) => buffer.push_str(text),
            Err(_) => continue,
        }

        // Events are delimited by a blank line.
        while let Some(pos) = buffer.find("\n\n") {
            let block = buffer[..pos].to_string();
            buffer.drain(..pos + 2);
            dispatch_sse_event(&block, &inbound_tx, &last_event_id).await;
        }
    }

    if !buffer.is_empty() {
        dispatch_sse_event(&buffer, &inbound_tx, &last_event_id).await;
    }
}

async fn dispatch_sse_event(
    block: &str,
    inbound_tx: &mpsc::UnboundedSender<String>,
    last_event_id: &Arc<RwLock<Option<String>>>,
) {
    let mut data_lines: Vec<&str> = Vec::new();
    let mut event_type: Option<&str> = None;
    let mut event_id: Option<&str> = None;

    for line in block.lines() {
        if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.trim());
        } else if let Some(value) = line.strip_prefix("id:") {
            event_id = Some(value.trim());
        } else if let Some(value) = line.strip_prefix("event:") {
            event_type = Some(value.trim());
        }
    }

    if let Some(id) = event_id {
        let mut guard = last_event_id.write().await;
        *guard = Some(id.to_string());
    }

    if event_type.is_some_and(|t| t.eq_ignore_ascii_case("ping")) {
        return;
    }

    let data = data_lines.join("\n");
    if data.is_empty() || data.eq_ignore_ascii_case("[ping]") {
        return;
    }

    let _ = inbound_tx.send(data);
}
