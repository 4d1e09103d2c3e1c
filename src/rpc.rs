//! Transport-agnostic async JSON-RPC 2.0 client
//!
//! [`RpcClient`] is a channel-backed JSON-RPC client decoupled from the
//! underlying transport. Callers wire up two [`tokio::sync::mpsc`] channels
//! (outbound and inbound serialized messages) and call [`start_read_loop`]
//! to process responses and notifications concurrently.
//!
//! # Design
//!
//! - In-flight requests live in a `pending` map keyed by `u64` request ID;
//!   each entry is a `oneshot::Sender` resolved when the matching response
//!   arrives.
//! - Inbound server notifications are recorded on the shared
//!   [`ProtocolLogger`] and then offered to any registered handler.
//! - This client exposes no capabilities a server could call, so
//!   server-initiated requests are answered with JSON-RPC `-32601`.
//! - A [`CancellationToken`] stops the read loop and drops all pending
//!   senders, so awaiting callers fail fast instead of hanging.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::{McprobeError, Result};
use crate::logger::ProtocolLogger;
use crate::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, CODE_METHOD_NOT_FOUND};

/// Default timeout applied when the caller does not specify one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Convenience alias for a boxed, `Send`-safe async future.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Called with the raw `params` value when a matching notification arrives.
type NotificationHandler = Box<dyn Fn(serde_json::Value) + Send + Sync + 'static>;

type PendingMap =
    HashMap<u64, oneshot::Sender<std::result::Result<serde_json::Value, JsonRpcError>>>;

/// Transport-agnostic async JSON-RPC 2.0 client.
///
/// Create one with [`RpcClient::new`], then call [`start_read_loop`] with the
/// inbound receiver. Issue requests with [`RpcClient::request`] and
/// fire-and-forget notifications with [`RpcClient::notify`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tokio::sync::mpsc;
/// use tokio_util::sync::CancellationToken;
/// use mcprobe::logger::ProtocolLogger;
/// use mcprobe::rpc::{start_read_loop, RpcClient};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let (out_tx, _out_rx) = mpsc::unbounded_channel::<String>();
///     let (_in_tx, in_rx) = mpsc::unbounded_channel::<String>();
///     let client = Arc::new(RpcClient::new(out_tx));
///     let logger = Arc::new(ProtocolLogger::new());
///     let _handle = start_read_loop(in_rx, CancellationToken::new(), Arc::clone(&client), logger);
///     Ok(())
/// }
/// ```
pub struct RpcClient {
    /// Monotonically increasing request ID counter.
    next_id: Arc<AtomicU64>,
    /// In-flight requests waiting for a response.
    pending: Arc<Mutex<PendingMap>>,
    /// Sends serialized JSON-RPC messages to the transport.
    outbound_tx: mpsc::UnboundedSender<String>,
    /// Handlers for server-sent notifications (method -> handler).
    /// A std mutex so registration is synchronous; handlers never block.
    notification_handlers: Arc<std::sync::Mutex<HashMap<String, NotificationHandler>>>,
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl RpcClient {
    /// Create a new client writing to `outbound_tx`.
    ///
    /// The caller wires `outbound_rx` to a transport writer and calls
    /// [`start_read_loop`] with the corresponding inbound receiver.
    pub fn new(outbound_tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(1)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            outbound_tx,
            notification_handlers: Arc::new(std::sync::Mutex::new(HashMap::new())),
        }
    }

    /// Create a client sharing all internal state with `self`.
    ///
    /// The clone shares the same pending map, ID counter, and handler table,
    /// so a read loop holding one handle resolves responses awaited through
    /// the other. This is how the session wires its own client to the loop's
    /// `Arc`.
    pub fn clone_shared(&self) -> Self {
        Self {
            next_id: Arc::clone(&self.next_id),
            pending: Arc::clone(&self.pending),
            outbound_tx: self.outbound_tx.clone(),
            notification_handlers: Arc::clone(&self.notification_handlers),
        }
    }

    /// Send a request and await the typed response.
    ///
    /// Registers the pending slot before sending, so the response can never
    /// arrive before anyone is waiting for it.
    ///
    /// # Arguments
    ///
    /// * `method` - The JSON-RPC method name
    /// * `params` - Serialized into the `params` field
    /// * `timeout` - Optional; defaults to [`DEFAULT_REQUEST_TIMEOUT`]
    ///
    /// # Errors
    ///
    /// Returns [`McprobeError::Transport`] if the outbound channel is closed
    /// or the read loop exits, [`McprobeError::Timeout`] if no response
    /// arrives in time, and [`McprobeError::Protocol`] for a JSON-RPC error
    /// response (the original error object travels in the anyhow chain so
    /// callers can inspect the code).
    pub async fn request<P, R>(&self, method: &str, params: P, timeout: Option<Duration>) -> Result<R>
    where
        P: serde::Serialize + Send,
        R: serde::de::DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        let message = serde_json::to_string(&JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(serde_json::json!(id)),
            method: method.to_string(),
            params: Some(serde_json::to_value(params)?),
        })?;

        self.outbound_tx
            .send(message)
            .map_err(|_| McprobeError::Transport("outbound channel closed".to_string()))?;

        let deadline = timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let outcome = tokio::time::timeout(deadline, rx).await.map_err(|_| {
            McprobeError::Timeout {
                method: method.to_string(),
            }
        })?;

        let rpc_result = outcome.map_err(|_| {
            McprobeError::Transport("read loop exited before response arrived".to_string())
        })?;

        let value = rpc_result
            .map_err(|e| anyhow::Error::new(McprobeError::Protocol(e.to_string())).context(e))?;

        serde_json::from_value(value).map_err(|e| McprobeError::Serialization(e).into())
    }

    /// Send a notification (no `id`, no reply expected).
    ///
    /// # Errors
    ///
    /// Returns [`McprobeError::Transport`] if the outbound channel is closed.
    pub fn notify<P: serde::Serialize + Send>(&self, method: &str, params: P) -> Result<()> {
        let message = serde_json::to_string(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": serde_json::to_value(params)?
        }))?;

        self.outbound_tx
            .send(message)
            .map_err(|_| McprobeError::Transport("outbound channel closed".to_string()))?;

        Ok(())
    }

    /// Register a handler for a server-sent notification.
    ///
    /// The read loop calls `f` with the raw `params` value (`Null` when
    /// absent) after the notification has been recorded on the trace.
    /// Registering again for the same method replaces the first handler.
    pub fn on_notification(
        &self,
        method: impl Into<String>,
        f: impl Fn(serde_json::Value) + Send + Sync + 'static,
    ) {
        let mut handlers = self
            .notification_handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        handlers.insert(method.into(), Box::new(f));
    }
}

/// Start the JSON-RPC read loop as a background task.
///
/// Each inbound message is classified and dispatched:
///
/// - **Response** (`id` + `result`/`error`): resolves the matching pending
///   sender.
/// - **Server-initiated request** (`id` + `method`): answered with JSON-RPC
///   `-32601 Method not found`; this client serves nothing.
/// - **Notification** (`method`, no `id`): recorded on `logger` as a
///   `notification` entry, then passed to the registered handler, if any.
///
/// On cancellation or inbound-channel close, pending senders are dropped so
/// in-flight `request()` calls fail instead of blocking.
pub fn start_read_loop(
    mut inbound_rx: mpsc::UnboundedReceiver<String>,
    cancellation: CancellationToken,
    client: Arc<RpcClient>,
    logger: Arc<ProtocolLogger>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => {
                    let mut pending = client.pending.lock().await;
                    pending.clear();
                    break;
                }

                maybe_msg = inbound_rx.recv() => {
                    let raw = match maybe_msg {
                        Some(s) => s,
                        None => {
                            let mut pending = client.pending.lock().await;
                            pending.clear();
                            break;
                        }
                    };
                    dispatch_message(&raw, &client, &logger).await;
                }
            }
        }
    })
}

/// Classify and dispatch one inbound JSON string.
async fn dispatch_message(raw: &str, client: &Arc<RpcClient>, logger: &Arc<ProtocolLogger>) {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("read loop: failed to parse inbound JSON: {e}");
            return;
        }
    };

    let has_id = value.get("id").is_some() && !value["id"].is_null();
    let has_method = value.get("method").is_some();
    let has_payload = value.get("result").is_some() || value.get("error").is_some();

    if has_id && has_payload && !has_method {
        handle_response(value, client).await;
    } else if has_id && has_method {
        reject_server_request(value, client);
    } else if has_method && !has_id {
        handle_notification(value, client, logger);
    } else {
        tracing::debug!("read loop: ignoring unclassifiable message");
    }
}

/// Resolve the pending sender for a response.
async fn handle_response(value: serde_json::Value, client: &Arc<RpcClient>) {
    let id_val = &value["id"];
    let id: u64 = if let Some(n) = id_val.as_u64() {
        n
    } else if let Some(n) = id_val.as_str().and_then(|s| s.parse::<u64>().ok()) {
        n
    } else {
        tracing::warn!("read loop: response has non-integer id: {id_val}");
        return;
    };

    let tx = {
        let mut pending = client.pending.lock().await;
        pending.remove(&id)
    };
    let Some(tx) = tx else {
        tracing::debug!("read loop: response for unknown id {id}; ignoring");
        return;
    };

    let outcome: std::result::Result<serde_json::Value, JsonRpcError> =
        if let Some(error_val) = value.get("error") {
            match serde_json::from_value::<JsonRpcError>(error_val.clone()) {
                Ok(e) => Err(e),
                Err(_) => Err(JsonRpcError {
                    code: -32603,
                    message: format!("malformed error object: {error_val}"),
                    data: None,
                }),
            }
        } else {
            Ok(value
                .get("result")
                .cloned()
                .unwrap_or(serde_json::Value::Null))
        };

    // The caller may have timed out already; a failed send is fine.
    let _ = tx.send(outcome);
}

/// Answer a server-initiated request with `-32601`.
fn reject_server_request(value: serde_json::Value, client: &Arc<RpcClient>) {
    let method = value
        .get("method")
        .and_then(|m| m.as_str())
        .unwrap_or("(unknown)");
    tracing::debug!("read loop: rejecting server-initiated request '{method}'");

    let response = JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id: value.get("id").cloned(),
        result: None,
        error: Some(JsonRpcError {
            code: CODE_METHOD_NOT_FOUND,
            message: format!("Method not found: {method}"),
            data: None,
        }),
    };
    if let Ok(serialized) = serde_json::to_string(&response) {
        let _ = client.outbound_tx.send(serialized);
    }
}

/// Record a notification on the trace and offer it to the handler.
fn handle_notification(
    value: serde_json::Value,
    client: &Arc<RpcClient>,
    logger: &Arc<ProtocolLogger>,
) {
    let Some(method) = value.get("method").and_then(|m| m.as_str()) else {
        return;
    };
    let params = value.get("params").cloned();
    logger.log_notification(method, params.clone());

    let handlers = client
        .notification_handlers
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(handler) = handlers.get(method) {
        handler(params.unwrap_or(serde_json::Value::Null));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::Direction;
    use std::sync::atomic::AtomicUsize;

    /// Build a wired client with both channel ends and the logger exposed.
    fn make_client() -> (
        Arc<RpcClient>,
        mpsc::UnboundedReceiver<String>,
        mpsc::UnboundedSender<String>,
        Arc<ProtocolLogger>,
        CancellationToken,
    ) {
        let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();
        let token = CancellationToken::new();
        let client = Arc::new(RpcClient::new(out_tx));
        let logger = Arc::new(ProtocolLogger::new());
        start_read_loop(in_rx, token.clone(), Arc::clone(&client), Arc::clone(&logger));
        (client, out_rx, in_tx, logger, token)
    }

    #[tokio::test]
    async fn test_request_resolves_with_result() {
        let (client, mut out_rx, in_tx, _logger, _ct) = make_client();

        tokio::spawn(async move {
            let sent = out_rx.recv().await.unwrap();
            let req: serde_json::Value = serde_json::from_str(&sent).unwrap();
            let resp = serde_json::json!({
                "jsonrpc": "2.0",
                "id": req["id"],
                "result": { "ok": true }
            });
            in_tx.send(serde_json::to_string(&resp).unwrap()).unwrap();
        });

        let result: serde_json::Value = client
            .request("ping", serde_json::json!({}), Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(result["ok"], true);
    }

    #[tokio::test]
    async fn test_request_times_out_without_response() {
        let (client, _out_rx, _in_tx, _logger, _ct) = make_client();

        let result: Result<serde_json::Value> = client
            .request(
                "tools/list",
                serde_json::json!({}),
                Some(Duration::from_millis(50)),
            )
            .await;
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<McprobeError>(),
            Some(McprobeError::Timeout { method }) if method == "tools/list"
        ));
    }

    #[tokio::test]
    async fn test_error_response_surfaces_as_protocol_error() {
        let (client, mut out_rx, in_tx, _logger, _ct) = make_client();

        tokio::spawn(async move {
            let sent = out_rx.recv().await.unwrap();
            let req: serde_json::Value = serde_json::from_str(&sent).unwrap();
            let resp = serde_json::json!({
                "jsonrpc": "2.0",
                "id": req["id"],
                "error": { "code": -32601, "message": "Method not found" }
            });
            in_tx.send(serde_json::to_string(&resp).unwrap()).unwrap();
        });

        let result: Result<serde_json::Value> = client
            .request(
                "roots/list",
                serde_json::json!({}),
                Some(Duration::from_secs(5)),
            )
            .await;
        let err = result.unwrap_err();
        // The typed Protocol error is in the chain and the original JSON-RPC
        // error object travels with it so callers can check the code.
        assert!(err.to_string().contains("Method not found"));
        assert!(err
            .downcast_ref::<JsonRpcError>()
            .is_some_and(|e| e.is_method_not_found()));
    }

    #[tokio::test]
    async fn test_notification_recorded_on_logger_and_handler_called() {
        let (client, _out_rx, in_tx, logger, _ct) = make_client();

        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        client.on_notification("notifications/resources/updated", move |_params| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        let notif = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "notifications/resources/updated",
            "params": { "uri": "file:///a.txt" }
        });
        in_tx.send(serde_json::to_string(&notif).unwrap()).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        let entries = logger.get_entries(Some(Direction::Notification), None, None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].method, "notifications/resources/updated");
        assert_eq!(entries[0].data["uri"], "file:///a.txt");
    }

    #[tokio::test]
    async fn test_unhandled_notification_still_recorded() {
        let (_client, _out_rx, in_tx, logger, _ct) = make_client();

        let notif = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "notifications/progress"
        });
        in_tx.send(serde_json::to_string(&notif).unwrap()).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(
            logger
                .get_entries(Some(Direction::Notification), None, None)
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_server_initiated_request_rejected_with_method_not_found() {
        let (_client, mut out_rx, in_tx, _logger, _ct) = make_client();

        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 99,
            "method": "sampling/createMessage",
            "params": {}
        });
        in_tx.send(serde_json::to_string(&request).unwrap()).unwrap();

        let raw = tokio::time::timeout(Duration::from_secs(2), out_rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        let resp: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(resp["id"], 99);
        assert_eq!(resp["error"]["code"], CODE_METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancellation_fails_inflight_requests() {
        let (client, _out_rx, _in_tx, _logger, token) = make_client();

        let client_clone = Arc::clone(&client);
        let request_task = tokio::spawn(async move {
            client_clone
                .request::<_, serde_json::Value>(
                    "tools/list",
                    serde_json::json!({}),
                    Some(Duration::from_secs(10)),
                )
                .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(2), request_task)
            .await
            .expect("request did not resolve after cancellation")
            .expect("task panicked");
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_requests_get_distinct_ids() {
        let (client, mut out_rx, in_tx, _logger, _ct) = make_client();

        tokio::spawn(async move {
            while let Some(raw) = out_rx.recv().await {
                let req: serde_json::Value = serde_json::from_str(&raw).unwrap();
                if let Some(id) = req.get("id") {
                    let resp = serde_json::json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "result": { "echo": id }
                    });
                    in_tx.send(serde_json::to_string(&resp).unwrap()).unwrap();
                }
            }
        });

        let (r1, r2, r3) = tokio::join!(
            client.request::<_, serde_json::Value>("ping", serde_json::json!({}), None),
            client.request::<_, serde_json::Value>("ping", serde_json::json!({}), None),
            client.request::<_, serde_json::Value>("ping", serde_json::json!({}), None),
        );

        let ids: std::collections::HashSet<u64> = [r1.unwrap(), r2.unwrap(), r3.unwrap()]
            .into_iter()
            .map(|v| v["echo"].as_u64().unwrap())
            .collect();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_notify_sends_without_id() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let client = RpcClient::new(out_tx);

        client
            .notify("notifications/initialized", serde_json::json!({}))
            .unwrap();

        let raw = out_rx.recv().await.unwrap();
        let val: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(val["method"], "notifications/initialized");
        assert!(val.get("id").is_none());
    }

    #[test]
    fn test_notify_fails_when_channel_closed() {
        let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
        drop(out_rx);
        let client = RpcClient::new(out_tx);
        assert!(client.notify("ping", serde_json::json!({})).is_err());
    }

    #[tokio::test]
    async fn test_clone_shared_resolves_through_same_pending_map() {
        let (client, mut out_rx, in_tx, _logger, _ct) = make_client();
        let owned = client.clone_shared();

        tokio::spawn(async move {
            let sent = out_rx.recv().await.unwrap();
            let req: serde_json::Value = serde_json::from_str(&sent).unwrap();
            let resp = serde_json::json!({
                "jsonrpc": "2.0",
                "id": req["id"],
                "result": {}
            });
            in_tx.send(serde_json::to_string(&resp).unwrap()).unwrap();
        });

        // The read loop services `client`; the request goes through `owned`.
        let result: Result<serde_json::Value> = owned
            .request("ping", serde_json::json!({}), Some(Duration::from_secs(5)))
            .await;
        assert!(result.is_ok());
    }
}
