//! MCP protocol session: connection lifecycle and capability operations
//!
//! [`Session`] owns one connection to an MCP server. It resolves the
//! configured transport, performs the `initialize` handshake, caches the
//! server's advertised capabilities, and exposes one method per protocol
//! operation. Every exchange is recorded on the session's
//! [`ProtocolLogger`], requests and responses paired with wall-clock
//! timestamps and monotonic durations.
//!
//! # Lifecycle
//!
//! A session starts disconnected. [`Session::connect`] resolves the
//! transport, launches or dials it, runs the handshake, and moves to
//! connected; [`Session::disconnect`] tears everything down. Operations
//! called while disconnected fail with [`McprobeError::NotConnected`] and
//! leave no trace entry. For one-shot use, [`Session::with_connection`]
//! scopes a connection around a closure and guarantees teardown even when
//! the closure errors.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{ClientConfig, TransportConfig};
use crate::error::{McprobeError, Result};
use crate::logger::ProtocolLogger;
use crate::rpc::{start_read_loop, BoxFuture, RpcClient};
use crate::transport::http::HttpTransport;
use crate::transport::stdio::StdioTransport;
use crate::transport::{resolve, ConnectionDescriptor, Transport};
use crate::types::{
    CallToolParams, CallToolResult, CapabilitySet, ClientCapabilities, CreateMessageParams,
    CreateMessageResult, CursorParams, GetPromptParams, GetPromptResult, Implementation,
    InitializeParams, InitializeResult, JsonRpcError, ListPromptsResult, ListResourcesResult,
    ListRootsResult, ListToolsResult, Prompt, ReadResourceResult, Resource, ResourceUriParams,
    Root, ServerCapabilities, Tool, LATEST_PROTOCOL_VERSION, METHOD_INITIALIZE,
    METHOD_INITIALIZED, METHOD_PING, METHOD_PROMPTS_GET, METHOD_PROMPTS_LIST,
    METHOD_RESOURCES_LIST, METHOD_RESOURCES_READ, METHOD_RESOURCES_SUBSCRIBE,
    METHOD_RESOURCES_UNSUBSCRIBE, METHOD_ROOTS_LIST, METHOD_SAMPLING_CREATE_MESSAGE,
    METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, SUPPORTED_PROTOCOL_VERSIONS,
};

/// Whether an error is a JSON-RPC `-32601` from the server.
///
/// Lack of `roots` and `sampling` support is not advertised in the
/// capability set, so this code is the detection signal.
fn is_method_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<JsonRpcError>()
        .is_some_and(JsonRpcError::is_method_not_found)
}

/// Everything that exists only while connected.
struct Connection {
    rpc: Arc<RpcClient>,
    cancel: CancellationToken,
    /// Keeps the transport (and for stdio, the child process) alive.
    _transport: Arc<dyn Transport>,
    inbound_pump: JoinHandle<()>,
    outbound_pump: JoinHandle<()>,
    read_loop: JoinHandle<()>,
    server_info: Implementation,
    capabilities: ServerCapabilities,
    capability_set: CapabilitySet,
    protocol_version: String,
    instructions: Option<String>,
}

impl Drop for Connection {
    /// Stop all background tasks so the transport's own `Drop` can run.
    fn drop(&mut self) {
        self.cancel.cancel();
        self.inbound_pump.abort();
        self.outbound_pump.abort();
        self.read_loop.abort();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("server_info", &self.server_info)
            .field("protocol_version", &self.protocol_version)
            .finish_non_exhaustive()
    }
}

/// A diagnostic session against one MCP server.
///
/// # Examples
///
/// ```no_run
/// use mcprobe::config::{ClientConfig, TransportConfig};
/// use mcprobe::session::Session;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let config = ClientConfig::new(TransportConfig::for_uvx("mcp-server-fetch"));
/// let mut session = Session::new(config);
/// session.connect().await?;
/// for tool in session.list_tools().await? {
///     println!("{}", tool.name);
/// }
/// session.disconnect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Session {
    config: ClientConfig,
    logger: Arc<ProtocolLogger>,
    connection: Option<Connection>,
}

impl Session {
    /// Create a disconnected session for the given configuration.
    pub fn new(config: ClientConfig) -> Self {
        let logger = Arc::new(ProtocolLogger::with_config(&config.logging));
        Self {
            config,
            logger,
            connection: None,
        }
    }

    /// The protocol trace shared with the read loop.
    pub fn logger(&self) -> &Arc<ProtocolLogger> {
        &self.logger
    }

    /// The configuration this session was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Server identity from the handshake; `None` while disconnected.
    pub fn server_info(&self) -> Option<&Implementation> {
        self.connection.as_ref().map(|c| &c.server_info)
    }

    /// Raw capability advertisement from the handshake.
    pub fn capabilities(&self) -> Option<&ServerCapabilities> {
        self.connection.as_ref().map(|c| &c.capabilities)
    }

    /// Flat capability view; all-false while disconnected.
    pub fn capability_set(&self) -> CapabilitySet {
        self.connection
            .as_ref()
            .map(|c| c.capability_set)
            .unwrap_or_default()
    }

    /// The protocol version negotiated during the handshake.
    pub fn protocol_version(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.protocol_version.as_str())
    }

    /// Optional usage instructions the server sent during the handshake.
    pub fn instructions(&self) -> Option<&str> {
        self.connection
            .as_ref()
            .and_then(|c| c.instructions.as_deref())
    }

    fn conn(&self) -> Result<&Connection> {
        self.connection
            .as_ref()
            .ok_or_else(|| McprobeError::NotConnected.into())
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Resolve the transport, connect, and run the `initialize` handshake.
    ///
    /// The handshake exchange is recorded on the trace like any other
    /// request/response pair. On success the server's capabilities are
    /// cached for the lifetime of the connection.
    ///
    /// # Errors
    ///
    /// Returns [`McprobeError::Config`] for invalid transport settings
    /// (before any I/O), [`McprobeError::Transport`] when the server cannot
    /// be launched or dialed, and [`McprobeError::ProtocolVersion`] when the
    /// server selects a version this client does not speak.
    pub async fn connect(&mut self) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }

        let descriptor = resolve(&self.config.transport)?;
        let transport: Arc<dyn Transport> = match descriptor {
            ConnectionDescriptor::Process { command, args, env } => {
                tracing::info!(command, "launching MCP server process");
                Arc::new(StdioTransport::spawn(command, args, env)?)
            }
            ConnectionDescriptor::Endpoint {
                url,
                headers,
                timeout,
            } => {
                tracing::info!(url = %url, "connecting to MCP endpoint");
                let transport = HttpTransport::new(url, headers, timeout)?;
                if matches!(self.config.transport, TransportConfig::Sse(_)) {
                    transport.open_event_stream().await?;
                }
                Arc::new(transport)
            }
        };

        self.connect_transport(transport).await
    }

    /// Wire channels, start the read loop, and perform the handshake over an
    /// already-built transport.
    async fn connect_transport(&mut self, transport: Arc<dyn Transport>) -> Result<()> {
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();
        let cancel = CancellationToken::new();

        let rpc = Arc::new(RpcClient::new(outbound_tx));

        // Pump transport.receive() into the read loop's inbound channel.
        let pump_transport = Arc::clone(&transport);
        let inbound_pump = tokio::spawn(async move {
            let mut stream = pump_transport.receive();
            while let Some(message) = stream.next().await {
                if inbound_tx.send(message).is_err() {
                    break;
                }
            }
        });

        // Pump outbound messages into transport.send(). A send failure
        // cancels the loop so in-flight requests fail fast instead of
        // waiting out their timeout.
        let send_transport = Arc::clone(&transport);
        let pump_cancel = cancel.clone();
        let outbound_pump = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(e) = send_transport.send(message).await {
                    tracing::warn!("transport send failed: {e}");
                    pump_cancel.cancel();
                    break;
                }
            }
        });

        let read_loop = start_read_loop(
            inbound_rx,
            cancel.clone(),
            Arc::clone(&rpc),
            Arc::clone(&self.logger),
        );

        let init = match self.handshake(&rpc).await {
            Ok(init) => init,
            Err(e) => {
                cancel.cancel();
                inbound_pump.abort();
                outbound_pump.abort();
                read_loop.abort();
                return Err(e);
            }
        };

        tracing::info!(
            server = %init.server_info.name,
            version = %init.server_info.version,
            protocol = %init.protocol_version,
            "session established"
        );

        self.connection = Some(Connection {
            rpc,
            cancel,
            _transport: transport,
            inbound_pump,
            outbound_pump,
            read_loop,
            capability_set: CapabilitySet::from(&init.capabilities),
            server_info: init.server_info,
            capabilities: init.capabilities,
            protocol_version: init.protocol_version,
            instructions: init.instructions,
        });
        Ok(())
    }

    /// Run the `initialize` exchange and the `notifications/initialized`
    /// acknowledgement.
    async fn handshake(&self, rpc: &RpcClient) -> Result<InitializeResult> {
        let params = InitializeParams {
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: self.config.client_name.clone(),
                version: self.config.client_version.clone(),
            },
        };
        let params_value = serde_json::to_value(&params)?;
        let handle = self
            .logger
            .log_request(METHOD_INITIALIZE, Some(params_value.clone()));

        let raw: serde_json::Value = match rpc
            .request(METHOD_INITIALIZE, params_value, None)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                self.logger.log_response(
                    METHOD_INITIALIZE,
                    serde_json::Value::Null,
                    Some(&handle),
                    Some(e.to_string()),
                );
                return Err(e);
            }
        };

        let init: InitializeResult = serde_json::from_value(raw.clone())?;
        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&init.protocol_version.as_str()) {
            let err = McprobeError::ProtocolVersion {
                expected: SUPPORTED_PROTOCOL_VERSIONS
                    .iter()
                    .map(|v| v.to_string())
                    .collect(),
                got: init.protocol_version.clone(),
            };
            self.logger.log_response(
                METHOD_INITIALIZE,
                raw,
                Some(&handle),
                Some(err.to_string()),
            );
            return Err(err.into());
        }

        self.logger
            .log_response(METHOD_INITIALIZE, raw, Some(&handle), None);
        rpc.notify(METHOD_INITIALIZED, serde_json::json!({}))?;
        Ok(init)
    }

    /// Tear down the connection. Safe to call while disconnected.
    pub async fn disconnect(&mut self) {
        if let Some(conn) = self.connection.take() {
            tracing::info!(server = %conn.server_info.name, "session closed");
            drop(conn);
        }
    }

    /// Connect, run `f`, and disconnect, even when `f` errors.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mcprobe::config::{ClientConfig, TransportConfig};
    /// use mcprobe::session::Session;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> anyhow::Result<()> {
    /// let config = ClientConfig::new(TransportConfig::for_uvx("mcp-server-fetch"));
    /// let tools = Session::with_connection(config, |session| {
    ///     Box::pin(async move { session.list_tools().await })
    /// })
    /// .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_connection<T, F>(config: ClientConfig, f: F) -> Result<T>
    where
        F: for<'s> FnOnce(&'s Session) -> BoxFuture<'s, Result<T>>,
    {
        let mut session = Session::new(config);
        session.connect().await?;
        let result = f(&session).await;
        session.disconnect().await;
        result
    }

    // -----------------------------------------------------------------------
    // Request plumbing
    // -----------------------------------------------------------------------

    /// Issue one traced request: log, dispatch, log the outcome, and on
    /// failure re-raise after recording an error entry.
    async fn call<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: serde::Serialize + Send,
        R: serde::de::DeserializeOwned,
    {
        let conn = self.conn()?;
        let params_value = serde_json::to_value(&params)?;
        let handle = self.logger.log_request(method, Some(params_value.clone()));

        match conn
            .rpc
            .request::<_, serde_json::Value>(method, params_value, None)
            .await
        {
            Ok(raw) => {
                self.logger
                    .log_response(method, raw.clone(), Some(&handle), None);
                serde_json::from_value(raw).map_err(|e| McprobeError::Serialization(e).into())
            }
            Err(e) => {
                self.logger.log_response(
                    method,
                    serde_json::Value::Null,
                    Some(&handle),
                    Some(e.to_string()),
                );
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Capability operations
    // -----------------------------------------------------------------------

    /// List all tools, following pagination cursors to the end.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page: ListToolsResult = self
                .call(METHOD_TOOLS_LIST, CursorParams { cursor: cursor.clone() })
                .await?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(c) if !c.is_empty() => cursor = Some(c),
                _ => break,
            }
        }
        Ok(tools)
    }

    /// Invoke a tool by name.
    ///
    /// A tool-level failure (`isError: true`) is a successful exchange; the
    /// result carries the flag and the caller decides how to surface it.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<serde_json::Value>,
    ) -> Result<CallToolResult> {
        self.call(
            METHOD_TOOLS_CALL,
            CallToolParams {
                name: name.to_string(),
                arguments,
            },
        )
        .await
    }

    /// List all resources, following pagination cursors to the end.
    pub async fn list_resources(&self) -> Result<Vec<Resource>> {
        let mut resources = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page: ListResourcesResult = self
                .call(
                    METHOD_RESOURCES_LIST,
                    CursorParams { cursor: cursor.clone() },
                )
                .await?;
            resources.extend(page.resources);
            match page.next_cursor {
                Some(c) if !c.is_empty() => cursor = Some(c),
                _ => break,
            }
        }
        Ok(resources)
    }

    /// Read the contents of a resource by URI.
    pub async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult> {
        self.call(
            METHOD_RESOURCES_READ,
            ResourceUriParams {
                uri: uri.to_string(),
            },
        )
        .await
    }

    /// Subscribe to change notifications for a resource URI.
    ///
    /// # Errors
    ///
    /// Returns [`McprobeError::Unsupported`] without sending anything when
    /// the server did not advertise `resources.subscribe`.
    pub async fn subscribe_resource(&self, uri: &str) -> Result<()> {
        let conn = self.conn()?;
        if !conn.capability_set.resources_subscribe {
            return Err(McprobeError::Unsupported(
                "server does not support resource subscriptions".to_string(),
            )
            .into());
        }
        let _: serde_json::Value = self
            .call(
                METHOD_RESOURCES_SUBSCRIBE,
                ResourceUriParams {
                    uri: uri.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    /// Cancel a resource subscription.
    ///
    /// # Errors
    ///
    /// Returns [`McprobeError::Unsupported`] without sending anything when
    /// the server did not advertise `resources.subscribe`.
    pub async fn unsubscribe_resource(&self, uri: &str) -> Result<()> {
        let conn = self.conn()?;
        if !conn.capability_set.resources_subscribe {
            return Err(McprobeError::Unsupported(
                "server does not support resource subscriptions".to_string(),
            )
            .into());
        }
        let _: serde_json::Value = self
            .call(
                METHOD_RESOURCES_UNSUBSCRIBE,
                ResourceUriParams {
                    uri: uri.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    /// List all prompts, following pagination cursors to the end.
    pub async fn list_prompts(&self) -> Result<Vec<Prompt>> {
        let mut prompts = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page: ListPromptsResult = self
                .call(
                    METHOD_PROMPTS_LIST,
                    CursorParams { cursor: cursor.clone() },
                )
                .await?;
            prompts.extend(page.prompts);
            match page.next_cursor {
                Some(c) if !c.is_empty() => cursor = Some(c),
                _ => break,
            }
        }
        Ok(prompts)
    }

    /// Retrieve a rendered prompt by name.
    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<std::collections::HashMap<String, String>>,
    ) -> Result<GetPromptResult> {
        self.call(
            METHOD_PROMPTS_GET,
            GetPromptParams {
                name: name.to_string(),
                arguments,
            },
        )
        .await
    }

    /// Liveness probe.
    ///
    /// Never fails on a protocol error: a server that errors or times out on
    /// `ping` is simply not alive, so the outcome is the boolean. The trace
    /// records `{"success": bool}` either way.
    ///
    /// # Errors
    ///
    /// Only [`McprobeError::NotConnected`], when there is no connection to
    /// probe.
    pub async fn ping(&self) -> Result<bool> {
        let conn = self.conn()?;
        let handle = self.logger.log_request(METHOD_PING, None);
        match conn
            .rpc
            .request::<_, serde_json::Value>(METHOD_PING, serde_json::json!({}), None)
            .await
        {
            Ok(_) => {
                self.logger.log_response(
                    METHOD_PING,
                    serde_json::json!({ "success": true }),
                    Some(&handle),
                    None,
                );
                Ok(true)
            }
            Err(e) => {
                self.logger.log_response(
                    METHOD_PING,
                    serde_json::json!({ "success": false }),
                    Some(&handle),
                    Some(e.to_string()),
                );
                Ok(false)
            }
        }
    }

    /// Ask the server for its exposed roots.
    ///
    /// Root support has no capability advertisement; a `-32601` reply is the
    /// "not supported" signal and degrades to an empty list, recorded on the
    /// trace as an error entry. Any other failure propagates.
    pub async fn list_roots(&self) -> Result<Vec<Root>> {
        let conn = self.conn()?;
        let handle = self.logger.log_request(METHOD_ROOTS_LIST, None);
        match conn
            .rpc
            .request::<_, serde_json::Value>(METHOD_ROOTS_LIST, serde_json::json!({}), None)
            .await
        {
            Ok(raw) => {
                self.logger
                    .log_response(METHOD_ROOTS_LIST, raw.clone(), Some(&handle), None);
                let result: ListRootsResult = serde_json::from_value(raw)?;
                Ok(result.roots)
            }
            Err(e) if is_method_not_found(&e) => {
                self.logger.log_response(
                    METHOD_ROOTS_LIST,
                    serde_json::json!({ "roots": [] }),
                    Some(&handle),
                    Some("Roots not supported".to_string()),
                );
                Ok(Vec::new())
            }
            Err(e) => {
                self.logger.log_response(
                    METHOD_ROOTS_LIST,
                    serde_json::Value::Null,
                    Some(&handle),
                    Some(e.to_string()),
                );
                Err(e)
            }
        }
    }

    /// Ask the server to generate a completion sample.
    ///
    /// # Errors
    ///
    /// Returns [`McprobeError::Unsupported`] when the server answers with
    /// `-32601`; sampling support has no capability advertisement.
    pub async fn create_message(
        &self,
        params: CreateMessageParams,
    ) -> Result<CreateMessageResult> {
        match self.call(METHOD_SAMPLING_CREATE_MESSAGE, params).await {
            Err(e) if is_method_not_found(&e) => Err(McprobeError::Unsupported(
                "server does not support sampling/createMessage".to_string(),
            )
            .into()),
            other => other,
        }
    }
}
