//! Transport abstraction, resolution, and implementations
//!
//! [`resolve`] turns a [`TransportConfig`] into a [`ConnectionDescriptor`]
//! without performing any I/O: a process launch plan for the stdio-family
//! variants, or a prepared endpoint for the HTTP-family variants. All
//! extra-arg folding happens here, so the concrete transports receive
//! fully-resolved inputs.
//!
//! The [`Transport`] trait is intentionally minimal: callers `send` a
//! serialized JSON-RPC string and `receive` a stream of serialized JSON-RPC
//! strings, one per logical message. Framing, session headers, and
//! reconnection are each implementation's concern. The `receive_err` stream
//! carries transport-level diagnostics (stderr of a child process); per the
//! MCP spec, diagnostic output is never an error condition.
//!
//! Concrete implementations:
//!
//! - [`stdio::StdioTransport`] -- child process over stdin/stdout pipes
//!   (newline-delimited JSON).
//! - [`http::HttpTransport`] -- streamable HTTP with SSE response parsing;
//!   serves both the `sse` and `http` config variants.
//! - [`fake::FakeTransport`] -- in-process fake used in tests (cfg(test)
//!   only).

use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use url::Url;

use crate::config::TransportConfig;
use crate::error::{McprobeError, Result};

pub mod http;
pub mod stdio;

#[cfg(test)]
pub mod fake;

/// Abstraction over the wire channel to an MCP server.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send a complete JSON-RPC message string to the remote peer.
    ///
    /// The string MUST be a single, complete JSON object. The transport
    /// applies whatever framing the medium needs (a trailing newline for
    /// stdio, an HTTP POST for the streamable transport).
    ///
    /// # Errors
    ///
    /// Returns [`McprobeError::Transport`] if the underlying I/O fails.
    async fn send(&self, message: String) -> Result<()>;

    /// Stream of inbound JSON-RPC message strings.
    ///
    /// Each item is a single, complete JSON object. The stream ends when the
    /// transport closes or the remote peer disconnects.
    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>>;

    /// Stream of transport-level diagnostic strings.
    ///
    /// For stdio transports this carries the child's stderr lines; for HTTP
    /// transports it is empty. Diagnostics are never an error condition.
    fn receive_err(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>>;
}

/// A fully-resolved connection plan, produced by [`resolve`] without
/// touching the network or the process table.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionDescriptor {
    /// Launch a child process and speak newline-delimited JSON over stdio.
    Process {
        /// Executable to launch.
        command: String,
        /// Full argument vector, extra args already folded in.
        args: Vec<String>,
        /// Environment for the child.
        env: HashMap<String, String>,
    },
    /// Connect to an HTTP endpoint.
    Endpoint {
        /// Endpoint URL, extra args already folded into the query string.
        url: Url,
        /// Headers merged into every request.
        headers: HashMap<String, String>,
        /// Per-request timeout.
        timeout: Duration,
    },
}

/// Fold free-form extra-arg tokens into a URL's query string.
///
/// Each token splits once on `=` into a key/value pair; a token without `=`
/// becomes `<token>=true`. Existing query parameters are preserved and the
/// new pairs are appended after them, in token order. An empty token list
/// leaves the URL untouched.
fn fold_query_args(url: &mut Url, extra_args: &[String]) {
    if extra_args.is_empty() {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for token in extra_args {
        match token.split_once('=') {
            Some((key, value)) => pairs.append_pair(key, value),
            None => pairs.append_pair(token, "true"),
        };
    }
}

/// Append extra-arg tokens to a process argument vector, in order.
fn fold_process_args(args: &mut Vec<String>, extra_args: &[String]) {
    args.extend(extra_args.iter().cloned());
}

/// Resolve a transport configuration into a connection plan.
///
/// Pure: performs no I/O and has no side effects, so resolution failures
/// surface before any connection attempt and never produce a trace entry.
///
/// # Errors
///
/// Returns [`McprobeError::Config`] when a required field is empty and
/// [`McprobeError::Url`] when an endpoint URL does not parse.
///
/// # Examples
///
/// ```
/// use mcprobe::config::TransportConfig;
/// use mcprobe::transport::{resolve, ConnectionDescriptor};
///
/// let desc = resolve(&TransportConfig::for_uvx("my-server")).unwrap();
/// match desc {
///     ConnectionDescriptor::Process { command, args, .. } => {
///         assert_eq!(command, "uvx");
///         assert_eq!(args, vec!["my-server"]);
///     }
///     _ => unreachable!(),
/// }
/// ```
pub fn resolve(config: &TransportConfig) -> Result<ConnectionDescriptor> {
    match config {
        TransportConfig::Stdio(cfg) => {
            if cfg.command.is_empty() {
                return Err(McprobeError::Config("stdio transport requires a command".into()).into());
            }
            let mut args = cfg.args.clone();
            fold_process_args(&mut args, &cfg.extra_args);
            Ok(ConnectionDescriptor::Process {
                command: cfg.command.clone(),
                args,
                env: cfg.env.clone(),
            })
        }
        TransportConfig::Sse(cfg) | TransportConfig::Http(cfg) => {
            if cfg.url.is_empty() {
                return Err(McprobeError::Config("HTTP transport requires a URL".into()).into());
            }
            let mut url = Url::parse(&cfg.url).map_err(McprobeError::Url)?;
            fold_query_args(&mut url, &cfg.extra_args);
            Ok(ConnectionDescriptor::Endpoint {
                url,
                headers: cfg.headers.clone(),
                timeout: cfg.timeout(),
            })
        }
        TransportConfig::Uvx(cfg) => {
            if cfg.server_name.is_empty() {
                return Err(
                    McprobeError::Config("uvx transport requires a server name".into()).into(),
                );
            }
            let mut args = Vec::new();
            if let Some(python) = &cfg.python_version {
                args.push("--python".to_string());
                args.push(python.clone());
            }
            for package in &cfg.with_packages {
                args.push("--with".to_string());
                args.push(package.clone());
            }
            args.push(cfg.server_name.clone());
            args.extend(cfg.args.iter().cloned());
            fold_process_args(&mut args, &cfg.extra_args);
            Ok(ConnectionDescriptor::Process {
                command: "uvx".to_string(),
                args,
                env: cfg.env.clone(),
            })
        }
        TransportConfig::UvxLocal(cfg) => {
            if cfg.project_path.as_os_str().is_empty() {
                return Err(
                    McprobeError::Config("local uvx transport requires a project path".into())
                        .into(),
                );
            }
            if cfg.server_name.is_empty() {
                return Err(
                    McprobeError::Config("local uvx transport requires a server name".into())
                        .into(),
                );
            }
            let mut args = vec![
                "--from".to_string(),
                cfg.project_path.display().to_string(),
            ];
            if let Some(python) = &cfg.python_version {
                args.push("--python".to_string());
                args.push(python.clone());
            }
            for package in &cfg.with_packages {
                args.push("--with".to_string());
                args.push(package.clone());
            }
            args.push(cfg.server_name.clone());
            args.extend(cfg.args.iter().cloned());
            fold_process_args(&mut args, &cfg.extra_args);
            Ok(ConnectionDescriptor::Process {
                command: "uvx".to_string(),
                args,
                env: cfg.env.clone(),
            })
        }
    }
}
