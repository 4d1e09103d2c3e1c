//! Client configuration types
//!
//! Defines [`ClientConfig`] and the [`TransportConfig`] sum type. Exactly one
//! transport variant is active by construction -- the "exactly one transport"
//! invariant is structural rather than a runtime check scattered across
//! constructors.
//!
//! Every variant carries `extra_args`: free-form tokens appended to the
//! resolved process arguments (stdio and uvx variants) or folded into the URL
//! query string (HTTP variants) at connection time. Folding happens in
//! [`crate::transport::resolve`], not here; this module is pure data.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default per-request timeout for HTTP transports, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Configuration for the stdio transport: spawn a child process and speak
/// newline-delimited JSON over its stdin/stdout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StdioConfig {
    /// Command to run the MCP server.
    pub command: String,
    /// Arguments for the command, in order.
    pub args: Vec<String>,
    /// Environment variables for the child process.
    pub env: HashMap<String, String>,
    /// Free-form tokens appended to the resolved process args.
    pub extra_args: Vec<String>,
}

/// Configuration for HTTP-based transports (SSE and streamable HTTP).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// URL of the MCP server endpoint.
    pub url: String,
    /// Extra headers merged into every request (auth tokens go here).
    pub headers: HashMap<String, String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Free-form tokens folded into the URL query string.
    pub extra_args: Vec<String>,
}

impl HttpConfig {
    /// The configured timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for a server run through `uvx` by installed package name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UvxConfig {
    /// Name of the installed server package / entry point.
    pub server_name: String,
    /// Arguments passed to the server after its name.
    pub args: Vec<String>,
    /// Python version to run under (e.g. `"3.12"`).
    pub python_version: Option<String>,
    /// Additional packages injected into the ephemeral environment.
    pub with_packages: Vec<String>,
    /// Environment variables for the child process.
    pub env: HashMap<String, String>,
    /// Free-form tokens appended to the resolved process args.
    pub extra_args: Vec<String>,
}

/// Configuration for a server resolved from a local project path
/// (`uvx --from <path> <server-name>`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UvxLocalConfig {
    /// Path to the local server project.
    pub project_path: PathBuf,
    /// Name of the server entry point within the project.
    pub server_name: String,
    /// Arguments passed to the server after its name.
    pub args: Vec<String>,
    /// Python version to run under.
    pub python_version: Option<String>,
    /// Additional packages injected into the ephemeral environment.
    pub with_packages: Vec<String>,
    /// Environment variables for the child process.
    pub env: HashMap<String, String>,
    /// Free-form tokens appended to the resolved process args.
    pub extra_args: Vec<String>,
}

/// Transport selection as a genuine sum type.
///
/// The SSE and streamable-HTTP variants share [`HttpConfig`]; the variant tag
/// is the transport-kind discriminator.
///
/// # Examples
///
/// ```
/// use mcprobe::config::TransportConfig;
///
/// let t = TransportConfig::for_stdio("python", ["server.py"]);
/// assert!(matches!(t, TransportConfig::Stdio(_)));
/// assert!(t.extra_args().is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportConfig {
    /// Child process over stdio.
    Stdio(StdioConfig),
    /// HTTP transport with SSE response streams.
    Sse(HttpConfig),
    /// Streamable HTTP transport.
    Http(HttpConfig),
    /// `uvx <server-name>` for an installed server package.
    Uvx(UvxConfig),
    /// `uvx --from <project-path> <server-name>` for a local project.
    UvxLocal(UvxLocalConfig),
}

impl TransportConfig {
    /// Build a stdio transport configuration.
    pub fn for_stdio(
        command: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        TransportConfig::Stdio(StdioConfig {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: HashMap::new(),
            extra_args: Vec::new(),
        })
    }

    /// Build an SSE transport configuration with the default timeout.
    pub fn for_sse(url: impl Into<String>) -> Self {
        TransportConfig::Sse(HttpConfig {
            url: url.into(),
            headers: HashMap::new(),
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            extra_args: Vec::new(),
        })
    }

    /// Build a streamable-HTTP transport configuration with the default timeout.
    pub fn for_http(url: impl Into<String>) -> Self {
        TransportConfig::Http(HttpConfig {
            url: url.into(),
            headers: HashMap::new(),
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            extra_args: Vec::new(),
        })
    }

    /// Build a configuration for an installed `uvx` server.
    pub fn for_uvx(server_name: impl Into<String>) -> Self {
        TransportConfig::Uvx(UvxConfig {
            server_name: server_name.into(),
            ..Default::default()
        })
    }

    /// Build a configuration for a local-project `uvx` server.
    pub fn for_uvx_local(project_path: impl Into<PathBuf>, server_name: impl Into<String>) -> Self {
        TransportConfig::UvxLocal(UvxLocalConfig {
            project_path: project_path.into(),
            server_name: server_name.into(),
            ..Default::default()
        })
    }

    /// The free-form extra args carried by the active variant.
    pub fn extra_args(&self) -> &[String] {
        match self {
            TransportConfig::Stdio(c) => &c.extra_args,
            TransportConfig::Sse(c) | TransportConfig::Http(c) => &c.extra_args,
            TransportConfig::Uvx(c) => &c.extra_args,
            TransportConfig::UvxLocal(c) => &c.extra_args,
        }
    }

    /// Mutable access to the active variant's extra args.
    pub fn extra_args_mut(&mut self) -> &mut Vec<String> {
        match self {
            TransportConfig::Stdio(c) => &mut c.extra_args,
            TransportConfig::Sse(c) | TransportConfig::Http(c) => &mut c.extra_args,
            TransportConfig::Uvx(c) => &mut c.extra_args,
            TransportConfig::UvxLocal(c) => &mut c.extra_args,
        }
    }

    /// Short identifier for the active variant, used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportConfig::Stdio(_) => "stdio",
            TransportConfig::Sse(_) => "sse",
            TransportConfig::Http(_) => "http",
            TransportConfig::Uvx(_) => "uvx",
            TransportConfig::UvxLocal(_) => "uvx_local",
        }
    }
}

/// Protocol-trace logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level for the trace lines emitted alongside entries.
    pub level: String,
    /// Optional file sink for the tracing subscriber.
    pub log_file: Option<PathBuf>,
    /// Emit a trace line for every outgoing request.
    pub log_requests: bool,
    /// Emit a trace line for every incoming response.
    pub log_responses: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
            log_requests: true,
            log_responses: true,
        }
    }
}

/// Main configuration for the diagnostic client.
///
/// Constructed once from CLI input and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// The single active transport.
    pub transport: TransportConfig,
    /// Client name advertised during the handshake.
    pub client_name: String,
    /// Client version advertised during the handshake.
    pub client_version: String,
    /// Protocol-trace logging options.
    pub logging: LogConfig,
}

impl ClientConfig {
    /// Build a configuration around the given transport with default
    /// identity and logging settings.
    pub fn new(transport: TransportConfig) -> Self {
        Self {
            transport,
            client_name: "mcprobe".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            logging: LogConfig::default(),
        }
    }
}
