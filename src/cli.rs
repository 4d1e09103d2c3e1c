//! Command-line interface definition for mcprobe
//!
//! This module defines the CLI structure using clap's derive API. Exactly
//! one transport target flag must be given; the remaining flags modify the
//! selected transport and are translated into a [`TransportConfig`] by
//! [`TargetArgs::to_transport_config`].

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{
    HttpConfig, StdioConfig, TransportConfig, UvxConfig, UvxLocalConfig, DEFAULT_HTTP_TIMEOUT_SECS,
};
use crate::error::{McprobeError, Result};

/// mcprobe - Diagnostic client for MCP servers
///
/// Connect to a Model Context Protocol server over stdio, SSE, or
/// streamable HTTP, exercise its capabilities, and inspect the full
/// protocol exchange.
#[derive(Parser, Debug, Clone)]
#[command(name = "mcprobe")]
#[command(version, about, long_about = None)]
#[command(group(
    clap::ArgGroup::new("target")
        .required(true)
        .multiple(false)
))]
pub struct Cli {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Write tracing output to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Export the protocol trace as JSON to this file before exiting
    #[arg(long, value_name = "PATH")]
    pub export_log: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// How results are rendered.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables
    Table,
    /// Machine-readable JSON
    Json,
}

/// Transport target selection and its modifiers.
///
/// Exactly one of `--stdio`, `--sse`, `--http`, `--uvx`, or `--uvx-local`
/// must be supplied.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Launch COMMAND (whitespace-split) and speak stdio
    #[arg(long, value_name = "COMMAND", group = "target")]
    pub stdio: Option<String>,

    /// Connect to an SSE endpoint
    #[arg(long, value_name = "URL", group = "target")]
    pub sse: Option<String>,

    /// Connect to a streamable HTTP endpoint
    #[arg(long, value_name = "URL", group = "target")]
    pub http: Option<String>,

    /// Run a uvx-installed server package
    #[arg(long, value_name = "PACKAGE", group = "target")]
    pub uvx: Option<String>,

    /// Run a server from a local project directory via uvx --from
    #[arg(long, value_name = "PATH", group = "target")]
    pub uvx_local: Option<PathBuf>,

    /// Server entry point name inside the local project (with --uvx-local)
    #[arg(
        long,
        value_name = "NAME",
        requires = "uvx_local",
        conflicts_with_all = ["stdio", "sse", "http", "uvx"]
    )]
    pub server_name: Option<String>,

    /// Argument passed to the launched server (repeatable)
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    pub server_args: Vec<String>,

    /// HTTP header as KEY=VALUE (repeatable; http/sse only)
    #[arg(long = "header", value_name = "KEY=VALUE")]
    pub headers: Vec<String>,

    /// Environment variable as KEY=VALUE for launched servers (repeatable)
    #[arg(long = "env-var", value_name = "KEY=VALUE")]
    pub env_vars: Vec<String>,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Python version for uvx (e.g. 3.12)
    #[arg(long, value_name = "VERSION")]
    pub python: Option<String>,

    /// Additional package installed alongside a uvx server (repeatable)
    #[arg(long = "with", value_name = "PACKAGE")]
    pub with_packages: Vec<String>,

    /// Free-form token folded into the transport: appended to the argument
    /// vector for process transports, appended to the URL query string
    /// (KEY=VALUE, or KEY meaning KEY=true) for HTTP transports (repeatable)
    #[arg(long = "extra-arg", value_name = "TOKEN")]
    pub extra_args: Vec<String>,
}

/// Parse repeated `KEY=VALUE` tokens into a map.
fn parse_pairs(tokens: &[String], what: &str) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for token in tokens {
        let (key, value) = token.split_once('=').ok_or_else(|| {
            McprobeError::Config(format!("{what} must be KEY=VALUE, got `{token}`"))
        })?;
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}

impl TargetArgs {
    /// Translate the parsed flags into a transport configuration.
    ///
    /// # Errors
    ///
    /// Returns [`McprobeError::Config`] when a `--header` or `--env-var`
    /// token is not `KEY=VALUE`, or when `--uvx-local` is given without
    /// `--server-name`.
    pub fn to_transport_config(&self) -> Result<TransportConfig> {
        let env = parse_pairs(&self.env_vars, "--env-var")?;

        if let Some(command_line) = &self.stdio {
            let mut parts = command_line.split_whitespace().map(str::to_string);
            let command = parts.next().unwrap_or_default();
            let mut args: Vec<String> = parts.collect();
            args.extend(self.server_args.iter().cloned());
            return Ok(TransportConfig::Stdio(StdioConfig {
                command,
                args,
                env,
                extra_args: self.extra_args.clone(),
            }));
        }

        if let Some(url) = self.sse.as_ref().or(self.http.as_ref()) {
            let headers = parse_pairs(&self.headers, "--header")?;
            let http = HttpConfig {
                url: url.clone(),
                headers,
                timeout_secs: self.timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
                extra_args: self.extra_args.clone(),
            };
            return Ok(if self.sse.is_some() {
                TransportConfig::Sse(http)
            } else {
                TransportConfig::Http(http)
            });
        }

        if let Some(package) = &self.uvx {
            return Ok(TransportConfig::Uvx(UvxConfig {
                server_name: package.clone(),
                args: self.server_args.clone(),
                python_version: self.python.clone(),
                with_packages: self.with_packages.clone(),
                env,
                extra_args: self.extra_args.clone(),
            }));
        }

        if let Some(project_path) = &self.uvx_local {
            let server_name = self.server_name.clone().ok_or_else(|| {
                McprobeError::Config("--uvx-local requires --server-name".to_string())
            })?;
            return Ok(TransportConfig::UvxLocal(UvxLocalConfig {
                project_path: project_path.clone(),
                server_name,
                args: self.server_args.clone(),
                python_version: self.python.clone(),
                with_packages: self.with_packages.clone(),
                env,
                extra_args: self.extra_args.clone(),
            }));
        }

        // clap's group(required = true) guarantees one target is present.
        Err(McprobeError::Config("no transport target selected".to_string()).into())
    }
}

/// Available commands for mcprobe
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Connect, handshake, and show server identity and capabilities
    Info,

    /// List the server's tools
    Tools,

    /// List the server's resources
    Resources,

    /// List the server's prompt templates
    Prompts,

    /// Invoke a tool by name
    Call {
        /// Tool name
        name: String,

        /// Tool arguments as a JSON object
        #[arg(long, value_name = "JSON")]
        args: Option<String>,
    },

    /// Read a resource by URI
    Read {
        /// Resource URI
        uri: String,
    },

    /// Render a prompt template
    Prompt {
        /// Prompt name
        name: String,

        /// Template argument as KEY=VALUE (repeatable)
        #[arg(long = "arg", value_name = "KEY=VALUE")]
        args: Vec<String>,
    },

    /// Probe server liveness
    Ping,

    /// Interactive shell against one connection
    Shell,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
