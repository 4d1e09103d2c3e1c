//! mcprobe - Diagnostic client library for MCP servers
//!
//! This library provides the core functionality for the mcprobe diagnostic
//! CLI: transport resolution and implementations, a JSON-RPC client, the
//! protocol session with capability caching, an append-only protocol trace,
//! and normalized result views.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `config`: Transport and client configuration
//! - `transport`: Transport resolution (`resolve`) and the stdio/HTTP
//!   implementations behind the [`transport::Transport`] trait
//! - `rpc`: Transport-agnostic async JSON-RPC 2.0 client and read loop
//! - `session`: Connection lifecycle, handshake, and capability operations
//! - `logger`: Append-only protocol trace with request/response timing
//! - `normalize`: Display-oriented views over raw protocol results
//! - `types`: MCP wire types and JSON-RPC primitives
//! - `error`: Error types and result alias
//! - `cli` / `commands`: Command-line surface
//!
//! # Example
//!
//! ```no_run
//! use mcprobe::config::{ClientConfig, TransportConfig};
//! use mcprobe::session::Session;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::new(TransportConfig::for_uvx("mcp-server-fetch"));
//!     let mut session = Session::new(config);
//!     session.connect().await?;
//!     for tool in session.list_tools().await? {
//!         println!("{}", tool.name);
//!     }
//!     session.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod normalize;
pub mod rpc;
pub mod session;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use config::{ClientConfig, TransportConfig};
pub use error::{McprobeError, Result};
pub use logger::ProtocolLogger;
pub use session::Session;
