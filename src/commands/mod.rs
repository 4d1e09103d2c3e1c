//! Command handlers for the CLI
//!
//! Each subcommand gets a handler that builds a [`Session`], runs one or
//! more protocol operations, and renders the outcome per the `--output`
//! flag. The shared plumbing lives here: translating parsed CLI flags into
//! a [`CommandContext`] and scoping a connection around a handler with
//! [`with_session`], which also honors `--export-log` on the way out.

use std::path::PathBuf;

use crate::cli::{Cli, OutputFormat};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::rpc::BoxFuture;
use crate::session::Session;

pub mod info;
pub mod invoke;
pub mod list;
pub mod output;
pub mod shell;

/// Everything a handler needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Client configuration derived from the target flags.
    pub config: ClientConfig,
    /// Rendering mode.
    pub output: OutputFormat,
    /// Where to write the protocol trace before exiting, if anywhere.
    pub export_log: Option<PathBuf>,
}

impl CommandContext {
    /// Build the context from parsed CLI flags.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::McprobeError::Config`] when the target flags
    /// do not translate into a valid transport configuration.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let transport = cli.target.to_transport_config()?;
        Ok(Self {
            config: ClientConfig::new(transport),
            output: cli.output,
            export_log: cli.export_log.clone(),
        })
    }
}

/// Connect, run `f`, export the trace if requested, and disconnect.
///
/// The trace is exported even when `f` fails, so a diagnostic run that hits
/// an error still leaves its evidence behind. When both fail, the handler's
/// error wins.
pub async fn with_session<T, F>(ctx: &CommandContext, f: F) -> Result<T>
where
    F: for<'s> FnOnce(&'s Session) -> BoxFuture<'s, Result<T>>,
{
    let mut session = Session::new(ctx.config.clone());
    session.connect().await?;
    let result = f(&session).await;
    let export = export_trace(&session, ctx.export_log.as_deref());
    session.disconnect().await;
    match (result, export) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), _) => Err(e),
    }
}

/// Write the session's protocol trace to `path` as pretty JSON.
pub(crate) fn export_trace(session: &Session, path: Option<&std::path::Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let json = session.logger().export_json()?;
    std::fs::write(path, json)?;
    tracing::info!(path = %path.display(), "protocol trace exported");
    Ok(())
}
