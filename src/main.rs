//! mcprobe - Diagnostic client CLI for MCP servers
//!
//! Main entry point: initializes tracing, parses the command line, and
//! dispatches to the command handlers.

use std::path::Path;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mcprobe::cli::{Cli, Commands};
use mcprobe::commands::{self, CommandContext};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before anything reads the environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();

    // The guard must outlive main so buffered log lines get flushed.
    let _log_guard = init_tracing(cli.verbose, cli.log_file.as_deref())?;

    let ctx = CommandContext::from_cli(&cli)?;
    tracing::debug!(transport = ctx.config.transport.kind(), "target resolved");

    match cli.command {
        Commands::Info => commands::info::run_info(&ctx).await,
        Commands::Tools => commands::list::run_tools(&ctx).await,
        Commands::Resources => commands::list::run_resources(&ctx).await,
        Commands::Prompts => commands::list::run_prompts(&ctx).await,
        Commands::Call { name, args } => {
            commands::invoke::run_call(&ctx, &name, args.as_deref()).await
        }
        Commands::Read { uri } => commands::invoke::run_read(&ctx, &uri).await,
        Commands::Prompt { name, args } => commands::invoke::run_prompt(&ctx, &name, &args).await,
        Commands::Ping => commands::invoke::run_ping(&ctx).await,
        Commands::Shell => commands::shell::run_shell(&ctx).await,
    }
}

/// Initialize the tracing subscriber.
///
/// Defaults to `mcprobe=info`; `--verbose` raises it to `mcprobe=debug`;
/// `RUST_LOG` overrides both. With `--log-file` the output goes to the file
/// through a non-blocking writer, otherwise to stderr (keeping stdout free
/// for command output).
fn init_tracing(
    verbose: bool,
    log_file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let default_filter = if verbose { "mcprobe=debug" } else { "mcprobe=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    match log_file {
        Some(path) => {
            let directory = path.parent().filter(|p| !p.as_os_str().is_empty());
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("--log-file has no file name: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(
                directory.unwrap_or_else(|| Path::new(".")),
                file_name,
            );
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false),
                )
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
            Ok(None)
        }
    }
}
