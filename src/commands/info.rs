//! `info` command: handshake and capability summary

use serde_json::json;

use crate::commands::{output, with_session, CommandContext};
use crate::cli::OutputFormat;
use crate::error::Result;

/// Connect, handshake, and print the server's identity and capabilities.
pub async fn run_info(ctx: &CommandContext) -> Result<()> {
    let output_format = ctx.output;
    with_session(ctx, move |session| {
        Box::pin(async move {
            // connect() already ran the handshake; everything is cached.
            let server = session
                .server_info()
                .cloned()
                .unwrap_or_else(|| crate::types::Implementation {
                    name: "(unknown)".to_string(),
                    version: String::new(),
                });
            let caps = session.capability_set();

            match output_format {
                OutputFormat::Json => output::print_json(&json!({
                    "serverInfo": server,
                    "protocolVersion": session.protocol_version(),
                    "instructions": session.instructions(),
                    "capabilities": session.capabilities(),
                    "capabilitySet": caps,
                }))?,
                OutputFormat::Table => output::print_server_info(
                    &server,
                    session.protocol_version().unwrap_or("(unknown)"),
                    session.instructions(),
                    &caps,
                ),
            }
            Ok(())
        })
    })
    .await
}
