//! `tools`, `resources`, and `prompts` commands: capability listings

use crate::cli::OutputFormat;
use crate::commands::{output, with_session, CommandContext};
use crate::error::Result;

/// List every tool the server exposes, following pagination to the end.
pub async fn run_tools(ctx: &CommandContext) -> Result<()> {
    let output_format = ctx.output;
    let tools = with_session(ctx, |session| {
        Box::pin(async move { session.list_tools().await })
    })
    .await?;

    match output_format {
        OutputFormat::Json => output::print_json(&tools),
        OutputFormat::Table => {
            output::print_tools_table(&tools);
            Ok(())
        }
    }
}

/// List every resource the server exposes.
pub async fn run_resources(ctx: &CommandContext) -> Result<()> {
    let output_format = ctx.output;
    let resources = with_session(ctx, |session| {
        Box::pin(async move { session.list_resources().await })
    })
    .await?;

    match output_format {
        OutputFormat::Json => output::print_json(&resources),
        OutputFormat::Table => {
            output::print_resources_table(&resources);
            Ok(())
        }
    }
}

/// List every prompt template the server exposes.
pub async fn run_prompts(ctx: &CommandContext) -> Result<()> {
    let output_format = ctx.output;
    let prompts = with_session(ctx, |session| {
        Box::pin(async move { session.list_prompts().await })
    })
    .await?;

    match output_format {
        OutputFormat::Json => output::print_json(&prompts),
        OutputFormat::Table => {
            output::print_prompts_table(&prompts);
            Ok(())
        }
    }
}
