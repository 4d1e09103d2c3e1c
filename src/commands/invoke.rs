//! `call`, `read`, `prompt`, and `ping` commands: single-operation probes

use std::collections::HashMap;

use colored::Colorize;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::commands::{output, with_session, CommandContext};
use crate::error::{McprobeError, Result};
use crate::normalize::{flatten_prompt, flatten_resource, NormalizedToolResult};

/// Parse a raw tool-argument payload (the one-shot `--args` flag or a
/// shell `call` payload).
///
/// Must be a JSON object or absent; anything else is rejected before a
/// connection is made.
pub(crate) fn parse_tool_arguments(raw: Option<&str>) -> Result<Option<serde_json::Value>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| McprobeError::Config(format!("--args is not valid JSON: {e}")))?;
    if !value.is_object() {
        return Err(
            McprobeError::Config("--args must be a JSON object, e.g. '{\"a\": 5}'".to_string())
                .into(),
        );
    }
    Ok(Some(value))
}

/// Parse repeated `KEY=VALUE` prompt arguments, shared by the one-shot
/// `prompt` command and the shell's `prompt` dispatch.
pub(crate) fn parse_prompt_arguments(tokens: &[String]) -> Result<Option<HashMap<String, String>>> {
    if tokens.is_empty() {
        return Ok(None);
    }
    let mut map = HashMap::new();
    for token in tokens {
        let (key, value) = token.split_once('=').ok_or_else(|| {
            McprobeError::Config(format!("prompt arguments must be KEY=VALUE, got `{token}`"))
        })?;
        map.insert(key.to_string(), value.to_string());
    }
    Ok(Some(map))
}

/// Invoke one tool and render its normalized result.
pub async fn run_call(ctx: &CommandContext, name: &str, args: Option<&str>) -> Result<()> {
    let arguments = parse_tool_arguments(args)?;
    let output_format = ctx.output;
    let tool_name = name.to_string();
    let call_args = arguments.clone();

    let result = with_session(ctx, move |session| {
        Box::pin(async move { session.call_tool(&tool_name, call_args).await })
    })
    .await?;

    let normalized = NormalizedToolResult::new(name, arguments, result);
    match output_format {
        OutputFormat::Json => output::print_json(&normalized),
        OutputFormat::Table => {
            output::print_tool_result(&normalized);
            Ok(())
        }
    }
}

/// Read one resource and render its flattened contents.
pub async fn run_read(ctx: &CommandContext, uri: &str) -> Result<()> {
    let output_format = ctx.output;
    let resource_uri = uri.to_string();

    let result = with_session(ctx, move |session| {
        Box::pin(async move { session.read_resource(&resource_uri).await })
    })
    .await?;

    let views = flatten_resource(&result);
    match output_format {
        OutputFormat::Json => output::print_json(&views),
        OutputFormat::Table => {
            output::print_resource_views(&views);
            Ok(())
        }
    }
}

/// Render one prompt template with the given arguments.
pub async fn run_prompt(ctx: &CommandContext, name: &str, args: &[String]) -> Result<()> {
    let arguments = parse_prompt_arguments(args)?;
    let output_format = ctx.output;
    let prompt_name = name.to_string();

    let result = with_session(ctx, move |session| {
        Box::pin(async move { session.get_prompt(&prompt_name, arguments).await })
    })
    .await?;

    let views = flatten_prompt(&result);
    match output_format {
        OutputFormat::Json => output::print_json(&json!({
            "description": result.description,
            "messages": views,
        })),
        OutputFormat::Table => {
            output::print_prompt_views(result.description.as_deref(), &views);
            Ok(())
        }
    }
}

/// Probe liveness; a dead server is a command failure.
pub async fn run_ping(ctx: &CommandContext) -> Result<()> {
    let output_format = ctx.output;
    let alive = with_session(ctx, |session| {
        Box::pin(async move { session.ping().await })
    })
    .await?;

    match output_format {
        OutputFormat::Json => output::print_json(&json!({ "alive": alive }))?,
        OutputFormat::Table => {
            if alive {
                println!("{}", "server answered ping".green());
            } else {
                println!("{}", "server did not answer ping".red());
            }
        }
    }

    if alive {
        Ok(())
    } else {
        Err(McprobeError::Transport("server did not answer ping".to_string()).into())
    }
}
