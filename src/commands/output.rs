//! Rendering helpers shared by the command handlers
//!
//! Tables for humans, pretty JSON for machines. Handlers pick one based on
//! the `--output` flag and otherwise stay free of formatting concerns.

use colored::Colorize;
use prettytable::{row, Table};

use crate::error::Result;
use crate::logger::LogEntry;
use crate::normalize::{NormalizedToolResult, PromptMessageView, ResourceView};
use crate::types::{CapabilitySet, Implementation, Prompt, Resource, Root, Tool};

/// Pretty-print any serializable value as JSON to stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn yes_no(flag: bool) -> String {
    if flag {
        "Yes".green().to_string()
    } else {
        "No".dimmed().to_string()
    }
}

/// One-line truncation for table cells.
fn ellipsize(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}\u{2026}")
    }
}

/// Print the handshake summary: identity, negotiated version, capabilities.
pub fn print_server_info(
    server: &Implementation,
    protocol_version: &str,
    instructions: Option<&str>,
    caps: &CapabilitySet,
) {
    println!();
    println!("Server:   {} {}", server.name.bold(), server.version);
    println!("Protocol: {protocol_version}");
    if let Some(instructions) = instructions {
        println!("Notes:    {}", ellipsize(instructions, 100));
    }
    println!();

    let mut table = Table::new();
    table.add_row(row!["Capability", "Supported"]);
    table.add_row(row!["tools", yes_no(caps.tools)]);
    table.add_row(row!["resources", yes_no(caps.resources)]);
    table.add_row(row!["resources/subscribe", yes_no(caps.resources_subscribe)]);
    table.add_row(row!["prompts", yes_no(caps.prompts)]);
    table.add_row(row!["logging", yes_no(caps.logging)]);
    table.add_row(row!["completions", yes_no(caps.completions)]);
    table.printstd();
    println!();
}

/// Print the tool list as a table.
pub fn print_tools_table(tools: &[Tool]) {
    if tools.is_empty() {
        println!("No tools exposed by this server.");
        return;
    }
    let mut table = Table::new();
    table.add_row(row!["Name", "Description"]);
    for tool in tools {
        table.add_row(row![
            tool.name,
            ellipsize(tool.description.as_deref().unwrap_or(""), 80)
        ]);
    }
    println!("\n{} tool(s):\n", tools.len());
    table.printstd();
    println!();
}

/// Print the resource list as a table.
pub fn print_resources_table(resources: &[Resource]) {
    if resources.is_empty() {
        println!("No resources exposed by this server.");
        return;
    }
    let mut table = Table::new();
    table.add_row(row!["URI", "Name", "MIME Type"]);
    for resource in resources {
        table.add_row(row![
            resource.uri,
            resource.name,
            resource.mime_type.as_deref().unwrap_or("-")
        ]);
    }
    println!("\n{} resource(s):\n", resources.len());
    table.printstd();
    println!();
}

/// Print the prompt list as a table.
pub fn print_prompts_table(prompts: &[Prompt]) {
    if prompts.is_empty() {
        println!("No prompts exposed by this server.");
        return;
    }
    let mut table = Table::new();
    table.add_row(row!["Name", "Arguments", "Description"]);
    for prompt in prompts {
        let arguments = prompt
            .arguments
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .map(|a| {
                if a.required.unwrap_or(false) {
                    format!("{}*", a.name)
                } else {
                    a.name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(row![
            prompt.name,
            arguments,
            ellipsize(prompt.description.as_deref().unwrap_or(""), 60)
        ]);
    }
    println!("\n{} prompt(s):\n", prompts.len());
    table.printstd();
    println!();
}

/// Print the roots list as a table.
pub fn print_roots_table(roots: &[Root]) {
    if roots.is_empty() {
        println!("No roots exposed by this server.");
        return;
    }
    let mut table = Table::new();
    table.add_row(row!["URI", "Name"]);
    for root in roots {
        table.add_row(row![root.uri, root.name.as_deref().unwrap_or("-")]);
    }
    table.printstd();
    println!();
}

/// Print a normalized tool result for humans.
pub fn print_tool_result(result: &NormalizedToolResult) {
    if result.is_error {
        println!("{} {}", "tool error:".red().bold(), result.tool_name);
    } else {
        println!("{} {}", "ok:".green().bold(), result.tool_name);
    }
    let text = result.joined_text();
    if !text.is_empty() {
        println!("{text}");
    }
    for block in &result.content {
        if block.as_text().is_none() {
            println!("{}", crate::normalize::describe_content(block).dimmed());
        }
    }
    if let Some(structured) = &result.structured {
        match serde_json::to_string_pretty(structured) {
            Ok(json) => println!("{json}"),
            Err(_) => println!("{structured}"),
        }
    }
}

/// Print flattened resource contents for humans.
pub fn print_resource_views(views: &[ResourceView]) {
    for view in views {
        let mime = view.mime_type.as_deref().unwrap_or("unknown");
        match (&view.text, view.blob_len) {
            (Some(text), _) => {
                println!("{} ({})", view.uri.bold(), mime);
                println!("{text}");
            }
            (None, Some(len)) => {
                println!("{} ({}, {} bytes base64)", view.uri.bold(), mime, len);
            }
            (None, None) => println!("{} ({}, empty)", view.uri.bold(), mime),
        }
    }
}

/// Print flattened prompt messages for humans.
pub fn print_prompt_views(description: Option<&str>, views: &[PromptMessageView]) {
    if let Some(description) = description {
        println!("{}", description.dimmed());
    }
    for view in views {
        println!("{}: {}", view.role.bold(), view.text);
    }
}

/// Print protocol trace entries as a table.
pub fn print_log_entries(entries: &[LogEntry]) {
    if entries.is_empty() {
        println!("Protocol trace is empty.");
        return;
    }
    let mut table = Table::new();
    table.add_row(row!["Time", "Direction", "Method", "Duration", "Error"]);
    for entry in entries {
        let duration = entry
            .duration_ms
            .map(|ms| format!("{ms:.1} ms"))
            .unwrap_or_else(|| "-".to_string());
        let error = match &entry.error {
            Some(e) => ellipsize(e, 40).red().to_string(),
            None => "-".to_string(),
        };
        table.add_row(row![
            entry.timestamp.format("%H:%M:%S%.3f"),
            entry.direction.to_string(),
            entry.method,
            duration,
            error
        ]);
    }
    table.printstd();
    println!("{} entr(ies)", entries.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ellipsize_short_text_unchanged() {
        assert_eq!(ellipsize("hello", 10), "hello");
    }

    #[test]
    fn test_ellipsize_flattens_newlines_and_truncates() {
        let long = "line one\nline two and quite a bit more text";
        let out = ellipsize(long, 12);
        assert!(!out.contains('\n'));
        assert!(out.chars().count() <= 12);
        assert!(out.ends_with('\u{2026}'));
    }

    #[test]
    fn test_print_json_handles_plain_values() {
        // Smoke test; output goes to stdout.
        print_json(&serde_json::json!({ "ok": true })).unwrap();
    }
}
