//! `shell` command: interactive REPL against one connection
//!
//! Unlike the one-shot commands, the shell connects once and keeps the
//! session open, so capability caching and the protocol trace accumulate
//! across inputs. Trace inspection is built in: `:log` prints recent
//! entries, `:export` writes the trace to a file, `:clear` empties it.

use std::path::PathBuf;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::commands::invoke::{parse_prompt_arguments, parse_tool_arguments};
use crate::commands::{export_trace, output, CommandContext};
use crate::error::Result;
use crate::normalize::{flatten_prompt, flatten_resource, NormalizedToolResult};
use crate::session::Session;

/// One parsed shell input line.
#[derive(Debug, Clone, PartialEq)]
enum ShellCommand {
    Empty,
    Help,
    Info,
    Tools,
    Resources,
    Prompts,
    Roots,
    Ping,
    Call { name: String, args: Option<String> },
    Read { uri: String },
    Prompt { name: String, args: Vec<String> },
    Log { limit: Option<usize> },
    Export { path: PathBuf },
    Clear,
    Quit,
    Unknown(String),
}

/// Parse one input line.
///
/// `call NAME {json...}` treats everything after the name as one JSON
/// payload, so objects with spaces need no quoting.
fn parse_shell_line(line: &str) -> ShellCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ShellCommand::Empty;
    }
    let mut tokens = trimmed.split_whitespace();
    let head = tokens.next().unwrap_or_default();

    match head {
        "help" | "?" => ShellCommand::Help,
        "info" => ShellCommand::Info,
        "tools" => ShellCommand::Tools,
        "resources" => ShellCommand::Resources,
        "prompts" => ShellCommand::Prompts,
        "roots" => ShellCommand::Roots,
        "ping" => ShellCommand::Ping,
        "quit" | "exit" => ShellCommand::Quit,
        ":clear" => ShellCommand::Clear,
        ":log" => {
            let limit = tokens.next().and_then(|t| t.parse::<usize>().ok());
            ShellCommand::Log { limit }
        }
        ":export" => match tokens.next() {
            Some(path) => ShellCommand::Export {
                path: PathBuf::from(path),
            },
            None => ShellCommand::Unknown(":export requires a file path".to_string()),
        },
        "call" => match tokens.next() {
            Some(name) => {
                let rest = trimmed
                    .splitn(3, char::is_whitespace)
                    .nth(2)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                ShellCommand::Call {
                    name: name.to_string(),
                    args: rest,
                }
            }
            None => ShellCommand::Unknown("call requires a tool name".to_string()),
        },
        "read" => match tokens.next() {
            Some(uri) => ShellCommand::Read {
                uri: uri.to_string(),
            },
            None => ShellCommand::Unknown("read requires a resource URI".to_string()),
        },
        "prompt" => match tokens.next() {
            Some(name) => ShellCommand::Prompt {
                name: name.to_string(),
                args: tokens.map(str::to_string).collect(),
            },
            None => ShellCommand::Unknown("prompt requires a prompt name".to_string()),
        },
        other => ShellCommand::Unknown(format!("unknown command `{other}`; try `help`")),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  info                      server identity and capabilities");
    println!("  tools                     list tools");
    println!("  resources                 list resources");
    println!("  prompts                   list prompt templates");
    println!("  roots                     list server roots");
    println!("  ping                      liveness probe");
    println!("  call NAME [JSON]          invoke a tool");
    println!("  read URI                  read a resource");
    println!("  prompt NAME [K=V ...]     render a prompt template");
    println!("  :log [N]                  show the last N trace entries");
    println!("  :export PATH              write the trace to a JSON file");
    println!("  :clear                    empty the trace");
    println!("  quit                      leave the shell");
}

/// Run the interactive shell.
///
/// Connects once, then reads commands until `quit` or EOF. Command errors
/// are printed and the loop continues; only connection setup errors abort.
pub async fn run_shell(ctx: &CommandContext) -> Result<()> {
    let mut session = Session::new(ctx.config.clone());
    session.connect().await?;

    if let Some(server) = session.server_info() {
        println!(
            "Connected to {} {} (protocol {})",
            server.name.bold(),
            server.version,
            session.protocol_version().unwrap_or("?")
        );
    }
    println!("Type `help` for commands, `quit` to leave.");

    let mut rl = DefaultEditor::new()?;
    loop {
        match rl.readline("mcprobe> ") {
            Ok(line) => {
                let command = parse_shell_line(&line);
                if command != ShellCommand::Empty {
                    let _ = rl.add_history_entry(line.trim());
                }
                match command {
                    ShellCommand::Quit => break,
                    ShellCommand::Empty => {}
                    other => {
                        if let Err(e) = dispatch(&session, other).await {
                            println!("{} {e:#}", "error:".red());
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("(interrupt; `quit` to leave)");
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                println!("{} {e}", "readline error:".red());
                break;
            }
        }
    }

    let export = export_trace(&session, ctx.export_log.as_deref());
    session.disconnect().await;
    export
}

/// Execute one parsed shell command against the live session.
async fn dispatch(session: &Session, command: ShellCommand) -> Result<()> {
    match command {
        ShellCommand::Help => print_help(),
        ShellCommand::Info => {
            if let Some(server) = session.server_info() {
                output::print_server_info(
                    server,
                    session.protocol_version().unwrap_or("(unknown)"),
                    session.instructions(),
                    &session.capability_set(),
                );
            }
        }
        ShellCommand::Tools => {
            output::print_tools_table(&session.list_tools().await?);
        }
        ShellCommand::Resources => {
            output::print_resources_table(&session.list_resources().await?);
        }
        ShellCommand::Prompts => {
            output::print_prompts_table(&session.list_prompts().await?);
        }
        ShellCommand::Roots => {
            output::print_roots_table(&session.list_roots().await?);
        }
        ShellCommand::Ping => {
            if session.ping().await? {
                println!("{}", "server answered ping".green());
            } else {
                println!("{}", "server did not answer ping".red());
            }
        }
        ShellCommand::Call { name, args } => {
            let arguments = parse_tool_arguments(args.as_deref())?;
            let result = session.call_tool(&name, arguments.clone()).await?;
            output::print_tool_result(&NormalizedToolResult::new(&name, arguments, result));
        }
        ShellCommand::Read { uri } => {
            let result = session.read_resource(&uri).await?;
            output::print_resource_views(&flatten_resource(&result));
        }
        ShellCommand::Prompt { name, args } => {
            let arguments = parse_prompt_arguments(&args)?;
            let result = session.get_prompt(&name, arguments).await?;
            output::print_prompt_views(result.description.as_deref(), &flatten_prompt(&result));
        }
        ShellCommand::Log { limit } => {
            let entries = session.logger().get_entries(None, None, limit);
            output::print_log_entries(&entries);
        }
        ShellCommand::Export { path } => {
            export_trace(session, Some(&path))?;
            println!("trace written to {}", path.display());
        }
        ShellCommand::Clear => {
            session.logger().clear();
            println!("trace cleared");
        }
        ShellCommand::Empty | ShellCommand::Quit => {}
        ShellCommand::Unknown(message) => println!("{message}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_and_whitespace() {
        assert_eq!(parse_shell_line(""), ShellCommand::Empty);
        assert_eq!(parse_shell_line("   "), ShellCommand::Empty);
    }

    #[test]
    fn test_parse_bare_commands() {
        assert_eq!(parse_shell_line("tools"), ShellCommand::Tools);
        assert_eq!(parse_shell_line("ping"), ShellCommand::Ping);
        assert_eq!(parse_shell_line("quit"), ShellCommand::Quit);
        assert_eq!(parse_shell_line("exit"), ShellCommand::Quit);
        assert_eq!(parse_shell_line("help"), ShellCommand::Help);
        assert_eq!(parse_shell_line("?"), ShellCommand::Help);
    }

    #[test]
    fn test_parse_call_keeps_json_payload_intact() {
        let parsed = parse_shell_line(r#"call add {"a": 5, "b": 3}"#);
        assert_eq!(
            parsed,
            ShellCommand::Call {
                name: "add".to_string(),
                args: Some(r#"{"a": 5, "b": 3}"#.to_string()),
            }
        );
    }

    #[test]
    fn test_parse_call_without_payload() {
        assert_eq!(
            parse_shell_line("call list_files"),
            ShellCommand::Call {
                name: "list_files".to_string(),
                args: None,
            }
        );
    }

    #[test]
    fn test_parse_call_without_name_is_unknown() {
        assert!(matches!(parse_shell_line("call"), ShellCommand::Unknown(_)));
    }

    #[test]
    fn test_parse_prompt_with_arguments() {
        assert_eq!(
            parse_shell_line("prompt greeting name=Ada tone=formal"),
            ShellCommand::Prompt {
                name: "greeting".to_string(),
                args: vec!["name=Ada".to_string(), "tone=formal".to_string()],
            }
        );
    }

    #[test]
    fn test_parse_log_with_and_without_limit() {
        assert_eq!(parse_shell_line(":log"), ShellCommand::Log { limit: None });
        assert_eq!(
            parse_shell_line(":log 20"),
            ShellCommand::Log { limit: Some(20) }
        );
    }

    #[test]
    fn test_parse_export_requires_path() {
        assert_eq!(
            parse_shell_line(":export /tmp/trace.json"),
            ShellCommand::Export {
                path: PathBuf::from("/tmp/trace.json"),
            }
        );
        assert!(matches!(
            parse_shell_line(":export"),
            ShellCommand::Unknown(_)
        ));
    }

    #[test]
    fn test_parse_unknown_command() {
        assert!(matches!(
            parse_shell_line("frobnicate"),
            ShellCommand::Unknown(_)
        ));
    }
}
