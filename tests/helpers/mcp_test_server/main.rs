//! Scripted stdio MCP server used by the integration tests
//!
//! Speaks newline-delimited JSON-RPC over stdin/stdout, synchronously: one
//! request in, one response out. The surface is small but exercises the
//! interesting paths: a paginated tool list, a tool that succeeds, a tool
//! that reports a domain-level failure, resources, prompts, and `-32601`
//! for everything else (including `roots/list`).

use std::io::{BufRead, Write};

use serde_json::{json, Value};

fn respond(method: &str, params: &Value) -> Result<Value, (i64, String)> {
    match method {
        "initialize" => Ok(json!({
            "protocolVersion": "2025-11-25",
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": {},
                "prompts": {}
            },
            "serverInfo": { "name": "mcp-test-server", "version": "0.1.0" },
            "instructions": "Scripted server for mcprobe integration tests."
        })),
        "ping" => Ok(json!({})),
        "tools/list" => match params.get("cursor").and_then(Value::as_str) {
            None => Ok(json!({
                "tools": [{
                    "name": "add",
                    "description": "Add two integers",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "a": { "type": "integer" },
                            "b": { "type": "integer" }
                        },
                        "required": ["a", "b"]
                    }
                }],
                "nextCursor": "page-2"
            })),
            Some("page-2") => Ok(json!({
                "tools": [{
                    "name": "greet",
                    "description": "Greet someone by name",
                    "inputSchema": {
                        "type": "object",
                        "properties": { "name": { "type": "string" } },
                        "required": ["name"]
                    }
                }, {
                    "name": "always_fails",
                    "description": "Reports a domain-level failure",
                    "inputSchema": { "type": "object" }
                }]
            })),
            Some(other) => Err((-32602, format!("unknown cursor: {other}"))),
        },
        "tools/call" => {
            let name = params.get("name").and_then(Value::as_str).unwrap_or("");
            let args = params.get("arguments").cloned().unwrap_or(json!({}));
            match name {
                "add" => {
                    let a = args.get("a").and_then(Value::as_i64).unwrap_or(0);
                    let b = args.get("b").and_then(Value::as_i64).unwrap_or(0);
                    Ok(json!({
                        "content": [{ "type": "text", "text": (a + b).to_string() }]
                    }))
                }
                "greet" => {
                    let who = args.get("name").and_then(Value::as_str).unwrap_or("world");
                    Ok(json!({
                        "content": [{ "type": "text", "text": format!("Hello, {who}!") }]
                    }))
                }
                "always_fails" => Ok(json!({
                    "content": [{ "type": "text", "text": "this tool always fails" }],
                    "isError": true
                })),
                other => Err((-32602, format!("unknown tool: {other}"))),
            }
        }
        "resources/list" => Ok(json!({
            "resources": [{
                "uri": "mem://greeting",
                "name": "greeting",
                "mimeType": "text/plain"
            }]
        })),
        "resources/read" => {
            let uri = params.get("uri").and_then(Value::as_str).unwrap_or("");
            if uri == "mem://greeting" {
                Ok(json!({
                    "contents": [{
                        "uri": "mem://greeting",
                        "mimeType": "text/plain",
                        "text": "hello from the test server"
                    }]
                }))
            } else {
                Err((-32602, format!("unknown resource: {uri}")))
            }
        }
        "prompts/list" => Ok(json!({
            "prompts": [{
                "name": "greeting",
                "description": "Greets a person",
                "arguments": [{ "name": "name", "required": true }]
            }]
        })),
        "prompts/get" => {
            let who = params
                .get("arguments")
                .and_then(|a| a.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("world");
            Ok(json!({
                "messages": [{
                    "role": "user",
                    "content": { "type": "text", "text": format!("Please greet {who}.") }
                }]
            }))
        }
        other => Err((-32601, format!("Method not found: {other}"))),
    }
}

fn main() {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        let Ok(message) = serde_json::from_str::<Value>(&line) else {
            continue;
        };
        // Notifications get no reply.
        let Some(id) = message.get("id").cloned() else {
            continue;
        };
        let method = message
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let params = message.get("params").cloned().unwrap_or(Value::Null);

        let reply = match respond(method, &params) {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err((code, text)) => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": code, "message": text }
            }),
        };
        if writeln!(out, "{reply}").is_err() {
            break;
        }
        let _ = out.flush();
    }
}
