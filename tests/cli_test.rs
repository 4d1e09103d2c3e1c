//! CLI binary tests: argument validation and end-to-end runs against the
//! scripted stdio server.

use assert_cmd::Command;
use predicates::prelude::*;

fn mcprobe() -> Command {
    Command::cargo_bin("mcprobe").expect("mcprobe binary not built")
}

fn stdio_target() -> String {
    env!("CARGO_BIN_EXE_mcp_test_server").to_string()
}

#[test]
fn help_lists_subcommands() {
    mcprobe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tools"))
        .stdout(predicate::str::contains("shell"));
}

#[test]
fn missing_target_is_rejected() {
    mcprobe()
        .arg("tools")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn two_targets_are_rejected() {
    mcprobe()
        .args([
            "--stdio",
            "cat",
            "--http",
            "http://localhost:1/mcp",
            "tools",
        ])
        .assert()
        .failure();
}

#[test]
fn tools_lists_all_pages_as_json() {
    mcprobe()
        .args(["--stdio", &stdio_target(), "--output", "json", "tools"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"add\""))
        .stdout(predicate::str::contains("\"greet\""))
        .stdout(predicate::str::contains("\"always_fails\""));
}

#[test]
fn info_shows_server_identity() {
    mcprobe()
        .args(["--stdio", &stdio_target(), "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mcp-test-server"));
}

#[test]
fn call_add_prints_sum() {
    mcprobe()
        .args([
            "--stdio",
            &stdio_target(),
            "--output",
            "json",
            "call",
            "add",
            "--args",
            r#"{"a": 5, "b": 3}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"8\""))
        .stdout(predicate::str::contains("\"toolName\""))
        .stdout(predicate::str::contains("\"arguments\""));
}

#[test]
fn call_rejects_non_object_args_before_connecting() {
    mcprobe()
        .args(["--stdio", &stdio_target(), "call", "add", "--args", "[1,2]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON object"));
}

#[test]
fn ping_succeeds_against_live_server() {
    mcprobe()
        .args(["--stdio", &stdio_target(), "ping"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ping"));
}

#[test]
fn read_resource_prints_contents() {
    mcprobe()
        .args(["--stdio", &stdio_target(), "read", "mem://greeting"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello from the test server"));
}

#[test]
fn prompt_renders_with_arguments() {
    mcprobe()
        .args([
            "--stdio",
            &stdio_target(),
            "prompt",
            "greeting",
            "--arg",
            "name=Ada",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Please greet Ada."));
}

#[test]
fn export_log_writes_trace_file() {
    let dir = tempfile::tempdir().unwrap();
    let trace_path = dir.path().join("trace.json");

    mcprobe()
        .args([
            "--stdio",
            &stdio_target(),
            "--export-log",
            trace_path.to_str().unwrap(),
            "ping",
        ])
        .assert()
        .success();

    let raw = std::fs::read_to_string(&trace_path).unwrap();
    let entries: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries[0]["method"], "initialize");
    assert!(entries.iter().any(|e| e["method"] == "ping"));
}

#[test]
fn failing_launch_reports_transport_error() {
    mcprobe()
        .args(["--stdio", "/nonexistent/mcp/server", "tools"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to spawn"));
}
