//! CLI integration tests
//!
//! Runs the fnpack binary with JSON-RPC requests and checks the response
//! printed to stdout and the exit code.

use serde_json::{json, Value};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Helper to get the path to the fnpack binary
fn fnpack_bin() -> PathBuf {
    // In tests, the binary should be at target/debug/fnpack
    let mut path = env::current_exe()
        .expect("Failed to get current executable path")
        .parent()
        .expect("No parent")
        .to_path_buf();

    // If we're in deps/, go up one more level
    if path.ends_with("deps") {
        path = path.parent().expect("No parent").to_path_buf();
    }

    path.join(format!("fnpack{}", env::consts::EXE_SUFFIX))
}

fn run_with_arg(request: &str) -> Output {
    Command::new(fnpack_bin())
        .arg(request)
        .env("FNPACK_LOG_LEVEL", "error")
        .output()
        .expect("Failed to run fnpack")
}

fn run_with_stdin(request: &str) -> Output {
    let mut child = Command::new(fnpack_bin())
        .env("FNPACK_LOG_LEVEL", "error")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn fnpack");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(request.as_bytes())
        .expect("Failed to write request");
    child.wait_with_output().expect("Failed to wait for fnpack")
}

fn response(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is a JSON response")
}

#[test]
fn test_cli_help() {
    let output = Command::new(fnpack_bin())
        .arg("--help")
        .output()
        .expect("Failed to run fnpack");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("JSON-RPC"));
}

#[test]
fn test_unknown_method_exits_with_error() {
    let output = run_with_arg(r#"{"jsonrpc":"2.0","id":42,"method":"Builder.nope","params":{}}"#);

    assert_eq!(output.status.code(), Some(1));
    let body = response(&output);
    assert_eq!(body["id"], json!(42));
    assert_eq!(body["error"]["code"], json!(-32601));
    assert_eq!(body["error"]["message"], json!("Method unavailable"));
}

#[test]
fn test_malformed_request_from_stdin() {
    let output = run_with_stdin("{\"jsonrpc\":");

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(response(&output)["error"]["code"], json!(-32700));
}

#[test]
fn test_unsupported_protocol_version() {
    let request = json!({
        "jsonrpc": "2.0",
        "id": "v",
        "method": "Builder.build",
        "params": {"__protocol_version": "9.0"}
    });
    let output = run_with_arg(&request.to_string());

    assert_eq!(output.status.code(), Some(1));
    let body = response(&output);
    assert_eq!(body["error"]["code"], json!(505));
    assert_eq!(body["error"]["message"], json!("Unsupported Protocol Version"));
}

#[test]
fn test_unknown_capability_is_known_failure() {
    let dir = TempDir::new().unwrap();
    let request = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "Builder.build",
        "params": {
            "__protocol_version": "0.3",
            "capability": {"language": "nope", "dependency_manager": null, "application_framework": null},
            "supported_workflows": null,
            "source_dir": dir.path().join("src"),
            "artifacts_dir": dir.path().join("artifacts"),
            "scratch_dir": dir.path().join("scratch"),
            "manifest_path": dir.path().join("src/manifest"),
            "runtime": null,
            "optimizations": {},
            "options": {}
        }
    });
    let output = run_with_stdin(&request.to_string());

    assert_eq!(output.status.code(), Some(1));
    let body = response(&output);
    assert_eq!(body["error"]["code"], json!(400));
    assert!(body["error"]["message"].as_str().unwrap().contains("nope"));
}

#[test]
#[cfg(unix)]
fn test_make_build_round_trip() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let source = dir.path().join("src");
    let bin = dir.path().join("bin");
    fs::create_dir_all(&source).unwrap();
    fs::create_dir_all(&bin).unwrap();
    fs::write(source.join("Makefile"), "build-Fn:\n\techo built\n").unwrap();

    // stand-in for make: writes into ARTIFACTS_DIR
    let fake_make = bin.join("make");
    fs::write(
        &fake_make,
        "#!/bin/sh\nmkdir -p \"$ARTIFACTS_DIR\" && echo ok > \"$ARTIFACTS_DIR/built.txt\"\n",
    )
    .unwrap();
    fs::set_permissions(&fake_make, fs::Permissions::from_mode(0o755)).unwrap();

    let artifacts = dir.path().join("artifacts");
    let request = json!({
        "jsonrpc": "2.0",
        "id": 7,
        "method": "Builder.build",
        "params": {
            "__protocol_version": "0.3",
            "capability": {"language": "provided", "dependency_manager": null, "application_framework": null},
            "source_dir": source,
            "artifacts_dir": artifacts,
            "scratch_dir": dir.path().join("scratch"),
            "manifest_path": source.join("Makefile"),
            "runtime": "provided.al2023",
            "options": {"build_logical_id": "Fn"},
            "executable_search_paths": [bin]
        }
    });
    let output = run_with_arg(&request.to_string());

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let body = response(&output);
    assert_eq!(body["id"], json!(7));
    assert_eq!(body["result"]["artifacts_dir"], json!(artifacts));
    assert_eq!(fs::read_to_string(artifacts.join("built.txt")).unwrap(), "ok\n");
}
