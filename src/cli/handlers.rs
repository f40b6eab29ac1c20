//! Request dispatch
//!
//! Turns one raw JSON-RPC request into one response. Every failure becomes an
//! error response; nothing here panics or returns early without a response.

use super::protocol::{
    BuildRequest, JsonRpcRequest, JsonRpcResponse, BUILD_METHOD, INVALID_PARAMS, JSONRPC_VERSION,
    METHOD_NOT_FOUND, PARSE_ERROR, UNSUPPORTED_PROTOCOL_VERSION,
};
use crate::builder::Builder;
use crate::config::FnpackConfig;
use crate::workflows::DEFAULT_WORKFLOW_SOURCE;
use serde_json::Value;
use tracing::{debug, error, info, warn};

pub const INVALID_REQUEST: i64 = -32600;

/// Handles a raw request string and produces the response to print.
pub fn handle_request(raw: &str, config: &FnpackConfig) -> JsonRpcResponse {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            error!("Failed to parse request: {}", e);
            return JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {}", e));
        }
    };

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            error!("Invalid request: {}", e);
            return JsonRpcResponse::error(id, INVALID_REQUEST, format!("Invalid Request: {}", e));
        }
    };

    if let Some(version) = request.jsonrpc.as_deref() {
        if version != JSONRPC_VERSION {
            warn!(jsonrpc = version, "unexpected JSON-RPC version, continuing");
        }
    }

    debug!(method = %request.method, id = %request.id, "received request");
    if request.method != BUILD_METHOD {
        error!(method = %request.method, "Method unavailable");
        return JsonRpcResponse::error(request.id, METHOD_NOT_FOUND, "Method unavailable");
    }

    handle_build(request, config)
}

fn handle_build(request: JsonRpcRequest, config: &FnpackConfig) -> JsonRpcResponse {
    let id = request.id;

    let mut build = match BuildRequest::from_params(&request.params) {
        Ok(build) => build,
        Err(e) => {
            error!("Invalid params: {}", e);
            return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {}", e));
        }
    };

    if build.protocol_too_new() {
        error!(
            requested = build.protocol_version.as_deref().unwrap_or(""),
            "Unsupported Protocol Version"
        );
        return JsonRpcResponse::error(id, UNSUPPORTED_PROTOCOL_VERSION, "Unsupported Protocol Version");
    }

    config.apply_defaults(&mut build.options, build.explicit_architecture);

    let sources = build
        .supported_workflows
        .clone()
        .unwrap_or_else(|| vec![DEFAULT_WORKFLOW_SOURCE.to_string()]);

    let result = Builder::with_sources(build.capability.clone(), &sources).and_then(|builder| {
        info!(workflow = builder.workflow_name(), "building");
        builder.build(
            &build.source_dir,
            &build.artifacts_dir,
            &build.scratch_dir,
            &build.manifest_path,
            build.options.clone(),
        )
    });

    match result {
        Ok(()) => JsonRpcResponse::success(id, &build.artifacts_dir),
        Err(e) => {
            error!("Build failed: {}", e);
            JsonRpcResponse::error(id, e.status_code(), e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::Architecture;
    use serde_json::json;
    use serial_test::serial;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config() -> FnpackConfig {
        FnpackConfig {
            log_level: "info".to_string(),
            log_json: false,
            executable_search_paths: Vec::new(),
            default_architecture: Architecture::X86_64,
        }
    }

    fn error_code(response: &JsonRpcResponse) -> i64 {
        response.error.as_ref().map(|e| e.code).unwrap_or(0)
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let response = handle_request("{not json", &config());
        assert_eq!(error_code(&response), PARSE_ERROR);
        assert_eq!(response.id, Value::Null);
    }

    #[test]
    fn test_unknown_method() {
        let raw = json!({"jsonrpc": "2.0", "id": "abc", "method": "Builder.clean", "params": {}});
        let response = handle_request(&raw.to_string(), &config());
        assert_eq!(error_code(&response), METHOD_NOT_FOUND);
        assert_eq!(response.error.unwrap().message, "Method unavailable");
        assert_eq!(response.id, json!("abc"));
    }

    #[test]
    fn test_newer_protocol_rejected() {
        let raw = json!({
            "jsonrpc": "2.0", "id": 1, "method": "Builder.build",
            "params": {"__protocol_version": "0.9"}
        });
        let response = handle_request(&raw.to_string(), &config());
        assert_eq!(error_code(&response), 505);
        assert_eq!(response.error.unwrap().message, "Unsupported Protocol Version");
    }

    #[test]
    #[serial]
    fn test_unknown_capability_is_400() {
        let raw = json!({
            "jsonrpc": "2.0", "id": 2, "method": "Builder.build",
            "params": {
                "__protocol_version": "0.3",
                "capability": {"language": "nope", "dependency_manager": null, "application_framework": null},
                "source_dir": "/src", "artifacts_dir": "/a", "scratch_dir": "/s", "manifest_path": "/m"
            }
        });
        let response = handle_request(&raw.to_string(), &config());
        assert_eq!(error_code(&response), 400);
        assert!(response.error.unwrap().message.contains("nope"));
    }

    #[test]
    #[serial]
    fn test_unknown_workflow_source_is_500() {
        let raw = json!({
            "jsonrpc": "2.0", "id": 3, "method": "Builder.build",
            "params": {
                "capability": {"language": "python", "dependency_manager": "pip"},
                "supported_workflows": ["fnpack.workflows.cobol"]
            }
        });
        let response = handle_request(&raw.to_string(), &config());
        assert_eq!(error_code(&response), 500);
    }

    #[test]
    #[serial]
    fn test_make_build_without_makefile_is_known_failure() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        let raw = json!({
            "jsonrpc": "2.0", "id": 4, "method": "Builder.build",
            "params": {
                "capability": {"language": "provided"},
                "source_dir": dir.path().join("src"),
                "artifacts_dir": dir.path().join("artifacts"),
                "scratch_dir": dir.path().join("scratch"),
                "manifest_path": dir.path().join("src/Makefile"),
                "runtime": "provided",
                "options": {"build_logical_id": "Fn"},
                "executable_search_paths": [dir.path().join("empty")]
            }
        });

        let mut cfg = config();
        cfg.executable_search_paths = vec![PathBuf::from("/unused")];
        let response = handle_request(&raw.to_string(), &cfg);

        // without make on PATH sanitize fails, with it the missing Makefile does
        let error = response.error.unwrap();
        assert_eq!(error.code, 400);
        assert!(error.message.starts_with("CustomMakeBuilder:"));
        assert!(dir.path().join("scratch").is_dir());
    }
}
