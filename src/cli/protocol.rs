//! JSON-RPC 2.0 request and response shapes
//!
//! One request in, one response out. `params` stays raw until the method is
//! known, so an unknown method is reported as such even when its params would
//! not parse as a build request.

use crate::capability::Capability;
use crate::workflow::BuildOptions;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::PathBuf;

pub const JSONRPC_VERSION: &str = "2.0";

/// Newest request protocol this binary understands.
pub const PROTOCOL_VERSION: &str = "0.3";

pub const BUILD_METHOD: &str = "Builder.build";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_PARAMS: i64 = -32602;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const UNSUPPORTED_PROTOCOL_VERSION: i64 = 505;

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Parameters of `Builder.build`.
///
/// Build options sit at the same level as the directories. JSON `null`
/// means "not given" for every field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuildRequest {
    #[serde(rename = "__protocol_version")]
    pub protocol_version: Option<String>,
    pub capability: Capability,
    pub supported_workflows: Option<Vec<String>>,
    pub source_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub manifest_path: PathBuf,
    #[serde(flatten)]
    pub options: BuildOptions,
    /// Whether the request named an architecture at all
    #[serde(skip)]
    pub explicit_architecture: bool,
}

impl BuildRequest {
    pub fn from_params(params: &Value) -> Result<Self, serde_json::Error> {
        let mut fields = match params {
            Value::Object(map) => strip_nulls(map),
            Value::Null => Map::new(),
            other => return Err(serde::de::Error::custom(format!("params must be an object, got {}", other))),
        };
        let explicit_architecture = fields.contains_key("architecture");
        if let Some(Value::Object(capability)) = fields.get_mut("capability") {
            *capability = strip_nulls(capability);
        }

        let mut request: BuildRequest = serde_json::from_value(Value::Object(fields))?;
        request.explicit_architecture = explicit_architecture;
        Ok(request)
    }

    /// True when the caller speaks a newer protocol than [`PROTOCOL_VERSION`].
    ///
    /// A missing version is accepted. A version that is not `major.minor`
    /// numbers counts as unsupported.
    pub fn protocol_too_new(&self) -> bool {
        match self.protocol_version.as_deref() {
            None => false,
            Some(requested) => match (parse_version(requested), parse_version(PROTOCOL_VERSION)) {
                (Some(requested), Some(supported)) => requested > supported,
                _ => true,
            },
        }
    }
}

fn strip_nulls(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn parse_version(version: &str) -> Option<Vec<u64>> {
    version
        .trim()
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, artifacts_dir: &std::path::Path) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(json!({ "artifacts_dir": artifacts_dir })),
            error: None,
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: json!({}),
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::{Architecture, BuildMode};
    use yare::parameterized;

    #[test]
    fn test_build_request_flattens_options() {
        let params = json!({
            "__protocol_version": "0.3",
            "capability": {"language": "python", "dependency_manager": "pip", "application_framework": null},
            "supported_workflows": null,
            "source_dir": "/src",
            "artifacts_dir": "/artifacts",
            "scratch_dir": "/scratch",
            "manifest_path": "/src/requirements.txt",
            "runtime": "python3.12",
            "optimizations": {},
            "options": {"build_logical_id": "Fn"},
            "executable_search_paths": null,
            "mode": "debug",
            "download_dependencies": false,
            "dependencies_dir": null,
            "architecture": "arm64"
        });

        let request = BuildRequest::from_params(&params).unwrap();
        assert_eq!(request.capability, Capability::new(Some("python"), Some("pip"), None));
        assert_eq!(request.manifest_path, PathBuf::from("/src/requirements.txt"));
        assert_eq!(request.options.runtime.as_deref(), Some("python3.12"));
        assert_eq!(request.options.mode, BuildMode::Debug);
        assert_eq!(request.options.architecture, Architecture::Arm64);
        assert!(!request.options.download_dependencies);
        assert!(request.options.combine_dependencies);
        assert!(request.options.executable_search_paths.is_empty());
        assert_eq!(request.options.option_str("build_logical_id"), Some("Fn"));
        assert!(request.explicit_architecture);
        assert!(!request.protocol_too_new());
    }

    #[test]
    fn test_missing_architecture_is_not_explicit() {
        let request = BuildRequest::from_params(&json!({"architecture": null})).unwrap();
        assert!(!request.explicit_architecture);
    }

    #[test]
    fn test_non_object_params_rejected() {
        assert!(BuildRequest::from_params(&json!([1, 2])).is_err());
    }

    #[parameterized(
        missing = { None, false },
        same = { Some("0.3"), false },
        older = { Some("0.2"), false },
        newer_minor = { Some("0.4"), true },
        newer_major = { Some("1.0"), true },
        ten_is_not_one = { Some("0.10"), true },
        garbage = { Some("latest"), true },
    )]
    fn test_protocol_version_check(version: Option<&str>, too_new: bool) {
        let request = BuildRequest {
            protocol_version: version.map(str::to_string),
            ..Default::default()
        };
        assert_eq!(request.protocol_too_new(), too_new);
    }

    #[test]
    fn test_error_response_shape() {
        let response = JsonRpcResponse::error(json!(7), METHOD_NOT_FOUND, "Method unavailable");
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "error": {"code": -32601, "message": "Method unavailable", "data": {}}
            })
        );
    }
}
