//! Go functions built with Go modules

use crate::actions::{Action, ActionError, Purpose};
use crate::architecture::{Architecture, BuildMode};
use crate::binary_path::{BinaryPath, ResolvedBinary};
use crate::capability::Capability;
use crate::error::{RegistryError, WorkflowError};
use crate::path_resolver::PathResolver;
use crate::registry::{Registry, WorkflowModule};
use crate::util::Subprocess;
use crate::validator::{RuntimeValidate, RuntimeValidator, ValidatorError};
use crate::workflow::{BuildInSourceSupport, BuildParams, Workflow, WorkflowSpec};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const NAME: &str = "GoModulesBuilder";

pub const MODULE: WorkflowModule = WorkflowModule {
    name: "fnpack.workflows.go_modules",
    register,
};

/// Oldest toolchain with module support
const MIN_GO_VERSION: (u32, u32) = (1, 11);

pub fn spec() -> WorkflowSpec {
    WorkflowSpec::new(NAME, Capability::new(Some("go"), Some("modules"), None), build)
        .with_supported_manifests(&["go.mod"])
        .with_build_in_source_support(BuildInSourceSupport::ExclusivelySupported)
}

fn register(registry: &Registry) -> Result<(), RegistryError> {
    registry.register(spec())
}

fn build(spec: &WorkflowSpec, params: BuildParams) -> Result<Workflow, WorkflowError> {
    let mut workflow = Workflow::new(spec, params);
    let options = workflow.options().clone();

    let handler = options
        .option_str("artifact_executable_name")
        .filter(|h| !h.is_empty())
        .ok_or_else(|| {
            WorkflowError::failed(
                &spec.name,
                None,
                "Option artifact_executable_name is required to build Go functions",
            )
        })?
        .to_string();

    let go = BinaryPath::new(
        Box::new(PathResolver::new(
            "go",
            None,
            options.executable_search_paths.clone(),
        )),
        Box::new(GoRuntimeValidator::new(
            options.runtime.as_deref(),
            options.architecture.clone(),
        )),
        "go",
    );
    let go_handle = go.handle();
    workflow.add_binary(go);

    workflow.add_action(GoModulesBuildAction {
        go: go_handle,
        source_dir: workflow.build_dir().to_path_buf(),
        output_path: workflow.artifacts_dir().join(&handler),
        architecture: options.architecture.clone(),
        mode: options.mode.clone(),
        trim_go_path: options
            .options
            .get("trim_go_path")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false),
    });

    Ok(workflow)
}

/// Parses `go version` output such as `go version go1.21.3 linux/amd64`.
fn parse_go_version(output: &str) -> Option<(u32, u32)> {
    static VERSION_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = VERSION_RE
        .get_or_init(|| Regex::new(r"\bgo(\d+)\.(\d+)").ok())
        .as_ref()?;
    let caps = re.captures(output)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Accepts a `go` executable whose toolchain is new enough for modules.
#[derive(Debug, Clone)]
pub struct GoRuntimeValidator {
    base: RuntimeValidator,
}

impl GoRuntimeValidator {
    pub fn new(runtime: Option<&str>, architecture: Architecture) -> Self {
        Self {
            base: RuntimeValidator::new(runtime, architecture),
        }
    }
}

impl RuntimeValidate for GoRuntimeValidator {
    fn validate(&self, path: &Path) -> Result<Option<PathBuf>, ValidatorError> {
        let Some(accepted) = self.base.validate(path)? else {
            return Ok(None);
        };

        let version = Subprocess::new(path)
            .arg("version")
            .run()
            .ok()
            .filter(|out| out.success())
            .and_then(|out| parse_go_version(&out.stdout));

        match version {
            Some((major, minor)) if major == MIN_GO_VERSION.0 && minor >= MIN_GO_VERSION.1 => {
                Ok(Some(accepted))
            }
            _ => Err(ValidatorError::MisMatch {
                language: "go".to_string(),
                required_runtime: self.base.runtime().unwrap_or("go1.x").to_string(),
                runtime_path: path.to_path_buf(),
            }),
        }
    }
}

/// `go build` producing a linux executable for the target architecture.
#[derive(Debug, Clone)]
pub struct GoModulesBuildAction {
    go: ResolvedBinary,
    source_dir: PathBuf,
    output_path: PathBuf,
    architecture: Architecture,
    mode: BuildMode,
    trim_go_path: bool,
}

impl GoModulesBuildAction {
    fn command(&self) -> Subprocess {
        let mut cmd = Subprocess::new(self.go.path()).arg("build");
        if self.trim_go_path {
            cmd = cmd.arg("-trimpath");
        }
        cmd = match self.mode {
            BuildMode::Debug => cmd.args(["-gcflags", "all=-N -l"]),
            _ => cmd.args(["-ldflags", "-s -w"]),
        };
        cmd.arg("-o")
            .arg(&self.output_path)
            .arg(&self.source_dir)
            .current_dir(&self.source_dir)
            .env("GOOS", "linux")
            .env("GOARCH", self.architecture.goarch())
    }
}

impl Action for GoModulesBuildAction {
    fn name(&self) -> &str {
        "GoModulesBuild"
    }

    fn purpose(&self) -> Purpose {
        Purpose::CompileSource
    }

    fn description(&self) -> &str {
        "Building Go package with Go Modules"
    }

    fn execute(&self) -> Result<(), ActionError> {
        self.command().run_for_action("go build")?;
        Ok(())
    }
}
