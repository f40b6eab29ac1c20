//! Rust functions built with Cargo Lambda

use crate::actions::{Action, ActionError, Purpose};
use crate::architecture::{Architecture, BuildMode};
use crate::binary_path::ResolvedBinary;
use crate::capability::Capability;
use crate::error::{RegistryError, WorkflowError};
use crate::registry::{Registry, WorkflowModule};
use crate::util::Subprocess;
use crate::workflow::{BuildInSourceSupport, BuildParams, Workflow, WorkflowSpec};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const NAME: &str = "RustCargoLambdaBuilder";

pub const MODULE: WorkflowModule = WorkflowModule {
    name: "fnpack.workflows.rust_cargo",
    register,
};

pub fn spec() -> WorkflowSpec {
    WorkflowSpec::new(NAME, Capability::new(Some("rust"), Some("cargo"), None), build)
        .with_supported_manifests(&["Cargo.toml"])
        .with_build_in_source_support(BuildInSourceSupport::ExclusivelySupported)
}

fn register(registry: &Registry) -> Result<(), RegistryError> {
    registry.register(spec())
}

fn build(spec: &WorkflowSpec, params: BuildParams) -> Result<Workflow, WorkflowError> {
    let mut workflow = Workflow::new(spec, params);
    let options = workflow.options().clone();

    let cargo = workflow.path_binary("cargo");
    let cargo_handle = cargo.handle();
    workflow.add_binary(cargo);
    let cargo_lambda = workflow.path_binary("cargo-lambda");
    workflow.add_binary(cargo_lambda);

    let handler = options
        .option_str("artifact_executable_name")
        .filter(|h| !h.is_empty())
        .map(str::to_string);

    workflow.add_action(RustCargoLambdaBuildAction {
        cargo: cargo_handle,
        source_dir: workflow.build_dir().to_path_buf(),
        handler: handler.clone(),
        architecture: options.architecture.clone(),
        mode: options.mode.clone(),
    });
    workflow.add_action(RustCopyAndRenameAction {
        source_dir: workflow.build_dir().to_path_buf(),
        artifacts_dir: workflow.artifacts_dir().to_path_buf(),
        handler,
    });

    Ok(workflow)
}

/// `cargo lambda build` for the requested architecture and profile.
#[derive(Debug, Clone)]
pub struct RustCargoLambdaBuildAction {
    cargo: ResolvedBinary,
    source_dir: PathBuf,
    handler: Option<String>,
    architecture: Architecture,
    mode: BuildMode,
}

impl RustCargoLambdaBuildAction {
    fn command(&self) -> Subprocess {
        let mut cmd = Subprocess::new(self.cargo.path()).args(["lambda", "build"]);
        if self.mode != BuildMode::Debug {
            cmd = cmd.arg("--release");
        }
        if self.architecture == Architecture::Arm64 {
            cmd = cmd.arg("--arm64");
        }
        if let Some(handler) = &self.handler {
            cmd = cmd.arg("--bin").arg(handler);
        }
        cmd.current_dir(&self.source_dir)
    }
}

impl Action for RustCargoLambdaBuildAction {
    fn name(&self) -> &str {
        "RustCargoLambdaBuild"
    }

    fn purpose(&self) -> Purpose {
        Purpose::CompileSource
    }

    fn description(&self) -> &str {
        "Building the project using Cargo Lambda"
    }

    fn execute(&self) -> Result<(), ActionError> {
        self.command().run_for_action("cargo lambda build")?;
        Ok(())
    }
}

/// Copies `target/lambda/<handler>/bootstrap` into the artifacts directory.
#[derive(Debug, Clone)]
pub struct RustCopyAndRenameAction {
    source_dir: PathBuf,
    artifacts_dir: PathBuf,
    handler: Option<String>,
}

impl RustCopyAndRenameAction {
    /// With no handler named, the single binary cargo-lambda produced is used.
    fn binary_dir(&self) -> Result<PathBuf, ActionError> {
        let lambda_dir = self.source_dir.join("target").join("lambda");
        if let Some(handler) = &self.handler {
            return Ok(lambda_dir.join(handler));
        }

        let mut dirs = fs::read_dir(&lambda_dir)
            .map_err(|e| {
                ActionError::failed(format!(
                    "Unable to read build output at {}: {}",
                    lambda_dir.display(),
                    e
                ))
            })?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.is_dir())
            .collect::<Vec<_>>();

        match dirs.len() {
            1 => Ok(dirs.remove(0)),
            0 => Err(ActionError::failed(format!(
                "No function binaries found in {}",
                lambda_dir.display()
            ))),
            _ => Err(ActionError::failed(
                "Multiple function binaries found, set artifact_executable_name to pick one",
            )),
        }
    }

    fn bootstrap(dir: &Path) -> PathBuf {
        dir.join("bootstrap")
    }
}

impl Action for RustCopyAndRenameAction {
    fn name(&self) -> &str {
        "RustCopyAndRename"
    }

    fn purpose(&self) -> Purpose {
        Purpose::CopySource
    }

    fn description(&self) -> &str {
        "Copy Rust executable, renaming if needed"
    }

    fn execute(&self) -> Result<(), ActionError> {
        let binary = Self::bootstrap(&self.binary_dir()?);
        if !binary.is_file() {
            return Err(ActionError::failed(format!(
                "Unable to find bootstrap file at {}",
                binary.display()
            )));
        }

        fs::create_dir_all(&self.artifacts_dir)?;
        let destination = self.artifacts_dir.join("bootstrap");
        fs::copy(&binary, &destination)?;
        debug!(from = %binary.display(), to = %destination.display(), "copied bootstrap");
        Ok(())
    }
}
