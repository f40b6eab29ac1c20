//! Functions for `provided` runtimes built by a Makefile target

use crate::actions::{Action, ActionError, CopySourceAction, Purpose};
use crate::binary_path::{BinaryPath, ResolvedBinary};
use crate::capability::Capability;
use crate::error::{RegistryError, WorkflowError};
use crate::path_resolver::PathResolver;
use crate::registry::{Registry, WorkflowModule};
use crate::util::Subprocess;
use crate::validator::RuntimeValidator;
use crate::workflow::{BuildInSourceSupport, BuildParams, Workflow, WorkflowSpec};
use std::fs;
use std::path::PathBuf;
use tracing::info;

pub const NAME: &str = "CustomMakeBuilder";

pub const MODULE: WorkflowModule = WorkflowModule {
    name: "fnpack.workflows.custom_make",
    register,
};

const EXCLUDED_FILES: &[&str] = &[".aws-sam", ".git"];

pub fn spec() -> WorkflowSpec {
    WorkflowSpec::new(NAME, Capability::new(Some("provided"), None, None), build)
        .with_build_in_source_support(BuildInSourceSupport::OptionallySupported)
}

fn register(registry: &Registry) -> Result<(), RegistryError> {
    registry.register(spec())
}

fn build(spec: &WorkflowSpec, params: BuildParams) -> Result<Workflow, WorkflowError> {
    let mut workflow = Workflow::new(spec, params);
    let options = workflow.options().clone();

    let build_logical_id = options
        .option_str("build_logical_id")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            WorkflowError::failed(&spec.name, None, "Build target (none) is not found!")
        })?
        .to_string();

    let make = BinaryPath::new(
        Box::new(PathResolver::new(
            "make",
            None,
            options.executable_search_paths.clone(),
        )),
        Box::new(RuntimeValidator::new(
            options.runtime.as_deref(),
            options.architecture.clone(),
        )),
        "make",
    );
    let make_handle = make.handle();
    workflow.add_binary(make);

    let build_dir = workflow.build_dir().to_path_buf();
    let working_directory = options
        .option_str("working_directory")
        .map(PathBuf::from)
        .unwrap_or_else(|| build_dir.clone());

    if build_dir != workflow.source_dir() {
        workflow.add_action(CopySourceAction::new(
            workflow.source_dir(),
            &build_dir,
            EXCLUDED_FILES,
        ));
    }

    workflow.add_action(CustomMakeAction {
        make: make_handle,
        artifacts_dir: workflow.artifacts_dir().to_path_buf(),
        manifest_path: workflow.manifest_path().to_path_buf(),
        build_logical_id,
        working_directory,
    });

    Ok(workflow)
}

/// Runs `make build-<logical id>` with `ARTIFACTS_DIR` exported.
#[derive(Debug, Clone)]
pub struct CustomMakeAction {
    make: ResolvedBinary,
    artifacts_dir: PathBuf,
    manifest_path: PathBuf,
    build_logical_id: String,
    working_directory: PathBuf,
}

impl CustomMakeAction {
    fn command(&self) -> Subprocess {
        Subprocess::new(self.make.path())
            .arg("--makefile")
            .arg(&self.manifest_path)
            .arg(format!("build-{}", self.build_logical_id))
            .current_dir(&self.working_directory)
            .env("ARTIFACTS_DIR", &self.artifacts_dir)
    }
}

impl Action for CustomMakeAction {
    fn name(&self) -> &str {
        "MakeBuild"
    }

    fn purpose(&self) -> Purpose {
        Purpose::CompileSource
    }

    fn description(&self) -> &str {
        "Running build target on Makefile"
    }

    fn execute(&self) -> Result<(), ActionError> {
        if !self.manifest_path.exists() {
            return Err(ActionError::failed(format!(
                "Makefile not found at {}",
                self.manifest_path.display()
            )));
        }

        fs::create_dir_all(&self.artifacts_dir)?;
        info!(artifacts_dir = %self.artifacts_dir.display(), "Current Artifacts Directory");

        self.command().run_for_action("make")?;
        Ok(())
    }
}
