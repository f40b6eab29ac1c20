//! Python functions with dependencies installed by pip

use crate::actions::{
    Action, ActionError, CleanUpAction, CopyDependenciesAction, CopySourceAction,
    MoveDependenciesAction, Purpose,
};
use crate::architecture::Architecture;
use crate::binary_path::{BinaryPath, ResolvedBinary};
use crate::capability::Capability;
use crate::error::{RegistryError, WorkflowError};
use crate::path_resolver::PathResolver;
use crate::registry::{Registry, WorkflowModule};
use crate::util::Subprocess;
use crate::validator::{RuntimeValidate, RuntimeValidator, ValidatorError};
use crate::workflow::{BuildParams, Workflow, WorkflowSpec};
use std::path::{Path, PathBuf};
use tracing::info;

pub const NAME: &str = "PythonPipBuilder";

pub const MODULE: WorkflowModule = WorkflowModule {
    name: "fnpack.workflows.python_pip",
    register,
};

const EXCLUDED_FILES: &[&str] = &[
    ".aws-sam",
    ".chalice",
    ".git",
    ".gitignore",
    "*.pyc",
    "__pycache__",
    "*.so",
    ".Python",
    "*.egg-info",
    "*.egg",
    "pip-log.txt",
    "pip-delete-this-directory.txt",
    "htmlcov",
    ".tox",
    ".nox",
    ".coverage",
    ".cache",
    ".pytest_cache",
    ".python-version",
    ".mypy_cache",
    ".dmypy.json",
    ".pyre",
    ".env",
    ".venv",
    "venv",
    "venv.bak",
    "env.bak",
    "ENV",
    "env",
    ".idea",
];

pub fn spec() -> WorkflowSpec {
    WorkflowSpec::new(NAME, Capability::new(Some("python"), Some("pip"), None), build)
        .with_supported_manifests(&["requirements.txt"])
}

fn register(registry: &Registry) -> Result<(), RegistryError> {
    registry.register(spec())
}

fn build(spec: &WorkflowSpec, params: BuildParams) -> Result<Workflow, WorkflowError> {
    let mut workflow = Workflow::new(spec, params);
    let options = workflow.options().clone();

    let python = BinaryPath::new(
        Box::new(PathResolver::new(
            "python",
            options.runtime.as_deref(),
            options.executable_search_paths.clone(),
        )),
        Box::new(PythonRuntimeValidator::new(
            options.runtime.as_deref(),
            options.architecture.clone(),
        )),
        "python",
    );
    let python_handle = python.handle();
    workflow.add_binary(python);

    let source_dir = workflow.source_dir().to_path_buf();
    let artifacts_dir = workflow.artifacts_dir().to_path_buf();

    if options.download_dependencies {
        workflow.add_action(PythonPipBuildAction {
            python: python_handle,
            manifest_path: workflow.manifest_path().to_path_buf(),
            target_dir: artifacts_dir.clone(),
            scratch_dir: workflow.scratch_dir().to_path_buf(),
            architecture: options.architecture.clone(),
        });
    }

    workflow.add_action(CopySourceAction::new(
        &source_dir,
        &artifacts_dir,
        EXCLUDED_FILES,
    ));

    if let Some(dependencies_dir) = options.dependencies_dir.clone() {
        if options.download_dependencies {
            workflow.add_action(CleanUpAction {
                target_dir: dependencies_dir.clone(),
            });
            if options.combine_dependencies {
                workflow.add_action(CopyDependenciesAction {
                    source_dir,
                    artifact_dir: artifacts_dir,
                    destination_dir: dependencies_dir,
                });
            } else {
                workflow.add_action(MoveDependenciesAction {
                    source_dir,
                    artifact_dir: artifacts_dir,
                    destination_dir: dependencies_dir,
                });
            }
        } else if options.combine_dependencies {
            workflow.add_action(CopySourceAction::new(&dependencies_dir, &artifacts_dir, &[]));
        }
    }

    Ok(workflow)
}

/// Checks that a python executable runs the exact `major.minor` the runtime
/// names, after the runtime/architecture table check.
#[derive(Debug, Clone)]
pub struct PythonRuntimeValidator {
    base: RuntimeValidator,
}

impl PythonRuntimeValidator {
    pub fn new(runtime: Option<&str>, architecture: Architecture) -> Self {
        Self {
            base: RuntimeValidator::new(runtime, architecture),
        }
    }

    fn version_check_command(python: &Path, runtime: &str) -> Option<Subprocess> {
        let (major, minor) = runtime.strip_prefix("python")?.split_once('.')?;
        Some(Subprocess::new(python).arg("-c").arg(format!(
            "import sys; assert sys.version_info.major == {} and sys.version_info.minor == {}",
            major, minor
        )))
    }
}

impl RuntimeValidate for PythonRuntimeValidator {
    fn validate(&self, path: &Path) -> Result<Option<PathBuf>, ValidatorError> {
        let Some(accepted) = self.base.validate(path)? else {
            return Ok(None);
        };
        let Some(runtime) = self.base.runtime() else {
            return Ok(Some(accepted));
        };

        let mismatch = || ValidatorError::MisMatch {
            language: "python".to_string(),
            required_runtime: runtime.to_string(),
            runtime_path: path.to_path_buf(),
        };

        let command = Self::version_check_command(path, runtime).ok_or_else(mismatch)?;
        match command.run() {
            Ok(output) if output.success() => Ok(Some(accepted)),
            _ => Err(mismatch()),
        }
    }
}

/// Installs the requirements file into the artifacts directory.
#[derive(Debug, Clone)]
pub struct PythonPipBuildAction {
    python: ResolvedBinary,
    manifest_path: PathBuf,
    target_dir: PathBuf,
    scratch_dir: PathBuf,
    architecture: Architecture,
}

impl PythonPipBuildAction {
    fn command(&self) -> Subprocess {
        let mut cmd = Subprocess::new(self.python.path())
            .args(["-m", "pip", "install", "-r"])
            .arg(&self.manifest_path)
            .arg("-t")
            .arg(&self.target_dir)
            .current_dir(&self.scratch_dir);

        if self.architecture == Architecture::Arm64 {
            cmd = cmd.args([
                "--platform",
                "manylinux2014_aarch64",
                "--only-binary=:all:",
            ]);
        }
        cmd
    }
}

impl Action for PythonPipBuildAction {
    fn name(&self) -> &str {
        "PythonPipBuild"
    }

    fn purpose(&self) -> Purpose {
        Purpose::ResolveDependencies
    }

    fn description(&self) -> &str {
        "Installing dependencies from PIP"
    }

    fn execute(&self) -> Result<(), ActionError> {
        if !self.manifest_path.is_file() {
            info!(
                manifest = %self.manifest_path.display(),
                "requirements file not found, continuing the build without dependencies"
            );
            return Ok(());
        }
        std::fs::create_dir_all(&self.target_dir)?;
        self.command().run_for_action("pip")?;
        Ok(())
    }
}
