//! Node.js functions packaged and installed with npm
//!
//! The source is packed with `npm pack` first so that only the files npm
//! itself would publish end up in the artifact. Production dependencies are
//! then installed next to the unpacked package.

use crate::actions::{
    Action, ActionError, CleanUpAction, CopyDependenciesAction, CopySourceAction,
    MoveDependenciesAction, Purpose,
};
use crate::binary_path::ResolvedBinary;
use crate::capability::Capability;
use crate::error::{RegistryError, WorkflowError};
use crate::registry::{Registry, WorkflowModule};
use crate::util::fs::extract_tarball;
use crate::util::Subprocess;
use crate::workflow::{BuildParams, Workflow, WorkflowSpec};
use std::path::PathBuf;
use tracing::debug;

pub const NAME: &str = "NodejsNpmBuilder";

pub const MODULE: WorkflowModule = WorkflowModule {
    name: "fnpack.workflows.nodejs_npm",
    register,
};

const EXCLUDED_FILES: &[&str] = &[".aws-sam", ".git"];

pub fn spec() -> WorkflowSpec {
    WorkflowSpec::new(NAME, Capability::new(Some("nodejs"), Some("npm"), None), build)
        .with_supported_manifests(&["package.json"])
}

fn register(registry: &Registry) -> Result<(), RegistryError> {
    registry.register(spec())
}

fn build(spec: &WorkflowSpec, params: BuildParams) -> Result<Workflow, WorkflowError> {
    let mut workflow = Workflow::new(spec, params);
    let options = workflow.options().clone();

    let npm = workflow.path_binary("npm");
    let npm_handle = npm.handle();
    workflow.add_binary(npm);

    let source_dir = workflow.source_dir().to_path_buf();
    let artifacts_dir = workflow.artifacts_dir().to_path_buf();
    let scratch_dir = workflow.scratch_dir().to_path_buf();
    let unpack_dir = scratch_dir.join("unpacked");

    workflow.add_action(NpmPackAction {
        npm: npm_handle.clone(),
        source_dir: source_dir.clone(),
        scratch_dir,
        unpack_dir: unpack_dir.clone(),
    });
    workflow.add_action(CopySourceAction::new(
        unpack_dir.join("package"),
        &artifacts_dir,
        EXCLUDED_FILES,
    ));

    if options.download_dependencies {
        workflow.add_action(NpmInstallAction {
            npm: npm_handle,
            artifacts_dir: artifacts_dir.clone(),
        });
    }

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

/// Runs `npm pack` on the source and unpacks the resulting tarball.
#[derive(Debug, Clone)]
pub struct NpmPackAction {
    npm: ResolvedBinary,
    source_dir: PathBuf,
    scratch_dir: PathBuf,
    unpack_dir: PathBuf,
}

impl NpmPackAction {
    fn command(&self) -> Subprocess {
        let mut target = std::ffi::OsString::from("file:");
        target.push(self.source_dir.as_os_str());
        Subprocess::new(self.npm.path())
            .args(["pack", "-q"])
            .arg(target)
            .current_dir(&self.scratch_dir)
    }
}

impl Action for NpmPackAction {
    fn name(&self) -> &str {
        "NpmPack"
    }

    fn purpose(&self) -> Purpose {
        Purpose::CopySource
    }

    fn description(&self) -> &str {
        "Packaging source using NPM"
    }

    fn execute(&self) -> Result<(), ActionError> {
        std::fs::create_dir_all(&self.scratch_dir)?;
        let stdout = self.command().run_for_action("npm pack")?;

        // npm prints lifecycle script output first; the tarball name is last
        let tarball_name = stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
            .ok_or_else(|| ActionError::failed("npm pack did not report a tarball"))?;
        let tarball = self.scratch_dir.join(tarball_name);
        debug!(tarball = %tarball.display(), "npm pack produced tarball");

        extract_tarball(&tarball, &self.unpack_dir)?;
        Ok(())
    }
}

/// Installs production dependencies inside the artifacts directory.
#[derive(Debug, Clone)]
pub struct NpmInstallAction {
    npm: ResolvedBinary,
    artifacts_dir: PathBuf,
}

impl NpmInstallAction {
    fn command(&self) -> Subprocess {
        Subprocess::new(self.npm.path())
            .args([
                "install",
                "-q",
                "--no-audit",
                "--no-save",
                "--unsafe-perm",
                "--production",
            ])
            .current_dir(&self.artifacts_dir)
    }
}

impl Action for NpmInstallAction {
    fn name(&self) -> &str {
        "NpmInstall"
    }

    fn purpose(&self) -> Purpose {
        Purpose::ResolveDependencies
    }

    fn description(&self) -> &str {
        "Installing dependencies from NPM"
    }

    fn execute(&self) -> Result<(), ActionError> {
        self.command().run_for_action("npm install")?;
        Ok(())
    }
}
