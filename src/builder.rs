//! Builder facade: pick a workflow once, then build with it.

use crate::capability::Capability;
use crate::error::BuilderError;
use crate::registry::{default_registry, Registry, WorkflowModule};
use crate::workflow::{BuildOptions, BuildParams, WorkflowSpec};
use crate::workflows::{find_modules, DEFAULT_WORKFLOW_SOURCE};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Selects the workflow for a capability and runs builds with it.
///
/// The workflow is looked up when the builder is created. Later calls to
/// [`Builder::build`] always use that workflow, whatever manifest or options
/// they pass.
#[derive(Debug, Clone)]
pub struct Builder {
    spec: WorkflowSpec,
}

impl Builder {
    /// Builder backed by the process-wide registry and every built-in workflow.
    pub fn new(capability: Capability) -> Result<Self, BuilderError> {
        Self::with_sources(capability, &[DEFAULT_WORKFLOW_SOURCE])
    }

    /// Builder backed by the process-wide registry, loading only the named
    /// workflow sources. An empty list loads nothing.
    pub fn with_sources<S: AsRef<str>>(
        capability: Capability,
        sources: &[S],
    ) -> Result<Self, BuilderError> {
        let modules = find_modules(sources)?;
        Self::from_registry(capability, default_registry(), &modules)
    }

    /// Loads `modules` into `registry` and looks up `capability` there.
    ///
    /// Loading is idempotent per registry, so the same module list can be
    /// passed any number of times.
    pub fn from_registry(
        capability: Capability,
        registry: &Registry,
        modules: &[WorkflowModule],
    ) -> Result<Self, BuilderError> {
        for module in modules {
            registry.load_module(module)?;
        }

        let spec = registry.get_workflow(&capability)?;
        debug!(workflow = %spec.name, capability = %capability, "selected workflow");
        Ok(Self { spec })
    }

    pub fn workflow_name(&self) -> &str {
        &self.spec.name
    }

    pub fn capability(&self) -> &Capability {
        &self.spec.capability
    }

    /// Creates `scratch_dir` if needed, instantiates the workflow and runs it.
    pub fn build(
        &self,
        source_dir: impl Into<PathBuf>,
        artifacts_dir: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
        manifest_path: impl Into<PathBuf>,
        options: BuildOptions,
    ) -> Result<(), BuilderError> {
        let scratch_dir = scratch_dir.into();
        fs::create_dir_all(&scratch_dir).map_err(|source| BuilderError::ScratchDir {
            path: scratch_dir.clone(),
            source,
        })?;

        let params = BuildParams::new(source_dir, artifacts_dir, scratch_dir, manifest_path, options);
        let mut workflow = self.spec.instantiate(params)?;
        info!(workflow = %workflow.name(), "starting build");
        workflow.run()?;
        info!(workflow = %workflow.name(), artifacts_dir = %workflow.artifacts_dir().display(), "build succeeded");
        Ok(())
    }
}
