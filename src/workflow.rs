//! Workflow instances and their execution
//!
//! A [`WorkflowSpec`] is what gets registered: a name, a capability and a
//! factory. The factory turns [`BuildParams`] into a [`Workflow`] holding an
//! ordered action list and the binaries those actions need.
//!
//! [`Workflow::run`] is single-shot:
//!
//! ```text
//! Constructed -> Sanitizing -> Running -> Succeeded
//!                     |           |
//!                     +-----------+-----> Failed
//! ```
//!
//! Sanitizing resolves and validates every declared binary before any action
//! runs. Actions then execute strictly in order, and the first failure stops
//! the run. Nothing done by earlier actions is rolled back.

use crate::actions::{describe, Action, ActionError};
use crate::architecture::{Architecture, BuildMode};
use crate::binary_path::BinaryPath;
use crate::capability::Capability;
use crate::error::WorkflowError;
use crate::path_resolver::PathResolver;
use crate::validator::RuntimeValidator;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Optional build settings shared by every workflow.
///
/// Workflows ignore the fields that do not apply to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    pub runtime: Option<String>,
    pub executable_search_paths: Vec<PathBuf>,
    pub optimizations: Map<String, Value>,
    /// Free-form, workflow specific options
    pub options: Map<String, Value>,
    pub mode: BuildMode,
    pub download_dependencies: bool,
    pub dependencies_dir: Option<PathBuf>,
    pub combine_dependencies: bool,
    pub architecture: Architecture,
    pub is_building_layer: bool,
    pub experimental_flags: Vec<String>,
    pub build_in_source: Option<bool>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            runtime: None,
            executable_search_paths: Vec::new(),
            optimizations: Map::new(),
            options: Map::new(),
            mode: BuildMode::default(),
            download_dependencies: true,
            dependencies_dir: None,
            combine_dependencies: true,
            architecture: Architecture::default(),
            is_building_layer: false,
            experimental_flags: Vec::new(),
            build_in_source: None,
        }
    }
}

impl BuildOptions {
    /// String value of a workflow specific option
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }
}

/// Everything a workflow factory receives.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildParams {
    pub source_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub options: BuildOptions,
}

impl BuildParams {
    pub fn new(
        source_dir: impl Into<PathBuf>,
        artifacts_dir: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
        manifest_path: impl Into<PathBuf>,
        options: BuildOptions,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            artifacts_dir: artifacts_dir.into(),
            scratch_dir: scratch_dir.into(),
            manifest_path: manifest_path.into(),
            options,
        }
    }
}

/// Whether a workflow can build directly inside the source directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildInSourceSupport {
    /// Always builds in scratch
    #[default]
    NotSupported,
    /// Builds in scratch unless the caller asks otherwise
    OptionallySupported,
    /// Always builds in source
    ExclusivelySupported,
}

impl BuildInSourceSupport {
    pub fn allowed_values(&self) -> &'static [bool] {
        match self {
            BuildInSourceSupport::NotSupported => &[false],
            BuildInSourceSupport::OptionallySupported => &[true, false],
            BuildInSourceSupport::ExclusivelySupported => &[true],
        }
    }

    pub fn default_value(&self) -> bool {
        matches!(self, BuildInSourceSupport::ExclusivelySupported)
    }
}

/// Constructs a workflow instance from its spec and the build parameters.
pub type WorkflowFactory = fn(&WorkflowSpec, BuildParams) -> Result<Workflow, WorkflowError>;

/// Registered description of a workflow.
#[derive(Clone)]
pub struct WorkflowSpec {
    pub name: String,
    pub capability: Capability,
    pub factory: WorkflowFactory,
    /// Manifest file names this workflow understands; empty means any
    pub supported_manifests: Vec<String>,
    pub build_in_source_support: BuildInSourceSupport,
}

impl WorkflowSpec {
    pub fn new(name: impl Into<String>, capability: Capability, factory: WorkflowFactory) -> Self {
        Self {
            name: name.into(),
            capability,
            factory,
            supported_manifests: Vec::new(),
            build_in_source_support: BuildInSourceSupport::default(),
        }
    }

    pub fn with_supported_manifests(mut self, manifests: &[&str]) -> Self {
        self.supported_manifests = manifests.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_build_in_source_support(mut self, support: BuildInSourceSupport) -> Self {
        self.build_in_source_support = support;
        self
    }

    pub fn instantiate(&self, params: BuildParams) -> Result<Workflow, WorkflowError> {
        (self.factory)(self, params)
    }
}

impl fmt::Debug for WorkflowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowSpec")
            .field("name", &self.name)
            .field("capability", &self.capability)
            .field("supported_manifests", &self.supported_manifests)
            .field("build_in_source_support", &self.build_in_source_support)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Constructed,
    Sanitizing,
    Running,
    Succeeded,
    Failed,
}

/// One build: ordered actions plus the binaries they rely on.
pub struct Workflow {
    name: String,
    capability: Capability,
    params: BuildParams,
    supported_manifests: Vec<String>,
    build_in_source: bool,
    actions: Vec<Box<dyn Action>>,
    binaries: IndexMap<String, BinaryPath>,
    state: WorkflowState,
}

impl Workflow {
    pub fn new(spec: &WorkflowSpec, params: BuildParams) -> Self {
        let build_in_source = resolve_build_in_source(
            &spec.name,
            spec.build_in_source_support,
            params.options.build_in_source,
        );

        Self {
            name: spec.name.clone(),
            capability: spec.capability.clone(),
            params,
            supported_manifests: spec.supported_manifests.clone(),
            build_in_source,
            actions: Vec::new(),
            binaries: IndexMap::new(),
            state: WorkflowState::Constructed,
        }
    }

    pub fn add_action(&mut self, action: impl Action + 'static) {
        self.actions.push(Box::new(action));
    }

    /// Declares a binary the actions need. A second binary with the same name
    /// replaces the first.
    pub fn add_binary(&mut self, binary: BinaryPath) {
        self.binaries.insert(binary.binary().to_string(), binary);
    }

    /// A binary found on the search paths and `PATH`, checked against the
    /// requested runtime and architecture.
    pub fn path_binary(&self, binary: &str) -> BinaryPath {
        let options = &self.params.options;
        BinaryPath::new(
            Box::new(PathResolver::new(
                binary,
                options.runtime.as_deref(),
                options.executable_search_paths.clone(),
            )),
            Box::new(RuntimeValidator::new(
                options.runtime.as_deref(),
                options.architecture.clone(),
            )),
            binary,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn params(&self) -> &BuildParams {
        &self.params
    }

    pub fn options(&self) -> &BuildOptions {
        &self.params.options
    }

    pub fn source_dir(&self) -> &Path {
        &self.params.source_dir
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.params.artifacts_dir
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.params.scratch_dir
    }

    pub fn manifest_path(&self) -> &Path {
        &self.params.manifest_path
    }

    pub fn build_in_source(&self) -> bool {
        self.build_in_source
    }

    /// Where intermediate build output goes
    pub fn build_dir(&self) -> &Path {
        if self.build_in_source {
            &self.params.source_dir
        } else {
            &self.params.scratch_dir
        }
    }

    /// True when the manifest's file name is one this workflow understands.
    pub fn is_supported(&self) -> bool {
        if self.supported_manifests.is_empty() {
            return true;
        }
        self.params
            .manifest_path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| self.supported_manifests.iter().any(|m| m == n))
    }

    pub fn actions(&self) -> &[Box<dyn Action>] {
        &self.actions
    }

    pub fn binaries(&self) -> &IndexMap<String, BinaryPath> {
        &self.binaries
    }

    pub fn binary_path(&self, binary: &str) -> Option<&Path> {
        self.binaries.get(binary).and_then(BinaryPath::binary_path)
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Resolves binaries, then executes every action in order.
    pub fn run(&mut self) -> Result<(), WorkflowError> {
        if self.state != WorkflowState::Constructed {
            return Err(WorkflowError::failed(
                &self.name,
                None,
                "Workflow has already been run",
            ));
        }

        debug!(workflow = %self.name, "running workflow");

        if self.actions.is_empty() {
            self.state = WorkflowState::Failed;
            return Err(WorkflowError::failed(
                &self.name,
                None,
                "Workflow does not have any actions registered",
            ));
        }

        self.state = WorkflowState::Sanitizing;
        if let Err(e) = self.sanitize() {
            self.state = WorkflowState::Failed;
            return Err(e);
        }

        self.state = WorkflowState::Running;
        let outcome = self.execute_actions();
        self.state = if outcome.is_ok() {
            WorkflowState::Succeeded
        } else {
            WorkflowState::Failed
        };
        outcome
    }

    fn sanitize(&self) -> Result<(), WorkflowError> {
        let workflow_name = &self.name;
        let runtime = self.params.options.runtime.as_deref();
        let mut validation_errors: Vec<String> = Vec::new();
        let mut invalid_paths: IndexMap<&str, Vec<PathBuf>> = IndexMap::new();

        for (name, binary) in self.binaries.iter() {
            let rejected = invalid_paths.entry(name.as_str()).or_default();

            let candidates = match binary.provided_path() {
                Some(path) => vec![path.to_path_buf()],
                None => binary.resolver().exec_paths().map_err(|e| {
                    debug!(binary = %name, error = %e, "resolver found no candidates");
                    WorkflowError::failed(workflow_name, Some("Resolver"), e.to_string())
                })?,
            };

            for candidate in candidates {
                match binary.validator().validate(&candidate) {
                    Ok(Some(valid)) => {
                        debug!(binary = %name, path = %valid.display(), "candidate accepted");
                        binary.set_binary_path(valid);
                        break;
                    }
                    Ok(None) => {
                        debug!(binary = %name, path = %candidate.display(), "candidate skipped");
                    }
                    Err(e) if e.is_mismatch() => {
                        debug!(binary = %name, path = %candidate.display(), error = %e, "candidate rejected");
                        rejected.push(candidate);
                    }
                    Err(e) => {
                        debug!(binary = %name, path = %candidate.display(), error = %e, "invalid build request");
                        let message = e.to_string();
                        if !validation_errors.contains(&message) {
                            validation_errors.push(message);
                        }
                    }
                }
            }
        }

        if !validation_errors.is_empty() {
            return Err(WorkflowError::failed(
                workflow_name,
                Some("Validation"),
                validation_errors.join("\n"),
            ));
        }

        let unresolved: Vec<String> = self
            .binaries
            .iter()
            .filter(|(_, binary)| !binary.is_resolved())
            .map(|(name, _)| {
                let tried = invalid_paths
                    .get(name.as_str())
                    .map(|paths| {
                        paths
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default();
                let runtime = display_field_str(runtime);
                format!(
                    "Binary validation failed for {b}, searched for {b} in following locations  : [{tried}] which did not satisfy constraints for runtime: {rt}. Do you have {b} for runtime: {rt} on your PATH?",
                    b = name,
                    tried = tried,
                    rt = runtime
                )
            })
            .collect();

        if !unresolved.is_empty() {
            return Err(WorkflowError::failed(
                workflow_name,
                Some("Validation"),
                unresolved.join("\n"),
            ));
        }

        Ok(())
    }

    fn execute_actions(&self) -> Result<(), WorkflowError> {
        for action in &self.actions {
            let action_info = format!("Workflow='{}',Action='{}'", self.name, action.name());

            info!("Running {}: {}", action_info, action.description());

            match action.execute() {
                Ok(()) => debug!("{} succeeded", action_info),
                Err(ActionError::Failed(reason)) => {
                    debug!(reason = %reason, "{} failed", action_info);
                    return Err(WorkflowError::failed(
                        &self.name,
                        Some(action.name()),
                        reason,
                    ));
                }
                Err(ActionError::Unexpected(e)) => {
                    debug!(error = ?e, "{} raised unhandled error", action_info);
                    return Err(WorkflowError::unknown(
                        &self.name,
                        Some(action.name()),
                        format!("{:#}", e),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn display_field_str(value: Option<&str>) -> &str {
    value.unwrap_or("(none)")
}

fn resolve_build_in_source(
    workflow: &str,
    support: BuildInSourceSupport,
    requested: Option<bool>,
) -> bool {
    match requested {
        None => support.default_value(),
        Some(value) if support.allowed_values().contains(&value) => value,
        Some(value) => {
            let default = support.default_value();
            warn!(
                workflow,
                requested = value,
                using = default,
                "Workflow does not support build_in_source={}, using default",
                value
            );
            default
        }
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actions: Vec<String> = self.actions.iter().map(|a| describe(a.as_ref())).collect();
        write!(f, "Workflow={}\nActions=\n\t{}", self.name, actions.join("\n\t"))
    }
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("capability", &self.capability.to_string())
            .field("state", &self.state)
            .field("actions", &self.actions.len())
            .field("binaries", &self.binaries)
            .finish()
    }
}
