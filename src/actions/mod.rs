//! Build actions
//!
//! An action is one discrete build step: resolve dependencies, copy source,
//! compile. Workflows hold an ordered list of actions and execute them one at
//! a time. An action reports either a well-known failure
//! ([`ActionError::Failed`]) or an unexpected one ([`ActionError::Unexpected`]);
//! the workflow wraps the two differently.

mod copy;

pub use copy::{CleanUpAction, CopyDependenciesAction, CopySourceAction, MoveDependenciesAction};

use std::fmt;
use thiserror::Error;

/// What an action contributes to the build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    ResolveDependencies,
    CopySource,
    CompileSource,
    CleanUp,
    CopyDependencies,
    MoveDependencies,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::ResolveDependencies => "RESOLVE_DEPENDENCIES",
            Purpose::CopySource => "COPY_SOURCE",
            Purpose::CompileSource => "COMPILE_SOURCE",
            Purpose::CleanUp => "CLEAN_UP",
            Purpose::CopyDependencies => "COPY_DEPENDENCIES",
            Purpose::MoveDependencies => "MOVE_DEPENDENCIES",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a failed [`Action::execute`].
#[derive(Debug, Error)]
pub enum ActionError {
    /// The action detected and reported a known failure mode
    #[error("{0}")]
    Failed(String),

    /// Anything the action did not anticipate
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ActionError {
    pub fn failed(reason: impl Into<String>) -> Self {
        ActionError::Failed(reason.into())
    }
}

impl From<std::io::Error> for ActionError {
    fn from(err: std::io::Error) -> Self {
        ActionError::Unexpected(err.into())
    }
}

/// One build step.
pub trait Action {
    /// Short identifier, unique within a workflow
    fn name(&self) -> &str;

    fn purpose(&self) -> Purpose;

    fn description(&self) -> &str;

    /// Perform the step. Mutates the filesystem, never the action itself.
    fn execute(&self) -> Result<(), ActionError>;
}

impl fmt::Debug for dyn Action + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", describe(self))
    }
}

/// Renders an action as `Name=<name>, Purpose=<PURPOSE>, Description=<text>`.
pub fn describe(action: &dyn Action) -> String {
    format!(
        "Name={}, Purpose={}, Description={}",
        action.name(),
        action.purpose(),
        action.description()
    )
}
