//! Error types shared by the registry, workflows and the builder facade.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while registering or looking up workflows.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A workflow is already registered under the derived key
    #[error("A workflow with capability key '{key}' is already registered")]
    DuplicateCapability { key: String },

    /// No workflow matches the requested capability
    #[error(
        "Unable to find a workflow matching given capability: {}, {}, {}",
        crate::capability::display_field(.language),
        crate::capability::display_field(.dependency_manager),
        crate::capability::display_field(.application_framework)
    )]
    WorkflowNotFound {
        language: Option<String>,
        dependency_manager: Option<String>,
        application_framework: Option<String>,
    },

    /// Workflow declared an empty name
    #[error("Workflow must provide a valid name")]
    InvalidName,
}

/// Errors a workflow reports to its caller.
///
/// `Failed` covers well-known failures (an action reported a failure, binary
/// sanitization rejected the environment, the workflow was misconfigured).
/// `Unknown` means an action broke in a way nobody anticipated.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{}{} - {}", .workflow_name, action_suffix(.action_name), .reason)]
    Failed {
        workflow_name: String,
        action_name: Option<String>,
        reason: String,
    },

    #[error("{}{} - {}", .workflow_name, action_suffix(.action_name), .reason)]
    Unknown {
        workflow_name: String,
        action_name: Option<String>,
        reason: String,
    },
}

fn action_suffix(action_name: &Option<String>) -> String {
    action_name
        .as_deref()
        .map(|name| format!(":{}", name))
        .unwrap_or_default()
}

impl WorkflowError {
    pub fn failed(workflow_name: &str, action_name: Option<&str>, reason: impl Into<String>) -> Self {
        WorkflowError::Failed {
            workflow_name: workflow_name.to_string(),
            action_name: action_name.map(str::to_string),
            reason: reason.into(),
        }
    }

    pub fn unknown(workflow_name: &str, action_name: Option<&str>, reason: impl Into<String>) -> Self {
        WorkflowError::Unknown {
            workflow_name: workflow_name.to_string(),
            action_name: action_name.map(str::to_string),
            reason: reason.into(),
        }
    }

    pub fn action_name(&self) -> Option<&str> {
        match self {
            WorkflowError::Failed { action_name, .. } | WorkflowError::Unknown { action_name, .. } => {
                action_name.as_deref()
            }
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            WorkflowError::Failed { reason, .. } | WorkflowError::Unknown { reason, .. } => reason,
        }
    }
}

/// Errors surfaced by [`crate::builder::Builder`].
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// A requested workflow source is not linked into this binary
    #[error("Unknown workflow source: {0}")]
    UnknownWorkflowSource(String),

    #[error("Failed to create scratch directory {}: {source}", .path.display())]
    ScratchDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuilderError {
    /// HTTP-like status code reported at the JSON-RPC boundary.
    ///
    /// Known failures the caller can act on map to 400; crashes and
    /// environment problems map to 500.
    pub fn status_code(&self) -> i64 {
        match self {
            BuilderError::Registry(RegistryError::WorkflowNotFound { .. }) => 400,
            BuilderError::Workflow(WorkflowError::Failed { .. }) => 400,
            _ => 500,
        }
    }
}
