//! fnpack - build orchestrator for serverless function artifacts
//!
//! Given a source tree, a dependency manifest and a capability triple
//! `(language, dependency_manager, application_framework)`, fnpack selects a
//! build workflow, checks that the toolchain binaries it needs exist and match
//! the target runtime, then runs the workflow's actions in order to fill an
//! artifacts directory.
//!
//! # Core Concepts
//!
//! - **Capability**: the triple a workflow is registered under
//! - **Registry**: thread-safe capability -> workflow map; one workflow per key
//! - **Workflow**: ordered build actions plus the binaries they depend on
//! - **Sanitize**: the pre-flight that resolves and validates every binary
//!   before any action runs
//! - **Builder**: picks the workflow once and runs builds with it
//!
//! # Example Usage
//!
//! ```no_run
//! use fnpack::{BuildOptions, Builder, Capability};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let builder = Builder::new(Capability::new(Some("python"), Some("pip"), None))?;
//! builder.build(
//!     "/work/src",
//!     "/work/artifacts",
//!     "/work/scratch",
//!     "/work/src/requirements.txt",
//!     BuildOptions {
//!         runtime: Some("python3.12".to_string()),
//!         ..Default::default()
//!     },
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`registry`]: capability registry and workflow module loading
//! - [`workflow`]: workflow instances, sanitize and the run state machine
//! - [`workflows`]: built-in ecosystem workflows
//! - [`builder`]: the facade used by the CLI
//! - [`cli`]: JSON-RPC front door

pub mod actions;
pub mod architecture;
pub mod binary_path;
pub mod builder;
pub mod capability;
pub mod cli;
pub mod config;
pub mod error;
pub mod id_enum;
pub mod path_resolver;
pub mod registry;
pub mod util;
pub mod validator;
pub mod workflow;
pub mod workflows;

pub use actions::{Action, ActionError, Purpose};
pub use architecture::{Architecture, BuildMode};
pub use binary_path::{BinaryPath, ResolvedBinary};
pub use builder::Builder;
pub use capability::Capability;
pub use config::{ConfigError, FnpackConfig};
pub use error::{BuilderError, RegistryError, WorkflowError};
pub use path_resolver::{ExecutableResolver, PathResolver, ResolverError};
pub use registry::{default_registry, Registry, WorkflowModule};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};
pub use validator::{RuntimeTable, RuntimeValidate, RuntimeValidator, ValidatorError};
pub use workflow::{
    BuildInSourceSupport, BuildOptions, BuildParams, Workflow, WorkflowSpec, WorkflowState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_fnpack() {
        assert_eq!(NAME, "fnpack");
    }
}
