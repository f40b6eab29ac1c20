//! Runtime and architecture validation for candidate executables
//!
//! A validator looks at one candidate path and either accepts it or explains
//! why not. A [`ValidatorError::MisMatch`] is about that candidate only, and
//! the caller moves on to the next one. The other variants describe a request
//! that can never be satisfied, whatever binary is found.

use crate::architecture::Architecture;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Runtime name paired with the architectures it accepts
pub type RuntimeTable = &'static [(&'static str, &'static [&'static str])];

const BOTH: &[&str] = &["arm64", "x86_64"];

/// Runtimes fnpack knows about and the architectures each accepts
pub const SUPPORTED_RUNTIMES: RuntimeTable = &[
    ("nodejs16.x", BOTH),
    ("nodejs18.x", BOTH),
    ("nodejs20.x", BOTH),
    ("nodejs22.x", BOTH),
    ("nodejs24.x", BOTH),
    ("python3.8", BOTH),
    ("python3.9", BOTH),
    ("python3.10", BOTH),
    ("python3.11", BOTH),
    ("python3.12", BOTH),
    ("python3.13", BOTH),
    ("python3.14", BOTH),
    ("ruby3.2", BOTH),
    ("ruby3.3", BOTH),
    ("ruby3.4", BOTH),
    ("java8", BOTH),
    ("java11", BOTH),
    ("java17", BOTH),
    ("java21", BOTH),
    ("java25", BOTH),
    ("go1.x", BOTH),
    ("dotnet6", BOTH),
    ("dotnet8", BOTH),
    ("dotnet10", BOTH),
    ("provided", BOTH),
    ("provided.al2", BOTH),
    ("provided.al2023", BOTH),
];

/// Architectures accepted for `runtime`, or `None` for an unknown runtime.
pub fn supported_architectures(runtime: &str) -> Option<&'static [&'static str]> {
    lookup_architectures(SUPPORTED_RUNTIMES, runtime)
}

fn lookup_architectures(table: RuntimeTable, runtime: &str) -> Option<&'static [&'static str]> {
    table
        .iter()
        .find(|(name, _)| *name == runtime)
        .map(|(_, archs)| *archs)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidatorError {
    /// The executable exists but is the wrong version
    #[error(
        "{language} executable found in your path does not match runtime. \n Expected version: {required_runtime}, Found a different version at {}.",
        .runtime_path.display()
    )]
    MisMatch {
        language: String,
        required_runtime: String,
        runtime_path: PathBuf,
    },

    #[error("Runtime {runtime} is not supported")]
    UnsupportedRuntime { runtime: String },

    #[error("Architecture {architecture} is not supported for runtime {runtime}")]
    UnsupportedArchitecture {
        runtime: String,
        architecture: String,
    },
}

impl ValidatorError {
    /// True for a per-candidate failure worth retrying with another path
    pub fn is_mismatch(&self) -> bool {
        matches!(self, ValidatorError::MisMatch { .. })
    }
}

/// Accepts or rejects a candidate executable.
pub trait RuntimeValidate {
    /// `Ok(Some(path))` accepts the candidate; `Ok(None)` passes on it silently.
    fn validate(&self, path: &Path) -> Result<Option<PathBuf>, ValidatorError>;
}

/// Checks the requested runtime/architecture pair against a runtime table,
/// [`SUPPORTED_RUNTIMES`] unless told otherwise.
///
/// Does not run the candidate. With no runtime requested every candidate is
/// accepted.
#[derive(Debug, Clone)]
pub struct RuntimeValidator {
    runtime: Option<String>,
    architecture: Architecture,
    supported_runtimes: RuntimeTable,
}

impl RuntimeValidator {
    pub fn new(runtime: Option<&str>, architecture: Architecture) -> Self {
        Self {
            runtime: runtime.map(str::to_string),
            architecture,
            supported_runtimes: SUPPORTED_RUNTIMES,
        }
    }

    /// Validates against `table` instead of [`SUPPORTED_RUNTIMES`].
    pub fn with_supported_runtimes(mut self, table: RuntimeTable) -> Self {
        self.supported_runtimes = table;
        self
    }

    pub fn runtime(&self) -> Option<&str> {
        self.runtime.as_deref()
    }

    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }
}

impl RuntimeValidate for RuntimeValidator {
    fn validate(&self, path: &Path) -> Result<Option<PathBuf>, ValidatorError> {
        let Some(runtime) = self.runtime.as_deref() else {
            return Ok(Some(path.to_path_buf()));
        };

        let archs = lookup_architectures(self.supported_runtimes, runtime).ok_or_else(|| {
            ValidatorError::UnsupportedRuntime {
                runtime: runtime.to_string(),
            }
        })?;

        if !archs.contains(&self.architecture.as_str()) {
            return Err(ValidatorError::UnsupportedArchitecture {
                runtime: runtime.to_string(),
                architecture: self.architecture.to_string(),
            });
        }

        debug!(runtime, architecture = %self.architecture, path = %path.display(), "runtime supported");
        Ok(Some(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        python_x86 = { "python3.12", Architecture::X86_64 },
        python_arm = { "python3.14", Architecture::Arm64 },
        node_arm = { "nodejs24.x", Architecture::Arm64 },
        go_arm = { "go1.x", Architecture::Arm64 },
        java8_arm = { "java8", Architecture::Arm64 },
        java25_x86 = { "java25", Architecture::X86_64 },
        ruby_arm = { "ruby3.4", Architecture::Arm64 },
        dotnet_arm = { "dotnet10", Architecture::Arm64 },
        provided_arm = { "provided.al2023", Architecture::Arm64 },
    )]
    fn test_supported_combinations(runtime: &str, arch: Architecture) {
        let validator = RuntimeValidator::new(Some(runtime), arch);
        let path = Path::new("/usr/bin/tool");
        assert_eq!(validator.validate(path).unwrap(), Some(path.to_path_buf()));
    }

    #[test]
    fn test_every_runtime_accepts_both_architectures() {
        for (runtime, archs) in SUPPORTED_RUNTIMES {
            assert_eq!(*archs, &["arm64", "x86_64"], "{}", runtime);
        }
        assert_eq!(supported_architectures("java8.al2"), None);
    }

    #[test]
    fn test_unsupported_runtime() {
        let validator = RuntimeValidator::new(Some("cobol85"), Architecture::X86_64);
        let err = validator.validate(Path::new("/usr/bin/cobc")).unwrap_err();
        assert_eq!(err.to_string(), "Runtime cobol85 is not supported");
        assert!(!err.is_mismatch());
    }

    const X86_ONLY: RuntimeTable = &[("go1.x", &["x86_64"])];

    #[test]
    fn test_unsupported_architecture() {
        let validator = RuntimeValidator::new(Some("go1.x"), Architecture::Arm64)
            .with_supported_runtimes(X86_ONLY);
        let err = validator.validate(Path::new("/usr/bin/go")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Architecture arm64 is not supported for runtime go1.x"
        );
    }

    #[test]
    fn test_custom_architecture_is_unsupported() {
        let arch: Architecture = "riscv64".parse().unwrap();
        let validator = RuntimeValidator::new(Some("python3.11"), arch);
        let err = validator.validate(Path::new("/usr/bin/python")).unwrap_err();
        assert!(matches!(err, ValidatorError::UnsupportedArchitecture { .. }));
    }

    #[test]
    fn test_no_runtime_accepts_everything() {
        let validator = RuntimeValidator::new(None, Architecture::Arm64);
        assert!(validator.validate(Path::new("/bin/make")).unwrap().is_some());
    }

    #[test]
    fn test_mismatch_message() {
        let err = ValidatorError::MisMatch {
            language: "python".to_string(),
            required_runtime: "python3.12".to_string(),
            runtime_path: PathBuf::from("/usr/bin/python3"),
        };
        assert!(err.is_mismatch());
        assert_eq!(
            err.to_string(),
            "python executable found in your path does not match runtime. \n Expected version: python3.12, Found a different version at /usr/bin/python3."
        );
    }
}
