//! Candidate discovery for required executables

use crate::capability::display_field;
use crate::util::fs::which;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error(
        "Path resolution for runtime: {} of binary: {} was not successful",
        display_field(.runtime),
        .binary
    )]
    NotFound {
        runtime: Option<String>,
        binary: String,
    },
}

/// Produces an ordered list of candidate paths for one binary.
pub trait ExecutableResolver {
    /// Name of the binary being resolved
    fn binary(&self) -> &str;

    /// Candidates in preference order. Never returns an empty list: "not
    /// found anywhere" is an error.
    fn exec_paths(&self) -> Result<Vec<PathBuf>, ResolverError>;
}

/// Looks the binary up on the caller's search paths, then `PATH`.
///
/// When a runtime is given, an executable named after the runtime (for
/// example `python3.12`) is preferred over the plain binary name.
#[derive(Debug, Clone)]
pub struct PathResolver {
    binary: String,
    runtime: Option<String>,
    executable_search_paths: Vec<PathBuf>,
}

impl PathResolver {
    pub fn new(
        binary: impl Into<String>,
        runtime: Option<&str>,
        executable_search_paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            binary: binary.into(),
            runtime: runtime.map(str::to_string),
            executable_search_paths,
        }
    }

    fn executables(&self) -> Vec<&str> {
        let mut names = Vec::with_capacity(2);
        if let Some(runtime) = self.runtime.as_deref() {
            if runtime != self.binary && !runtime.is_empty() {
                names.push(runtime);
            }
        }
        names.push(self.binary.as_str());
        names
    }
}

impl ExecutableResolver for PathResolver {
    fn binary(&self) -> &str {
        &self.binary
    }

    fn exec_paths(&self) -> Result<Vec<PathBuf>, ResolverError> {
        let mut paths: Vec<PathBuf> = Vec::new();
        for name in self.executables() {
            for path in which(name, &self.executable_search_paths) {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }

        if paths.is_empty() {
            return Err(ResolverError::NotFound {
                runtime: self.runtime.clone(),
                binary: self.binary.clone(),
            });
        }

        debug!(binary = %self.binary, candidates = paths.len(), "resolved candidate paths");
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_named_executable_comes_first() {
        let resolver = PathResolver::new("python", Some("python3.12"), Vec::new());
        assert_eq!(resolver.executables(), vec!["python3.12", "python"]);
    }

    #[test]
    fn test_runtime_equal_to_binary_is_not_repeated() {
        let resolver = PathResolver::new("make", Some("make"), Vec::new());
        assert_eq!(resolver.executables(), vec!["make"]);

        let resolver = PathResolver::new("make", None, Vec::new());
        assert_eq!(resolver.executables(), vec!["make"]);
    }

    #[test]
    fn test_missing_binary_is_an_error() {
        let resolver = PathResolver::new("doesnotexist123", Some("provided"), Vec::new());
        let err = resolver.exec_paths().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Path resolution for runtime: provided of binary: doesnotexist123 was not successful"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_search_paths_are_used() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let tool = dir.path().join("fnpack-resolver-tool");
        fs::write(&tool, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

        let resolver =
            PathResolver::new("fnpack-resolver-tool", None, vec![dir.path().to_path_buf()]);
        assert_eq!(resolver.exec_paths().unwrap(), vec![tool]);
    }
}
