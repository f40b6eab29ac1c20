//! A required executable and the means to find and check it

use crate::path_resolver::ExecutableResolver;
use crate::validator::RuntimeValidate;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Binds a resolver and validator to one binary name.
///
/// The accepted location is written once, by sanitization. When a path is
/// supplied up front, resolution is skipped and that path is the only
/// candidate the validator sees.
pub struct BinaryPath {
    resolver: Box<dyn ExecutableResolver>,
    validator: Box<dyn RuntimeValidate>,
    binary: String,
    provided: Option<PathBuf>,
    resolved: Arc<OnceLock<PathBuf>>,
}

impl BinaryPath {
    pub fn new(
        resolver: Box<dyn ExecutableResolver>,
        validator: Box<dyn RuntimeValidate>,
        binary: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            validator,
            binary: binary.into(),
            provided: None,
            resolved: Arc::new(OnceLock::new()),
        }
    }

    /// Uses `path` as the sole candidate instead of asking the resolver.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.provided = Some(path.into());
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn resolver(&self) -> &dyn ExecutableResolver {
        self.resolver.as_ref()
    }

    pub fn validator(&self) -> &dyn RuntimeValidate {
        self.validator.as_ref()
    }

    pub fn path_provided(&self) -> bool {
        self.provided.is_some()
    }

    pub fn provided_path(&self) -> Option<&Path> {
        self.provided.as_deref()
    }

    /// The validated path, or the supplied one before validation.
    pub fn binary_path(&self) -> Option<&Path> {
        self.resolved
            .get()
            .map(PathBuf::as_path)
            .or(self.provided.as_deref())
    }

    /// True once sanitization accepted a path for this binary
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Records the accepted path. Returns false if one was already recorded.
    pub(crate) fn set_binary_path(&self, path: PathBuf) -> bool {
        self.resolved.set(path).is_ok()
    }

    /// Handle for actions that need the path at execution time.
    pub fn handle(&self) -> ResolvedBinary {
        ResolvedBinary {
            binary: self.binary.clone(),
            provided: self.provided.clone(),
            resolved: Arc::clone(&self.resolved),
        }
    }
}

impl fmt::Debug for BinaryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryPath")
            .field("binary", &self.binary)
            .field("binary_path", &self.binary_path())
            .field("path_provided", &self.path_provided())
            .finish()
    }
}

/// Read side of a [`BinaryPath`], handed to actions at construction.
///
/// Actions are built before sanitization runs, so they hold this handle and
/// look the path up when they execute.
#[derive(Debug, Clone)]
pub struct ResolvedBinary {
    binary: String,
    provided: Option<PathBuf>,
    resolved: Arc<OnceLock<PathBuf>>,
}

impl ResolvedBinary {
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Path to execute. Falls back to the bare binary name (looked up on
    /// `PATH` by the OS) when nothing was resolved.
    pub fn path(&self) -> PathBuf {
        self.resolved
            .get()
            .cloned()
            .or_else(|| self.provided.clone())
            .unwrap_or_else(|| PathBuf::from(&self.binary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::Architecture;
    use crate::path_resolver::PathResolver;
    use crate::validator::RuntimeValidator;

    fn make_binary() -> BinaryPath {
        BinaryPath::new(
            Box::new(PathResolver::new("make", None, Vec::new())),
            Box::new(RuntimeValidator::new(None, Architecture::X86_64)),
            "make",
        )
    }

    #[test]
    fn test_starts_unresolved() {
        let binary = make_binary();
        assert_eq!(binary.binary(), "make");
        assert!(!binary.path_provided());
        assert!(binary.binary_path().is_none());
        assert_eq!(binary.handle().path(), PathBuf::from("make"));
    }

    #[test]
    fn test_with_path_marks_provided() {
        let binary = make_binary().with_path("/opt/bin/make");
        assert!(binary.path_provided());
        assert!(!binary.is_resolved());
        assert_eq!(binary.binary_path(), Some(Path::new("/opt/bin/make")));
    }

    #[test]
    fn test_path_is_written_once_and_seen_by_handles() {
        let binary = make_binary();
        let handle = binary.handle();

        assert!(binary.set_binary_path(PathBuf::from("/usr/bin/make")));
        assert!(!binary.set_binary_path(PathBuf::from("/usr/local/bin/make")));

        assert_eq!(binary.binary_path(), Some(Path::new("/usr/bin/make")));
        assert_eq!(handle.path(), PathBuf::from("/usr/bin/make"));
    }
}
