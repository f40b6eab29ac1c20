//! Blocking subprocess execution
//!
//! Every package-manager call a workflow makes goes through [`Subprocess`].
//! The calling thread blocks until the child exits; there is no timeout.

use crate::actions::ActionError;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Captured result of a finished child process
#[derive(Debug, Clone)]
pub struct SubprocessOutput {
    /// Exit code, `None` when the child was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl SubprocessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// A command line waiting to be run.
#[derive(Debug, Clone)]
pub struct Subprocess {
    program: PathBuf,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    env: Vec<(OsString, OsString)>,
}

impl Subprocess {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Command line rendered for logs and error messages
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }

    /// Runs the command and captures its output. Only spawn failures are errors.
    pub fn run(&self) -> io::Result<SubprocessOutput> {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }

        debug!(command = %self.display(), cwd = ?self.cwd, "spawning process");

        let output = command.output()?;
        let result = SubprocessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.stderr.is_empty() {
            debug!(stderr = %result.stderr.trim(), "command stderr");
        }
        if !result.stdout.is_empty() {
            debug!(stdout = %result.stdout.trim(), "command stdout");
        }

        Ok(result)
    }

    /// Runs the command for an action.
    ///
    /// A non-zero exit becomes [`ActionError::Failed`] carrying the tool's
    /// stderr (stdout when stderr is empty). A spawn failure is unexpected.
    /// Returns trimmed stdout on success.
    pub fn run_for_action(&self, tool: &str) -> Result<String, ActionError> {
        let output = self.run()?;

        if !output.success() {
            let detail = if output.stderr.trim().is_empty() {
                output.stdout.trim()
            } else {
                output.stderr.trim()
            };
            let code = output
                .code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(ActionError::failed(format!(
                "{} failed (exit {}): {}",
                tool, code, detail
            )));
        }

        Ok(output.stdout.trim().to_string())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_run_captures_stdout() {
        let output = Subprocess::new("/bin/sh")
            .args(["-c", "echo hello"])
            .run()
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    fn test_run_honours_cwd_and_env() {
        let dir = TempDir::new().unwrap();
        let output = Subprocess::new("/bin/sh")
            .args(["-c", "pwd; echo $FNPACK_TEST_VALUE"])
            .current_dir(dir.path())
            .env("FNPACK_TEST_VALUE", "42")
            .run()
            .unwrap();
        let lines: Vec<&str> = output.stdout.lines().collect();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(Path::new(lines[0]).canonicalize().unwrap(), expected);
        assert_eq!(lines[1], "42");
    }

    #[test]
    fn test_non_zero_exit_is_known_failure() {
        let err = Subprocess::new("/bin/sh")
            .args(["-c", "echo broken >&2; exit 3"])
            .run_for_action("sh")
            .unwrap_err();
        match err {
            ActionError::Failed(reason) => {
                assert_eq!(reason, "sh failed (exit 3): broken");
            }
            other => panic!("expected known failure, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_program_is_unexpected() {
        let err = Subprocess::new("/definitely/not/here/fnpack-tool")
            .run_for_action("tool")
            .unwrap_err();
        assert!(matches!(err, ActionError::Unexpected(_)));
    }

    #[test]
    fn test_display_joins_program_and_args() {
        let cmd = Subprocess::new("npm").args(["pack", "-q"]);
        assert_eq!(cmd.display(), "npm pack -q");
    }
}
