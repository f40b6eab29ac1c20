//! File-moving actions shared by several workflows

use super::{Action, ActionError, Purpose};
use crate::util::fs::{copy_entry, copy_tree, list_dir};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Copies the source tree, skipping entries that match any exclude glob.
#[derive(Debug, Clone)]
pub struct CopySourceAction {
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub excludes: Vec<String>,
}

impl CopySourceAction {
    pub fn new(source_dir: impl Into<PathBuf>, dest_dir: impl Into<PathBuf>, excludes: &[&str]) -> Self {
        Self {
            source_dir: source_dir.into(),
            dest_dir: dest_dir.into(),
            excludes: excludes.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl Action for CopySourceAction {
    fn name(&self) -> &str {
        "CopySource"
    }

    fn purpose(&self) -> Purpose {
        Purpose::CopySource
    }

    fn description(&self) -> &str {
        "Copying source code while skipping certain commonly excluded files"
    }

    fn execute(&self) -> Result<(), ActionError> {
        copy_tree(&self.source_dir, &self.dest_dir, &self.excludes)?;
        Ok(())
    }
}

/// Entries of `artifact_dir` that did not come from `source_dir`.
fn new_dependencies(source_dir: &Path, artifact_dir: &Path) -> Result<Vec<OsString>, ActionError> {
    let source_names = list_dir(source_dir)?;
    Ok(list_dir(artifact_dir)?
        .into_iter()
        .filter(|name| !source_names.contains(name))
        .collect())
}

/// Copies dependencies the build produced into a separate directory.
#[derive(Debug, Clone)]
pub struct CopyDependenciesAction {
    pub source_dir: PathBuf,
    pub artifact_dir: PathBuf,
    pub destination_dir: PathBuf,
}

impl Action for CopyDependenciesAction {
    fn name(&self) -> &str {
        "CopyDependencies"
    }

    fn purpose(&self) -> Purpose {
        Purpose::CopyDependencies
    }

    fn description(&self) -> &str {
        "Copying dependencies while skipping source file"
    }

    fn execute(&self) -> Result<(), ActionError> {
        let names = new_dependencies(&self.source_dir, &self.artifact_dir)?;
        fs::create_dir_all(&self.destination_dir)?;
        for name in &names {
            copy_entry(&self.artifact_dir.join(name), &self.destination_dir.join(name))?;
        }
        debug!(count = names.len(), destination = %self.destination_dir.display(), "copied dependencies");
        Ok(())
    }
}

/// Moves dependencies the build produced into a separate directory.
#[derive(Debug, Clone)]
pub struct MoveDependenciesAction {
    pub source_dir: PathBuf,
    pub artifact_dir: PathBuf,
    pub destination_dir: PathBuf,
}

impl Action for MoveDependenciesAction {
    fn name(&self) -> &str {
        "MoveDependencies"
    }

    fn purpose(&self) -> Purpose {
        Purpose::MoveDependencies
    }

    fn description(&self) -> &str {
        "Moving dependencies while skipping source file"
    }

    fn execute(&self) -> Result<(), ActionError> {
        let names = new_dependencies(&self.source_dir, &self.artifact_dir)?;
        fs::create_dir_all(&self.destination_dir)?;
        for name in &names {
            let target = self.destination_dir.join(name);
            if target.is_dir() {
                fs::remove_dir_all(&target)?;
            }
            fs::rename(self.artifact_dir.join(name), &target)?;
        }
        debug!(count = names.len(), destination = %self.destination_dir.display(), "moved dependencies");
        Ok(())
    }
}

/// Empties a directory, keeping the directory itself.
#[derive(Debug, Clone)]
pub struct CleanUpAction {
    pub target_dir: PathBuf,
}

impl Action for CleanUpAction {
    fn name(&self) -> &str {
        "CleanUp"
    }

    fn purpose(&self) -> Purpose {
        Purpose::CleanUp
    }

    fn description(&self) -> &str {
        "Cleaning up the target folder"
    }

    fn execute(&self) -> Result<(), ActionError> {
        if !self.target_dir.is_dir() {
            debug!(target = %self.target_dir.display(), "nothing to clean");
            return Ok(());
        }
        for entry in fs::read_dir(&self.target_dir)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}
