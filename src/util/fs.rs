//! File system helpers used by build actions and resolvers

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Finds every executable called `name`.
///
/// `search_paths` are tried first, in order, then each entry of `PATH`. A
/// directory that appears in both is only searched once. Returns an empty list
/// when nothing matches.
pub fn which(name: &str, search_paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = search_paths.to_vec();
    if let Some(path_var) = env::var_os("PATH") {
        dirs.extend(env::split_paths(&path_var));
    }

    let mut seen = Vec::new();
    let mut found = Vec::new();
    for dir in dirs {
        if dir.as_os_str().is_empty() || seen.contains(&dir) {
            continue;
        }
        for candidate in executable_names(name) {
            let path = dir.join(&candidate);
            if is_executable(&path) && !found.contains(&path) {
                trace!(path = %path.display(), "executable candidate");
                found.push(path);
            }
        }
        seen.push(dir);
    }

    found
}

#[cfg(windows)]
fn executable_names(name: &str) -> Vec<String> {
    let mut names = vec![name.to_string()];
    let pathext = env::var("PATHEXT").unwrap_or_else(|_| ".EXE;.BAT;.CMD".to_string());
    names.extend(pathext.split(';').filter(|e| !e.is_empty()).map(|ext| format!("{}{}", name, ext.to_lowercase())));
    names
}

#[cfg(not(windows))]
fn executable_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Matcher for file-name globs such as `*.pyc` or `.git`.
///
/// Patterns follow gitignore syntax, so a pattern without a slash matches the
/// entry's name at any depth.
fn exclude_matcher(root: &Path, excludes: &[String]) -> Result<Gitignore> {
    let mut builder = GitignoreBuilder::new(root);
    for pattern in excludes {
        builder
            .add_line(None, pattern)
            .with_context(|| format!("Invalid exclude pattern '{}'", pattern))?;
    }
    builder.build().context("Failed to build exclude matcher")
}

/// Recursively copies `source` into `destination`, creating it when missing.
///
/// Entries matching any of `excludes` are skipped along with everything below
/// them. Existing files in `destination` are overwritten.
pub fn copy_tree(source: &Path, destination: &Path, excludes: &[String]) -> Result<()> {
    let matcher = exclude_matcher(source, excludes)?;

    fs::create_dir_all(destination)
        .with_context(|| format!("Failed to create {}", destination.display()))?;

    let walker = WalkDir::new(source)
        .min_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            !matcher
                .matched(e.path(), e.file_type().is_dir())
                .is_ignore()
        });

    let mut copied = 0usize;
    for entry in walker {
        let entry = entry.context("Failed to read directory entry")?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .context("Failed to strip source prefix")?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
            copied += 1;
        }
    }

    debug!(
        source = %source.display(),
        destination = %destination.display(),
        files = copied,
        "copied tree"
    );
    Ok(())
}

/// Copies one entry (file or directory) to `target`.
pub fn copy_entry(source: &Path, target: &Path) -> Result<()> {
    if source.is_dir() {
        copy_tree(source, target, &[])
    } else {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, target).with_context(|| {
            format!("Failed to copy {} to {}", source.display(), target.display())
        })?;
        Ok(())
    }
}

/// Names of the direct children of `dir`, sorted. Missing directory yields none.
pub fn list_dir(dir: &Path) -> Result<Vec<std::ffi::OsString>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<std::io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

/// Unpacks a gzip-compressed tarball into `destination`.
pub fn extract_tarball(tarball: &Path, destination: &Path) -> Result<()> {
    let file = fs::File::open(tarball)
        .with_context(|| format!("Failed to open {}", tarball.display()))?;
    fs::create_dir_all(destination)?;

    let mut archive = Archive::new(GzDecoder::new(file));
    archive
        .unpack(destination)
        .with_context(|| format!("Failed to extract {}", tarball.display()))?;

    debug!(tarball = %tarball.display(), destination = %destination.display(), "extracted tarball");
    Ok(())
}
