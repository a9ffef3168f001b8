//! Source file discovery
//!
//! Global invariants enforced:
//! - Discovered files are sorted lexicographically before use
//! - Exclusion rules look only at path components below the analysed root
//! - The same test/venv rule is shared by every package-level analysis
//!
//! A file is a *test file* when any component of its root-relative path is
//! `test` or `tests`, or its stem starts with `test_` or ends with `_test`.
//! A file is a *venv file* when any component equals the dependency-install
//! directory name (`venv` unless configured otherwise).

use anyhow::{Context, Result};
use globset::GlobSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_VENV_DIR: &str = "venv";
const TEST_DIRS: &[&str] = &["test", "tests"];
const PYTHON_EXTENSION: &str = "py";

/// A discovered source file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    /// Path used to read the file
    pub path: PathBuf,
    /// Path below the analysed root, used for filtering and reporting
    pub relative: PathBuf,
}

/// Which side of the test/source split to select
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Non-test sources (depth engine, dryness meter)
    Sources,
    /// Test files only (test counter)
    Tests,
}

/// Path filter shared by every package-level analysis
#[derive(Debug, Clone)]
pub struct SourceFilter {
    venv_dir: String,
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl Default for SourceFilter {
    fn default() -> Self {
        SourceFilter::new(DEFAULT_VENV_DIR)
    }
}

impl SourceFilter {
    pub fn new(venv_dir: impl Into<String>) -> Self {
        SourceFilter {
            venv_dir: venv_dir.into(),
            include: None,
            exclude: None,
        }
    }

    /// Add user glob patterns on top of the built-in rule
    pub fn with_globs(mut self, include: Option<GlobSet>, exclude: Option<GlobSet>) -> Self {
        self.include = include;
        self.exclude = exclude;
        self
    }

    pub fn venv_dir(&self) -> &str {
        &self.venv_dir
    }

    pub fn is_test_file(&self, relative: &Path) -> bool {
        let in_test_dir = relative
            .components()
            .any(|c| TEST_DIRS.iter().any(|dir| c.as_os_str() == OsStr::new(dir)));
        let stem = relative
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        in_test_dir || stem.starts_with("test_") || stem.ends_with("_test")
    }

    pub fn is_venv_file(&self, relative: &Path) -> bool {
        relative
            .components()
            .any(|c| c.as_os_str() == OsStr::new(&self.venv_dir))
    }

    fn matches_globs(&self, relative: &Path) -> bool {
        let path_str = relative.to_string_lossy();
        if let Some(ref exclude) = self.exclude {
            if exclude.is_match(path_str.as_ref()) {
                return false;
            }
        }
        match self.include {
            Some(ref include) => include.is_match(path_str.as_ref()),
            None => true,
        }
    }

    /// Whether a root-relative path belongs to `selection`
    pub fn selects(&self, relative: &Path, selection: Selection) -> bool {
        if self.is_venv_file(relative) || !self.matches_globs(relative) {
            return false;
        }
        match selection {
            Selection::Sources => !self.is_test_file(relative),
            Selection::Tests => self.is_test_file(relative),
        }
    }

    /// Discover and filter the Python files under `root`, sorted
    pub fn discover(&self, root: &Path, selection: Selection) -> Result<Vec<SourceFile>> {
        let files = collect_python_files(root, &self.venv_dir)?;
        let mut selected = Vec::with_capacity(files.len());
        for path in files {
            let relative = relative_path(root, &path);
            if self.selects(&relative, selection) {
                selected.push(SourceFile { path, relative });
            } else {
                debug!(file = %relative.display(), ?selection, "skipping file");
            }
        }
        Ok(selected)
    }
}

/// Path of `path` below `root`; a root that is itself a file yields its name
pub fn relative_path(root: &Path, path: &Path) -> PathBuf {
    if root == path {
        return path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf());
    }
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Check if a file name is a Python source file
fn is_python_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(PYTHON_EXTENSION)
}

/// Collect all Python files from a path (file or directory), sorted
///
/// Directories named `venv_dir` are not descended into and symlinks are not
/// followed. Only the root itself must be readable; anything below it that
/// cannot be read is logged and skipped.
pub fn collect_python_files(path: &Path, venv_dir: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if path.is_file() {
        if is_python_file(path) {
            files.push(path.to_path_buf());
        }
    } else if path.is_dir() {
        let entries = std::fs::read_dir(path)
            .with_context(|| format!("Failed to read directory: {}", path.display()))?;
        collect_entries(entries, venv_dir, &mut files);
    } else {
        anyhow::bail!("Path does not exist: {}", path.display());
    }

    // Sort files for deterministic order
    files.sort();

    Ok(files)
}

/// Process one directory entry, pushing source files or recursing into dirs
fn process_dir_entry(
    path: PathBuf,
    metadata: std::fs::Metadata,
    venv_dir: &str,
    files: &mut Vec<PathBuf>,
) {
    if metadata.is_symlink() {
        return;
    }

    if metadata.is_dir() {
        if path.file_name() == Some(OsStr::new(venv_dir)) {
            return;
        }
        collect_python_files_recursive(&path, venv_dir, files);
    } else if metadata.is_file() && is_python_file(&path) {
        files.push(path);
    }
}

/// Recursively collect Python files from a directory below the root
fn collect_python_files_recursive(dir: &Path, venv_dir: &str, files: &mut Vec<PathBuf>) {
    match std::fs::read_dir(dir) {
        Ok(entries) => collect_entries(entries, venv_dir, files),
        Err(e) => warn!(dir = %dir.display(), error = %e, "skipping unreadable directory"),
    }
}

fn collect_entries(entries: std::fs::ReadDir, venv_dir: &str, files: &mut Vec<PathBuf>) {
    for entry_result in entries {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        match std::fs::symlink_metadata(&path) {
            Ok(metadata) => process_dir_entry(path, metadata, venv_dir, files),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable entry"),
        }
    }
}

#[cfg(test)]
#[path = "discover/tests.rs"]
mod tests;
