//! Recoverable per-file failures
//!
//! Nothing in here aborts a package analysis. Every variant is rendered to a
//! string and appended to the package error list by the caller.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Source text that tree-sitter could not turn into a clean syntax tree
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("syntax error in module {module}, skipping: {message} (line {line}, column {column})")]
pub struct ParseError {
    pub path: PathBuf,
    pub module: String,
    /// 1-indexed line of the first error node
    pub line: usize,
    /// 0-indexed column of the first error node
    pub column: usize,
    pub message: String,
}

/// Failure while processing a single source file
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl FileError {
    pub fn is_parse(&self) -> bool {
        matches!(self, FileError::Parse(_))
    }
}
