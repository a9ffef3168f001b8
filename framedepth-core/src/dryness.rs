//! Duplicate block detection
//!
//! Every indented block is hashed with SHA-256 over its source text, less
//! trailing whitespace. Identical hashes across the package mark duplicated
//! code. Blocks shorter than [`MIN_BLOCK_LINES`] are counted but not hashed.

use crate::discover::{Selection, SourceFilter};
use crate::error::ParseError;
use crate::parser::PythonParser;
use crate::stats::round_to;
use crate::tree_sitter_utils::{for_each_node, node_text};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

pub const MIN_BLOCK_LINES: usize = 2;

/// Block hashes for one module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockHashes {
    /// Hex-encoded SHA-256 digests in source order
    pub hashes: Vec<String>,
    pub skipped: usize,
}

/// Package duplication summary
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct DrynessReport {
    /// Hashed plus skipped blocks
    pub total_hashes: usize,
    /// Distinct duplicated hashes as a percentage of `total_hashes`
    pub percentage_duplicates: f64,
}

/// Hash every indented block in one module
pub fn hash_blocks(
    parser: &PythonParser,
    source: &str,
    path: &Path,
) -> std::result::Result<BlockHashes, ParseError> {
    let module = parser.parse(source, path)?;
    let mut blocks = BlockHashes::default();
    for_each_node(module.root(), &mut |node| {
        if node.kind() != "block" {
            return;
        }
        let text = node_text(node, module.source()).trim_end();
        if text.lines().count() < MIN_BLOCK_LINES {
            blocks.skipped += 1;
            return;
        }
        blocks
            .hashes
            .push(format!("{:x}", Sha256::digest(text.as_bytes())));
    });
    Ok(blocks)
}

/// Summarize block hashes gathered across a package
pub fn summarize(hashes: &[String], skipped: usize) -> DrynessReport {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for hash in hashes {
        *counts.entry(hash.as_str()).or_default() += 1;
    }
    let duplicated = counts.values().filter(|&&n| n > 1).count();
    let total_hashes = hashes.len() + skipped;
    let percentage_duplicates = if total_hashes == 0 {
        0.0
    } else {
        round_to(duplicated as f64 / total_hashes as f64 * 100.0, 2)
    };

    DrynessReport {
        total_hashes,
        percentage_duplicates,
    }
}

/// Measure duplication across the package's non-test sources
pub fn check_dryness(root: &Path, filter: &SourceFilter) -> Result<DrynessReport> {
    info!(root = %root.display(), "checking dryness");
    let parser = PythonParser::new()?;
    let mut hashes = Vec::new();
    let mut skipped = 0;

    for file in filter.discover(root, Selection::Sources)? {
        let source = match std::fs::read_to_string(&file.path) {
            Ok(source) => source,
            Err(e) => {
                warn!(file = %file.path.display(), error = %e, "failed to read file");
                continue;
            }
        };
        match hash_blocks(&parser, &source, &file.relative) {
            Ok(blocks) => {
                hashes.extend(blocks.hashes);
                skipped += blocks.skipped;
            }
            Err(e) => warn!(error = %e, "skipping unparsable file"),
        }
    }

    let report = summarize(&hashes, skipped);
    info!(
        total = report.total_hashes,
        duplicates = report.percentage_duplicates,
        "dryness check complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const DUPLICATED: &str = r#"
def first(items):
    for item in items:
        total = item * 2
        print(total)

def second(items):
    count = len(items)
    for item in items:
        total = item * 2
        print(total)
"#;

    #[test]
    fn test_hash_blocks_counts_and_skips() {
        let parser = PythonParser::new().unwrap();
        let blocks = hash_blocks(&parser, DUPLICATED, Path::new("dup.py")).unwrap();
        // Two function bodies and two identical loop bodies
        assert_eq!(blocks.hashes.len(), 4);
        assert_eq!(blocks.skipped, 0);
        assert_eq!(blocks.hashes[1], blocks.hashes[3]);
        assert_ne!(blocks.hashes[0], blocks.hashes[2]);
        assert_eq!(blocks.hashes[0].len(), 64);

        let short = hash_blocks(&parser, "def f():\n    return 1\n", Path::new("s.py")).unwrap();
        assert!(short.hashes.is_empty());
        assert_eq!(short.skipped, 1);
    }

    #[test]
    fn test_summarize() {
        let hashes: Vec<String> = ["a", "b", "a", "c", "c", "c"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let report = summarize(&hashes, 2);
        assert_eq!(report.total_hashes, 8);
        // a and c are duplicated: 2 / 8
        assert_eq!(report.percentage_duplicates, 25.0);
        assert_eq!(summarize(&[], 0).percentage_duplicates, 0.0);
    }

    #[test]
    fn test_check_dryness_skips_tests_and_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("tests")).unwrap();
        fs::write(root.join("dup.py"), DUPLICATED).unwrap();
        fs::write(root.join("broken.py"), "def broken(:\n").unwrap();
        fs::write(root.join("tests/test_dup.py"), DUPLICATED).unwrap();

        let report = check_dryness(root, &SourceFilter::default()).unwrap();
        assert_eq!(report.total_hashes, 4);
        assert_eq!(report.percentage_duplicates, 25.0);
    }
}
