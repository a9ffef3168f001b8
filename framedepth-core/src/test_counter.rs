//! Test function counting
//!
//! Counts `test_*` functions and methods in the files the depth engine
//! skips as tests. Parse failures count as zero tests for that file.

use crate::discover::{Selection, SourceFilter};
use crate::error::ParseError;
use crate::parser::PythonParser;
use crate::tree_sitter_utils::{for_each_node, is_function, node_text};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

const TEST_PREFIX: &str = "test_";

/// Test counts for a package
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TestReport {
    pub total_tests: usize,
    /// Root-relative path -> number of test functions
    pub tests_per_file: BTreeMap<String, usize>,
}

/// Count test functions in one module's source
pub fn count_tests_in_module(
    parser: &PythonParser,
    source: &str,
    path: &Path,
) -> std::result::Result<usize, ParseError> {
    let module = parser.parse(source, path)?;
    let mut count = 0;
    for_each_node(module.root(), &mut |node| {
        if !is_function(node) {
            return;
        }
        if let Some(name) = node.child_by_field_name("name") {
            let name = node_text(name, module.source());
            if name.starts_with(TEST_PREFIX) {
                debug!(function = name, "found test function");
                count += 1;
            }
        }
    });
    Ok(count)
}

/// Count test functions across every test file under `root`
pub fn count_tests_in_package(root: &Path, filter: &SourceFilter) -> Result<TestReport> {
    info!(root = %root.display(), "counting tests");
    let parser = PythonParser::new()?;
    let mut report = TestReport::default();

    for file in filter.discover(root, Selection::Tests)? {
        let source = match std::fs::read_to_string(&file.path) {
            Ok(source) => source,
            Err(e) => {
                warn!(file = %file.path.display(), error = %e, "failed to read test file");
                continue;
            }
        };
        let count = match count_tests_in_module(&parser, &source, &file.relative) {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "skipping unparsable test file");
                0
            }
        };
        report.total_tests += count;
        report
            .tests_per_file
            .insert(file.relative.to_string_lossy().replace('\\', "/"), count);
    }

    info!(total = report.total_tests, "test count complete");
    Ok(report)
}
