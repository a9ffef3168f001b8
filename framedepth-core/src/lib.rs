//! framedepth core library - static call depth analysis for Python packages

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Files are visited in sorted path order
// - Per-file extraction is independent; merging is sequential
// - A file that fails to read or parse contributes nothing but an error entry
// - Depth resolution terminates on any call graph, cyclic or not
// - Identical input yields byte-for-byte identical output

pub mod analysis;
pub mod callgraph;
pub mod config;
pub mod discover;
pub mod dryness;
pub mod error;
pub mod parser;
pub mod report;
pub mod resolver;
pub mod stats;
pub mod test_counter;
pub mod tree_sitter_utils;

pub use analysis::PackageAggregator;
pub use callgraph::{CallGraph, ScopeTracking};
pub use config::ResolvedConfig;
pub use discover::SourceFilter;
pub use error::{FileError, ParseError};
pub use report::{render_json, render_text, PackageReport, QualityReport};

use anyhow::Result;
use std::path::Path;

/// Knobs for a single depth analysis run
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub scope_tracking: ScopeTracking,
    /// Extract per-file call graphs on the rayon pool
    pub parallel: bool,
    pub filter: SourceFilter,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            scope_tracking: ScopeTracking::default(),
            parallel: true,
            filter: SourceFilter::default(),
        }
    }
}

/// Analyze the package at the given path
pub fn analyze(path: &Path, options: &AnalysisOptions) -> Result<PackageReport> {
    PackageAggregator::new(options).analyze(path)
}

/// Analyze the package at the given path using resolved configuration
pub fn analyze_with_config(path: &Path, config: &ResolvedConfig) -> Result<PackageReport> {
    analyze(path, &config.analysis_options())
}

/// Run the depth engine, test counter, and dryness meter over one package
pub fn quality_report(path: &Path, config: &ResolvedConfig) -> Result<QualityReport> {
    let options = config.analysis_options();
    Ok(QualityReport {
        frame_depth: analyze(path, &options)?,
        tests: test_counter::count_tests_in_package(path, &options.filter)?,
        dryness: dryness::check_dryness(path, &options.filter)?,
    })
}
