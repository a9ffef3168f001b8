//! Analysis orchestration - ties together discovery, parsing, call graph
//! extraction, depth resolution, and reporting

use crate::callgraph::{build_call_graph, CallGraph, ScopeTracking};
use crate::discover::{Selection, SourceFile};
use crate::error::FileError;
use crate::parser::PythonParser;
use crate::report::PackageReport;
use crate::resolver::resolve_total_depths;
use crate::AnalysisOptions;
use anyhow::Result;
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// Read, parse, and extract the call graph of one file
pub fn analyze_file(
    file: &SourceFile,
    parser: &PythonParser,
    tracking: ScopeTracking,
) -> std::result::Result<CallGraph, FileError> {
    info!(file = %file.relative.display(), "processing file");
    let source = std::fs::read_to_string(&file.path).map_err(|source| FileError::Read {
        path: file.path.clone(),
        source,
    })?;
    let module = parser.parse(&source, &file.relative)?;
    let graph = build_call_graph(&module, tracking);
    debug!(
        file = %file.relative.display(),
        functions = graph.len(),
        calls = graph.edge_count(),
        "extracted call graph"
    );
    Ok(graph)
}

/// Package-wide call graph merged from every analysed file
#[derive(Debug, Clone, Default)]
pub struct PackageGraph {
    pub graph: CallGraph,
    /// One message per file that contributed nothing
    pub errors: Vec<String>,
    pub files_analyzed: usize,
}

/// Drives per-file extraction and package-level resolution
pub struct PackageAggregator<'o> {
    options: &'o AnalysisOptions,
}

impl<'o> PackageAggregator<'o> {
    pub fn new(options: &'o AnalysisOptions) -> Self {
        PackageAggregator { options }
    }

    /// Extract and merge call graphs for every eligible file under `root`
    ///
    /// Files are processed in sorted order; on a qualified-name collision
    /// the later file wins. Per-file failures are recorded, never raised.
    pub fn build_package_graph(&self, root: &Path) -> Result<PackageGraph> {
        let files = self.options.filter.discover(root, Selection::Sources)?;
        let parser = PythonParser::new()?;
        let tracking = self.options.scope_tracking;

        // Extraction is independent per file; merging stays sequential
        let outcomes: Vec<_> = if self.options.parallel {
            files
                .par_iter()
                .map(|file| analyze_file(file, &parser, tracking))
                .collect()
        } else {
            files
                .iter()
                .map(|file| analyze_file(file, &parser, tracking))
                .collect()
        };

        let mut package = PackageGraph {
            files_analyzed: files.len(),
            ..Default::default()
        };
        for (file, outcome) in files.iter().zip(outcomes) {
            match outcome {
                Ok(graph) => package.graph.merge(graph),
                Err(e) => {
                    if e.is_parse() {
                        warn!(file = %file.relative.display(), error = %e, "skipping unparsable file");
                    } else {
                        warn!(file = %file.relative.display(), error = %e, "skipping unreadable file");
                    }
                    package.errors.push(e.to_string());
                }
            }
        }
        Ok(package)
    }

    /// Analyze the package under `root` and summarize its call depths
    pub fn analyze(&self, root: &Path) -> Result<PackageReport> {
        info!(root = %root.display(), "analyzing package");
        let package = self.build_package_graph(root)?;
        let depths = resolve_total_depths(&package.graph);
        let report = PackageReport::summarize(&package.graph, &depths, package.errors);

        match report.max_depth_function {
            Some(ref function) => info!(
                files = package.files_analyzed,
                max_depth = report.max_depth,
                function = %function,
                "package analysis complete"
            ),
            None => warn!("no valid Python functions found"),
        }
        Ok(report)
    }
}
