//! Reporting and output generation
//!
//! Global invariants enforced:
//! - Serialized field names are a downstream contract and never change
//! - Deterministic output ordering
//! - Byte-for-byte identical output across runs

use crate::callgraph::CallGraph;
use crate::dryness::DrynessReport;
use crate::resolver::DepthTable;
use crate::stats::{mean, population_std_dev, round_to};
use crate::test_counter::TestReport;
use anyhow::Result;
use serde::{Deserialize, Serialize};

const MEAN_PLACES: usize = 2;
const STD_DEV_PLACES: usize = 3;

/// Package-level call depth statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PackageReport {
    pub count_of_functions: usize,
    pub count_of_errors_while_parsing: usize,
    pub max_depth: u64,
    pub mean_average_depth: f64,
    /// Qualified name of the deepest function, `null` for an empty package
    pub max_depth_function: Option<String>,
    pub standard_deviation: f64,
    /// Same statistics with every total depth of exactly 1 discarded
    pub mean_average_depth_excluding_ones: f64,
    pub standard_deviation_excluding_ones: f64,
    /// Per-file failure messages; only their count is serialized
    #[serde(skip)]
    pub errors: Vec<String>,
}

impl PackageReport {
    /// Summarize resolved depths
    ///
    /// Ties for the maximum go to the entry first written to the depth table.
    pub fn summarize(graph: &CallGraph, depths: &DepthTable, errors: Vec<String>) -> Self {
        let mut max: Option<(u64, &str)> = None;
        for (id, total) in depths.iter() {
            if max.map_or(true, |(best, _)| total > best) {
                max = Some((total, graph.record(id).name.as_str()));
            }
        }

        let values: Vec<u64> = depths.values().collect();
        let excluding_ones: Vec<u64> = values.iter().copied().filter(|&v| v != 1).collect();

        PackageReport {
            count_of_functions: graph.len(),
            count_of_errors_while_parsing: errors.len(),
            max_depth: max.map(|(total, _)| total).unwrap_or(0),
            mean_average_depth: round_to(mean(&values), MEAN_PLACES),
            max_depth_function: max.map(|(_, name)| name.to_string()),
            standard_deviation: round_to(population_std_dev(&values), STD_DEV_PLACES),
            mean_average_depth_excluding_ones: round_to(mean(&excluding_ones), MEAN_PLACES),
            standard_deviation_excluding_ones: round_to(
                population_std_dev(&excluding_ones),
                STD_DEV_PLACES,
            ),
            errors,
        }
    }
}

/// The package analyses bundled for a surrounding report assembler
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct QualityReport {
    pub frame_depth: PackageReport,
    pub tests: TestReport,
    pub dryness: DrynessReport,
}

/// Render any report as pretty JSON
pub fn render_json<T: Serialize>(report: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Render a depth report as text output
pub fn render_text(report: &PackageReport) -> String {
    let mut output = String::new();
    let rows: [(&str, String); 8] = [
        ("functions", report.count_of_functions.to_string()),
        ("parse errors", report.count_of_errors_while_parsing.to_string()),
        ("max depth", report.max_depth.to_string()),
        (
            "max depth function",
            report
                .max_depth_function
                .clone()
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("mean depth", format!("{:.2}", report.mean_average_depth)),
        ("std deviation", format!("{:.3}", report.standard_deviation)),
        (
            "mean depth (excl. 1)",
            format!("{:.2}", report.mean_average_depth_excluding_ones),
        ),
        (
            "std deviation (excl. 1)",
            format!("{:.3}", report.standard_deviation_excluding_ones),
        ),
    ];
    for (label, value) in rows {
        output.push_str(&format!("{:<24} {}\n", label, value));
    }

    if !report.errors.is_empty() {
        output.push_str("\nErrors:\n");
        for error in &report.errors {
            output.push_str(&format!("  {}\n", error));
        }
    }

    output
}

/// Render a test count report as text output
pub fn render_tests_text(report: &TestReport) -> String {
    let mut output = format!("{:<8} {}\n", "TESTS", "FILE");
    for (file, count) in &report.tests_per_file {
        output.push_str(&format!("{:<8} {}\n", count, file));
    }
    output.push_str(&format!("\nTotal tests: {}\n", report.total_tests));
    output
}

/// Render a dryness report as text output
pub fn render_dryness_text(report: &DrynessReport) -> String {
    format!(
        "{:<24} {}\n{:<24} {:.2}%\n",
        "blocks", report.total_hashes, "duplicated", report.percentage_duplicates
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve_total_depths;

    fn graph(defs: &[(&str, u32)], calls: &[(&str, &str)]) -> CallGraph {
        let mut graph = CallGraph::new();
        for (name, depth) in defs {
            graph.define(name.to_string(), *depth);
        }
        for (caller, callee) in calls {
            let id = graph.id_of(caller).unwrap();
            graph.add_call(id, callee.to_string());
        }
        graph
    }

    #[test]
    fn test_empty_package() {
        let g = CallGraph::new();
        let report = PackageReport::summarize(&g, &resolve_total_depths(&g), Vec::new());
        assert_eq!(report.count_of_functions, 0);
        assert_eq!(report.max_depth, 0);
        assert_eq!(report.max_depth_function, None);
        assert_eq!(report.mean_average_depth, 0.0);
        assert_eq!(report.standard_deviation, 0.0);
        assert_eq!(report.mean_average_depth_excluding_ones, 0.0);
        assert_eq!(report.standard_deviation_excluding_ones, 0.0);
    }

    #[test]
    fn test_all_ones_excluded_set_is_empty() {
        let g = graph(&[("m.a", 1), ("m.b", 1)], &[]);
        let report = PackageReport::summarize(&g, &resolve_total_depths(&g), Vec::new());
        assert_eq!(report.mean_average_depth, 1.0);
        assert_eq!(report.mean_average_depth_excluding_ones, 0.0);
        assert_eq!(report.standard_deviation_excluding_ones, 0.0);
    }

    #[test]
    fn test_statistics_and_rounding() {
        // totals: a = 1 + 2 = 3, b = 2, c = 1
        let g = graph(&[("m.a", 1), ("m.b", 2), ("m.c", 1)], &[("m.a", "m.b")]);
        let report = PackageReport::summarize(&g, &resolve_total_depths(&g), Vec::new());
        assert_eq!(report.count_of_functions, 3);
        assert_eq!(report.max_depth, 3);
        assert_eq!(report.max_depth_function.as_deref(), Some("m.a"));
        assert_eq!(report.mean_average_depth, 2.0);
        // sqrt(2/3) = 0.8164...
        assert_eq!(report.standard_deviation, 0.816);
        assert_eq!(report.mean_average_depth_excluding_ones, 2.5);
        assert_eq!(report.standard_deviation_excluding_ones, 0.5);
    }

    #[test]
    fn test_mean_rounds_ties_to_even() {
        // seven leaves plus a caller with nine edges: 17 / 8 = 2.125
        let mut defs = vec![("m.caller", 1)];
        let leaves = ["m.l1", "m.l2", "m.l3", "m.l4", "m.l5", "m.l6", "m.l7"];
        defs.extend(leaves.iter().map(|name| (*name, 1)));
        let calls = vec![("m.caller", "m.l1"); 9];
        let g = graph(&defs, &calls);
        let report = PackageReport::summarize(&g, &resolve_total_depths(&g), Vec::new());
        assert_eq!(report.count_of_functions, 8);
        assert_eq!(report.max_depth, 10);
        assert_eq!(report.mean_average_depth, 2.12);
    }

    #[test]
    fn test_max_tie_goes_to_first_written() {
        // b is written first (1), then a (2), then x (2)
        let g = graph(&[("m.a", 1), ("m.b", 1), ("m.x", 2)], &[("m.a", "m.b"), ("m.b", "m.c")]);
        let report = PackageReport::summarize(&g, &resolve_total_depths(&g), Vec::new());
        assert_eq!(report.max_depth, 2);
        assert_eq!(report.max_depth_function.as_deref(), Some("m.a"));

        let g = graph(&[("m.x", 2), ("m.y", 2)], &[]);
        let report = PackageReport::summarize(&g, &resolve_total_depths(&g), Vec::new());
        assert_eq!(report.max_depth_function.as_deref(), Some("m.x"));
    }

    #[test]
    fn test_errors_counted_not_serialized() {
        let g = CallGraph::new();
        let errors = vec!["syntax error in module broken, skipping: x".to_string()];
        let report = PackageReport::summarize(&g, &resolve_total_depths(&g), errors);
        assert_eq!(report.count_of_errors_while_parsing, 1);

        let json = render_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 8);
        for key in [
            "count_of_functions",
            "count_of_errors_while_parsing",
            "max_depth",
            "max_depth_function",
            "mean_average_depth",
            "standard_deviation",
            "mean_average_depth_excluding_ones",
            "standard_deviation_excluding_ones",
        ] {
            assert!(keys.contains(&key), "missing {}", key);
        }
        assert!(value["max_depth_function"].is_null());
    }

    #[test]
    fn test_render_text_lists_errors() {
        let report = PackageReport {
            errors: vec!["failed to read a.py: denied".to_string()],
            count_of_errors_while_parsing: 1,
            ..Default::default()
        };
        let text = render_text(&report);
        assert!(text.contains("max depth function       -"));
        assert!(text.contains("Errors:\n  failed to read a.py: denied"));
    }
}
