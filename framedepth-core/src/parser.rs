//! Python source parser using tree-sitter
//!
//! tree-sitter always produces a tree, recovering from bad input with
//! `ERROR` and `MISSING` nodes. A tree containing either is reported as a
//! [`ParseError`] so the caller can skip the file. The grammar also accepts
//! some Python 2 only syntax without error nodes; those constructs are
//! rejected the same way.

use crate::error::ParseError;
use crate::tree_sitter_utils::{find_first, first_error_node, node_text};
use anyhow::{Context, Result};
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

const SNIPPET_LEN: usize = 40;

/// Node kinds the grammar accepts that only exist in Python 2
const PYTHON2_KINDS: &[(&str, &str)] = &[
    ("print_statement", "Python 2 `print` statement"),
    ("exec_statement", "Python 2 `exec` statement"),
    ("<>", "Python 2 `<>` operator"),
];

/// Python parser using tree-sitter
pub struct PythonParser;

impl PythonParser {
    /// Create a new Python parser
    pub fn new() -> Result<Self> {
        // Just validate that the grammar loads
        new_ts_parser()?;
        Ok(PythonParser)
    }

    /// Parse one file's text into a syntax tree
    ///
    /// `path` only identifies the file in diagnostics and supplies the
    /// module stem used for qualified names.
    pub fn parse(&self, source: &str, path: &Path) -> std::result::Result<ParsedModule, ParseError> {
        let module = module_stem(path);
        // A fresh tree-sitter parser per call keeps `&self` shareable across threads
        let mut parser = new_ts_parser().map_err(|e| ParseError {
            path: path.to_path_buf(),
            module: module.clone(),
            line: 0,
            column: 0,
            message: format!("{:#}", e),
        })?;

        let tree = parser.parse(source, None).ok_or_else(|| ParseError {
            path: path.to_path_buf(),
            module: module.clone(),
            line: 0,
            column: 0,
            message: "parser produced no syntax tree".to_string(),
        })?;

        if let Some(bad) = first_error_node(tree.root_node()) {
            return Err(ParseError {
                path: path.to_path_buf(),
                module,
                line: bad.start_position().row + 1,
                column: bad.start_position().column,
                message: describe_error_node(bad, source),
            });
        }

        if let Some((node, message)) = first_python2_node(tree.root_node()) {
            return Err(ParseError {
                path: path.to_path_buf(),
                module,
                line: node.start_position().row + 1,
                column: node.start_position().column,
                message: message.to_string(),
            });
        }

        Ok(ParsedModule {
            tree,
            source: source.to_string(),
            module,
        })
    }
}

fn new_ts_parser() -> Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .context("Failed to set Python language for parser")?;
    Ok(parser)
}

fn first_python2_node(root: Node<'_>) -> Option<(Node<'_>, &'static str)> {
    let node = find_first(root, |n| PYTHON2_KINDS.iter().any(|(kind, _)| n.kind() == *kind))?;
    PYTHON2_KINDS
        .iter()
        .find(|(kind, _)| node.kind() == *kind)
        .map(|(_, message)| (node, *message))
}

fn describe_error_node(node: Node<'_>, source: &str) -> String {
    if node.is_missing() {
        return format!("missing `{}`", node.kind());
    }
    let text = node_text(node, source);
    let first_line = text.lines().next().unwrap_or("").trim();
    if first_line.is_empty() {
        return "invalid syntax".to_string();
    }
    let snippet: String = first_line.chars().take(SNIPPET_LEN).collect();
    if snippet.len() < first_line.len() {
        format!("invalid syntax near `{}...`", snippet)
    } else {
        format!("invalid syntax near `{}`", snippet)
    }
}

/// File name without its final extension, e.g. `utils` for `pkg/utils.py`
pub fn module_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parsed Python module
#[derive(Debug)]
pub struct ParsedModule {
    tree: Tree,
    source: String,
    module: String,
}

impl ParsedModule {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Module stem used as the qualified-name prefix
    pub fn module(&self) -> &str {
        &self.module
    }
}
