//! Call graph extraction
//!
//! Walks a parsed Python module and records, for every function or method
//! definition, its lexical nesting depth and the names it calls.
//!
//! ## Limitations
//!
//! Call targets are matched by **lexical name only**:
//!
//! - ❌ No import resolution or type-based binding
//! - ❌ No dynamic dispatch, reflection, or indirect calls
//! - ❌ Only `name(...)` and `name.attr(...)` call shapes are recorded
//!
//! A recorded callee that matches no definition in the package is simply
//! unknown and contributes nothing downstream.

use crate::parser::ParsedModule;
use crate::tree_sitter_utils::{is_function, node_text};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use tree_sitter::Node;

/// Index of a function in a [`CallGraph`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub usize);

/// A function or method definition keyed by its qualified name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRecord {
    /// `{module_stem}.{function_name}`
    pub name: String,
    /// Lexical nesting level, 1 for a top-level function or a method
    pub base_depth: u32,
}

/// Arena of function records with their ordered, unresolved call edges
///
/// Iteration order is the order in which names were first defined.
/// Redefining a name overwrites its depth and clears its edges in place.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    records: Vec<FunctionRecord>,
    calls: Vec<Vec<String>>,
    index: HashMap<String, FunctionId>,
}

impl CallGraph {
    /// Create an empty call graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or redefine) a function; last writer wins
    pub fn define(&mut self, name: String, base_depth: u32) -> FunctionId {
        debug_assert!(base_depth >= 1, "base depth must be positive");
        if let Some(&id) = self.index.get(&name) {
            self.records[id.0].base_depth = base_depth;
            self.calls[id.0].clear();
            return id;
        }

        let id = FunctionId(self.records.len());
        self.index.insert(name.clone(), id);
        self.records.push(FunctionRecord { name, base_depth });
        self.calls.push(Vec::new());
        id
    }

    /// Append a call edge (caller -> textual callee name)
    pub fn add_call(&mut self, caller: FunctionId, callee: String) {
        self.calls[caller.0].push(callee);
    }

    /// Merge another graph into this one, replacing colliding names
    pub fn merge(&mut self, other: CallGraph) {
        for (record, calls) in other.records.into_iter().zip(other.calls) {
            let id = self.define(record.name, record.base_depth);
            self.calls[id.0] = calls;
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn id_of(&self, name: &str) -> Option<FunctionId> {
        self.index.get(name).copied()
    }

    pub fn record(&self, id: FunctionId) -> &FunctionRecord {
        &self.records[id.0]
    }

    pub fn get(&self, name: &str) -> Option<&FunctionRecord> {
        self.id_of(name).map(|id| self.record(id))
    }

    /// Records in first-definition order
    pub fn records(&self) -> impl Iterator<Item = (FunctionId, &FunctionRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, record)| (FunctionId(i), record))
    }

    /// Outgoing callee names in source order, duplicates preserved
    pub fn calls(&self, id: FunctionId) -> &[String] {
        &self.calls[id.0]
    }

    /// Resolve every textual edge against the known definitions
    ///
    /// Unknown callees are dropped; repeated edges stay repeated.
    pub fn linked_edges(&self) -> Vec<Vec<FunctionId>> {
        self.calls
            .iter()
            .map(|callees| {
                callees
                    .iter()
                    .filter_map(|callee| self.id_of(callee))
                    .collect()
            })
            .collect()
    }

    /// Total number of recorded edges, including unknown callees
    pub fn edge_count(&self) -> usize {
        self.calls.iter().map(Vec::len).sum()
    }
}

/// How calls are attributed to enclosing functions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeTracking {
    /// Innermost enclosing function; leaving a nested function re-activates its parent
    #[default]
    Stack,
    /// One "current function" slot, cleared whenever any function is left.
    /// Calls after a nested definition in the enclosing body are dropped.
    SingleSlot,
}

impl ScopeTracking {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeTracking::Stack => "stack",
            ScopeTracking::SingleSlot => "single_slot",
        }
    }
}

/// Build the call graph for a single parsed module
pub fn build_call_graph(module: &ParsedModule, tracking: ScopeTracking) -> CallGraph {
    let mut builder = CallGraphBuilder::new(module.module(), module.source(), tracking);
    builder.walk(module.root());
    builder.finish()
}

/// Single-file tree walk producing function records and call edges
pub struct CallGraphBuilder<'m> {
    module: &'m str,
    source: &'m str,
    tracking: ScopeTracking,
    depth: u32,
    scopes: Vec<FunctionId>,
    current: Option<FunctionId>,
    graph: CallGraph,
}

impl<'m> CallGraphBuilder<'m> {
    pub fn new(module: &'m str, source: &'m str, tracking: ScopeTracking) -> Self {
        CallGraphBuilder {
            module,
            source,
            tracking,
            depth: 0,
            scopes: Vec::new(),
            current: None,
            graph: CallGraph::new(),
        }
    }

    pub fn finish(self) -> CallGraph {
        self.graph
    }

    /// Walk `root` in pre-order with an explicit work stack
    ///
    /// A `Leave` step is queued beneath a definition's children so the
    /// function is left once its whole subtree has been visited.
    pub fn walk(&mut self, root: Node<'_>) {
        let mut stack = vec![Step::Visit(root)];
        while let Some(step) = stack.pop() {
            let node = match step {
                Step::Visit(node) => node,
                Step::Leave => {
                    self.leave_function();
                    continue;
                }
            };

            if node.kind() == "decorated_definition" {
                if let Some(definition) = node
                    .child_by_field_name("definition")
                    .filter(|d| is_function(*d))
                {
                    // Decorators belong to the function they decorate
                    if self.enter_function(definition) {
                        stack.push(Step::Leave);
                    }
                    push_children(&mut stack, definition, None);
                    push_children(&mut stack, node, Some(definition.id()));
                    continue;
                }
            }

            if is_function(node) {
                if self.enter_function(node) {
                    stack.push(Step::Leave);
                }
                push_children(&mut stack, node, None);
                continue;
            }

            if node.kind() == "call" {
                self.record_call(node);
            }
            push_children(&mut stack, node, None);
        }
    }

    fn active_function(&self) -> Option<FunctionId> {
        match self.tracking {
            ScopeTracking::Stack => self.scopes.last().copied(),
            ScopeTracking::SingleSlot => self.current,
        }
    }

    fn enter_function(&mut self, node: Node<'_>) -> bool {
        let Some(name_node) = node.child_by_field_name("name") else {
            return false;
        };
        let qualified = format!("{}.{}", self.module, node_text(name_node, self.source));

        self.depth += 1;
        debug!(function = %qualified, depth = self.depth, "entering function");
        let id = self.graph.define(qualified, self.depth);
        self.scopes.push(id);
        self.current = Some(id);
        true
    }

    fn leave_function(&mut self) {
        if let Some(id) = self.scopes.pop() {
            debug!(
                function = %self.graph.record(id).name,
                depth = self.depth,
                "leaving function"
            );
        }
        self.depth -= 1;
        self.current = None;
    }

    fn record_call(&mut self, call: Node<'_>) {
        let Some(caller) = self.active_function() else {
            return;
        };
        let Some(target) = call.child_by_field_name("function") else {
            return;
        };
        if let Some(callee) = callee_name(target, self.source) {
            debug!(caller = %self.graph.record(caller).name, callee = %callee, "recording call");
            self.graph.add_call(caller, callee);
        }
    }
}

enum Step<'t> {
    Visit(Node<'t>),
    Leave,
}

/// Queue the children of `node` so the first child is popped first
fn push_children<'t>(stack: &mut Vec<Step<'t>>, node: Node<'t>, skip: Option<usize>) {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node
        .children(&mut cursor)
        .filter(|child| Some(child.id()) != skip)
        .collect();
    stack.extend(children.into_iter().rev().map(Step::Visit));
}

/// `name` for `name(...)`, `obj.attr` for `obj.attr(...)`, otherwise nothing
fn callee_name(target: Node<'_>, source: &str) -> Option<String> {
    match target.kind() {
        "identifier" => Some(node_text(target, source).to_string()),
        "attribute" => {
            let object = target.child_by_field_name("object")?;
            let attribute = target.child_by_field_name("attribute")?;
            (object.kind() == "identifier").then(|| {
                format!(
                    "{}.{}",
                    node_text(object, source),
                    node_text(attribute, source)
                )
            })
        }
        _ => None,
    }
}
