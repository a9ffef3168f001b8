//! Cycle-safe cumulative depth resolution
//!
//! `total_depth(f) = base_depth(f) + Σ contribution(e)` over every outgoing
//! edge of `f`, where an edge to an unknown callee contributes 0, an edge
//! to a function already on the current resolution path contributes that
//! function's base depth, and any other edge contributes the callee's own
//! total depth. Edges are a multigraph: two calls to the same callee count
//! twice.
//!
//! Global invariants enforced:
//! - A memoized total is written once and never recomputed
//! - The resolution path is tracked separately from the memo table
//! - Resolution is iterative, so call-chain length is not bounded by the thread stack

use crate::callgraph::{CallGraph, FunctionId};

/// What a single call edge adds to its caller's total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contribution {
    /// Callee already resolved (or resolved by recursing into it)
    Resolved(u64),
    /// Callee is on the current path; its base depth breaks the cycle
    OnStack(u64),
    /// No definition with this name in the package
    Unknown,
}

impl Contribution {
    pub fn value(&self) -> u64 {
        match self {
            Contribution::Resolved(v) | Contribution::OnStack(v) => *v,
            Contribution::Unknown => 0,
        }
    }
}

/// Memoized total depths, in the order their values were first written
#[derive(Debug, Clone, Default)]
pub struct DepthTable {
    totals: Vec<Option<u64>>,
    order: Vec<FunctionId>,
}

impl DepthTable {
    fn with_capacity(n: usize) -> Self {
        DepthTable {
            totals: vec![None; n],
            order: Vec::with_capacity(n),
        }
    }

    pub fn get(&self, id: FunctionId) -> Option<u64> {
        self.totals.get(id.0).copied().flatten()
    }

    fn insert(&mut self, id: FunctionId, total: u64) {
        debug_assert!(self.totals[id.0].is_none(), "depth written twice");
        self.totals[id.0] = Some(total);
        self.order.push(id);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// `(function, total_depth)` pairs in memoization order
    pub fn iter(&self) -> impl Iterator<Item = (FunctionId, u64)> + '_ {
        self.order
            .iter()
            .filter_map(move |&id| self.totals[id.0].map(|total| (id, total)))
    }

    pub fn values(&self) -> impl Iterator<Item = u64> + '_ {
        self.iter().map(|(_, total)| total)
    }
}

/// Resolves total depths over a merged package call graph
pub struct DepthResolver<'g> {
    graph: &'g CallGraph,
    edges: Vec<Vec<FunctionId>>,
    on_path: Vec<bool>,
    table: DepthTable,
}

struct Frame {
    id: FunctionId,
    next_edge: usize,
    total: u64,
}

impl<'g> DepthResolver<'g> {
    pub fn new(graph: &'g CallGraph) -> Self {
        DepthResolver {
            graph,
            edges: graph.linked_edges(),
            on_path: vec![false; graph.len()],
            table: DepthTable::with_capacity(graph.len()),
        }
    }

    fn base_depth(&self, id: FunctionId) -> u64 {
        u64::from(self.graph.record(id).base_depth)
    }

    /// Classify an edge target without recursing
    ///
    /// Returns `None` when the callee still has to be resolved.
    fn classify(&self, callee: Option<FunctionId>) -> Option<Contribution> {
        let Some(id) = callee else {
            return Some(Contribution::Unknown);
        };
        if let Some(total) = self.table.get(id) {
            return Some(Contribution::Resolved(total));
        }
        if self.on_path[id.0] {
            return Some(Contribution::OnStack(self.base_depth(id)));
        }
        None
    }

    /// Total depth of `root`, resolving everything it reaches
    pub fn resolve(&mut self, root: FunctionId) -> u64 {
        if let Some(total) = self.table.get(root) {
            return total;
        }

        let mut path = vec![self.open(root)];
        while let Some(frame) = path.last_mut() {
            let id = frame.id;
            if let Some(&callee) = self.edges[id.0].get(frame.next_edge) {
                frame.next_edge += 1;
                match self.classify(Some(callee)) {
                    Some(contribution) => {
                        frame.total = frame.total.saturating_add(contribution.value());
                    }
                    None => {
                        let next = self.open(callee);
                        path.push(next);
                    }
                }
                continue;
            }

            let total = frame.total;
            path.pop();
            self.on_path[id.0] = false;
            self.table.insert(id, total);
            if let Some(caller) = path.last_mut() {
                caller.total = caller.total.saturating_add(total);
            }
        }

        self.table.get(root).unwrap_or(0)
    }

    fn open(&mut self, id: FunctionId) -> Frame {
        self.on_path[id.0] = true;
        Frame {
            id,
            next_edge: 0,
            total: self.base_depth(id),
        }
    }

    /// Resolve every function in definition order
    pub fn resolve_all(mut self) -> DepthTable {
        for (id, _) in self.graph.records() {
            self.resolve(id);
        }
        self.table
    }
}

/// Resolve total depths for every function in the graph
pub fn resolve_total_depths(graph: &CallGraph) -> DepthTable {
    DepthResolver::new(graph).resolve_all()
}
