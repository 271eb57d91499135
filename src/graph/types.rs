//! Graph data structures.
//!
//! Nodes live in an arena and are addressed by [`NodeIndex`] internally;
//! the public API speaks in [`RecordId`]s.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::types::RecordId;

/// Position of a node in the graph arena.
pub type NodeIndex = usize;

/// How an edge was introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Plain import of another project file.
    Import,
    /// The importer also re-exports what it imports.
    ReExport,
}

/// A resolved dependency between two project files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: RecordId,
    pub to: RecordId,
    pub kind: EdgeKind,
}

/// One file in the dependency graph.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyNode {
    pub id: RecordId,
    pub path: String,
    /// Raw import strings as declared by the record.
    pub dependencies: BTreeSet<String>,
    /// Imports that did not resolve to a project file.
    pub external_dependencies: BTreeSet<String>,
    /// Ids of nodes importing this one.
    pub dependents: BTreeSet<RecordId>,
    pub is_entry_point: bool,
    pub is_critical: bool,
    pub trust_boundary: bool,
    /// Always within `[0, 10]`.
    pub security_risk: f32,
}

impl DependencyNode {
    pub(crate) fn new(id: RecordId, path: String) -> Self {
        Self {
            id,
            path,
            dependencies: BTreeSet::new(),
            external_dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
            is_entry_point: false,
            is_critical: false,
            trust_boundary: false,
            security_risk: 0.0,
        }
    }

    /// Node qualifies as the end of a critical path.
    pub fn is_high_risk(&self, risk_threshold: f32) -> bool {
        self.is_critical || self.trust_boundary || self.security_risk > risk_threshold
    }
}

/// An entry-point-to-high-risk-node path and its summed node risk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalPath {
    pub nodes: Vec<RecordId>,
    pub risk: f32,
}

/// Derived metrics of one graph build.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub cycles: usize,
    pub entry_points: usize,
    pub external_imports: usize,
    /// Longest dependency chain, in edges, reachable from any entry point.
    pub max_depth: usize,
    /// Path enumeration stopped at the expansion budget.
    pub truncated: bool,
}

/// The dependency graph of one analysis run. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub(crate) nodes: Vec<DependencyNode>,
    pub(crate) index: HashMap<RecordId, NodeIndex>,
    pub(crate) adjacency: Vec<Vec<NodeIndex>>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) cycles: Vec<Vec<RecordId>>,
    pub(crate) entry_points: BTreeSet<RecordId>,
    pub(crate) critical_paths: Vec<CriticalPath>,
    pub(crate) stats: GraphStats,
}

impl DependencyGraph {
    pub fn node(&self, id: &str) -> Option<&DependencyNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Look a node up by its file path.
    pub fn node_by_path(&self, path: &str) -> Option<&DependencyNode> {
        self.nodes.iter().find(|n| n.path == path)
    }

    /// Nodes in deterministic (path) order.
    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn cycles(&self) -> &[Vec<RecordId>] {
        &self.cycles
    }

    pub fn entry_points(&self) -> &BTreeSet<RecordId> {
        &self.entry_points
    }

    /// Ranked highest-risk-first.
    pub fn critical_paths(&self) -> &[CriticalPath] {
        &self.critical_paths
    }

    pub fn stats(&self) -> &GraphStats {
        &self.stats
    }

    /// Ids the given node imports directly.
    pub fn dependencies_of(&self, id: &str) -> Vec<&RecordId> {
        self.index
            .get(id)
            .map(|&i| self.adjacency[i].iter().map(|&j| &self.nodes[j].id).collect())
            .unwrap_or_default()
    }

    /// Nodes whose risk exceeds `threshold`, highest first.
    pub fn high_risk_nodes(&self, threshold: f32) -> Vec<&DependencyNode> {
        let mut nodes: Vec<_> = self
            .nodes
            .iter()
            .filter(|n| n.security_risk > threshold)
            .collect();
        nodes.sort_by(|a, b| {
            b.security_risk
                .total_cmp(&a.security_risk)
                .then_with(|| a.path.cmp(&b.path))
        });
        nodes
    }
}
