//! Builds a [`DependencyGraph`] from the full set of code records.
//!
//! # Passes
//! 1. Node construction with heuristic seeds
//! 2. Edge resolution and reverse (dependent) edges
//! 3. Cycle detection
//! 4. Entry-point identification
//! 5. Risk scoring
//! 6. Single-pass trust-boundary propagation
//! 7. Critical-path search and ranking

use std::collections::HashSet;

use tracing::{debug, info};

use super::GraphBuildError;
use super::resolver::{ImportResolver, PathIndex, PathSuffixResolver};
use super::traversal::{enumerate_paths, find_cycles};
use super::types::{
    CriticalPath, DependencyGraph, DependencyNode, Edge, EdgeKind, GraphStats, NodeIndex,
};
use crate::config::GraphConfig;
use crate::risk;
use crate::types::{CodeRecord, RiskLevel};

/// Risk added when a node inherits a trust boundary.
const PROPAGATION_BUMP: f32 = 2.0;

/// Dependency graph builder, generic over the import resolution backend.
#[derive(Debug, Clone)]
pub struct GraphBuilder<R = PathSuffixResolver> {
    config: GraphConfig,
    resolver: R,
}

impl GraphBuilder<PathSuffixResolver> {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            resolver: PathSuffixResolver,
        }
    }
}

impl Default for GraphBuilder<PathSuffixResolver> {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

impl<R: ImportResolver> GraphBuilder<R> {
    pub fn with_resolver(config: GraphConfig, resolver: R) -> Self {
        Self { config, resolver }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Build the graph. Input order does not affect the result.
    pub fn build(&self, records: &[CodeRecord]) -> Result<DependencyGraph, GraphBuildError> {
        let records = dedupe_records(records);
        let mut graph = DependencyGraph::default();

        for record in &records {
            let idx = graph.nodes.len();
            graph.index.insert(record.id.clone(), idx);
            graph.nodes.push(self.seed_node(record));
        }
        graph.adjacency = vec![Vec::new(); graph.nodes.len()];

        self.resolve_edges(&records, &mut graph)?;

        graph.cycles = find_cycles(&graph.adjacency)
            .into_iter()
            .map(|cycle| {
                cycle
                    .into_iter()
                    .map(|i| graph.nodes[i].id.clone())
                    .collect()
            })
            .collect();

        self.identify_entry_points(&mut graph);
        score_nodes(&records, &mut graph);
        propagate_trust_boundaries(&mut graph);
        let (max_depth, truncated) = self.rank_critical_paths(&mut graph);

        graph.stats = GraphStats {
            nodes: graph.nodes.len(),
            edges: graph.edges.len(),
            cycles: graph.cycles.len(),
            entry_points: graph.entry_points.len(),
            external_imports: graph
                .nodes
                .iter()
                .map(|n| n.external_dependencies.len())
                .sum(),
            max_depth,
            truncated,
        };

        info!(
            nodes = graph.stats.nodes,
            edges = graph.stats.edges,
            cycles = graph.stats.cycles,
            entry_points = graph.stats.entry_points,
            critical_paths = graph.critical_paths.len(),
            "dependency graph built"
        );

        Ok(graph)
    }

    fn seed_node(&self, record: &CodeRecord) -> DependencyNode {
        let mut node = DependencyNode::new(record.id.clone(), record.path.clone());
        node.dependencies = record.imports.iter().cloned().collect();
        node.is_entry_point =
            risk::matches_entry_convention(&record.path, &self.config.entry_patterns);
        node.is_critical = risk::is_critical_path(&record.path)
            || record
                .security_patterns
                .iter()
                .any(|p| p.severity == RiskLevel::Critical)
            || record
                .functions
                .iter()
                .any(|f| f.risk_level == RiskLevel::Critical);
        node.trust_boundary = risk::declares_trust_boundary(record);
        node
    }

    fn resolve_edges(
        &self,
        records: &[&CodeRecord],
        graph: &mut DependencyGraph,
    ) -> Result<(), GraphBuildError> {
        let path_index = PathIndex::new(
            graph
                .nodes
                .iter()
                .enumerate()
                .map(|(i, n)| (i, n.path.as_str())),
        );
        let mut seen: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
        let mut pending: Vec<(NodeIndex, NodeIndex, EdgeKind)> = Vec::new();
        let mut external: Vec<(NodeIndex, String)> = Vec::new();

        for (from, record) in records.iter().enumerate() {
            let exports: HashSet<&str> = record.exports.iter().map(String::as_str).collect();
            for spec in &graph.nodes[from].dependencies {
                match self.resolver.resolve(&record.path, spec, &path_index)? {
                    Some(to) => {
                        if seen.insert((from, to)) {
                            let kind = if exports.contains(spec.as_str()) {
                                EdgeKind::ReExport
                            } else {
                                EdgeKind::Import
                            };
                            pending.push((from, to, kind));
                        }
                    }
                    None => {
                        debug!(importer = %record.path, import = %spec, "unresolved import");
                        external.push((from, spec.clone()));
                    }
                }
            }
        }

        for (from, spec) in external {
            graph.nodes[from].external_dependencies.insert(spec);
        }
        for (from, to, kind) in pending {
            graph.adjacency[from].push(to);
            let from_id = graph.nodes[from].id.clone();
            let to_id = graph.nodes[to].id.clone();
            graph.nodes[to].dependents.insert(from_id.clone());
            graph.edges.push(Edge {
                from: from_id,
                to: to_id,
                kind,
            });
        }
        Ok(())
    }

    fn identify_entry_points(&self, graph: &mut DependencyGraph) {
        for node in &mut graph.nodes {
            let orphan_app_file = node.dependents.is_empty()
                && risk::is_under_application_root(&node.path, &self.config.application_roots);
            node.is_entry_point = node.is_entry_point || orphan_app_file;
            if node.is_entry_point {
                graph.entry_points.insert(node.id.clone());
            }
        }
    }

    fn rank_critical_paths(&self, graph: &mut DependencyGraph) -> (usize, bool) {
        let starts: Vec<NodeIndex> = graph
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_entry_point)
            .map(|(i, _)| i)
            .collect();
        let threshold = self.config.critical_risk_threshold;
        let nodes = &graph.nodes;
        let search = enumerate_paths(
            &graph.adjacency,
            &starts,
            |i| nodes[i].is_high_risk(threshold),
            self.config.max_path_expansions,
        );
        if search.truncated {
            tracing::warn!(
                budget = self.config.max_path_expansions,
                "critical path enumeration stopped at expansion budget"
            );
        }

        let mut paths: Vec<CriticalPath> = search
            .paths
            .into_iter()
            .map(|path| CriticalPath {
                risk: path.iter().map(|&i| nodes[i].security_risk).sum(),
                nodes: path.into_iter().map(|i| nodes[i].id.clone()).collect(),
            })
            .collect();
        paths.sort_by(|a, b| {
            b.risk
                .total_cmp(&a.risk)
                .then_with(|| a.nodes.len().cmp(&b.nodes.len()))
                .then_with(|| a.nodes.cmp(&b.nodes))
        });
        paths.truncate(self.config.critical_path_limit);
        graph.critical_paths = paths;

        (search.max_depth, search.truncated)
    }
}

/// Sort by path then id and keep the first record per content id.
fn dedupe_records(records: &[CodeRecord]) -> Vec<&CodeRecord> {
    let mut sorted: Vec<&CodeRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.id.cmp(&b.id)));
    let mut seen = HashSet::new();
    let before = sorted.len();
    sorted.retain(|r| seen.insert(r.id.clone()));
    if sorted.len() != before {
        debug!(
            collapsed = before - sorted.len(),
            "records with identical content collapsed"
        );
    }
    sorted
}

fn score_nodes(records: &[&CodeRecord], graph: &mut DependencyGraph) {
    for (node, record) in graph.nodes.iter_mut().zip(records) {
        let score = risk::pattern_score(&record.security_patterns)
            + risk::path_score(&record.path)
            + risk::complexity_score(&record.functions)
            + risk::external_import_score(
                node.dependencies.len(),
                node.external_dependencies.len(),
            );
        node.security_risk = risk::clamp_risk(score);
    }
}

/// One pass over all nodes. Inheritance reads the flags as they were before
/// the pass, so the result does not depend on node order.
fn propagate_trust_boundaries(graph: &mut DependencyGraph) {
    let before: Vec<bool> = graph.nodes.iter().map(|n| n.trust_boundary).collect();
    let mut triggered = 0usize;
    for (i, node) in graph.nodes.iter_mut().enumerate() {
        let inherits = graph.adjacency[i].iter().any(|&j| before[j])
            || !node.external_dependencies.is_empty();
        if inherits {
            node.trust_boundary = true;
            node.security_risk = risk::clamp_risk(node.security_risk + PROPAGATION_BUMP);
            triggered += 1;
        }
    }
    debug!(triggered, "trust boundaries propagated");
}
