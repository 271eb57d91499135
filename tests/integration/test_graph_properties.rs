//! Structural guarantees of the dependency graph on a realistic record set.

use std::collections::BTreeSet;

use codesight::config::GraphConfig;
use codesight::graph::{GraphBuildError, load_records};
use codesight::{DependencyGraph, GraphBuilder};
use tempfile::TempDir;

use crate::common::{order_flow, record};

fn build(records: &[codesight::CodeRecord]) -> DependencyGraph {
    GraphBuilder::default().build(records).unwrap()
}

#[test]
fn every_referenced_id_is_a_node() {
    let mut records = order_flow();
    records.push(record("apps/api/audit.ts", &["./audit-sink"]));
    records.push(record("apps/api/audit-sink.ts", &["./audit"]));
    let graph = build(&records);

    for edge in graph.edges() {
        assert!(graph.contains(edge.from.as_str()));
        assert!(graph.contains(edge.to.as_str()));
    }
    for id in graph.cycles().iter().flatten() {
        assert!(graph.contains(id.as_str()));
    }
    for id in graph.entry_points() {
        assert!(graph.contains(id.as_str()));
    }
    for path in graph.critical_paths() {
        for id in &path.nodes {
            assert!(graph.contains(id.as_str()));
        }
    }
    assert_eq!(graph.cycles().len(), 1);
    assert_eq!(graph.node_count(), 6);
}

#[test]
fn order_flow_entry_points_and_critical_paths() {
    let graph = build(&order_flow());

    let controller = graph.node_by_path("apps/api/orders.controller.ts").unwrap();
    assert!(controller.is_entry_point);
    assert!(controller.trust_boundary);
    assert_eq!(graph.entry_points().len(), 1);

    // The gateway depends on an external package, so it is a trust boundary
    // and ends at least one critical path from the controller.
    let gateway = graph.node_by_path("apps/api/payment.gateway.ts").unwrap();
    assert!(gateway.trust_boundary);
    assert!(graph.critical_paths().iter().any(|p| {
        p.nodes.first() == Some(&controller.id) && p.nodes.last() == Some(&gateway.id)
    }));

    for path in graph.critical_paths() {
        assert!(path.nodes.len() >= 2);
        assert!(graph.entry_points().contains(&path.nodes[0]));
    }
    for pair in graph.critical_paths().windows(2) {
        assert!(pair[0].risk >= pair[1].risk);
    }
    for node in graph.nodes() {
        assert!((0.0..=10.0).contains(&node.security_risk));
    }
    assert_eq!(graph.stats().max_depth, 2);
}

#[test]
fn dependents_are_the_reverse_of_edges() {
    let graph = build(&order_flow());
    let from_edges: BTreeSet<(String, String)> = graph
        .edges()
        .iter()
        .map(|e| (e.to.to_string(), e.from.to_string()))
        .collect();
    let from_nodes: BTreeSet<(String, String)> = graph
        .nodes()
        .flat_map(|n| {
            n.dependents
                .iter()
                .map(move |d| (n.id.to_string(), d.to_string()))
        })
        .collect();
    assert_eq!(from_edges, from_nodes);
}

#[test]
fn input_order_does_not_change_the_graph() {
    let records = order_flow();
    let mut reversed = records.clone();
    reversed.reverse();

    let a = build(&records);
    let b = build(&reversed);

    let edges = |g: &DependencyGraph| {
        g.edges()
            .iter()
            .map(|e| (e.from.clone(), e.to.clone()))
            .collect::<BTreeSet<_>>()
    };
    assert_eq!(edges(&a), edges(&b));
    assert_eq!(a.entry_points(), b.entry_points());
    assert_eq!(a.critical_paths(), b.critical_paths());
    assert_eq!(a.stats(), b.stats());
}

#[test]
fn critical_path_limit_is_configurable() {
    let config = GraphConfig {
        critical_path_limit: 1,
        ..GraphConfig::default()
    };
    let graph = GraphBuilder::new(config).build(&order_flow()).unwrap();
    assert_eq!(graph.critical_paths().len(), 1);
}

#[test]
fn records_load_from_json() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("records.json");
    let records = order_flow();
    std::fs::write(&path, serde_json::to_string_pretty(&records).unwrap()).unwrap();

    let loaded = load_records(&path).unwrap();
    assert_eq!(loaded, records);

    std::fs::write(&path, "{\"not\": \"an array\"}").unwrap();
    assert!(matches!(
        load_records(&path),
        Err(GraphBuildError::RecordFormat(_))
    ));
    assert!(matches!(
        load_records(&temp_dir.path().join("missing.json")),
        Err(GraphBuildError::RecordRead { .. })
    ));
}

#[test]
fn long_import_chains_are_not_cut_short() {
    // src/main.ts -> src/m1.ts -> ... -> src/m30.ts -> stripe
    let mut records = vec![record("src/main.ts", &["./m1"])];
    for i in 1..30 {
        let next = format!("./m{}", i + 1);
        records.push(record(&format!("src/m{i}.ts"), &[next.as_str()]));
    }
    records.push(record("src/m30.ts", &["stripe"]));
    let graph = build(&records);

    let stats = graph.stats();
    assert_eq!(stats.max_depth, 30);
    assert!(!stats.truncated);

    let paths = graph.critical_paths();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].nodes.len(), 31);
    let last = paths[0].nodes.last().unwrap();
    assert_eq!(graph.node(last.as_str()).unwrap().path, "src/m30.ts");
}
