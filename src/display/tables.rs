//! Table formatting for graph, search and cluster output.

use comfy_table::{
    Attribute, Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
};

use crate::graph::DependencyGraph;
use crate::vector::{Cluster, VectorSearchResult};

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

fn risk_cell(risk: f32) -> Cell {
    let color = if risk >= 7.0 {
        Color::Red
    } else if risk >= 4.0 {
        Color::Yellow
    } else {
        Color::Green
    };
    Cell::new(format!("{risk:.1}")).fg(color)
}

/// Metric/value summary of a graph build.
pub fn graph_summary_table(graph: &DependencyGraph) -> String {
    let stats = graph.stats();
    let mut table = new_table(&["Metric", "Value"]);

    table.add_row(vec!["Files", &stats.nodes.to_string()]);
    table.add_row(vec!["Import edges", &stats.edges.to_string()]);
    table.add_row(vec!["Entry points", &stats.entry_points.to_string()]);
    table.add_row(vec!["External imports", &stats.external_imports.to_string()]);
    table.add_row(vec!["Max depth", &stats.max_depth.to_string()]);
    table.add_row(vec!["Critical paths", &graph.critical_paths().len().to_string()]);

    let cycle_color = if stats.cycles == 0 {
        Color::Green
    } else {
        Color::Yellow
    };
    table.add_row(vec![
        Cell::new("Cycles"),
        Cell::new(stats.cycles).fg(cycle_color),
    ]);
    if stats.truncated {
        table.add_row(vec![
            Cell::new("Path search"),
            Cell::new("truncated").fg(Color::Yellow),
        ]);
    }

    table.to_string()
}

/// Ranked critical paths with file paths joined by arrows.
pub fn critical_paths_table(graph: &DependencyGraph, limit: usize) -> String {
    let mut table = new_table(&["#", "Risk", "Path"]);
    for (rank, path) in graph.critical_paths().iter().take(limit).enumerate() {
        let route = path
            .nodes
            .iter()
            .map(|id| graph.node(id.as_str()).map_or(id.as_str(), |n| n.path.as_str()))
            .collect::<Vec<_>>()
            .join(" → ");
        table.add_row(vec![
            Cell::new(rank + 1),
            risk_cell(path.risk),
            Cell::new(route),
        ]);
    }
    table.to_string()
}

/// Search hits, best first.
pub fn search_results_table(results: &[VectorSearchResult]) -> String {
    let mut table = new_table(&["Score", "Type", "File", "Function", "Security", "Boundary"]);
    for result in results {
        let metadata = &result.embedding.metadata;
        table.add_row(vec![
            Cell::new(format!("{:.3}", result.score)),
            Cell::new(result.embedding.embedding_type.as_str()),
            Cell::new(&metadata.file_name),
            Cell::new(metadata.function_name.as_deref().unwrap_or("-")),
            risk_cell(f32::from(metadata.security_relevance)),
            Cell::new(if metadata.trust_boundary { "yes" } else { "no" }),
        ]);
    }
    table.to_string()
}

/// Clusters, highest risk first.
pub fn clusters_table(clusters: &[Cluster], sample: usize) -> String {
    let mut table = new_table(&["#", "Risk", "Size", "Members"]);
    for (rank, cluster) in clusters.iter().enumerate() {
        let mut members = cluster
            .members
            .iter()
            .take(sample)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if cluster.members.len() > sample {
            members.push_str(&format!(", +{} more", cluster.members.len() - sample));
        }
        table.add_row(vec![
            Cell::new(rank + 1),
            risk_cell(cluster.risk_score),
            Cell::new(cluster.size),
            Cell::new(members),
        ]);
    }
    table.to_string()
}
