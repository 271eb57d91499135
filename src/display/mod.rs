//! Terminal output for the CLI.
//!
//! Styled tables for graph summaries, search hits and clusters, plus
//! progress bars for the embedding and storage phases.

pub mod progress;
pub mod tables;
pub mod theme;

pub use progress::{create_progress_bar, create_spinner, with_spinner};
pub use tables::{
    clusters_table, critical_paths_table, graph_summary_table, search_results_table,
};
pub use theme::{THEME, Theme, Tone};
