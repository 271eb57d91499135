//! Dependency graph construction and analysis.
//!
//! Turns the flat list of [`CodeRecord`](crate::types::CodeRecord)s into an
//! import graph annotated with entry points, cycles, trust boundaries,
//! per-file risk and ranked critical paths.

pub mod builder;
pub mod resolver;
pub mod traversal;
pub mod types;

pub use builder::GraphBuilder;
pub use resolver::{ImportResolver, PathIndex, PathSuffixResolver};
pub use types::{CriticalPath, DependencyGraph, DependencyNode, Edge, EdgeKind, GraphStats};

use thiserror::Error;

/// Errors raised while building a dependency graph.
///
/// Unresolved imports are not errors; they are recorded as external
/// dependencies on the importing node.
#[derive(Error, Debug)]
pub enum GraphBuildError {
    #[error(
        "Import resolution failed for '{specifier}' in '{importer}': {reason}\nSuggestion: Check the resolver configuration or rerun with debug logging"
    )]
    Resolution {
        importer: String,
        specifier: String,
        reason: String,
    },

    #[error("Failed to read records from '{path}': {source}")]
    RecordRead {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed record input: {0}\nSuggestion: Records must be a JSON array of code records")]
    RecordFormat(#[from] serde_json::Error),
}

/// Read a JSON array of code records from disk.
pub fn load_records(
    path: &std::path::Path,
) -> Result<Vec<crate::types::CodeRecord>, GraphBuildError> {
    let data = std::fs::read_to_string(path).map_err(|source| GraphBuildError::RecordRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&data)?)
}
