//! Error types for the analysis pipeline
//!
//! Each component has its own thiserror enum. [`AnalysisError`] wraps them
//! for callers that drive the whole pipeline and adds stable status codes
//! and recovery hints.

use std::path::PathBuf;
use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::graph::GraphBuildError;
use crate::vector::VectorStoreError;

/// Umbrella error for a full analysis run
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Graph(#[from] GraphBuildError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    VectorStore(#[from] VectorStoreError),

    /// Configuration errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    General(String),
}

impl AnalysisError {
    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON output
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::Graph(e) => match e {
                GraphBuildError::Resolution { .. } => "IMPORT_RESOLUTION_ERROR",
                GraphBuildError::RecordRead { .. } => "RECORD_READ_ERROR",
                GraphBuildError::RecordFormat(_) => "RECORD_FORMAT_ERROR",
            },
            Self::Embedding(e) => match e {
                EmbeddingError::ModelLoad { .. } => "MODEL_LOAD_ERROR",
                EmbeddingError::InvalidArtifact { .. } => "INVALID_MODEL_ARTIFACT",
                EmbeddingError::DimensionMismatch { .. } => "EMBEDDING_DIMENSION_MISMATCH",
                EmbeddingError::TokenOutOfRange { .. } => "TOKEN_OUT_OF_RANGE",
                EmbeddingError::Inference(_) => "INFERENCE_ERROR",
                EmbeddingError::InvalidVector(_) => "INVALID_VECTOR",
                EmbeddingError::Io(_) => "EMBEDDING_IO_ERROR",
            },
            Self::VectorStore(e) => match e {
                VectorStoreError::Connection { .. } => "VECTOR_DB_UNREACHABLE",
                VectorStoreError::Backend { .. } => "VECTOR_DB_ERROR",
                VectorStoreError::CollectionUnavailable { .. } => "COLLECTION_UNAVAILABLE",
                VectorStoreError::DimensionMismatch { .. } => "VECTOR_DIMENSION_MISMATCH",
                VectorStoreError::InvalidFilter(_) => "INVALID_FILTER",
                VectorStoreError::InvalidQuery(_) => "INVALID_QUERY",
                VectorStoreError::Snapshot { .. } => "SNAPSHOT_ERROR",
                VectorStoreError::Io(_) => "VECTOR_IO_ERROR",
                VectorStoreError::Serialization(_) => "SERIALIZATION_ERROR",
                VectorStoreError::Task(_) => "TASK_FAILED",
            },
            Self::Config { .. } => "CONFIG_ERROR",
            Self::FileWrite { .. } => "FILE_WRITE_ERROR",
            Self::General(_) => "GENERAL_ERROR",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Graph(GraphBuildError::RecordRead { .. }) => vec![
                "Check that the records file exists and you have read permissions",
            ],
            Self::Graph(GraphBuildError::RecordFormat(_)) => vec![
                "The records file must be a JSON array of code records",
                "Regenerate it with the scanner that produced it",
            ],
            Self::Embedding(EmbeddingError::ModelLoad { .. })
            | Self::Embedding(EmbeddingError::InvalidArtifact { .. }) => vec![
                "Run 'codesight model generate' to create a lookup-table model",
                "Check embedding.model_path in .codesight/settings.toml",
            ],
            Self::Embedding(EmbeddingError::DimensionMismatch { .. })
            | Self::VectorStore(VectorStoreError::DimensionMismatch { .. }) => vec![
                "embedding.dimension must match the model and the existing collection",
                "Use a new vector_store.collection_prefix after changing models",
            ],
            Self::VectorStore(VectorStoreError::Connection { .. }) => vec![
                "Check that the vector database is running",
                "Set vector_store.backend = \"local\" to run without a server",
            ],
            Self::VectorStore(VectorStoreError::CollectionUnavailable { .. }) => vec![
                "Run 'codesight index' to create and fill the collection",
            ],
            Self::VectorStore(VectorStoreError::Snapshot { .. }) => vec![
                "Check disk space and permissions for vector_store.data_dir",
                "Delete the snapshot and re-run 'codesight index' if it is corrupted",
            ],
            Self::Config { .. } => vec![
                "Run 'codesight config' to inspect the effective settings",
                "Run 'codesight init --force' to restore the default settings file",
            ],
            _ => vec![],
        }
    }
}

/// Result type alias for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> Result<T, AnalysisError>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: &str) -> Result<T, AnalysisError> {
        self.map_err(|e| AnalysisError::General(format!("{msg}: {e}")))
    }
}
