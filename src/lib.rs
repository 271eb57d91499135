/// The main library module for codesight

pub mod config;
pub mod display;
pub mod embedding;
pub mod error;
pub mod graph;
pub mod risk;
pub mod types;
pub mod vector;

// Explicit exports for better API clarity
pub use config::Settings;
pub use embedding::{
    CodeEmbedding, EmbeddingError, EmbeddingMetadata, EmbeddingType, InferenceModel,
    SemanticEmbedder, Vocabulary,
};
pub use error::{AnalysisError, AnalysisResult, ErrorContext};
pub use graph::{DependencyGraph, DependencyNode, GraphBuildError, GraphBuilder};
pub use types::{CodeRecord, FunctionFact, RecordId, RiskLevel, SecurityPatternFact, calculate_hash};
pub use vector::{
    Filter, SearchQuery, VectorBackend, VectorSearchResult, VectorStore, VectorStoreError,
};
