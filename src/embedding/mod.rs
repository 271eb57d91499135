//! Semantic embedding pipeline.
//!
//! text -> tokens -> vocabulary ids -> padded sequence -> model -> vector.
//! The vocabulary and the model are loaded once and passed in explicitly;
//! nothing here is a global.

mod embedder;
mod model;
mod tokenizer;
mod types;

pub use embedder::SemanticEmbedder;
#[cfg(test)]
pub use model::MockInferenceModel;
pub use model::{
    FASTEMBED_DIMENSION, FastEmbedModel, InferenceModel, LookupTableModel, l2_normalize,
    load_model, write_artifact,
};
pub use tokenizer::{LANGUAGE_KEYWORDS, PAD_ID, UNK_ID, Vocabulary, tokenize};
pub use types::{CodeEmbedding, EmbeddingMetadata, EmbeddingType};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the embedding pipeline.
///
/// Empty or garbled input is never an error; it embeds as padding.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error(
        "Failed to load embedding model from '{path}': {reason}\nSuggestion: Run 'codesight model generate' or point embedding.model_path at an existing artifact"
    )]
    ModelLoad { path: PathBuf, reason: String },

    #[error(
        "Invalid model artifact '{path}': {reason}\nSuggestion: Regenerate the artifact with 'codesight model generate --force'"
    )]
    InvalidArtifact { path: PathBuf, reason: String },

    #[error(
        "Embedding dimension mismatch: expected {expected}, got {actual}\nSuggestion: Set embedding.dimension to the model's output dimension"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "Token id {id} is outside the model's {rows} rows\nSuggestion: The model artifact was built for a smaller vocabulary; regenerate it"
    )]
    TokenOutOfRange { id: u32, rows: usize },

    #[error(
        "Embedding generation failed: {0}\nSuggestion: Verify the embedding model is properly initialized"
    )]
    Inference(String),

    #[error("Model produced an invalid vector: {0}\nSuggestion: Check the model artifact for corruption")]
    InvalidVector(String),

    #[error("Storage error: {0}\nSuggestion: Check disk space and file permissions")]
    Io(#[from] std::io::Error),
}
