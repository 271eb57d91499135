//! Points, payloads, queries and errors of the vector store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use super::filter::Filter;
use crate::embedding::{CodeEmbedding, EmbeddingMetadata, EmbeddingType};
use crate::types::RecordId;

/// Storage id of an embedding: a UUID built from the SHA-256 of its embedding id,
/// so storing the same embedding id twice overwrites.
pub fn storage_id(embedding_id: &str) -> Uuid {
    let digest = Sha256::digest(embedding_id.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}

/// Structured data stored next to each vector. Field names are the wire paths
/// filters refer to (`fileId`, `type`, `metadata.securityRelevance`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub embedding_id: String,
    pub file_id: RecordId,
    #[serde(rename = "type")]
    pub embedding_type: EmbeddingType,
    pub metadata: EmbeddingMetadata,
    pub created_at: DateTime<Utc>,
}

impl Payload {
    pub fn from_embedding(embedding: &CodeEmbedding) -> Self {
        Self {
            embedding_id: embedding.id.clone(),
            file_id: embedding.file_id.clone(),
            embedding_type: embedding.embedding_type,
            metadata: embedding.metadata.clone(),
            created_at: embedding.created_at,
        }
    }

    pub fn into_embedding(self, vector: Vec<f32>) -> CodeEmbedding {
        CodeEmbedding {
            id: self.embedding_id,
            file_id: self.file_id,
            embedding_type: self.embedding_type,
            vector,
            metadata: self.metadata,
            created_at: self.created_at,
        }
    }
}

/// One stored vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

impl Point {
    pub fn from_embedding(embedding: &CodeEmbedding) -> Self {
        Self {
            id: storage_id(&embedding.id),
            vector: embedding.vector.clone(),
            payload: Payload::from_embedding(embedding),
        }
    }
}

/// A point returned by a backend query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: Uuid,
    /// Cosine similarity, or 0.0 for filter-only queries.
    pub score: f32,
    pub payload: Payload,
    pub vector: Option<Vec<f32>>,
}

/// Read-only query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorSearchResult {
    /// Embedding id.
    pub id: String,
    pub score: f32,
    /// `vector` is empty unless the query asked for vectors.
    pub embedding: CodeEmbedding,
}

impl From<ScoredPoint> for VectorSearchResult {
    fn from(point: ScoredPoint) -> Self {
        let embedding = point
            .payload
            .into_embedding(point.vector.unwrap_or_default());
        Self {
            id: embedding.id.clone(),
            score: point.score,
            embedding,
        }
    }
}

/// Search parameters. Without a vector, results are filter matches scored 0.0
/// and `threshold` does not apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub vector: Option<Vec<f32>>,
    pub filter: Option<Filter>,
    pub limit: Option<usize>,
    pub threshold: Option<f32>,
    pub with_vector: bool,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_vector(mut self) -> Self {
        self.with_vector = true;
        self
    }
}

/// Backend-facing form of a query, after defaults and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendQuery {
    pub vector: Option<Vec<f32>>,
    pub filter: Filter,
    pub limit: usize,
    pub threshold: Option<f32>,
    pub with_vector: bool,
}

/// Errors that can occur during vector store operations.
///
/// All error messages include actionable suggestions for resolution.
#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error(
        "Vector database unreachable at '{url}': {reason}\nSuggestion: Check that the vector database is running and vector_store.url is correct"
    )]
    Connection { url: String, reason: String },

    #[error(
        "Vector database returned {status} during {operation}: {message}\nSuggestion: Inspect the database logs for the rejected request"
    )]
    Backend {
        operation: &'static str,
        status: u16,
        message: String,
    },

    #[error(
        "Collection '{name}' is unavailable: {reason}\nSuggestion: Run 'codesight index' to initialize the collection"
    )]
    CollectionUnavailable { name: String, reason: String },

    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all vectors use the same embedding model"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid filter: {0}\nSuggestion: Check the field name and value type of each condition")]
    InvalidFilter(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error(
        "Failed to persist collection snapshot '{path}': {reason}\nSuggestion: Check disk space and permissions for vector_store.data_dir"
    )]
    Snapshot { path: PathBuf, reason: String },

    #[error("Storage error: {0}\nSuggestion: Check disk space and file permissions")]
    Io(#[from] std::io::Error),

    #[error(
        "Serialization error: {0}\nSuggestion: Check that vector data is valid and not corrupted"
    )]
    Serialization(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<reqwest::Error> for VectorStoreError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Connection {
                url,
                reason: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for VectorStoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_id_is_stable() {
        let a = storage_id("abc:semantic_code");
        assert_eq!(a, storage_id("abc:semantic_code"));
        assert_ne!(a, storage_id("abc:dependency_flow"));
    }

    #[test]
    fn test_payload_wire_names() {
        let payload = Payload {
            embedding_id: "f:semantic_code".to_string(),
            file_id: RecordId::from("f"),
            embedding_type: EmbeddingType::SecurityPattern,
            metadata: EmbeddingMetadata {
                file_name: "auth.ts".to_string(),
                file_path: "src/auth.ts".to_string(),
                function_name: Some("login".to_string()),
                security_relevance: 8,
                business_criticality: 1,
                complexity: 12,
                trust_boundary: true,
            },
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["fileId"], "f");
        assert_eq!(value["type"], "SECURITY_PATTERN");
        assert_eq!(value["metadata"]["functionName"], "login");
        assert!(value["createdAt"].is_string());

        let back: Payload = serde_json::from_value(value).unwrap();
        assert_eq!(back, payload);
    }
}
