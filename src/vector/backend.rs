//! The vector database seam.
//!
//! A backend stores points in named collections with cosine distance,
//! answers vector and filter queries, and deletes by filter. Any product
//! honouring these calls can sit behind the store.

use async_trait::async_trait;

use super::filter::{FieldKey, Filter};
use super::types::{BackendQuery, Point, ScoredPoint, VectorStoreError};

#[async_trait]
pub trait VectorBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Create the collection if absent. Returns `true` when it was created.
    /// An existing collection with another dimension is an error.
    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> Result<bool, VectorStoreError>;

    /// Payload fields that already carry an index.
    async fn indexed_fields(&self, collection: &str) -> Result<Vec<String>, VectorStoreError>;

    async fn create_index(&self, collection: &str, field: FieldKey)
    -> Result<(), VectorStoreError>;

    /// Insert or overwrite points by id.
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<(), VectorStoreError>;

    /// Ranked by cosine similarity when the query has a vector, otherwise
    /// filter matches in storage order with score 0.0.
    async fn search(
        &self,
        collection: &str,
        query: &BackendQuery,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError>;

    /// Every point matching the filter, unranked.
    async fn scroll(
        &self,
        collection: &str,
        filter: &Filter,
        with_vector: bool,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError>;

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<(), VectorStoreError>;

    /// Make earlier mutations durable. Backends that persist on write keep the default.
    async fn flush(&self, _collection: &str) -> Result<(), VectorStoreError> {
        Ok(())
    }
}
