//! Vector storage and search for code embeddings.
//!
//! Embeddings are stored as points with a typed payload in one collection per
//! analysis project. Queries combine cosine similarity with a typed filter
//! AST over payload fields. Two backends implement the same contract: an
//! in-process one with on-disk snapshots, and Qdrant over HTTP.
//!
//! # Architecture
//! - [`VectorStore`]: validation, defaults, batching, clustering
//! - [`VectorBackend`]: the database seam
//! - [`Filter`]: `Exact | Range | Exists` conditions, AND-ed

mod backend;
mod clustering;
mod filter;
mod local;
mod qdrant;
mod store;
mod types;

pub use backend::VectorBackend;
pub use clustering::{
    SinglePassClusters, assign_to_nearest_centroid, cosine_similarity, single_pass_clusters,
};
pub use filter::{Condition, FieldKey, FieldKind, Filter, FilterValue};
pub use local::LocalBackend;
pub use qdrant::QdrantBackend;
pub use store::{
    BUSINESS_LOGIC_MIN_CRITICALITY, Cluster, INDEXED_FIELDS, SECURITY_PATTERN_MIN_RELEVANCE,
    TRUST_BOUNDARY_MIN_RELEVANCE, VectorStore, open_backend,
};
pub use types::{
    BackendQuery, Payload, Point, ScoredPoint, SearchQuery, VectorSearchResult, VectorStoreError,
    storage_id,
};
