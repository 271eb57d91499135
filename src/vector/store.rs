//! Collection-level operations over a [`VectorBackend`].
//!
//! The store owns one collection per analysis project. It validates queries,
//! applies defaults, batches upserts and runs the triage clustering; the
//! backend only moves points.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::backend::VectorBackend;
use super::clustering::single_pass_clusters;
use super::filter::{FieldKey, Filter};
use super::local::LocalBackend;
use super::qdrant::QdrantBackend;
use super::types::{BackendQuery, Point, SearchQuery, VectorSearchResult, VectorStoreError};
use crate::config::{Settings, VectorBackendKind, VectorStoreConfig};
use crate::embedding::{CodeEmbedding, EmbeddingType};

/// Payload fields indexed by [`VectorStore::initialize`].
pub const INDEXED_FIELDS: [FieldKey; 9] = [
    FieldKey::FileId,
    FieldKey::FilePath,
    FieldKey::Type,
    FieldKey::SecurityRelevance,
    FieldKey::BusinessCriticality,
    FieldKey::TrustBoundary,
    FieldKey::CreatedAt,
    FieldKey::Complexity,
    FieldKey::FunctionName,
];

/// Minimum `securityRelevance` for [`VectorStore::find_security_patterns`].
pub const SECURITY_PATTERN_MIN_RELEVANCE: i64 = 5;
/// Minimum `businessCriticality` for [`VectorStore::find_business_logic`].
pub const BUSINESS_LOGIC_MIN_CRITICALITY: i64 = 5;
/// Minimum `securityRelevance` for [`VectorStore::find_trust_boundaries`].
pub const TRUST_BOUNDARY_MIN_RELEVANCE: i64 = 7;

/// One group produced by [`VectorStore::cluster_by_type`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub centroid: Vec<f32>,
    /// Embedding ids, sorted.
    pub members: Vec<String>,
    /// Mean `securityRelevance` of the members.
    pub risk_score: f32,
    pub size: usize,
}

/// Build the backend named by configuration.
pub fn open_backend(config: &VectorStoreConfig) -> Result<Arc<dyn VectorBackend>, VectorStoreError> {
    let backend: Arc<dyn VectorBackend> = match config.backend {
        VectorBackendKind::Local => Arc::new(LocalBackend::open(config.data_dir.clone())),
        VectorBackendKind::Qdrant => Arc::new(QdrantBackend::new(config)?),
    };
    Ok(backend)
}

pub struct VectorStore {
    backend: Arc<dyn VectorBackend>,
    collection: String,
    dimension: usize,
    batch_size: usize,
    store_concurrency: usize,
    default_limit: usize,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("backend", &self.backend.name())
            .field("collection", &self.collection)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl VectorStore {
    pub fn new(
        backend: Arc<dyn VectorBackend>,
        collection: impl Into<String>,
        dimension: usize,
        config: &VectorStoreConfig,
    ) -> Self {
        Self {
            backend,
            collection: collection.into(),
            dimension,
            batch_size: config.batch_size.max(1),
            store_concurrency: config.store_concurrency.max(1),
            default_limit: config.default_limit.max(1),
        }
    }

    /// Store for the project described by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, VectorStoreError> {
        let backend = open_backend(&settings.vector_store)?;
        Ok(Self::new(
            backend,
            settings.collection_name(),
            settings.embedding.dimension,
            &settings.vector_store,
        ))
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Create the collection and its payload indexes if missing.
    ///
    /// Safe to call repeatedly. Index creation failures are logged and
    /// skipped; the collection stays usable without them.
    pub async fn initialize(&self) -> Result<bool, VectorStoreError> {
        let created = self
            .backend
            .ensure_collection(&self.collection, self.dimension)
            .await?;

        let existing = match self.backend.indexed_fields(&self.collection).await {
            Ok(fields) => fields,
            Err(e) => {
                warn!(collection = %self.collection, error = %e, "could not list payload indexes");
                Vec::new()
            }
        };

        for field in INDEXED_FIELDS {
            if existing.iter().any(|f| f == field.path()) {
                continue;
            }
            match self.backend.create_index(&self.collection, field).await {
                Ok(()) => debug!(collection = %self.collection, field = field.path(), "created payload index"),
                Err(e) => warn!(
                    collection = %self.collection,
                    field = field.path(),
                    error = %e,
                    "payload index creation failed, continuing without it"
                ),
            }
        }

        self.backend.flush(&self.collection).await?;

        if created {
            info!(
                collection = %self.collection,
                dimension = self.dimension,
                backend = self.backend.name(),
                "initialized vector collection"
            );
        }
        Ok(created)
    }

    /// Upsert embeddings in batches of `batch_size`, at most
    /// `store_concurrency` batches in flight, then flush once.
    /// Returns the number stored.
    pub async fn store(&self, embeddings: &[CodeEmbedding]) -> Result<usize, VectorStoreError> {
        if embeddings.is_empty() {
            return Ok(0);
        }
        if let Some(bad) = embeddings.iter().find(|e| e.vector.len() != self.dimension) {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.vector.len(),
            });
        }

        let points: Vec<Point> = embeddings.iter().map(Point::from_embedding).collect();
        let semaphore = Arc::new(Semaphore::new(self.store_concurrency));
        let mut tasks = JoinSet::new();

        for (batch_index, chunk) in points.chunks(self.batch_size).enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| VectorStoreError::Task(e.to_string()))?;
            let backend = Arc::clone(&self.backend);
            let collection = self.collection.clone();
            let batch = chunk.to_vec();
            tasks.spawn(async move {
                let _permit = permit;
                let size = batch.len();
                backend.upsert(&collection, batch).await?;
                debug!(collection = %collection, batch = batch_index, size, "upserted batch");
                Ok::<usize, VectorStoreError>(size)
            });
        }

        let mut stored = 0;
        while let Some(joined) = tasks.join_next().await {
            stored += joined.map_err(|e| VectorStoreError::Task(e.to_string()))??;
        }
        self.backend.flush(&self.collection).await?;
        debug!(collection = %self.collection, stored, "stored embeddings");
        Ok(stored)
    }

    /// Similarity and/or filter search.
    ///
    /// With a vector, results are ranked by cosine similarity and `threshold`
    /// drops anything below it. Without one, results are filter matches with
    /// score 0.0 and `threshold` is ignored.
    pub async fn search(
        &self,
        query: SearchQuery,
    ) -> Result<Vec<VectorSearchResult>, VectorStoreError> {
        let backend_query = self.prepare(query)?;
        let hits = self
            .backend
            .search(&self.collection, &backend_query)
            .await?;
        Ok(hits.into_iter().map(VectorSearchResult::from).collect())
    }

    fn prepare(&self, query: SearchQuery) -> Result<BackendQuery, VectorStoreError> {
        let filter = query.filter.unwrap_or_default();
        filter.validate()?;

        if let Some(vector) = &query.vector {
            if vector.len() != self.dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(VectorStoreError::InvalidQuery(
                    "query vector contains non-finite values".to_string(),
                ));
            }
        }

        let limit = match query.limit {
            Some(0) => {
                return Err(VectorStoreError::InvalidQuery(
                    "limit must be at least 1".to_string(),
                ));
            }
            Some(limit) => limit,
            None => self.default_limit,
        };

        let threshold = match query.threshold {
            Some(t) if !t.is_finite() => {
                return Err(VectorStoreError::InvalidQuery(format!(
                    "threshold {t} is not a finite number"
                )));
            }
            t if query.vector.is_some() => t,
            _ => None,
        };

        Ok(BackendQuery {
            vector: query.vector,
            filter,
            limit,
            threshold,
            with_vector: query.with_vector,
        })
    }

    /// Security-pattern embeddings similar to `vector` with relevance of at least 5.
    pub async fn find_security_patterns(
        &self,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<VectorSearchResult>, VectorStoreError> {
        let filter = Filter::by_type(EmbeddingType::SecurityPattern)
            .at_least(FieldKey::SecurityRelevance, SECURITY_PATTERN_MIN_RELEVANCE);
        self.search(SearchQuery::new().vector(vector).filter(filter).limit(limit))
            .await
    }

    /// Business-logic embeddings similar to `vector` with criticality of at least 5.
    pub async fn find_business_logic(
        &self,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<VectorSearchResult>, VectorStoreError> {
        let filter = Filter::by_type(EmbeddingType::BusinessLogic)
            .at_least(FieldKey::BusinessCriticality, BUSINESS_LOGIC_MIN_CRITICALITY);
        self.search(SearchQuery::new().vector(vector).filter(filter).limit(limit))
            .await
    }

    /// Trust-boundary embeddings similar to `vector` with relevance of at least 7.
    pub async fn find_trust_boundaries(
        &self,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<VectorSearchResult>, VectorStoreError> {
        let filter = Filter::new()
            .exact(FieldKey::TrustBoundary, true)
            .at_least(FieldKey::SecurityRelevance, TRUST_BOUNDARY_MIN_RELEVANCE);
        self.search(SearchQuery::new().vector(vector).filter(filter).limit(limit))
            .await
    }

    /// Function-level embeddings with complexity of at least `min_complexity`.
    /// Metadata-only: no vector, every score is 0.0.
    pub async fn find_complex_functions(
        &self,
        min_complexity: u32,
        limit: usize,
    ) -> Result<Vec<VectorSearchResult>, VectorStoreError> {
        let filter = Filter::new()
            .exists(FieldKey::FunctionName)
            .at_least(FieldKey::Complexity, i64::from(min_complexity));
        self.search(SearchQuery::new().filter(filter).limit(limit))
            .await
    }

    /// Remove every embedding of one content version of a file.
    pub async fn delete_by_file(&self, file_id: &str) -> Result<(), VectorStoreError> {
        self.backend
            .delete(&self.collection, &Filter::by_file(file_id))
            .await?;
        self.backend.flush(&self.collection).await?;
        debug!(collection = %self.collection, file_id, "deleted file embeddings");
        Ok(())
    }

    /// Remove every embedding stored for `path`, whichever content version
    /// produced it. Re-indexing a changed file calls this before storing.
    pub async fn delete_by_path(&self, path: &str) -> Result<(), VectorStoreError> {
        self.delete_by_paths([path]).await
    }

    /// [`delete_by_path`](Self::delete_by_path) for many paths with one flush.
    pub async fn delete_by_paths<'a>(
        &self,
        paths: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), VectorStoreError> {
        for path in paths {
            self.backend
                .delete(&self.collection, &Filter::by_path(path))
                .await?;
            debug!(collection = %self.collection, path, "deleted path embeddings");
        }
        self.backend.flush(&self.collection).await
    }

    /// Every stored embedding of a file, vectors included, sorted by id.
    pub async fn get_by_file(&self, file_id: &str) -> Result<Vec<CodeEmbedding>, VectorStoreError> {
        let points = self
            .backend
            .scroll(&self.collection, &Filter::by_file(file_id), true)
            .await?;
        let mut embeddings: Vec<CodeEmbedding> = points
            .into_iter()
            .map(|p| p.payload.into_embedding(p.vector.unwrap_or_default()))
            .collect();
        embeddings.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(embeddings)
    }

    /// Approximate k-means over one embedding type, highest risk first.
    ///
    /// Returns an empty list when fewer than `k` embeddings exist.
    pub async fn cluster_by_type(
        &self,
        embedding_type: EmbeddingType,
        k: usize,
    ) -> Result<Vec<Cluster>, VectorStoreError> {
        let mut points = self
            .backend
            .scroll(&self.collection, &Filter::by_type(embedding_type), true)
            .await?;
        points.retain(|p| p.vector.as_ref().is_some_and(|v| v.len() == self.dimension));
        points.sort_by(|a, b| a.payload.embedding_id.cmp(&b.payload.embedding_id));

        let vectors: Vec<&[f32]> = points
            .iter()
            .filter_map(|p| p.vector.as_deref())
            .collect();
        let Some(result) = single_pass_clusters(&vectors, k) else {
            debug!(
                embedding_type = %embedding_type,
                k,
                available = points.len(),
                "not enough embeddings to cluster"
            );
            return Ok(Vec::new());
        };

        let mut members: Vec<Vec<usize>> = vec![Vec::new(); k];
        for (point_index, &cluster) in result.assignments.iter().enumerate() {
            members[cluster].push(point_index);
        }

        let mut clusters: Vec<Cluster> = result
            .centroids
            .into_iter()
            .zip(members)
            .map(|(centroid, indices)| {
                let relevance: u32 = indices
                    .iter()
                    .map(|&i| u32::from(points[i].payload.metadata.security_relevance))
                    .sum();
                let risk_score = if indices.is_empty() {
                    0.0
                } else {
                    relevance as f32 / indices.len() as f32
                };
                let mut ids: Vec<String> = indices
                    .iter()
                    .map(|&i| points[i].payload.embedding_id.clone())
                    .collect();
                ids.sort();
                Cluster {
                    centroid,
                    size: ids.len(),
                    members: ids,
                    risk_score,
                }
            })
            .collect();

        clusters.sort_by(|a, b| {
            b.risk_score
                .total_cmp(&a.risk_score)
                .then_with(|| b.size.cmp(&a.size))
        });
        debug!(
            embedding_type = %embedding_type,
            k,
            converged = result.converged,
            "clustered embeddings with a single assignment pass"
        );
        Ok(clusters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingMetadata;
    use crate::types::RecordId;
    use chrono::Utc;

    struct Spec<'a> {
        file: &'a str,
        embedding_type: EmbeddingType,
        vector: Vec<f32>,
        security: u8,
        business: u8,
        complexity: u32,
        trust_boundary: bool,
        function: Option<&'a str>,
    }

    impl<'a> Spec<'a> {
        fn new(file: &'a str, embedding_type: EmbeddingType, vector: Vec<f32>) -> Self {
            Self {
                file,
                embedding_type,
                vector,
                security: 0,
                business: 0,
                complexity: 1,
                trust_boundary: false,
                function: None,
            }
        }

        fn build(self) -> CodeEmbedding {
            let id = match self.function {
                Some(name) => format!("{}:function:{name}:1", self.file),
                None => format!("{}:{}", self.file, self.embedding_type.as_str()),
            };
            CodeEmbedding {
                id,
                file_id: RecordId::from(self.file),
                embedding_type: self.embedding_type,
                vector: self.vector,
                metadata: EmbeddingMetadata {
                    file_name: format!("{}.ts", self.file),
                    file_path: format!("src/{}.ts", self.file),
                    function_name: self.function.map(str::to_string),
                    security_relevance: self.security,
                    business_criticality: self.business,
                    complexity: self.complexity,
                    trust_boundary: self.trust_boundary,
                },
                created_at: Utc::now(),
            }
        }
    }

    fn store_with(config: VectorStoreConfig) -> VectorStore {
        VectorStore::new(Arc::new(LocalBackend::in_memory()), "test", 2, &config)
    }

    fn store() -> VectorStore {
        store_with(VectorStoreConfig::default())
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let store = store();
        assert!(store.initialize().await.unwrap());
        assert!(!store.initialize().await.unwrap());

        let fields = store.backend.indexed_fields("test").await.unwrap();
        assert_eq!(fields.len(), INDEXED_FIELDS.len());
        assert!(fields.iter().any(|f| f == "metadata.trustBoundary"));
    }

    #[tokio::test]
    async fn test_store_in_small_batches() {
        let store = store_with(VectorStoreConfig {
            batch_size: 2,
            store_concurrency: 2,
            ..VectorStoreConfig::default()
        });
        store.initialize().await.unwrap();

        let embeddings: Vec<CodeEmbedding> = (0..5)
            .map(|i| {
                Spec::new(&format!("f{i}"), EmbeddingType::SemanticCode, vec![1.0, i as f32])
                    .build()
            })
            .collect();
        assert_eq!(store.store(&embeddings).await.unwrap(), 5);

        // Re-storing the same ids overwrites.
        assert_eq!(store.store(&embeddings).await.unwrap(), 5);
        let all = store
            .search(SearchQuery::new().limit(100))
            .await
            .unwrap();
        assert_eq!(all.len(), 5);
    }

    #[tokio::test]
    async fn test_store_rejects_wrong_dimension() {
        let store = store();
        store.initialize().await.unwrap();
        let bad = Spec::new("f", EmbeddingType::SemanticCode, vec![1.0, 0.0, 0.0]).build();
        assert!(matches!(
            store.store(&[bad]).await,
            Err(VectorStoreError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[tokio::test]
    async fn test_search_filters_and_threshold() {
        let store = store();
        store.initialize().await.unwrap();

        let mut high = Spec::new("a", EmbeddingType::SecurityPattern, vec![1.0, 0.0]);
        high.security = 8;
        let mut low = Spec::new("b", EmbeddingType::SecurityPattern, vec![0.9, 0.1]);
        low.security = 3;
        let other = Spec::new("c", EmbeddingType::SemanticCode, vec![1.0, 0.0]);
        store
            .store(&[high.build(), low.build(), other.build()])
            .await
            .unwrap();

        let hits = store
            .find_security_patterns(vec![1.0, 0.0], 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].embedding.file_id.as_str(), "a");
        assert!(hits[0].embedding.vector.is_empty());

        let hits = store
            .search(
                SearchQuery::new()
                    .vector(vec![0.0, 1.0])
                    .threshold(0.5),
            )
            .await
            .unwrap();
        assert!(hits.is_empty());

        // The threshold does not apply without a vector.
        let hits = store
            .search(
                SearchQuery::new()
                    .filter(Filter::by_type(EmbeddingType::SemanticCode))
                    .threshold(0.99),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 0.0);
    }

    #[tokio::test]
    async fn test_convenience_queries() {
        let store = store();
        store.initialize().await.unwrap();

        let mut boundary = Spec::new("ctrl", EmbeddingType::SemanticCode, vec![1.0, 0.0]);
        boundary.trust_boundary = true;
        boundary.security = 7;
        let mut weak_boundary = Spec::new("view", EmbeddingType::SemanticCode, vec![1.0, 0.0]);
        weak_boundary.trust_boundary = true;
        weak_boundary.security = 6;
        let mut business = Spec::new("pay", EmbeddingType::BusinessLogic, vec![0.0, 1.0]);
        business.business = 6;
        let mut complex = Spec::new("svc", EmbeddingType::SemanticCode, vec![0.5, 0.5]);
        complex.function = Some("settle");
        complex.complexity = 14;
        let mut simple = Spec::new("svc2", EmbeddingType::SemanticCode, vec![0.5, 0.5]);
        simple.function = Some("noop");
        simple.complexity = 2;
        store
            .store(&[
                boundary.build(),
                weak_boundary.build(),
                business.build(),
                complex.build(),
                simple.build(),
            ])
            .await
            .unwrap();

        let hits = store.find_trust_boundaries(vec![1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].embedding.file_id.as_str(), "ctrl");

        let hits = store.find_business_logic(vec![0.0, 1.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].embedding.file_id.as_str(), "pay");

        let hits = store.find_complex_functions(10, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(
            hits[0].embedding.metadata.function_name.as_deref(),
            Some("settle")
        );
    }

    #[tokio::test]
    async fn test_delete_and_get_by_file() {
        let store = store();
        store.initialize().await.unwrap();
        store
            .store(&[
                Spec::new("a", EmbeddingType::SemanticCode, vec![1.0, 0.0]).build(),
                Spec::new("a", EmbeddingType::DependencyFlow, vec![0.0, 1.0]).build(),
                Spec::new("b", EmbeddingType::SemanticCode, vec![1.0, 1.0]).build(),
            ])
            .await
            .unwrap();

        let a = store.get_by_file("a").await.unwrap();
        assert_eq!(a.len(), 2);
        assert!(a.iter().all(|e| e.vector.len() == 2));

        store.delete_by_file("a").await.unwrap();
        assert!(store.get_by_file("a").await.unwrap().is_empty());
        assert_eq!(store.get_by_file("b").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_by_path_spans_content_versions() {
        let store = store();
        store.initialize().await.unwrap();
        let old = Spec::new("v1", EmbeddingType::SemanticCode, vec![1.0, 0.0]).build();
        let mut new = Spec::new("v2", EmbeddingType::SemanticCode, vec![0.0, 1.0]).build();
        new.metadata.file_path = old.metadata.file_path.clone();
        let other = Spec::new("b", EmbeddingType::SemanticCode, vec![1.0, 1.0]).build();
        store.store(&[old, new, other]).await.unwrap();

        store.delete_by_path("src/v1.ts").await.unwrap();
        assert!(store.get_by_file("v1").await.unwrap().is_empty());
        assert!(store.get_by_file("v2").await.unwrap().is_empty());
        assert_eq!(store.get_by_file("b").await.unwrap().len(), 1);

        store.delete_by_paths(["src/b.ts", "src/gone.ts"]).await.unwrap();
        assert!(store.get_by_file("b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_queries_are_rejected() {
        let store = store();
        store.initialize().await.unwrap();

        let bad_filter = Filter::new().exact(FieldKey::SecurityRelevance, "high");
        assert!(matches!(
            store.search(SearchQuery::new().filter(bad_filter)).await,
            Err(VectorStoreError::InvalidFilter(_))
        ));
        assert!(matches!(
            store.search(SearchQuery::new().vector(vec![1.0])).await,
            Err(VectorStoreError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            store.search(SearchQuery::new().limit(0)).await,
            Err(VectorStoreError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_cluster_by_type() {
        let store = store();
        store.initialize().await.unwrap();

        let mut embeddings = Vec::new();
        for (i, (vector, security)) in [
            (vec![1.0, 0.0], 9),
            (vec![0.95, 0.05], 7),
            (vec![0.0, 1.0], 1),
            (vec![0.1, 0.9], 2),
        ]
        .into_iter()
        .enumerate()
        {
            let mut spec = Spec::new(
                ["f0", "f1", "f2", "f3"][i],
                EmbeddingType::SecurityPattern,
                vector,
            );
            spec.security = security;
            embeddings.push(spec.build());
        }
        store.store(&embeddings).await.unwrap();

        // Seeds are f0 and f2 after sorting by id.
        let clusters = store
            .cluster_by_type(EmbeddingType::SecurityPattern, 2)
            .await
            .unwrap();
        assert_eq!(clusters.len(), 2);
        assert!((clusters[0].risk_score - 8.0).abs() < 1e-6);
        assert!((clusters[1].risk_score - 1.5).abs() < 1e-6);
        assert_eq!(clusters[0].size, 2);
        assert!(clusters[0].members.iter().all(|m| m.starts_with("f0") || m.starts_with("f1")));

        let none = store
            .cluster_by_type(EmbeddingType::SecurityPattern, 10)
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
