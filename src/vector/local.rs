//! In-process vector backend.
//!
//! Collections live in memory behind a `parking_lot::RwLock`. With a data
//! directory, mutations mark the collection dirty and [`VectorBackend::flush`]
//! writes it to `<data_dir>/<name>.bin` (bincode) on the blocking pool,
//! replacing the previous snapshot atomically. Search is an exact linear scan.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::backend::VectorBackend;
use super::clustering::cosine_similarity;
use super::filter::{FieldKey, Filter};
use super::types::{BackendQuery, Payload, Point, ScoredPoint, VectorStoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPoint {
    vector: Vec<f32>,
    payload: Payload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Collection {
    dimension: usize,
    indexes: BTreeSet<String>,
    points: BTreeMap<Uuid, StoredPoint>,
}

impl Collection {
    fn new(dimension: usize) -> Self {
        Self {
            dimension,
            indexes: BTreeSet::new(),
            points: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct LocalBackend {
    data_dir: Option<PathBuf>,
    collections: RwLock<HashMap<String, Collection>>,
    /// Collections changed since their last snapshot.
    dirty: Mutex<HashSet<String>>,
    /// Serialises snapshot writes so the newest state lands last.
    persist_lock: tokio::sync::Mutex<()>,
}

impl LocalBackend {
    /// Memory only. Everything is lost on drop.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Snapshot-backed. Existing snapshots are loaded on first use of a collection.
    pub fn open(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            ..Self::default()
        }
    }

    fn snapshot_path(&self, collection: &str) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(format!("{collection}.bin")))
    }

    fn load_snapshot(path: &Path) -> Result<Option<Collection>, VectorStoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(path)?;
        let (collection, _): (Collection, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).map_err(
                |e| VectorStoreError::Snapshot {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                },
            )?;
        debug!(path = %path.display(), points = collection.points.len(), "loaded collection snapshot");
        Ok(Some(collection))
    }

    /// Bring a persisted collection into memory if it is not there yet.
    fn hydrate(&self, collection: &str) -> Result<(), VectorStoreError> {
        if self.collections.read().contains_key(collection) {
            return Ok(());
        }
        let Some(path) = self.snapshot_path(collection) else {
            return Ok(());
        };
        if let Some(loaded) = Self::load_snapshot(&path)? {
            self.collections
                .write()
                .entry(collection.to_string())
                .or_insert(loaded);
        }
        Ok(())
    }

    fn mark_dirty(&self, collection: &str) {
        if self.data_dir.is_some() {
            self.dirty.lock().insert(collection.to_string());
        }
    }

    fn write_snapshot(path: &Path, bytes: &[u8]) -> Result<(), VectorStoreError> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut temp, bytes)?;
        temp.persist(path).map_err(|e| VectorStoreError::Snapshot {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn missing(collection: &str) -> VectorStoreError {
        VectorStoreError::CollectionUnavailable {
            name: collection.to_string(),
            reason: "collection does not exist".to_string(),
        }
    }

    fn with_collection<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&Collection) -> T,
    ) -> Result<T, VectorStoreError> {
        self.hydrate(collection)?;
        let collections = self.collections.read();
        collections
            .get(collection)
            .map(f)
            .ok_or_else(|| Self::missing(collection))
    }

    fn scored(id: &Uuid, point: &StoredPoint, score: f32, with_vector: bool) -> ScoredPoint {
        ScoredPoint {
            id: *id,
            score,
            payload: point.payload.clone(),
            vector: with_vector.then(|| point.vector.clone()),
        }
    }
}

#[async_trait]
impl VectorBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    async fn ensure_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> Result<bool, VectorStoreError> {
        self.hydrate(collection)?;
        let created = {
            let mut collections = self.collections.write();
            match collections.get(collection) {
                Some(existing) if existing.dimension != dimension => {
                    return Err(VectorStoreError::DimensionMismatch {
                        expected: dimension,
                        actual: existing.dimension,
                    });
                }
                Some(_) => false,
                None => {
                    collections.insert(collection.to_string(), Collection::new(dimension));
                    true
                }
            }
        };
        if created {
            self.mark_dirty(collection);
        }
        Ok(created)
    }

    async fn indexed_fields(&self, collection: &str) -> Result<Vec<String>, VectorStoreError> {
        self.with_collection(collection, |c| c.indexes.iter().cloned().collect())
    }

    async fn create_index(
        &self,
        collection: &str,
        field: FieldKey,
    ) -> Result<(), VectorStoreError> {
        self.hydrate(collection)?;
        {
            let mut collections = self.collections.write();
            let data = collections
                .get_mut(collection)
                .ok_or_else(|| Self::missing(collection))?;
            data.indexes.insert(field.path().to_string());
        }
        self.mark_dirty(collection);
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<(), VectorStoreError> {
        self.hydrate(collection)?;
        {
            let mut collections = self.collections.write();
            let data = collections
                .get_mut(collection)
                .ok_or_else(|| Self::missing(collection))?;
            for point in &points {
                if point.vector.len() != data.dimension {
                    return Err(VectorStoreError::DimensionMismatch {
                        expected: data.dimension,
                        actual: point.vector.len(),
                    });
                }
            }
            for point in points {
                data.points.insert(
                    point.id,
                    StoredPoint {
                        vector: point.vector,
                        payload: point.payload,
                    },
                );
            }
        }
        self.mark_dirty(collection);
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: &BackendQuery,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        self.with_collection(collection, |data| {
            let candidates = data
                .points
                .iter()
                .filter(|(_, p)| query.filter.matches(&p.payload));
            match &query.vector {
                Some(vector) => {
                    let mut hits: Vec<ScoredPoint> = candidates
                        .map(|(id, p)| {
                            let score = cosine_similarity(vector, &p.vector);
                            Self::scored(id, p, score, query.with_vector)
                        })
                        .filter(|hit| query.threshold.is_none_or(|t| hit.score >= t))
                        .collect();
                    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
                    hits.truncate(query.limit);
                    hits
                }
                None => candidates
                    .take(query.limit)
                    .map(|(id, p)| Self::scored(id, p, 0.0, query.with_vector))
                    .collect(),
            }
        })
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: &Filter,
        with_vector: bool,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        self.with_collection(collection, |data| {
            data.points
                .iter()
                .filter(|(_, p)| filter.matches(&p.payload))
                .map(|(id, p)| Self::scored(id, p, 0.0, with_vector))
                .collect()
        })
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<(), VectorStoreError> {
        self.hydrate(collection)?;
        let removed = {
            let mut collections = self.collections.write();
            let data = collections
                .get_mut(collection)
                .ok_or_else(|| Self::missing(collection))?;
            let before = data.points.len();
            data.points.retain(|_, p| !filter.matches(&p.payload));
            before - data.points.len()
        };
        debug!(collection, removed, "deleted points");
        if removed > 0 {
            self.mark_dirty(collection);
        }
        Ok(())
    }

    async fn flush(&self, collection: &str) -> Result<(), VectorStoreError> {
        let Some(path) = self.snapshot_path(collection) else {
            return Ok(());
        };
        let _guard = self.persist_lock.lock().await;
        if !self.dirty.lock().remove(collection) {
            return Ok(());
        }
        let encoded = {
            let collections = self.collections.read();
            match collections.get(collection) {
                Some(data) => bincode::serde::encode_to_vec(data, bincode::config::standard())
                    .map_err(|e| VectorStoreError::Snapshot {
                        path: path.clone(),
                        reason: e.to_string(),
                    }),
                None => return Ok(()),
            }
        };
        let written = match encoded {
            Ok(bytes) => {
                let target = path.clone();
                tokio::task::spawn_blocking(move || Self::write_snapshot(&target, &bytes))
                    .await
                    .map_err(|e| VectorStoreError::Task(e.to_string()))
                    .and_then(|r| r)
            }
            Err(e) => Err(e),
        };
        if written.is_err() {
            self.mark_dirty(collection);
        }
        written?;
        debug!(collection, path = %path.display(), "wrote collection snapshot");
        Ok(())
    }
}
