//! Inference models: token ids in, fixed-length vector out.
//!
//! # Artifact format (`.cemb`)
//!
//! - Header (16 bytes): magic `CEMB`, version, dimension, row count (all `u32` LE)
//! - Rows: `rows * dimension` little-endian `f32`, one row per vocabulary id
//!
//! The lookup-table model maps the artifact read-only and mean-pools the rows
//! of all non-padding ids, then L2-normalises the result.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use memmap2::{Mmap, MmapOptions};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::EmbeddingError;
use super::tokenizer::{PAD_ID, Vocabulary};
use crate::config::{EmbeddingBackend, EmbeddingConfig};

const MAGIC_BYTES: &[u8; 4] = b"CEMB";
const ARTIFACT_VERSION: u32 = 1;
const HEADER_SIZE: usize = 16;
const BYTES_PER_F32: usize = 4;

/// Output dimension of the fastembed AllMiniLML6V2 model.
pub const FASTEMBED_DIMENSION: usize = 384;

/// A loaded, read-only inference model shared by all embedding calls.
pub trait InferenceModel: Send + Sync {
    /// Length of every vector returned by [`infer`](Self::infer).
    fn dimension(&self) -> usize;

    /// Embed one fixed-length id sequence.
    fn infer(&self, token_ids: &[u32]) -> Result<Vec<f32>, EmbeddingError>;

    fn name(&self) -> &str;
}

/// Load the configured model once. The returned handle is shared across threads.
pub fn load_model(
    config: &EmbeddingConfig,
    vocabulary: Arc<Vocabulary>,
) -> Result<Arc<dyn InferenceModel>, EmbeddingError> {
    let model: Arc<dyn InferenceModel> = match config.backend {
        EmbeddingBackend::Lookup => Arc::new(LookupTableModel::open(
            &config.model_path,
            config.dimension,
            vocabulary.len(),
        )?),
        EmbeddingBackend::Fastembed => Arc::new(FastEmbedModel::new(
            &config.cache_dir,
            vocabulary,
            config.dimension,
        )?),
    };
    info!(
        model = model.name(),
        dimension = model.dimension(),
        "embedding model loaded"
    );
    Ok(model)
}

/// Memory-mapped lookup-table model.
#[derive(Debug)]
pub struct LookupTableModel {
    path: PathBuf,
    mmap: Mmap,
    dimension: usize,
    rows: usize,
}

impl LookupTableModel {
    /// Open an artifact and check it against the configured dimension.
    ///
    /// `min_rows` is the vocabulary size; an artifact with fewer rows cannot
    /// embed every id the tokenizer can produce.
    pub fn open(
        path: impl AsRef<Path>,
        expected_dimension: usize,
        min_rows: usize,
    ) -> Result<Self, EmbeddingError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| EmbeddingError::ModelLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        // The artifact is never written while mapped.
        let mmap = unsafe { MmapOptions::new().map(&file) }.map_err(|e| {
            EmbeddingError::ModelLoad {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        let invalid = |reason: String| EmbeddingError::InvalidArtifact {
            path: path.to_path_buf(),
            reason,
        };

        if mmap.len() < HEADER_SIZE {
            return Err(invalid("file too small to contain header".to_string()));
        }
        if &mmap[0..4] != MAGIC_BYTES {
            return Err(invalid("invalid magic bytes".to_string()));
        }
        let version = read_u32(&mmap, 4);
        if version != ARTIFACT_VERSION {
            return Err(invalid(format!(
                "unsupported version {version}, expected {ARTIFACT_VERSION}"
            )));
        }
        let dimension = read_u32(&mmap, 8) as usize;
        let rows = read_u32(&mmap, 12) as usize;

        if dimension != expected_dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: expected_dimension,
                actual: dimension,
            });
        }
        let expected_len = HEADER_SIZE + rows * dimension * BYTES_PER_F32;
        if mmap.len() != expected_len {
            return Err(invalid(format!(
                "expected {expected_len} bytes for {rows} rows of {dimension}, found {}",
                mmap.len()
            )));
        }
        if rows < min_rows {
            return Err(invalid(format!(
                "{rows} rows cannot cover a vocabulary of {min_rows} ids"
            )));
        }

        debug!(path = %path.display(), dimension, rows, "mapped lookup-table model");
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            dimension,
            rows,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn add_row(&self, id: u32, acc: &mut [f32]) -> Result<(), EmbeddingError> {
        let row = id as usize;
        if row >= self.rows {
            return Err(EmbeddingError::TokenOutOfRange {
                id,
                rows: self.rows,
            });
        }
        let start = HEADER_SIZE + row * self.dimension * BYTES_PER_F32;
        for (i, slot) in acc.iter_mut().enumerate() {
            let at = start + i * BYTES_PER_F32;
            *slot += f32::from_le_bytes([
                self.mmap[at],
                self.mmap[at + 1],
                self.mmap[at + 2],
                self.mmap[at + 3],
            ]);
        }
        Ok(())
    }
}

impl InferenceModel for LookupTableModel {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn infer(&self, token_ids: &[u32]) -> Result<Vec<f32>, EmbeddingError> {
        let mut pooled = vec![0.0f32; self.dimension];
        let mut count = 0usize;
        for &id in token_ids.iter().filter(|&&id| id != PAD_ID) {
            self.add_row(id, &mut pooled)?;
            count += 1;
        }
        if count == 0 {
            // Nothing but padding: the pad row is the low-information embedding.
            self.add_row(PAD_ID, &mut pooled)?;
            count = 1;
        }
        for value in &mut pooled {
            *value /= count as f32;
        }
        l2_normalize(&mut pooled);
        Ok(pooled)
    }

    fn name(&self) -> &str {
        "lookup-table"
    }
}

/// Write a seeded random lookup-table artifact. The same seed always yields
/// the same bytes.
pub fn write_artifact(
    path: impl AsRef<Path>,
    rows: usize,
    dimension: usize,
    seed: u64,
) -> Result<(), EmbeddingError> {
    let path = path.as_ref();
    if rows == 0 || dimension == 0 {
        return Err(EmbeddingError::InvalidArtifact {
            path: path.to_path_buf(),
            reason: "rows and dimension must be non-zero".to_string(),
        });
    }
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        writer.write_all(MAGIC_BYTES)?;
        writer.write_all(&ARTIFACT_VERSION.to_le_bytes())?;
        writer.write_all(&(dimension as u32).to_le_bytes())?;
        writer.write_all(&(rows as u32).to_le_bytes())?;

        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..rows * dimension {
            let value: f32 = rng.random_range(-1.0..1.0);
            writer.write_all(&value.to_le_bytes())?;
        }
        writer.flush()?;
    }
    temp.persist(path).map_err(|e| EmbeddingError::Io(e.error))?;
    info!(path = %path.display(), rows, dimension, seed, "wrote lookup-table model");
    Ok(())
}

/// fastembed adapter. Ids are turned back into text through the vocabulary,
/// so the sentence model sees the same lossy view the lookup model does.
pub struct FastEmbedModel {
    model: Mutex<TextEmbedding>,
    vocabulary: Arc<Vocabulary>,
}

impl FastEmbedModel {
    pub fn new(
        cache_dir: &Path,
        vocabulary: Arc<Vocabulary>,
        expected_dimension: usize,
    ) -> Result<Self, EmbeddingError> {
        if expected_dimension != FASTEMBED_DIMENSION {
            return Err(EmbeddingError::DimensionMismatch {
                expected: expected_dimension,
                actual: FASTEMBED_DIMENSION,
            });
        }
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::AllMiniLML6V2)
                .with_cache_dir(cache_dir.to_path_buf())
                .with_show_download_progress(false),
        )
        .map_err(|e| EmbeddingError::ModelLoad {
            path: cache_dir.to_path_buf(),
            reason: format!(
                "{e}. Ensure you have internet connection for first-time model download"
            ),
        })?;
        Ok(Self {
            model: Mutex::new(model),
            vocabulary,
        })
    }
}

impl std::fmt::Debug for FastEmbedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedModel")
            .field("model", &"<TextEmbedding>")
            .field("vocabulary", &self.vocabulary.len())
            .finish()
    }
}

impl InferenceModel for FastEmbedModel {
    fn dimension(&self) -> usize {
        FASTEMBED_DIMENSION
    }

    fn infer(&self, token_ids: &[u32]) -> Result<Vec<f32>, EmbeddingError> {
        let text = self.vocabulary.decode(token_ids);
        let embeddings = self
            .model
            .lock()
            .map_err(|_| {
                EmbeddingError::Inference(
                    "Failed to acquire embedding model lock - model may be poisoned".to_string(),
                )
            })?
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::Inference(format!("Failed to generate embedding: {e}")))?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Inference("model returned no embedding".to_string()))
    }

    fn name(&self) -> &str {
        "fastembed/AllMiniLML6V2"
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Scale to unit length. A zero vector is left unchanged.
pub fn l2_normalize(vector: &mut [f32]) {
    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in vector.iter_mut() {
            *value /= magnitude;
        }
    }
}

/// Deterministic model for tests: one-hot buckets of token ids, normalised.
#[cfg(test)]
#[derive(Debug)]
pub struct MockInferenceModel {
    dimension: usize,
}

#[cfg(test)]
impl MockInferenceModel {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[cfg(test)]
impl InferenceModel for MockInferenceModel {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn infer(&self, token_ids: &[u32]) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0.01; self.dimension];
        for &id in token_ids.iter().filter(|&&id| id != PAD_ID) {
            vector[id as usize % self.dimension] += 1.0;
        }
        l2_normalize(&mut vector);
        Ok(vector)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_artifact_roundtrip_and_pooling() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("models/test.cemb");
        write_artifact(&path, 8, 16, 7).unwrap();

        let model = LookupTableModel::open(&path, 16, 8).unwrap();
        assert_eq!(model.rows(), 8);

        let v = model.infer(&[2, 3, PAD_ID, PAD_ID]).unwrap();
        assert_eq!(v.len(), 16);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);

        // Order of tokens does not change a mean pool.
        assert_eq!(v, model.infer(&[3, 2, PAD_ID, PAD_ID]).unwrap());
    }

    #[test]
    fn test_same_seed_same_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.cemb");
        let b = temp_dir.path().join("b.cemb");
        write_artifact(&a, 4, 8, 42).unwrap();
        write_artifact(&b, 4, 8, 42).unwrap();
        assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
    }

    #[test]
    fn test_padding_only_uses_pad_row() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("m.cemb");
        write_artifact(&path, 4, 8, 1).unwrap();
        let model = LookupTableModel::open(&path, 8, 4).unwrap();

        let v = model.infer(&[PAD_ID; 5]).unwrap();
        assert_eq!(v.len(), 8);
        assert!(v.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_rejects_bad_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("m.cemb");
        write_artifact(&path, 4, 8, 1).unwrap();

        assert!(matches!(
            LookupTableModel::open(&path, 16, 4),
            Err(EmbeddingError::DimensionMismatch {
                expected: 16,
                actual: 8
            })
        ));
        assert!(matches!(
            LookupTableModel::open(&path, 8, 100),
            Err(EmbeddingError::InvalidArtifact { .. })
        ));
        assert!(matches!(
            LookupTableModel::open(temp_dir.path().join("missing.cemb"), 8, 4),
            Err(EmbeddingError::ModelLoad { .. })
        ));

        let garbage = temp_dir.path().join("garbage.cemb");
        std::fs::write(&garbage, b"not a model at all").unwrap();
        assert!(matches!(
            LookupTableModel::open(&garbage, 8, 4),
            Err(EmbeddingError::InvalidArtifact { .. })
        ));
    }

    #[test]
    fn test_out_of_range_token_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("m.cemb");
        write_artifact(&path, 4, 8, 1).unwrap();
        let model = LookupTableModel::open(&path, 8, 4).unwrap();
        assert!(matches!(
            model.infer(&[9]),
            Err(EmbeddingError::TokenOutOfRange { id: 9, rows: 4 })
        ));
    }

    #[test]
    fn test_fastembed_dimension_checked_before_download() {
        let temp_dir = TempDir::new().unwrap();
        let result = FastEmbedModel::new(temp_dir.path(), Arc::new(Vocabulary::builtin()), 4096);
        assert!(matches!(
            result,
            Err(EmbeddingError::DimensionMismatch { .. })
        ));
    }
}
