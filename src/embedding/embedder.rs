//! Record to embeddings.
//!
//! Every record yields one file-level `SEMANTIC_CODE` embedding. Further
//! embeddings are emitted when the record has something to say:
//!
//! | Type | Emitted when | Text |
//! |---|---|---|
//! | `SECURITY_PATTERN` | one per pattern type present | descriptions of that type |
//! | `SEMANTIC_CODE` + function name | complexity above threshold or risk above low | the function's lines |
//! | `DEPENDENCY_FLOW` | imports or exports exist | import and export identifiers |
//! | `BUSINESS_LOGIC` | business vocabulary matched | the matched terms |

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::debug;

use super::EmbeddingError;
use super::model::InferenceModel;
use super::tokenizer::Vocabulary;
use super::types::{CodeEmbedding, EmbeddingMetadata, EmbeddingType};
use crate::config::EmbeddingConfig;
use crate::graph::{DependencyGraph, DependencyNode};
use crate::risk;
use crate::types::{CodeRecord, FunctionFact, RiskLevel, SecurityPatternFact};

/// Turns code records into typed vectors with a shared, read-only model.
pub struct SemanticEmbedder {
    model: Arc<dyn InferenceModel>,
    vocabulary: Arc<Vocabulary>,
    max_sequence_length: usize,
    function_complexity_threshold: u32,
    /// Workers for [`SemanticEmbedder::embed_batch`], built once.
    pool: rayon::ThreadPool,
}

impl std::fmt::Debug for SemanticEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticEmbedder")
            .field("model", &self.model.name())
            .field("dimension", &self.model.dimension())
            .field("vocabulary", &self.vocabulary.len())
            .field("max_sequence_length", &self.max_sequence_length)
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

/// Scores shared by every embedding of one record.
struct FileScores {
    file_name: String,
    file_path: String,
    security_relevance: u8,
    business_criticality: u8,
    complexity: u32,
    trust_boundary: bool,
}

impl FileScores {
    fn metadata(&self) -> EmbeddingMetadata {
        EmbeddingMetadata {
            file_name: self.file_name.clone(),
            file_path: self.file_path.clone(),
            function_name: None,
            security_relevance: self.security_relevance,
            business_criticality: self.business_criticality,
            complexity: self.complexity,
            trust_boundary: self.trust_boundary,
        }
    }
}

impl SemanticEmbedder {
    /// The model's dimension must match the configured one.
    pub fn new(
        model: Arc<dyn InferenceModel>,
        vocabulary: Arc<Vocabulary>,
        config: &EmbeddingConfig,
    ) -> Result<Self, EmbeddingError> {
        if model.dimension() != config.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: config.dimension,
                actual: model.dimension(),
            });
        }
        if config.max_sequence_length == 0 {
            return Err(EmbeddingError::Inference(
                "max_sequence_length must be at least 1".to_string(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.concurrency.max(1))
            .thread_name(|i| format!("codesight-embed-{i}"))
            .build()
            .map_err(|e| EmbeddingError::Inference(format!("Failed to start worker pool: {e}")))?;
        Ok(Self {
            model,
            vocabulary,
            max_sequence_length: config.max_sequence_length,
            function_complexity_threshold: config.function_complexity_threshold,
            pool,
        })
    }

    pub fn dimension(&self) -> usize {
        self.model.dimension()
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Embed a record without graph context.
    pub fn embed(&self, record: &CodeRecord) -> Result<Vec<CodeEmbedding>, EmbeddingError> {
        self.embed_with_context(record, None)
    }

    /// Embed a record. A graph node, when given, raises security relevance to
    /// the node's risk and carries over its trust boundary.
    pub fn embed_with_context(
        &self,
        record: &CodeRecord,
        node: Option<&DependencyNode>,
    ) -> Result<Vec<CodeEmbedding>, EmbeddingError> {
        let created_at = Utc::now();
        let mut scores = FileScores {
            file_name: record.file_name().to_string(),
            file_path: record.path.clone(),
            security_relevance: risk::security_relevance(record),
            business_criticality: risk::business_criticality(record),
            complexity: record.max_complexity(),
            trust_boundary: risk::declares_trust_boundary(record),
        };
        let node_floor = node.map(|n| risk::to_score(n.security_risk)).unwrap_or(0);
        if let Some(node) = node {
            scores.security_relevance = scores.security_relevance.max(node_floor);
            scores.trust_boundary |= node.trust_boundary;
        }

        let mut out = Vec::new();

        out.push(self.make(
            record,
            EmbeddingType::SemanticCode,
            CodeEmbedding::make_id(&record.id, EmbeddingType::SemanticCode),
            &record.content,
            scores.metadata(),
            created_at,
        )?);

        for (pattern_type, group) in group_patterns(&record.security_patterns) {
            let text = group
                .iter()
                .map(|p| {
                    if p.description.is_empty() {
                        p.pattern_type.as_str()
                    } else {
                        p.description.as_str()
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            let mut metadata = scores.metadata();
            metadata.security_relevance = risk::pattern_group_relevance(&group).max(node_floor);
            out.push(self.make(
                record,
                EmbeddingType::SecurityPattern,
                format!(
                    "{}:{pattern_type}",
                    CodeEmbedding::make_id(&record.id, EmbeddingType::SecurityPattern)
                ),
                &text,
                metadata,
                created_at,
            )?);
        }

        for (fact, function) in record
            .functions
            .iter()
            .enumerate()
            .filter(|(_, f)| self.is_embeddable_function(f))
        {
            let mut text = record.line_slice(function.start_line, function.end_line);
            if text.trim().is_empty() {
                // Bad line range: fall back to the name rather than dropping it.
                text = function.name.clone();
            }
            let metadata = EmbeddingMetadata {
                function_name: Some(function.name.clone()),
                security_relevance: risk::function_relevance(record, function).max(node_floor),
                complexity: function.complexity,
                trust_boundary: function.trust_boundary || scores.trust_boundary,
                ..scores.metadata()
            };
            out.push(self.make(
                record,
                EmbeddingType::SemanticCode,
                format!(
                    "{}:function:{fact}:{}:{}",
                    record.id, function.name, function.start_line
                ),
                &text,
                metadata,
                created_at,
            )?);
        }

        if !record.imports.is_empty() || !record.exports.is_empty() {
            let text = record
                .imports
                .iter()
                .chain(&record.exports)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            out.push(self.make(
                record,
                EmbeddingType::DependencyFlow,
                CodeEmbedding::make_id(&record.id, EmbeddingType::DependencyFlow),
                &text,
                scores.metadata(),
                created_at,
            )?);
        }

        let mut terms = risk::business_terms(&record.path);
        terms.extend(risk::business_terms(&record.content));
        terms.sort_unstable();
        terms.dedup();
        if !terms.is_empty() {
            out.push(self.make(
                record,
                EmbeddingType::BusinessLogic,
                CodeEmbedding::make_id(&record.id, EmbeddingType::BusinessLogic),
                &terms.join(" "),
                scores.metadata(),
                created_at,
            )?);
        }

        debug!(file = %record.path, embeddings = out.len(), "record embedded");
        Ok(out)
    }

    /// Embed many records on the embedder's pool of `embedding.concurrency` threads.
    /// Output order follows input order; the first error aborts the batch.
    pub fn embed_batch(
        &self,
        records: &[CodeRecord],
        graph: Option<&DependencyGraph>,
    ) -> Result<Vec<Vec<CodeEmbedding>>, EmbeddingError> {
        self.pool.install(|| {
            records
                .par_iter()
                .map(|record| {
                    let node = graph.and_then(|g| g.node(record.id.as_str()));
                    self.embed_with_context(record, node)
                })
                .collect()
        })
    }

    /// Embed free text, e.g. a search query, with the same pipeline.
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let ids = self.vocabulary.encode(text, self.max_sequence_length);
        let vector = self.model.infer(&ids)?;
        self.validate(vector)
    }

    fn is_embeddable_function(&self, function: &FunctionFact) -> bool {
        function.complexity > self.function_complexity_threshold
            || function.risk_level > RiskLevel::Low
    }

    fn make(
        &self,
        record: &CodeRecord,
        embedding_type: EmbeddingType,
        id: String,
        text: &str,
        metadata: EmbeddingMetadata,
        created_at: DateTime<Utc>,
    ) -> Result<CodeEmbedding, EmbeddingError> {
        Ok(CodeEmbedding {
            id,
            file_id: record.id.clone(),
            embedding_type,
            vector: self.embed_text(text)?,
            metadata,
            created_at,
        })
    }

    fn validate(&self, vector: Vec<f32>) -> Result<Vec<f32>, EmbeddingError> {
        let expected = self.model.dimension();
        if vector.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(EmbeddingError::InvalidVector(
                "model produced a non-finite value".to_string(),
            ));
        }
        Ok(vector)
    }
}

/// Findings grouped by pattern type, in type order.
fn group_patterns(patterns: &[SecurityPatternFact]) -> BTreeMap<&str, Vec<&SecurityPatternFact>> {
    let mut groups: BTreeMap<&str, Vec<&SecurityPatternFact>> = BTreeMap::new();
    for pattern in patterns {
        groups
            .entry(pattern.pattern_type.as_str())
            .or_default()
            .push(pattern);
    }
    groups
}
