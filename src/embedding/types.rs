//! Embedding records produced by the semantic embedder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::RecordId;

/// What an embedding represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmbeddingType {
    /// Whole file, or a single risky function when `functionName` is set.
    SemanticCode,
    /// All findings of one pattern type within a file.
    SecurityPattern,
    /// Import and export identifiers.
    DependencyFlow,
    /// Business vocabulary found in the file.
    BusinessLogic,
}

impl EmbeddingType {
    pub const ALL: [EmbeddingType; 4] = [
        Self::SemanticCode,
        Self::SecurityPattern,
        Self::DependencyFlow,
        Self::BusinessLogic,
    ];

    /// Wire name, as stored in vector payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SemanticCode => "SEMANTIC_CODE",
            Self::SecurityPattern => "SECURITY_PATTERN",
            Self::DependencyFlow => "DEPENDENCY_FLOW",
            Self::BusinessLogic => "BUSINESS_LOGIC",
        }
    }

    /// Lower-case segment used inside embedding ids.
    pub(crate) fn id_segment(&self) -> &'static str {
        match self {
            Self::SemanticCode => "semantic_code",
            Self::SecurityPattern => "security_pattern",
            Self::DependencyFlow => "dependency_flow",
            Self::BusinessLogic => "business_logic",
        }
    }
}

impl fmt::Display for EmbeddingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown embedding type '{s}', expected one of SEMANTIC_CODE, SECURITY_PATTERN, DEPENDENCY_FLOW, BUSINESS_LOGIC"
                )
            })
    }
}

/// Scores copied onto every embedding so the store can filter without the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingMetadata {
    pub file_name: String,
    /// Record path; stable across content changes, unlike `fileId`.
    #[serde(default)]
    pub file_path: String,
    pub function_name: Option<String>,
    /// 0-10
    pub security_relevance: u8,
    /// 0-10
    pub business_criticality: u8,
    pub complexity: u32,
    pub trust_boundary: bool,
}

/// One typed vector for one file (or one function of a file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeEmbedding {
    /// Deterministic per (file, type, granularity).
    pub id: String,
    pub file_id: RecordId,
    #[serde(rename = "type")]
    pub embedding_type: EmbeddingType,
    /// Empty when a query result omitted the vector.
    pub vector: Vec<f32>,
    pub metadata: EmbeddingMetadata,
    pub created_at: DateTime<Utc>,
}

impl CodeEmbedding {
    pub(crate) fn make_id(file_id: &RecordId, embedding_type: EmbeddingType) -> String {
        format!("{file_id}:{}", embedding_type.id_segment())
    }
}
