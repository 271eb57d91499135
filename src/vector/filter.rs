//! Typed payload filters.
//!
//! A [`Filter`] is a conjunction of conditions over known payload fields.
//! Each condition is one of exact match, numeric/time range, or existence,
//! and is checked against the field's value type before reaching a backend.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

use super::types::{Payload, VectorStoreError};
use crate::embedding::EmbeddingType;

/// Filterable payload fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    FileId,
    Type,
    FileName,
    FilePath,
    FunctionName,
    SecurityRelevance,
    BusinessCriticality,
    Complexity,
    TrustBoundary,
    CreatedAt,
}

/// Value type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Keyword,
    Integer,
    Bool,
    Datetime,
}

impl FieldKey {
    pub const ALL: [FieldKey; 10] = [
        Self::FileId,
        Self::Type,
        Self::FileName,
        Self::FilePath,
        Self::FunctionName,
        Self::SecurityRelevance,
        Self::BusinessCriticality,
        Self::Complexity,
        Self::TrustBoundary,
        Self::CreatedAt,
    ];

    /// Dotted payload path on the wire.
    pub fn path(&self) -> &'static str {
        match self {
            Self::FileId => "fileId",
            Self::Type => "type",
            Self::FileName => "metadata.fileName",
            Self::FilePath => "metadata.filePath",
            Self::FunctionName => "metadata.functionName",
            Self::SecurityRelevance => "metadata.securityRelevance",
            Self::BusinessCriticality => "metadata.businessCriticality",
            Self::Complexity => "metadata.complexity",
            Self::TrustBoundary => "metadata.trustBoundary",
            Self::CreatedAt => "createdAt",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::FileId | Self::Type | Self::FileName | Self::FilePath | Self::FunctionName => {
                FieldKind::Keyword
            }
            Self::SecurityRelevance | Self::BusinessCriticality | Self::Complexity => {
                FieldKind::Integer
            }
            Self::TrustBoundary => FieldKind::Bool,
            Self::CreatedAt => FieldKind::Datetime,
        }
    }

    /// Current value of this field in a payload. `None` when absent.
    fn value_of(&self, payload: &Payload) -> Option<FilterValue> {
        let m = &payload.metadata;
        Some(match self {
            Self::FileId => FilterValue::Keyword(payload.file_id.to_string()),
            Self::Type => FilterValue::Keyword(payload.embedding_type.as_str().to_string()),
            Self::FileName => FilterValue::Keyword(m.file_name.clone()),
            Self::FilePath => FilterValue::Keyword(m.file_path.clone()),
            Self::FunctionName => FilterValue::Keyword(m.function_name.clone()?),
            Self::SecurityRelevance => FilterValue::Integer(i64::from(m.security_relevance)),
            Self::BusinessCriticality => FilterValue::Integer(i64::from(m.business_criticality)),
            Self::Complexity => FilterValue::Integer(i64::from(m.complexity)),
            Self::TrustBoundary => FilterValue::Bool(m.trust_boundary),
            Self::CreatedAt => FilterValue::Datetime(payload.created_at),
        })
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for FieldKey {
    type Err = VectorStoreError;

    /// Accepts the wire path or its last segment (`securityRelevance`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| {
                let path = k.path();
                path == s || path.rsplit('.').next() == Some(s)
            })
            .ok_or_else(|| VectorStoreError::InvalidFilter(format!("unknown field '{s}'")))
    }
}

/// A filter operand.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Keyword(String),
    Integer(i64),
    Bool(bool),
    Datetime(DateTime<Utc>),
}

impl FilterValue {
    fn kind(&self) -> FieldKind {
        match self {
            Self::Keyword(_) => FieldKind::Keyword,
            Self::Integer(_) => FieldKind::Integer,
            Self::Bool(_) => FieldKind::Bool,
            Self::Datetime(_) => FieldKind::Datetime,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Keyword(s) => json!(s),
            Self::Integer(i) => json!(i),
            Self::Bool(b) => json!(b),
            Self::Datetime(t) => json!(t.to_rfc3339()),
        }
    }

    /// Ordering within one kind; `None` across kinds or for unordered kinds.
    fn partial_cmp_same_kind(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Datetime(a), Self::Datetime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Keyword(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Keyword(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Datetime(value)
    }
}

impl From<EmbeddingType> for FilterValue {
    fn from(value: EmbeddingType) -> Self {
        Self::Keyword(value.as_str().to_string())
    }
}

/// One filter clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Exact {
        field: FieldKey,
        value: FilterValue,
    },
    Range {
        field: FieldKey,
        gte: Option<FilterValue>,
        lte: Option<FilterValue>,
    },
    Exists {
        field: FieldKey,
    },
}

impl Condition {
    pub fn field(&self) -> FieldKey {
        match self {
            Self::Exact { field, .. } | Self::Range { field, .. } | Self::Exists { field } => {
                *field
            }
        }
    }

    fn validate(&self) -> Result<(), VectorStoreError> {
        let invalid = |msg: String| Err(VectorStoreError::InvalidFilter(msg));
        match self {
            Self::Exact { field, value } => {
                if value.kind() != field.kind() {
                    return invalid(format!(
                        "'{field}' expects a {:?} value, got {:?}",
                        field.kind(),
                        value.kind()
                    ));
                }
                if let (FieldKey::Type, FilterValue::Keyword(name)) = (field, value) {
                    if !EmbeddingType::ALL.iter().any(|t| t.as_str() == name) {
                        return invalid(format!("'{name}' is not an embedding type"));
                    }
                }
                Ok(())
            }
            Self::Range { field, gte, lte } => {
                if !matches!(field.kind(), FieldKind::Integer | FieldKind::Datetime) {
                    return invalid(format!("'{field}' does not support range conditions"));
                }
                if gte.is_none() && lte.is_none() {
                    return invalid(format!("range on '{field}' needs gte or lte"));
                }
                for bound in gte.iter().chain(lte.iter()) {
                    if bound.kind() != field.kind() {
                        return invalid(format!(
                            "'{field}' range bound must be {:?}, got {:?}",
                            field.kind(),
                            bound.kind()
                        ));
                    }
                }
                if let (Some(lo), Some(hi)) = (gte, lte) {
                    if lo.partial_cmp_same_kind(hi) == Some(std::cmp::Ordering::Greater) {
                        return invalid(format!("range on '{field}' has gte above lte"));
                    }
                }
                Ok(())
            }
            Self::Exists { .. } => Ok(()),
        }
    }

    fn matches(&self, payload: &Payload) -> bool {
        match self {
            Self::Exact { field, value } => field.value_of(payload).as_ref() == Some(value),
            Self::Range { field, gte, lte } => {
                let Some(actual) = field.value_of(payload) else {
                    return false;
                };
                let above = gte.as_ref().is_none_or(|lo| {
                    actual.partial_cmp_same_kind(lo) != Some(std::cmp::Ordering::Less)
                });
                let below = lte.as_ref().is_none_or(|hi| {
                    actual.partial_cmp_same_kind(hi) != Some(std::cmp::Ordering::Greater)
                });
                above && below
            }
            Self::Exists { field } => match field.value_of(payload) {
                Some(FilterValue::Keyword(s)) => !s.is_empty(),
                Some(_) => true,
                None => false,
            },
        }
    }
}

/// Conjunction of conditions. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub must: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exact(mut self, field: FieldKey, value: impl Into<FilterValue>) -> Self {
        self.must.push(Condition::Exact {
            field,
            value: value.into(),
        });
        self
    }

    pub fn range(
        mut self,
        field: FieldKey,
        gte: Option<FilterValue>,
        lte: Option<FilterValue>,
    ) -> Self {
        self.must.push(Condition::Range { field, gte, lte });
        self
    }

    /// Integer field at least `min`.
    pub fn at_least(self, field: FieldKey, min: i64) -> Self {
        self.range(field, Some(FilterValue::Integer(min)), None)
    }

    pub fn exists(mut self, field: FieldKey) -> Self {
        self.must.push(Condition::Exists { field });
        self
    }

    pub fn by_file(file_id: &str) -> Self {
        Self::new().exact(FieldKey::FileId, file_id)
    }

    pub fn by_path(path: &str) -> Self {
        Self::new().exact(FieldKey::FilePath, path)
    }

    pub fn by_type(embedding_type: EmbeddingType) -> Self {
        Self::new().exact(FieldKey::Type, embedding_type)
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }

    pub fn validate(&self) -> Result<(), VectorStoreError> {
        self.must.iter().try_for_each(Condition::validate)
    }

    pub fn matches(&self, payload: &Payload) -> bool {
        self.must.iter().all(|c| c.matches(payload))
    }

    /// Qdrant filter JSON. Existence becomes `must_not: is_empty`, plus a
    /// `must_not` on `""` for keyword fields so both backends agree.
    pub fn to_qdrant(&self) -> Value {
        let mut must = Vec::new();
        let mut must_not = Vec::new();
        for condition in &self.must {
            match condition {
                Condition::Exact { field, value } => {
                    must.push(json!({ "key": field.path(), "match": { "value": value.to_json() } }));
                }
                Condition::Range { field, gte, lte } => {
                    let mut range = serde_json::Map::new();
                    if let Some(lo) = gte {
                        range.insert("gte".to_string(), lo.to_json());
                    }
                    if let Some(hi) = lte {
                        range.insert("lte".to_string(), hi.to_json());
                    }
                    must.push(json!({ "key": field.path(), "range": range }));
                }
                Condition::Exists { field } => {
                    must_not.push(json!({ "is_empty": { "key": field.path() } }));
                    if field.kind() == FieldKind::Keyword {
                        must_not.push(json!({ "key": field.path(), "match": { "value": "" } }));
                    }
                }
            }
        }
        let mut filter = serde_json::Map::new();
        if !must.is_empty() {
            filter.insert("must".to_string(), Value::Array(must));
        }
        if !must_not.is_empty() {
            filter.insert("must_not".to_string(), Value::Array(must_not));
        }
        Value::Object(filter)
    }
}
