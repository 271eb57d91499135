//! Input records produced by the scanner/parser stage.
//!
//! Records are read-only to the engine. Their identity is the SHA-256 of
//! the file content, so two files with identical content share one id.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Content-hash identity of a [`CodeRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Derive the id from file content.
    pub fn from_content(content: &str) -> Self {
        Self(calculate_hash(content))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RecordId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Calculate SHA256 hash of content
pub fn calculate_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Severity scale shared by functions and security pattern findings.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Weight used when summing findings into a 0-10 score.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Low => 0.5,
            Self::Medium => 1.0,
            Self::High => 2.0,
            Self::Critical => 3.0,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!(
                "unknown risk level '{other}', expected low|medium|high|critical"
            )),
        }
    }
}

/// A function extracted from a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionFact {
    pub name: String,
    /// 1-based, inclusive
    pub start_line: u32,
    /// 1-based, inclusive
    pub end_line: u32,
    #[serde(default = "default_complexity")]
    pub complexity: u32,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub trust_boundary: bool,
}

fn default_complexity() -> u32 {
    1
}

/// A security pattern match reported by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityPatternFact {
    /// Pattern family, e.g. `sql_injection` or `hardcoded_secret`.
    pub pattern_type: String,
    pub severity: RiskLevel,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub line: Option<u32>,
}

/// One parsed source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeRecord {
    pub id: RecordId,
    pub path: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub exports: Vec<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub functions: Vec<FunctionFact>,
    #[serde(default)]
    pub security_patterns: Vec<SecurityPatternFact>,
}

impl CodeRecord {
    /// Create a record whose id is derived from its content.
    pub fn new(
        path: impl Into<String>,
        language: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            id: RecordId::from_content(&content),
            path: path.into(),
            language: language.into(),
            size: content.len(),
            content,
            imports: Vec::new(),
            exports: Vec::new(),
            classes: Vec::new(),
            functions: Vec::new(),
            security_patterns: Vec::new(),
        }
    }

    pub fn with_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imports = imports.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_exports<I, S>(mut self, exports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exports = exports.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_function(mut self, function: FunctionFact) -> Self {
        self.functions.push(function);
        self
    }

    pub fn with_pattern(mut self, pattern: SecurityPatternFact) -> Self {
        self.security_patterns.push(pattern);
        self
    }

    /// File name component of the path.
    pub fn file_name(&self) -> &str {
        self.path.rsplit(['/', '\\']).next().unwrap_or(&self.path)
    }

    /// Highest function complexity, or 1 when no functions were extracted.
    pub fn max_complexity(&self) -> u32 {
        self.functions
            .iter()
            .map(|f| f.complexity)
            .max()
            .unwrap_or(1)
    }

    /// Lines `start..=end` (1-based) of the content. Out-of-range bounds are clamped.
    pub fn line_slice(&self, start: u32, end: u32) -> String {
        if start == 0 || end < start {
            return String::new();
        }
        self.content
            .lines()
            .skip(start as usize - 1)
            .take((end - start + 1) as usize)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
