//! Configuration module for the code-intelligence engine.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `CS_` and use double underscores
//! to separate nested levels:
//! - `CS_EMBEDDING__DIMENSION=1024` sets `embedding.dimension`
//! - `CS_VECTOR_STORE__URL=http://qdrant:6333` sets `vector_store.url`
//! - `CS_GRAPH__CRITICAL_PATH_LIMIT=50` sets `graph.critical_path_limit`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-workspace configuration directory.
pub const CONFIG_DIR: &str = ".codesight";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Analysis project name; scopes the vector collection
    #[serde(default = "default_project")]
    pub project: String,

    /// Workspace root directory (where .codesight is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Global debug mode
    #[serde(default = "default_false")]
    pub debug: bool,

    /// Log filter used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dependency graph settings
    #[serde(default)]
    pub graph: GraphConfig,

    /// Embedding pipeline settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Vector store settings
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GraphConfig {
    /// Directories under which a file without dependents is an entry point
    #[serde(default = "default_application_roots")]
    pub application_roots: Vec<String>,

    /// File-name conventions of entry points (`*` wildcard)
    #[serde(default = "default_entry_patterns")]
    pub entry_patterns: Vec<String>,

    /// Number of ranked critical paths kept
    #[serde(default = "default_critical_path_limit")]
    pub critical_path_limit: usize,

    /// Nodes above this risk terminate critical paths
    #[serde(default = "default_critical_risk_threshold")]
    pub critical_risk_threshold: f32,

    /// Node expansions allowed during path enumeration
    #[serde(default = "default_max_path_expansions")]
    pub max_path_expansions: usize,
}

/// Which inference model backs the embedder.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Memory-mapped lookup-table artifact at `model_path`
    Lookup,
    /// fastembed text model, ids detokenised through the vocabulary
    Fastembed,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_backend")]
    pub backend: EmbeddingBackend,

    /// Model artifact path for the lookup backend
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Vector length produced by the model
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Token ids per inference call, after padding/truncation
    #[serde(default = "default_max_sequence_length")]
    pub max_sequence_length: usize,

    /// Functions above this complexity get their own embedding
    #[serde(default = "default_function_complexity_threshold")]
    pub function_complexity_threshold: u32,

    /// Records embedded concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Download cache for the fastembed backend
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

/// Which vector database backs the store.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackendKind {
    /// In-process collection with on-disk snapshots under `data_dir`
    Local,
    /// Qdrant over HTTP at `url`
    Qdrant,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VectorStoreConfig {
    #[serde(default = "default_vector_backend")]
    pub backend: VectorBackendKind,

    /// Base URL of the vector database
    #[serde(default = "default_url")]
    pub url: String,

    /// Optional API key sent as `api-key`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Collection names are `<prefix>_<project>`
    #[serde(default = "default_collection_prefix")]
    pub collection_prefix: String,

    /// Snapshot directory of the local backend
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Points per upsert round-trip
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Upsert batches in flight at once
    #[serde(default = "default_store_concurrency")]
    pub store_concurrency: usize,

    /// Result count when a query sets no limit
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// HTTP request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_project() -> String {
    "default".to_string()
}
fn default_false() -> bool {
    false
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_application_roots() -> Vec<String> {
    ["apps", "app", "src", "packages", "services"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_entry_patterns() -> Vec<String> {
    [
        "main.*",
        "index.*",
        "server.*",
        "*.controller.*",
        "*.routes.*",
        "*.handler.*",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_critical_path_limit() -> usize {
    20
}
fn default_critical_risk_threshold() -> f32 {
    7.0
}
fn default_max_path_expansions() -> usize {
    1_000_000
}
fn default_embedding_backend() -> EmbeddingBackend {
    EmbeddingBackend::Lookup
}
fn default_model_path() -> PathBuf {
    PathBuf::from(".codesight/models/embedding.cemb")
}
fn default_dimension() -> usize {
    4096
}
fn default_max_sequence_length() -> usize {
    512
}
fn default_function_complexity_threshold() -> u32 {
    10
}
fn default_concurrency() -> usize {
    num_cpus::get()
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from(".codesight/models")
}
fn default_vector_backend() -> VectorBackendKind {
    VectorBackendKind::Local
}
fn default_url() -> String {
    "http://localhost:6333".to_string()
}
fn default_collection_prefix() -> String {
    "codesight".to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from(".codesight/vectors")
}
fn default_batch_size() -> usize {
    100
}
fn default_store_concurrency() -> usize {
    4
}
fn default_limit() -> usize {
    10
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            project: default_project(),
            workspace_root: None,
            debug: false,
            log_level: default_log_level(),
            graph: GraphConfig::default(),
            embedding: EmbeddingConfig::default(),
            vector_store: VectorStoreConfig::default(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            application_roots: default_application_roots(),
            entry_patterns: default_entry_patterns(),
            critical_path_limit: default_critical_path_limit(),
            critical_risk_threshold: default_critical_risk_threshold(),
            max_path_expansions: default_max_path_expansions(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: default_embedding_backend(),
            model_path: default_model_path(),
            dimension: default_dimension(),
            max_sequence_length: default_max_sequence_length(),
            function_complexity_threshold: default_function_complexity_threshold(),
            concurrency: default_concurrency(),
            cache_dir: default_cache_dir(),
        }
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_vector_backend(),
            url: default_url(),
            api_key: None,
            collection_prefix: default_collection_prefix(),
            data_dir: default_data_dir(),
            batch_size: default_batch_size(),
            store_concurrency: default_store_concurrency(),
            default_limit: default_limit(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                // If workspace_root is not set in config, detect it
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Double underscore separates nested levels, single underscore
            // stays part of the field name
            .merge(Env::prefixed("CS_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Find the workspace config by looking for .codesight from the current directory up
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join("settings.toml"))
    }

    /// Get the workspace root directory (where .codesight is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Name of the vector collection for this project.
    pub fn collection_name(&self) -> String {
        format!("{}_{}", self.vector_store.collection_prefix, self.project)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join("settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = format!(
            r#"# codesight configuration

version = 1

# Analysis project; the vector collection is "<collection_prefix>_<project>"
project = "default"

debug = false
log_level = "warn"

[graph]
application_roots = ["apps", "app", "src", "packages", "services"]
entry_patterns = ["main.*", "index.*", "server.*", "*.controller.*", "*.routes.*", "*.handler.*"]
critical_path_limit = 20
critical_risk_threshold = 7.0
# Node expansions before critical-path search stops (sets "truncated")
max_path_expansions = 1000000

[embedding]
# "lookup" (model artifact at model_path) or "fastembed"
backend = "lookup"
model_path = ".codesight/models/embedding.cemb"
dimension = 4096
max_sequence_length = 512
function_complexity_threshold = 10
# concurrency = {}

[vector_store]
# "local" (snapshots under data_dir) or "qdrant"
backend = "local"
url = "http://localhost:6333"
collection_prefix = "codesight"
data_dir = ".codesight/vectors"
batch_size = 100
store_concurrency = 4
default_limit = 10
timeout_secs = 30
"#,
            num_cpus::get()
        );

        std::fs::write(&config_path, template)?;

        Ok(config_path)
    }
}
