//! CLI entry point for codesight.
//!
//! Wires the graph builder, the embedder and the vector store together.
//! Records come from an external scanner as a JSON array of code records.

use anyhow::Context;
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use codesight::display::{
    THEME, Tone, clusters_table, create_progress_bar, critical_paths_table, graph_summary_table,
    search_results_table, with_spinner,
};
use codesight::embedding::{load_model, write_artifact};
use codesight::graph::{GraphStats, load_records};
use codesight::vector::{FieldKey, Filter, SearchQuery, VectorStore};
use codesight::{
    AnalysisError, AnalysisResult, CodeRecord, DependencyGraph, EmbeddingType, GraphBuilder,
    SemanticEmbedder, Settings, Vocabulary,
};

/// Records embedded between progress updates.
const EMBED_CHUNK: usize = 64;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Dependency-graph risk analysis and semantic code search
#[derive(Parser)]
#[command(
    name = "codesight",
    version = env!("CARGO_PKG_VERSION"),
    about = "Dependency-graph risk analysis and semantic code search",
    next_line_help = true,
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up .codesight directory with default configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    Config,

    /// Manage the embedding model artifact
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },

    /// Build the dependency graph and report cycles, entry points and critical paths
    Graph {
        /// JSON array of code records
        records: PathBuf,

        /// Critical paths to print
        #[arg(long, default_value_t = 10)]
        paths: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the graph, embed every record and store the embeddings
    Index {
        /// JSON array of code records
        records: PathBuf,

        /// Embedding threads (overrides config)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Embed without graph-derived risk
        #[arg(long)]
        no_graph: bool,
    },

    /// Query stored embeddings
    #[command(
        after_help = "Examples:\n  codesight search --text \"jwt token verify\" --type SECURITY_PATTERN\n  codesight search --file 3f2a... --limit 50\n  codesight search --trust-boundary --min-security 7\n  codesight search --min-complexity 15"
    )]
    Search {
        /// Free text embedded as the query vector
        #[arg(long)]
        text: Option<String>,

        /// Only embeddings of this file id
        #[arg(long = "file")]
        file_id: Option<String>,

        /// Only embeddings of this type
        #[arg(long = "type")]
        embedding_type: Option<EmbeddingType>,

        #[arg(long)]
        min_security: Option<u8>,

        #[arg(long)]
        min_business: Option<u8>,

        /// Function-level embeddings at or above this complexity
        #[arg(long)]
        min_complexity: Option<u32>,

        /// Only trust-boundary embeddings
        #[arg(long)]
        trust_boundary: bool,

        #[arg(short, long)]
        limit: Option<usize>,

        /// Minimum cosine score (vector queries only)
        #[arg(long)]
        threshold: Option<f32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Group one embedding type into k risk clusters
    Clusters {
        #[arg(long = "type", default_value = "SECURITY_PATTERN")]
        embedding_type: EmbeddingType,

        #[arg(short, default_value_t = 5)]
        k: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Write a seeded lookup-table model sized for the built-in vocabulary
    Generate {
        /// Output path (defaults to embedding.model_path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Overwrite an existing artifact
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Serialize)]
struct GraphReport<'a> {
    stats: &'a GraphStats,
    entry_points: Vec<&'a str>,
    cycles: Vec<Vec<&'a str>>,
    critical_paths: Vec<PathReport<'a>>,
}

#[derive(Serialize)]
struct PathReport<'a> {
    risk: f32,
    files: Vec<&'a str>,
}

impl<'a> GraphReport<'a> {
    fn new(graph: &'a DependencyGraph) -> Self {
        let path_of = move |id: &'a codesight::RecordId| {
            graph
                .node(id.as_str())
                .map_or(id.as_str(), |n| n.path.as_str())
        };
        Self {
            stats: graph.stats(),
            entry_points: graph.entry_points().iter().map(path_of).collect(),
            cycles: graph
                .cycles()
                .iter()
                .map(|cycle| cycle.iter().map(path_of).collect())
                .collect(),
            critical_paths: graph
                .critical_paths()
                .iter()
                .map(|p| PathReport {
                    risk: p.risk,
                    files: p.nodes.iter().map(path_of).collect(),
                })
                .collect(),
        }
    }
}

fn init_tracing(settings: &Settings) {
    let filter = if settings.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_settings(path: Option<&Path>) -> Settings {
    match path {
        Some(config_path) => Settings::load_from(config_path).unwrap_or_else(|e| {
            eprintln!(
                "Configuration error loading from {}: {}",
                config_path.display(),
                e
            );
            std::process::exit(1);
        }),
        None => Settings::load().unwrap_or_else(|e| {
            eprintln!("Configuration error: {e}");
            Settings::default()
        }),
    }
}

fn load_embedder(settings: &Settings) -> AnalysisResult<SemanticEmbedder> {
    let vocabulary = Arc::new(Vocabulary::builtin());
    let model = load_model(&settings.embedding, Arc::clone(&vocabulary))?;
    Ok(SemanticEmbedder::new(model, vocabulary, &settings.embedding)?)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Entry point with tokio async runtime.
///
/// Failures print the error, its status code and recovery hints, then exit 1.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref());
    init_tracing(&settings);

    if let Err(err) = run(cli.command, settings).await {
        eprintln!("{}", THEME.status(Tone::Failed, &format!("{err:#}")));
        if let Some(analysis) = err.downcast_ref::<AnalysisError>() {
            eprintln!("  code: {}", analysis.status_code());
            for suggestion in analysis.recovery_suggestions() {
                eprintln!("  - {suggestion}");
            }
        }
        std::process::exit(1);
    }
}

async fn run(command: Commands, mut settings: Settings) -> anyhow::Result<()> {
    match command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(force).map_err(|e| anyhow::anyhow!("{e}"))?;
            println!(
                "{}",
                THEME.status(Tone::Done, &format!("Created configuration file at: {}", path.display()))
            );
            println!("Edit this file to customize your settings.");
        }

        Commands::Config => {
            println!("Current Configuration:");
            println!("{}", "=".repeat(50));
            println!("{}", toml::to_string_pretty(&settings)?);
        }

        Commands::Model {
            action: ModelAction::Generate { output, seed, force },
        } => {
            let path = output.unwrap_or_else(|| settings.embedding.model_path.clone());
            if path.exists() && !force {
                anyhow::bail!(
                    "Model artifact already exists at {}. Use --force to overwrite",
                    path.display()
                );
            }
            let rows = Vocabulary::builtin().len();
            write_artifact(&path, rows, settings.embedding.dimension, seed)
                .map_err(AnalysisError::from)?;
            println!(
                "{}",
                THEME.status(Tone::Done, &format!(
                    "Wrote {rows} x {} lookup table to {}",
                    settings.embedding.dimension,
                    path.display()
                ))
            );
        }

        Commands::Graph {
            records,
            paths,
            json,
        } => {
            let records = load_records(&records).map_err(AnalysisError::from)?;
            let graph = GraphBuilder::new(settings.graph.clone())
                .build(&records)
                .map_err(AnalysisError::from)?;
            if json {
                print_json(&GraphReport::new(&graph))?;
            } else {
                println!("{}", graph_summary_table(&graph));
                if !graph.critical_paths().is_empty() {
                    println!("{}", THEME.heading("Critical paths"));
                    println!("{}", critical_paths_table(&graph, paths));
                }
                let hot = graph.high_risk_nodes(settings.graph.critical_risk_threshold);
                if !hot.is_empty() {
                    println!("{}", THEME.heading("High-risk files"));
                    for node in hot.iter().take(paths) {
                        let boundary = if node.trust_boundary { " (trust boundary)" } else { "" };
                        println!(
                            "  {} {}{}",
                            THEME.risk(node.security_risk),
                            node.path,
                            THEME.muted(boundary)
                        );
                    }
                }
            }
        }

        Commands::Index {
            records,
            threads,
            no_graph,
        } => {
            if let Some(threads) = threads {
                settings.embedding.concurrency = threads;
            }
            index(&records, &settings, no_graph).await?;
        }

        Commands::Search {
            text,
            file_id,
            embedding_type,
            min_security,
            min_business,
            min_complexity,
            trust_boundary,
            limit,
            threshold,
            json,
        } => {
            let mut filter = Filter::new();
            if let Some(file_id) = &file_id {
                filter = filter.exact(FieldKey::FileId, file_id.as_str());
            }
            if let Some(embedding_type) = embedding_type {
                filter = filter.exact(FieldKey::Type, embedding_type);
            }
            if let Some(min) = min_security {
                filter = filter.at_least(FieldKey::SecurityRelevance, i64::from(min));
            }
            if let Some(min) = min_business {
                filter = filter.at_least(FieldKey::BusinessCriticality, i64::from(min));
            }
            if let Some(min) = min_complexity {
                filter = filter
                    .exists(FieldKey::FunctionName)
                    .at_least(FieldKey::Complexity, i64::from(min));
            }
            if trust_boundary {
                filter = filter.exact(FieldKey::TrustBoundary, true);
            }

            let mut query = SearchQuery::new().filter(filter);
            if let Some(text) = text {
                let embedder = load_embedder(&settings)?;
                let vector = embedder.embed_text(&text).map_err(AnalysisError::from)?;
                query = query.vector(vector);
            }
            if let Some(limit) = limit {
                query = query.limit(limit);
            }
            if let Some(threshold) = threshold {
                query = query.threshold(threshold);
            }

            let store = VectorStore::from_settings(&settings).map_err(AnalysisError::from)?;
            let results = store.search(query).await.map_err(AnalysisError::from)?;
            if json {
                print_json(&results)?;
            } else if results.is_empty() {
                println!("{}", THEME.status(Tone::Caution, "No matching embeddings"));
            } else {
                println!("{}", search_results_table(&results));
            }
        }

        Commands::Clusters {
            embedding_type,
            k,
            json,
        } => {
            let store = VectorStore::from_settings(&settings).map_err(AnalysisError::from)?;
            let clusters = store
                .cluster_by_type(embedding_type, k)
                .await
                .map_err(AnalysisError::from)?;
            if json {
                print_json(&clusters)?;
            } else if clusters.is_empty() {
                println!(
                    "{}",
                    THEME.status(Tone::Caution, &format!(
                        "Fewer than {k} {embedding_type} embeddings stored, nothing to cluster"
                    ))
                );
            } else {
                println!("{}", clusters_table(&clusters, 5));
            }
        }
    }
    Ok(())
}

async fn index(records_path: &Path, settings: &Settings, no_graph: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    let records: Vec<CodeRecord> = load_records(records_path)
        .map_err(AnalysisError::from)
        .with_context(|| format!("loading {}", records_path.display()))?;
    info!(records = records.len(), "loaded code records");

    let graph = if no_graph {
        None
    } else {
        let graph = with_spinner("Building dependency graph", || {
            GraphBuilder::new(settings.graph.clone()).build(&records)
        })
        .map_err(AnalysisError::from)?;
        Some(graph)
    };

    let embedder = with_spinner("Loading embedding model", || load_embedder(settings))?;
    let store = VectorStore::from_settings(settings).map_err(AnalysisError::from)?;
    store.initialize().await.map_err(AnalysisError::from)?;

    let pb = create_progress_bar(records.len() as u64, "embedding");
    let mut stored = 0;
    for chunk in records.chunks(EMBED_CHUNK) {
        let embeddings = embedder
            .embed_batch(chunk, graph.as_ref())
            .map_err(AnalysisError::from)?;
        store
            .delete_by_paths(chunk.iter().map(|r| r.path.as_str()))
            .await
            .map_err(AnalysisError::from)?;
        let flat: Vec<_> = embeddings.into_iter().flatten().collect();
        stored += store.store(&flat).await.map_err(AnalysisError::from)?;
        pb.inc(chunk.len() as u64);
        debug!(chunk = chunk.len(), stored, "indexed chunk");
    }
    pb.finish_and_clear();

    println!(
        "{}",
        THEME.status(Tone::Done, &format!(
            "Indexed {} records into {} embeddings in '{}' ({:.1?})",
            records.len(),
            stored,
            store.collection(),
            start.elapsed()
        ))
    );
    if let Some(graph) = &graph {
        println!("{}", graph_summary_table(graph));
    }
    Ok(())
}
