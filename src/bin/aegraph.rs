//! # aegraph CLI
//!
//! Thin wrapper: ingest an exported project into an in-memory graph, then
//! print the ingestion report or the result of one walk as JSON.
//!
//! ```bash
//! aegraph ingest project.json --threshold 0.8
//! aegraph query project.json time 2.5 --comp comp_main
//! RUST_LOG=aegraph=debug aegraph --json-logs query project.json summary
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use aegraph::{GraphConfig, HashingEmbedder, MemoryBackend, NodeType, ProjectDocument, ProjectGraph};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type CliResult<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "aegraph")]
#[command(version, about = "After Effects project graph", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override `ingestion.similarity_threshold`
    #[arg(long, global = true)]
    threshold: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a document and print the report
    Ingest { document: PathBuf },

    /// Ingest a document, then run one walk
    Query {
        document: PathBuf,
        #[command(subcommand)]
        walk: Walk,
    },
}

#[derive(Subcommand, Debug)]
enum Walk {
    Hierarchy {
        comp: String,
        /// Defaults to `traversal.default_depth`
        #[arg(short, long)]
        depth: Option<usize>,
    },
    Dependencies {
        node: String,
        #[arg(long, default_value = "both")]
        direction: String,
        #[arg(long, default_value_t = 3)]
        max_depth: usize,
    },
    Effects {
        layer: String,
        #[arg(long)]
        no_properties: bool,
    },
    Expression { property: String },
    Time {
        t: f64,
        #[arg(long)]
        comp: Option<String>,
    },
    Similar {
        layer: String,
        #[arg(long, default_value_t = 0.7)]
        threshold: f64,
    },
    Related {
        term: String,
        /// Restrict to these storage labels (e.g. TextLayer)
        #[arg(long = "type")]
        types: Vec<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    Unused,
    RenderPath { layer: String },
    Patterns {
        #[arg(default_value = "any")]
        pattern: String,
        #[arg(long, requires = "to")]
        from: Option<f64>,
        #[arg(long, requires = "from")]
        to: Option<f64>,
    },
    Summary,
    Schema,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "aegraph=info".into());
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    if let Err(e) = run(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let mut config = match &cli.config {
        Some(path) => GraphConfig::from_path(path)?,
        None => GraphConfig::default(),
    };
    if let Some(threshold) = cli.threshold {
        config.ingestion.similarity_threshold = threshold;
        config.validate()?;
    }

    let embedder = Arc::new(HashingEmbedder::new(config.embedding.dimension));
    let graph = ProjectGraph::with_backend(MemoryBackend::new())
        .with_config(config)
        .with_embedder(embedder);

    match cli.command {
        Command::Ingest { document } => {
            let report = graph.ingest(&ProjectDocument::from_path(document)?).await?;
            print_json(&report)
        }
        Command::Query { document, walk } => {
            graph.ingest(&ProjectDocument::from_path(document)?).await?;
            query(&graph, walk).await
        }
    }
}

async fn query(graph: &ProjectGraph<MemoryBackend>, walk: Walk) -> CliResult<()> {
    let walker = graph.walker();
    match walk {
        Walk::Hierarchy { comp, depth } => {
            let depth = depth.unwrap_or(walker.config().default_depth);
            print_json(&walker.walk_composition_hierarchy(&comp, depth).await?)
        }
        Walk::Dependencies { node, direction, max_depth } => {
            print_json(&walker.walk_dependencies(&node, &direction, max_depth).await?)
        }
        Walk::Effects { layer, no_properties } => {
            print_json(&walker.walk_effects_chain(&layer, !no_properties).await?)
        }
        Walk::Expression { property } => print_json(&walker.walk_expression_dependencies(&property).await?),
        Walk::Time { t, comp } => print_json(&walker.walk_time_relationships(t, comp.as_deref()).await?),
        Walk::Similar { layer, threshold } => print_json(&walker.find_similar_setups(&layer, threshold).await?),
        Walk::Related { term, types, limit } => {
            let types = types
                .iter()
                .map(|label| {
                    NodeType::from_label(label).ok_or_else(|| format!("unknown node type '{label}'"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let filter = (!types.is_empty()).then_some(types.as_slice());
            print_json(&walker.walk_related_by_name(&term, filter, limit).await?)
        }
        Walk::Unused => print_json(&walker.discover_unused_elements().await?),
        Walk::RenderPath { layer } => print_json(&walker.trace_render_path(&layer).await?),
        Walk::Patterns { pattern, from, to } => {
            let range = from.zip(to);
            print_json(&walker.find_animation_patterns(&pattern, range).await?)
        }
        Walk::Summary => print_json(&walker.graph_summary().await?),
        Walk::Schema => print_json(&walker.schema_description()),
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
