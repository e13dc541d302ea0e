//! # Club knowledge-base CLI (`clubkb`)
//!
//! ## Usage
//!
//! ```bash
//! clubkb --config ./config/clubkb.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `clubkb init` | Create the SQLite database and run schema migrations |
//! | `clubkb load` | Ingest the full source tree |
//! | `clubkb refresh` | Re-ingest changed documents only |
//! | `clubkb query "<text>"` | Answer a query from the command line |
//! | `clubkb serve` | Start the HTTP API server |

use std::sync::Arc;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use clubkb::answer::AnswerService;
use clubkb::config::{self, Config};
use clubkb::db;
use clubkb::embedding::Embedder;
use clubkb::ingest::Ingestor;
use clubkb::migrate;
use clubkb::models::RagQuery;
use clubkb::search::SearchEngine;
use clubkb::server;
use clubkb::store::{KnowledgeStore, SqliteStore};
use clubkb::webhook::WebhookClient;

/// Club knowledge-base service — markdown ingestion, similarity retrieval,
/// and FAQ answering for the video-creation club.
#[derive(Parser)]
#[command(
    name = "clubkb",
    about = "Club knowledge-base service — markdown ingestion and similarity retrieval",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/clubkb.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Ingest the full source tree, skipping files the store already
    /// holds unchanged.
    Load,

    /// Re-ingest changed documents and drop vanished ones.
    Refresh,

    /// Answer a query from the command line.
    Query {
        /// The question text.
        query: String,

        /// Maximum number of chunks to retrieve.
        #[arg(long, default_value_t = 5)]
        top_k: i64,

        /// Restrict retrieval to one category.
        #[arg(long)]
        category: Option<String>,
    },

    /// Start the HTTP API server.
    Serve,
}

/// Long-lived pipeline components shared by every command that touches
/// the knowledge base.
struct Pipeline {
    store: Arc<dyn KnowledgeStore>,
    ingestor: Arc<Ingestor>,
    answers: Arc<AnswerService>,
    webhook: Arc<WebhookClient>,
}

async fn build_pipeline(cfg: &Config) -> anyhow::Result<Pipeline> {
    let pool = db::connect(&cfg.db.path).await?;
    migrate::run_migrations(&pool).await?;

    let store: Arc<dyn KnowledgeStore> = Arc::new(SqliteStore::new(pool));
    let embedder = Arc::new(Embedder::new(&cfg.embedding)?);
    let ingestor = Arc::new(Ingestor::new(
        store.clone(),
        embedder.clone(),
        cfg.source.clone(),
        cfg.chunking.clone(),
    ));
    let search = Arc::new(SearchEngine::new(store.clone(), embedder));
    let answers = Arc::new(AnswerService::new(search));
    let webhook = Arc::new(WebhookClient::new(&cfg.webhook)?);

    Ok(Pipeline {
        store,
        ingestor,
        answers,
        webhook,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            println!("Database initialized successfully.");
        }
        Commands::Load => {
            let pipeline = build_pipeline(&cfg).await?;
            let summary = pipeline.ingestor.load_all().await?;
            println!(
                "Loaded {} documents ({} already current).",
                summary.processed, summary.skipped
            );
        }
        Commands::Refresh => {
            let pipeline = build_pipeline(&cfg).await?;
            let summary = pipeline.ingestor.refresh().await?;
            println!(
                "Refreshed: {} updated, {} unchanged, {} removed.",
                summary.processed, summary.skipped, summary.removed
            );
        }
        Commands::Query {
            query,
            top_k,
            category,
        } => {
            let pipeline = build_pipeline(&cfg).await?;
            let response = pipeline
                .answers
                .answer(&RagQuery {
                    query,
                    top_k,
                    category,
                })
                .await?;

            for hit in &response.relevant_chunks {
                println!(
                    "[{:.4}] {} ({})",
                    hit.similarity, hit.title, hit.category
                );
            }
            println!("\n{}", response.enhanced_query);
        }
        Commands::Serve => {
            let pipeline = build_pipeline(&cfg).await?;
            server::run_server(
                &cfg.server.bind,
                pipeline.store,
                pipeline.ingestor,
                pipeline.answers,
                pipeline.webhook,
            )
            .await?;
        }
    }

    Ok(())
}
