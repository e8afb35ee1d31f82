//! Pulse scheduler entry point
//!
//! Each subcommand is one scheduler tick: it runs to completion or until
//! the wall-clock deadline, then prints its summary as JSON.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pulse_core::{InstrumentRegistry, ScrapedItem};
use pulse_embedding::{EmbeddingAdapter, EmbeddingClient, SimilarityStore};
use pulse_research::{OpenAIClient, PexelsClient};
use pulse_services::{
    DetectionService, DocumentStore, GenerationService, PipelineConfig, RunContext, RunSummary,
    SqliteDocumentStore, StaticInstrumentRegistry,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "pulse", about = "Trend detection and article generation for market snippets")]
struct Cli {
    /// JSON pipeline config; `PULSE_*` variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Hard wall-clock ceiling for one tick
    #[arg(long, global = true, default_value_t = 300)]
    deadline_secs: u64,

    #[arg(long, global = true, env = "PULSE_DB_PATH", default_value = "data/pulse.db")]
    db_path: PathBuf,

    #[arg(long, global = true, env = "PULSE_VECTOR_DB_PATH", default_value = "data/pulse-vectors.db")]
    vector_db_path: PathBuf,

    #[arg(long, global = true, env = "PULSE_INSTRUMENTS_PATH")]
    instruments: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upsert scraped items from a JSON array
    Ingest {
        #[arg(long)]
        file: PathBuf,
    },
    /// Deduplicate, cluster and score pending items
    Detect,
    /// Generate articles for pending topics
    Generate,
    /// Detect, then generate
    Run,
    /// Print row counts
    Stats,
}

/// Everything a tick needs, built once per process
struct Pipeline {
    config: PipelineConfig,
    documents: Arc<SqliteDocumentStore>,
    vectors: Arc<SimilarityStore>,
}

impl Pipeline {
    fn open(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::from_env()?,
        };

        info!("Opening document store at: {}", cli.db_path.display());
        let documents = Arc::new(SqliteDocumentStore::new(&cli.db_path)?);

        info!("Opening vector store at: {}", cli.vector_db_path.display());
        let vectors = Arc::new(
            SimilarityStore::open(&cli.vector_db_path, config.embedding.dimension, true)
                .context("Failed to open vector store")?,
        );

        Ok(Self {
            config,
            documents,
            vectors,
        })
    }

    fn embeddings(&self) -> Result<EmbeddingAdapter> {
        let api_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?;
        let client = EmbeddingClient::new(api_key).with_model(
            pulse_embedding::client::DEFAULT_MODEL,
            self.config.embedding.dimension,
        );
        Ok(EmbeddingAdapter::new(Arc::new(client), self.config.embedding.clone())?)
    }

    fn registry(path: Option<&PathBuf>) -> Result<Arc<dyn InstrumentRegistry>> {
        match path {
            Some(path) => Ok(Arc::new(StaticInstrumentRegistry::from_json_file(path)?)),
            None => {
                info!("No instrument registry configured, instrument checks disabled");
                Ok(Arc::new(StaticInstrumentRegistry::empty()))
            }
        }
    }

    async fn detect(&self, ctx: &RunContext) -> Result<RunSummary> {
        let service = DetectionService::new(
            self.documents.clone(),
            self.vectors.clone(),
            self.embeddings()?,
            self.config.clone(),
        );
        Ok(service.run(ctx).await?)
    }

    async fn generate(&self, ctx: &RunContext, instruments: Option<&PathBuf>) -> Result<RunSummary> {
        let api_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?;
        let text = Arc::new(OpenAIClient::with_api_key(&api_key)?);

        let mut service = GenerationService::new(
            self.documents.clone(),
            self.vectors.clone(),
            self.embeddings()?,
            text,
            Self::registry(instruments)?,
            self.config.clone(),
        );

        match PexelsClient::new() {
            Ok(pexels) => service = service.with_images(Arc::new(pexels)),
            Err(_) => info!("PEXELS_API_KEY not set, articles will have no image"),
        }

        Ok(service.run(ctx).await?)
    }

    fn ingest(&self, file: &PathBuf) -> Result<usize> {
        let raw = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let mut items: Vec<ScrapedItem> =
            serde_json::from_str(&raw).context("Items file must be a JSON array of scraped items")?;

        for item in &mut items {
            if item.id.trim().is_empty() {
                item.id = ScrapedItem::id_for_url(&item.source_url);
            }
        }
        Ok(self.documents.upsert_items(&items)?)
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pulse_cli=debug,pulse_services=debug")),
        )
        .init();

    let cli = Cli::parse();
    let pipeline = Pipeline::open(&cli)?;
    let deadline = Duration::from_secs(cli.deadline_secs);
    let ctx = RunContext::new(pipeline.config.limits.detection_window_hours).with_deadline(deadline);

    match &cli.command {
        Command::Ingest { file } => {
            let count = pipeline.ingest(file)?;
            info!("Ingested {} items", count);
            print_json(&serde_json::json!({ "ingested": count }))?;
        }
        Command::Stats => {
            let documents = pipeline.documents.stats()?;
            let vectors = pipeline.vectors.persistent().get_stats()?;
            print_json(&serde_json::json!({
                "documents": documents,
                "vectors": {
                    "scraped_items": vectors.scraped_item_count,
                    "articles": vectors.article_count,
                    "topics": vectors.topic_count,
                },
            }))?;
        }
        Command::Detect | Command::Generate | Command::Run => {
            info!(run_id = %ctx.run_id, "Starting {:?} tick", cli.command);
            let tick = async {
                match &cli.command {
                    Command::Detect => pipeline.detect(&ctx).await,
                    Command::Generate => pipeline.generate(&ctx, cli.instruments.as_ref()).await,
                    _ => {
                        let mut summary = pipeline.detect(&ctx).await?;
                        let generated = pipeline.generate(&ctx, cli.instruments.as_ref()).await?;
                        summary.absorb(generated);
                        Ok(summary)
                    }
                }
            };

            let summary = match tokio::time::timeout(deadline, tick).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!("Tick exceeded its {}s deadline", cli.deadline_secs);
                    anyhow::bail!("tick exceeded its {}s deadline", cli.deadline_secs);
                }
            };
            print_json(&summary)?;
        }
    }

    Ok(())
}
