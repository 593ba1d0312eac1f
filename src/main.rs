use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use colorit_daily::config::AppConfig;
use colorit_daily::services::daily_push::{DailyPushJob, PagesDb};
use colorit_llm::{GeminiConfig, GeminiEmbeddingProvider, GeminiProvider};
use colorit_pipeline::{
    CreativeDirector, Critic, Generator, IdeationConfig, LocalArtifactStore, PotraceOptimizer,
    ProductionLoop, ProductionOutcome, Publisher, Stylist,
};
use colorit_store::SqliteConceptStore;

#[derive(Parser)]
#[command(name = "colorit-daily")]
#[command(about = "Daily children's coloring page production pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full production cycle: ideate, style, render, critique
    Run {
        /// Production date, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Migrate approved records into the relational pages database
    Push,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(Level::INFO.into()),
        )
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("loading configuration")?;

    match cli.command {
        Commands::Run { date } => {
            let date = match date {
                Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .with_context(|| format!("invalid --date value: {}", raw))?,
                None => Utc::now().date_naive(),
            };
            run_pipeline(&config, date).await
        }
        Commands::Push => run_push(&config),
    }
}

async fn run_pipeline(config: &AppConfig, date: NaiveDate) -> Result<()> {
    std::fs::create_dir_all(&config.data_dir).context("creating data directory")?;

    let provider = Arc::new(GeminiProvider::new(GeminiConfig {
        api_key: config.gemini_api_key.clone(),
        base_url: None,
        model: config.gemini_model.clone(),
        image_model: config.gemini_image_model.clone(),
        temperature: 0.7,
        max_output_tokens: 4096,
    }));
    let embeddings = Arc::new(GeminiEmbeddingProvider::new(
        config.gemini_api_key.clone(),
        config.embedding_model.clone(),
        config.embedding_dimension,
    ));
    let store = Arc::new(
        SqliteConceptStore::open(config.concept_db_path(), config.embedding_dimension)
            .context("opening concept store")?,
    );
    let artifacts = Arc::new(LocalArtifactStore::new(config.artifact_dir()));

    let ideation = Arc::new(CreativeDirector::new(
        provider.clone(),
        embeddings.clone(),
        store.clone(),
        IdeationConfig {
            history_limit: config.history_limit,
            neighbor_count: config.neighbor_count,
            similarity_threshold: config.similarity_threshold,
            max_brainstorm_attempts: config.max_brainstorm_attempts,
        },
    ));
    let production = ProductionLoop::new(
        Arc::new(Stylist::new()),
        Arc::new(Generator::new(
            provider.clone(),
            Arc::new(PotraceOptimizer::new()),
            artifacts.clone(),
        )),
        Arc::new(Critic::new(provider, embeddings, store, artifacts)),
    )
    .with_max_cycles(config.max_cycles);

    let publisher = Publisher::new(ideation, production);
    match publisher.run(date).await? {
        ProductionOutcome::Published(record) => {
            info!(id = %record.id, title = %record.title, "pipeline run complete");
            Ok(())
        }
        ProductionOutcome::Exhausted {
            cycles,
            last_feedback,
        } => anyhow::bail!(
            "no artifact passed critique after {} cycles (last feedback: {})",
            cycles,
            last_feedback
        ),
    }
}

fn run_push(config: &AppConfig) -> Result<()> {
    let store = SqliteConceptStore::open(config.concept_db_path(), config.embedding_dimension)
        .context("opening concept store")?;
    let mut pages = PagesDb::open(config.pages_db_path()).context("opening pages database")?;

    let job = DailyPushJob::new(
        config.gemini_image_model.clone(),
        config.gemini_model.clone(),
    );
    let report = job.run(&store, &mut pages).context("running daily push")?;
    info!(
        processed = report.processed,
        skipped = report.skipped,
        failed = report.failed,
        "daily push complete"
    );
    if report.failed > 0 {
        anyhow::bail!("{} record(s) failed to migrate", report.failed);
    }
    Ok(())
}
