//! # Short News
//!
//! A regional-language news pipeline: scrape listing pages, deep-fetch the
//! articles, drop near-duplicate headlines, rewrite each article as a
//! five-word headline plus a short summary with an LLM, and keep a capped,
//! per-category collection of the newest documents in a remote store.
//!
//! ## Usage
//!
//! ```sh
//! OPENAI_API_KEY=... short_news --config config/tamil.yaml --store firestore
//! ```
//!
//! ## Architecture
//!
//! The run is a straight pipeline, each stage leaving a snapshot on disk:
//! 1. **Ingestion**: listings → fresh stubs → deep content → dedup
//! 2. **Grouping**: articles keyed by category
//! 3. **Summarization**: cached, retried model calls, 3 at a time
//! 4. **Sync**: new documents uploaded, each category trimmed to 50
//!
//! Running out of model quota stops the run with exit status 1; every other
//! failure is contained to the article, listing or document it concerns.

use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cache;
mod cli;
mod config;
mod dedup;
mod error;
mod fetch;
mod ingest;
mod models;
mod outputs;
mod render;
mod scrapers;
mod store;
mod summarize;
mod sync;
mod text;
mod utils;

use api::{OpenAiClient, RetryGenerate, RetryPolicy};
use cache::{SummaryCache, UrlCache};
use cli::{Cli, StoreKind};
use config::LanguageConfig;
use error::{ModelError, PipelineError, Result};
use fetch::Fetcher;
use models::group_by_category;
use outputs::json::SnapshotWriter;
use scrapers::Adapters;
use store::{FileStore, FirestoreStore, MemoryStore};
use summarize::Summarizer;
use sync::{MAX_DOCS_PER_CATEGORY, SyncReport, sync_all};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "short_news starting up");

    let args = Cli::parse();

    match run(&args).await {
        Ok(()) => {
            info!(
                elapsed_secs = start_time.elapsed().as_secs(),
                "Pipeline completed"
            );
            Ok(())
        }
        Err(PipelineError::Model(e @ ModelError::QuotaExhausted(_))) => {
            error!(
                error = %e,
                "Model quota exhausted; check billing and usage limits for the API key before rerunning"
            );
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, elapsed_secs = start_time.elapsed().as_secs(), "Pipeline failed");
            Err(e.into())
        }
    }
}

#[instrument(level = "info", skip_all, fields(config = %args.config))]
async fn run(args: &Cli) -> Result<()> {
    // Everything that can be rejected is checked before any network I/O.
    let config = LanguageConfig::load(&args.config).await?;
    let api_key = args
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| PipelineError::Config("an API key is required (--api-key or OPENAI_API_KEY)".into()))?;
    if !args.skip_sync && args.store == StoreKind::Firestore && args.firestore_project.is_none() {
        return Err(PipelineError::Config(
            "--firestore-project (or FIRESTORE_PROJECT) is required for the firestore store".into(),
        ));
    }

    for dir in [&args.output_dir, &args.cache_dir, &args.log_dir] {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "Directory is not writable (fix perms or choose a different path)");
            return Err(e);
        }
    }

    let ns = &config.namespace;
    let cache_dir = Path::new(&args.cache_dir);
    let snapshots = SnapshotWriter::new(&args.output_dir, &args.log_dir, ns.as_str());

    // ---- Ingestion ----
    let fetcher = Fetcher::new(fetch::DEFAULT_TIMEOUT)?;
    let adapters = Adapters::default();
    let mut url_cache = UrlCache::load(cache_dir.join(format!("{ns}-urls.json"))).await;
    let outcome = ingest::ingest(&config, &fetcher, &adapters, &mut url_cache).await?;

    snapshots.write_run_log(&outcome.logs).await?;
    snapshots.write_raw(&outcome.articles).await?;
    info!(count = outcome.articles.len(), path = %snapshots.raw_path().display(), "Saved flat article list");

    // ---- Grouping ----
    let grouped = group_by_category(outcome.articles);
    snapshots.write_grouped(&grouped).await?;
    info!(categories = grouped.len(), "Grouped articles by category");

    // ---- Summarization ----
    let client = OpenAiClient::new(api_key, &args.api_base_url, &config.summarizer.model)?;
    let generator = RetryGenerate::new(client, RetryPolicy::from_config(&config.summarizer));
    let summarizer = Summarizer::new(generator, &config)?;
    let mut summary_cache = SummaryCache::load(cache_dir.join(format!("{ns}-summaries.json"))).await;
    let summarized = summarizer.summarize_grouped(grouped, &mut summary_cache).await?;
    snapshots.write_summarized(&summarized).await?;
    info!(
        articles = summarized.values().map(Vec::len).sum::<usize>(),
        path = %snapshots.summarized_path().display(),
        "Saved summaries"
    );

    // ---- Sync ----
    if args.skip_sync {
        warn!("Skipping store sync as requested");
        return Ok(());
    }
    let categories: Vec<String> = config.categories.iter().map(|c| c.name.clone()).collect();
    let report: SyncReport = match args.store {
        StoreKind::File => {
            let store = FileStore::new(&args.store_dir);
            sync_all(&store, ns, &categories, &summarized, MAX_DOCS_PER_CATEGORY).await
        }
        StoreKind::Memory => {
            let store = MemoryStore::new();
            sync_all(&store, ns, &categories, &summarized, MAX_DOCS_PER_CATEGORY).await
        }
        StoreKind::Firestore => {
            let project = args.firestore_project.as_deref().unwrap_or_default();
            let store = FirestoreStore::new(
                project,
                args.firestore_token.clone(),
                args.firestore_base_url.as_deref(),
            )?;
            sync_all(&store, ns, &categories, &summarized, MAX_DOCS_PER_CATEGORY).await
        }
    };
    info!(
        categories = summarized.len(),
        uploaded = report.uploaded,
        deleted = report.deleted,
        "Store sync finished"
    );
    Ok(())
}
