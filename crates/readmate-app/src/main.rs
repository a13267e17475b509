//! Readmate application binary - composition root.
//!
//! Runs one weekly recommendation batch:
//! 1. Load configuration from TOML and apply CLI overrides
//! 2. Build the embedding backend
//! 3. Pick the record source (SQLite or JSONL fixtures)
//! 4. Generate, persist (unless dry-run), and print a summary

mod cli;

use std::sync::Arc;

use clap::Parser;

use readmate_core::config::ReadmateConfig;
use readmate_core::source::{RecommendationSink, RecordSource};
use readmate_reco::{run_weekly, BatchSettings};
use readmate_storage::{Database, JsonlSource, RecommendationRepository, SqliteSource};
use readmate_vector::build_embedder;

use crate::cli::{expand_home, CliArgs};

/// Rows echoed after a dry run.
const SAMPLE_ROWS: usize = 3;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let config_missing = !config_file.exists();
    let mut config = ReadmateConfig::load_or_default(&config_file)?;
    args.apply_overrides(&mut config);

    // Tracing. RUST_LOG wins over the configured level.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting Readmate batch v{}", env!("CARGO_PKG_VERSION"));
    if config_missing {
        tracing::warn!(path = %config_file.display(), "Config file not found, using defaults");
    } else {
        tracing::info!(path = %config_file.display(), "Configuration loaded");
    }

    config.recommend.validate()?;
    let settings = BatchSettings::from_config(&config.recommend)?;
    tracing::info!(
        top_k = settings.top_k,
        search_k = settings.search_k,
        policy = %settings.policy,
        seed = ?settings.seed,
        dry_run = args.dry_run,
        "Batch settings resolved"
    );

    let embedder = build_embedder(&config.embedding, &expand_home(&config.embedding.model_dir))?;
    tracing::info!(
        backend = %config.embedding.backend,
        dimensions = embedder.dimensions(),
        "Embedding backend ready"
    );

    // A database is needed unless fixtures are read and nothing is written.
    let db = if args.fixtures.is_some() && args.dry_run {
        None
    } else {
        let db_path = args.resolve_db_path(&config);
        let db = Database::new(&db_path)?;
        tracing::info!(path = %db_path.display(), "SQLite database opened");
        Some(Arc::new(db))
    };

    let source: Box<dyn RecordSource> = match (&args.fixtures, &db) {
        (Some(dir), _) => {
            tracing::info!(dir = %dir.display(), "Reading JSONL fixtures");
            Box::new(JsonlSource::new(dir))
        }
        (None, Some(db)) => Box::new(SqliteSource::new(Arc::clone(db))),
        (None, None) => return Err("no record source available".into()),
    };

    let repository = match (&db, args.dry_run) {
        (Some(db), false) => Some(RecommendationRepository::new(Arc::clone(db))),
        _ => None,
    };
    let sink = repository
        .as_ref()
        .map(|repo| repo as &dyn RecommendationSink);

    let today = args
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let summary = match run_weekly(source.as_ref(), sink, embedder.as_ref(), settings, today) {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(error = %e, "Weekly batch failed");
            return Err(e.into());
        }
    };

    println!("{}", summary);
    if args.dry_run {
        let sample = &summary.rows[..summary.rows.len().min(SAMPLE_ROWS)];
        println!("dry-run: sample rows -> {}", serde_json::to_string(sample)?);
    }

    Ok(())
}
