//! CLI argument definitions for the Readmate batch.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use chrono::NaiveDate;
use std::path::PathBuf;

use readmate_core::config::ReadmateConfig;

/// Readmate weekly batch: recommends recruiting reading-group meetings to users.
#[derive(Parser, Debug)]
#[command(name = "readmate", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Data directory holding the SQLite database.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Explicit database file, overriding data dir and db_file.
    #[arg(long = "db")]
    pub db: Option<PathBuf>,

    /// Read meetings.jsonl and users.jsonl from this directory instead of the database.
    #[arg(long = "fixtures")]
    pub fixtures: Option<PathBuf>,

    /// Final recommendations per user.
    #[arg(long = "top-k")]
    pub top_k: Option<usize>,

    /// Nearest neighbors considered before filtering and re-ranking.
    #[arg(long = "search-k")]
    pub search_k: Option<usize>,

    /// Selection policy: recruiting_top_k or genre_rerank.
    #[arg(long = "policy")]
    pub policy: Option<String>,

    /// Seed for the random backfill order.
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Run the batch for the week containing this date (YYYY-MM-DD). Defaults to today.
    #[arg(long = "date")]
    pub date: Option<NaiveDate>,

    /// Generate rows without writing them.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > READMATE_CONFIG env var > ~/.readmate/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("READMATE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    /// Resolve the database file path.
    ///
    /// Priority: --db flag > --data-dir joined with db_file > config values.
    pub fn resolve_db_path(&self, config: &ReadmateConfig) -> PathBuf {
        if let Some(ref p) = self.db {
            return p.clone();
        }
        let data_dir = match self.data_dir {
            Some(ref dir) => dir.clone(),
            None => expand_home(&config.general.data_dir),
        };
        data_dir.join(&config.storage.db_file)
    }

    /// Copy selection overrides into the `[recommend]` section.
    pub fn apply_overrides(&self, config: &mut ReadmateConfig) {
        if let Some(top_k) = self.top_k {
            config.recommend.top_k = top_k;
        }
        if let Some(search_k) = self.search_k {
            config.recommend.search_k = search_k;
        }
        if let Some(ref policy) = self.policy {
            config.recommend.policy = policy.clone();
        }
        if self.seed.is_some() {
            config.recommend.seed = self.seed;
        }
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let home = std::env::var("USERPROFILE");
    #[cfg(not(target_os = "windows"))]
    let home = std::env::var("HOME");
    home.ok().map(PathBuf::from)
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    match home_dir() {
        Some(home) => home.join(".readmate").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}
