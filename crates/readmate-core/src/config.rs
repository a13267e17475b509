use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ReadmateError, Result};

/// Top-level configuration for the Readmate batch.
///
/// Loaded from `~/.readmate/config.toml` by default. Each section corresponds
/// to one concern of the weekly run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadmateConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub recommend: RecommendConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl ReadmateConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ReadmateConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist. A file that exists but cannot be read or parsed is
    /// an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("No config at {}. Using defaults.", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ReadmateError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory holding the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.readmate/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Embedding backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend: "mock" or "onnx".
    pub backend: String,
    /// Directory with `model.onnx` and `tokenizer.json` (onnx backend only).
    pub model_dir: String,
    /// Vector dimension produced by the mock backend.
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "mock".to_string(),
            model_dir: "~/.readmate/models/KURE-v1".to_string(),
            dimensions: 384,
        }
    }
}

/// Candidate selection and re-ranking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    /// Final recommendations per user.
    pub top_k: usize,
    /// Nearest neighbors considered before filtering and re-ranking.
    pub search_k: usize,
    /// Selection policy: "recruiting_top_k" or "genre_rerank".
    pub policy: String,
    /// Additive boost when a meeting's genre is one the user prefers.
    pub genre_bonus: f64,
    /// Additive penalty per already-picked meeting of the same genre.
    pub duplicate_penalty: f64,
    /// Seed for the random backfill order. Unset means nondeterministic.
    pub seed: Option<u64>,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            search_k: 20,
            policy: "genre_rerank".to_string(),
            genre_bonus: 0.05,
            duplicate_penalty: 0.07,
            seed: None,
        }
    }
}

impl RecommendConfig {
    /// Reject settings that cannot produce a meaningful ranking.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(ReadmateError::Config("top_k must be at least 1".to_string()));
        }
        if self.search_k < self.top_k {
            return Err(ReadmateError::PoolSmallerThanTopK {
                top_k: self.top_k,
                search_k: self.search_k,
            });
        }
        Ok(())
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file name inside the data directory.
    pub db_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_file: "readmate.db".to_string(),
        }
    }
}
