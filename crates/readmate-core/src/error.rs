use thiserror::Error;

/// Top-level error type for the Readmate system.
///
/// Subsystem failures are flattened into string-carrying variants so that
/// the `?` operator works across crate boundaries without each crate
/// exporting its own error enum.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReadmateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid selection parameters: search_k ({search_k}) must be >= top_k ({top_k})")]
    PoolSmallerThanTopK { top_k: usize, search_k: usize },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ReadmateError {
    fn from(err: toml::de::Error) -> Self {
        ReadmateError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ReadmateError {
    fn from(err: toml::ser::Error) -> Self {
        ReadmateError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ReadmateError {
    fn from(err: serde_json::Error) -> Self {
        ReadmateError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Readmate operations.
pub type Result<T> = std::result::Result<T, ReadmateError>;
