pub mod config;
pub mod error;
pub mod source;
pub mod types;

pub use config::ReadmateConfig;
pub use error::{ReadmateError, Result};
pub use source::{RecommendationSink, RecordSource};
pub use types::*;
