//! Readmate Reco crate - weekly meeting recommendations.
//!
//! Builds query text for meetings and users, selects candidates with one of
//! two policies (status-filtered Top-K or genre-aware greedy re-rank), and
//! assembles ranked rows for the week. `run_weekly` ties these together with
//! a record source, an embedder, and an optional sink.

pub mod batch;
pub mod catalog;
pub mod rerank;
pub mod rows;
pub mod runner;
pub mod select;
pub mod text;

pub use batch::{BatchOutput, BatchSettings, BatchTimings, Policy, RecommendationBatch};
pub use catalog::MeetingCatalog;
pub use rerank::{greedy_rerank, rerank_with_genre_bonus, Pick, RerankParams};
pub use rows::{assemble_rows, week_start};
pub use runner::{run_weekly, RunSummary};
pub use select::{select_recruiting_top_k, SelectionParams};
pub use text::{meeting_text, user_query};
