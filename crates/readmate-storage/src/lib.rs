//! Readmate Storage crate - SQLite persistence and record sources.
//!
//! Provides a WAL-mode SQLite database with migrations, repositories for
//! meetings, users and weekly recommendations, and the two record sources
//! the batch can read from: the database itself or a JSONL fixtures
//! directory.

pub mod db;
pub mod migrations;
pub mod records;
pub mod repository;
pub mod source;

pub use db::Database;
pub use records::{normalize_meeting, normalize_user, parse_code_list, RawRecord};
pub use repository::{MeetingRepository, RecommendationRepository, UserRepository};
pub use source::{load_jsonl, JsonlSource, SqliteSource};
