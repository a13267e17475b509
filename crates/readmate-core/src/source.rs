//! Boundaries between the recommender and the outside world.
//!
//! A `RecordSource` hands over meetings and users already normalized to the
//! canonical shapes in [`crate::types`]. A `RecommendationSink` receives the
//! finished rows.

use crate::error::Result;
use crate::types::{Meeting, RecommendationRow, User};

/// Supplies the records for one batch run.
pub trait RecordSource {
    /// All meetings, in a stable order.
    fn meetings(&self) -> Result<Vec<Meeting>>;

    /// All active users, in a stable order.
    fn users(&self) -> Result<Vec<User>>;
}

/// Accepts recommendation rows.
///
/// Implementations must upsert on (user_id, meeting_id, week_start_date) so
/// that re-running a week updates ranks instead of duplicating rows.
pub trait RecommendationSink {
    /// Persist the rows and return how many were written.
    fn upsert(&self, rows: &[RecommendationRow]) -> Result<usize>;
}
