//! The weekly job: load records, generate rows, persist them.

use std::fmt;

use chrono::NaiveDate;
use tracing::info;

use readmate_core::error::{ReadmateError, Result};
use readmate_core::source::{RecommendationSink, RecordSource};
use readmate_core::types::RecommendationRow;
use readmate_vector::embedding::EmbeddingService;

use crate::batch::{BatchSettings, BatchTimings, RecommendationBatch};
use crate::rows::week_start;

/// Outcome of one weekly run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub rows: Vec<RecommendationRow>,
    pub users: usize,
    /// Rows written by the sink. Zero on a dry run.
    pub inserted: usize,
    pub timings: BatchTimings,
    pub week_start: NaiveDate,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows={} users={} inserted={} embed_ms={} / {}",
            self.rows.len(),
            self.users,
            self.inserted,
            self.timings.embed_meeting_ms,
            self.timings.embed_user_ms
        )
    }
}

/// Run the batch for the week containing `today`.
///
/// Passing `None` as the sink is a dry run: rows are generated and returned
/// but nothing is written.
pub fn run_weekly(
    source: &dyn RecordSource,
    sink: Option<&dyn RecommendationSink>,
    embedder: &dyn EmbeddingService,
    settings: BatchSettings,
    today: NaiveDate,
) -> Result<RunSummary> {
    settings.validate()?;

    let meetings = source.meetings()?;
    let users = source.users()?;
    info!(
        meetings = meetings.len(),
        users = users.len(),
        "Loaded batch inputs"
    );
    if meetings.is_empty() || users.is_empty() {
        return Err(ReadmateError::NoData(format!(
            "meetings or users not available (meetings={}, users={})",
            meetings.len(),
            users.len()
        )));
    }

    let week = week_start(today);
    let output = RecommendationBatch::new(embedder, settings).generate_rows(&meetings, &users, week)?;

    let inserted = match sink {
        Some(sink) => {
            let written = sink.upsert(&output.rows)?;
            info!(inserted = written, week_start = %week, "Recommendations persisted");
            written
        }
        None => {
            info!(rows = output.rows.len(), "Dry run, skipping persistence");
            0
        }
    };

    Ok(RunSummary {
        rows: output.rows,
        users: output.users,
        inserted,
        timings: output.timings,
        week_start: week,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use readmate_core::types::{Meeting, MeetingStatus, User};
    use readmate_vector::embedding::MockEmbedding;

    struct StaticSource {
        meetings: Vec<Meeting>,
        users: Vec<User>,
    }

    impl RecordSource for StaticSource {
        fn meetings(&self) -> Result<Vec<Meeting>> {
            Ok(self.meetings.clone())
        }

        fn users(&self) -> Result<Vec<User>> {
            Ok(self.users.clone())
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        rows: RefCell<Vec<RecommendationRow>>,
    }

    impl RecommendationSink for CollectingSink {
        fn upsert(&self, rows: &[RecommendationRow]) -> Result<usize> {
            self.rows.borrow_mut().extend_from_slice(rows);
            Ok(rows.len())
        }
    }

    fn source() -> StaticSource {
        StaticSource {
            meetings: vec![
                Meeting::new(1, Some("SF"), MeetingStatus::Recruiting),
                Meeting::new(2, Some("ESSAY"), MeetingStatus::Recruiting),
                Meeting::new(3, Some("SF"), MeetingStatus::Finished),
            ],
            users: vec![User {
                id: 10,
                genre_codes: vec!["SF".to_string()],
                ..Default::default()
            }],
        }
    }

    fn settings() -> BatchSettings {
        BatchSettings {
            top_k: 2,
            search_k: 3,
            seed: Some(3),
            ..BatchSettings::default()
        }
    }

    fn thursday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 13).unwrap()
    }

    #[test]
    fn test_run_persists_through_sink() {
        let sink = CollectingSink::default();
        let embedder = MockEmbedding::with_dimensions(16);
        let summary = run_weekly(&source(), Some(&sink), &embedder, settings(), thursday()).unwrap();

        assert_eq!(summary.week_start, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(summary.users, 1);
        assert_eq!(summary.rows.len(), 2);
        assert_eq!(summary.inserted, 2);
        assert_eq!(*sink.rows.borrow(), summary.rows);
        assert!(summary.to_string().starts_with("rows=2 users=1 inserted=2 embed_ms="));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let embedder = MockEmbedding::with_dimensions(16);
        let summary = run_weekly(&source(), None, &embedder, settings(), thursday()).unwrap();
        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.rows.len(), 2);
    }

    #[test]
    fn test_missing_users_is_no_data() {
        let mut src = source();
        src.users.clear();
        let embedder = MockEmbedding::new();
        let err = run_weekly(&src, None, &embedder, settings(), thursday()).unwrap_err();
        assert!(matches!(err, ReadmateError::NoData(_)));
    }

    #[test]
    fn test_bad_settings_fail_before_loading() {
        struct FailingSource;
        impl RecordSource for FailingSource {
            fn meetings(&self) -> Result<Vec<Meeting>> {
                Err(ReadmateError::Source("should not be called".to_string()))
            }
            fn users(&self) -> Result<Vec<User>> {
                Err(ReadmateError::Source("should not be called".to_string()))
            }
        }

        let embedder = MockEmbedding::new();
        let bad = BatchSettings {
            top_k: 10,
            search_k: 1,
            ..BatchSettings::default()
        };
        let err = run_weekly(&FailingSource, None, &embedder, bad, thursday()).unwrap_err();
        assert!(matches!(err, ReadmateError::PoolSmallerThanTopK { .. }));
    }
}
