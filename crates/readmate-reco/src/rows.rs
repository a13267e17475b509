//! Turning ranked meeting ids into persistence rows.

use chrono::{Datelike, Days, NaiveDate};

use readmate_core::types::{MeetingId, RecommendationRow, UserId};

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// One row per meeting, ranked 1..=n in the given order.
pub fn assemble_rows(
    user_id: UserId,
    meeting_ids: &[MeetingId],
    week_start: NaiveDate,
) -> Vec<RecommendationRow> {
    meeting_ids
        .iter()
        .zip(1u32..)
        .map(|(&meeting_id, rank)| RecommendationRow {
            user_id,
            meeting_id,
            week_start_date: week_start,
            rank,
        })
        .collect()
}
