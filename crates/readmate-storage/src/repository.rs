//! Repository implementations for SQLite-backed persistence.
//!
//! Provides MeetingRepository, UserRepository, and RecommendationRepository
//! that operate on the Database struct using raw SQL.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use rusqlite::Row;
use tracing::debug;

use readmate_core::error::{ReadmateError, Result};
use readmate_core::source::RecommendationSink;
use readmate_core::types::{
    Meeting, MeetingId, MeetingStatus, RecommendationRow, User, UserId,
};

use crate::db::Database;
use crate::records::parse_code_list;

const WEEK_FORMAT: &str = "%Y-%m-%d";

/// Repository for meetings.
pub struct MeetingRepository {
    db: Arc<Database>,
}

impl MeetingRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert or replace a meeting by id.
    pub fn save(&self, meeting: &Meeting) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO meetings
                    (id, reading_genre_code, title, description, leader_intro, status,
                     capacity, current_count, leader_user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    meeting.id,
                    meeting.genre_code,
                    meeting.title,
                    meeting.description,
                    meeting.leader_intro,
                    meeting.status.as_ref().map(MeetingStatus::as_code),
                    meeting.capacity,
                    meeting.current_count,
                    meeting.leader_user_id,
                ],
            )
            .map_err(|e| ReadmateError::Storage(format!("Failed to save meeting: {}", e)))?;
            Ok(())
        })
    }

    /// All meetings that have not been deleted, ordered by id.
    pub fn fetch_all(&self) -> Result<Vec<Meeting>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, reading_genre_code, title, description, leader_intro, status,
                            capacity, current_count, leader_user_id
                     FROM meetings
                     WHERE deleted_at IS NULL
                     ORDER BY id",
                )
                .map_err(|e| ReadmateError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], row_to_meeting)
                .map_err(|e| ReadmateError::Storage(e.to_string()))?;

            let meetings = rows
                .map(|row| row.map_err(|e| ReadmateError::Storage(e.to_string())))
                .collect::<Result<Vec<_>>>()?;
            Ok(meetings)
        })
    }

    /// Soft-delete a meeting so it no longer appears in `fetch_all`.
    pub fn mark_deleted(&self, id: MeetingId) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE meetings SET deleted_at = strftime('%s', 'now') WHERE id = ?1",
                rusqlite::params![id],
            )
            .map_err(|e| ReadmateError::Storage(format!("Failed to delete meeting: {}", e)))?;
            Ok(())
        })
    }

    /// Count meetings that have not been deleted.
    pub fn count(&self) -> Result<u64> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM meetings WHERE deleted_at IS NULL",
                    [],
                    |row| row.get(0),
                )
                .map_err(|e| ReadmateError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

/// Repository for user reading profiles.
pub struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert or replace a user by id. Code lists are stored as JSON text.
    pub fn save(&self, user: &User) -> Result<()> {
        let purposes = serde_json::to_string(&user.purpose_codes)?;
        let genres = serde_json::to_string(&user.genre_codes)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO users (id, reading_volume_code, purpose_codes, genre_codes)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![user.id, user.reading_volume_code, purposes, genres],
            )
            .map_err(|e| ReadmateError::Storage(format!("Failed to save user: {}", e)))?;
            Ok(())
        })
    }

    /// All users that have not been deleted, ordered by id.
    pub fn fetch_all(&self) -> Result<Vec<User>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, reading_volume_code, purpose_codes, genre_codes
                     FROM users
                     WHERE deleted_at IS NULL
                     ORDER BY id",
                )
                .map_err(|e| ReadmateError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], row_to_user)
                .map_err(|e| ReadmateError::Storage(e.to_string()))?;

            let users = rows
                .map(|row| row.map_err(|e| ReadmateError::Storage(e.to_string())))
                .collect::<Result<Vec<_>>>()?;
            Ok(users)
        })
    }

    /// Soft-delete a user so it no longer appears in `fetch_all`.
    pub fn mark_deleted(&self, id: UserId) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET deleted_at = strftime('%s', 'now') WHERE id = ?1",
                rusqlite::params![id],
            )
            .map_err(|e| ReadmateError::Storage(format!("Failed to delete user: {}", e)))?;
            Ok(())
        })
    }

    /// Count users that have not been deleted.
    pub fn count(&self) -> Result<u64> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM users WHERE deleted_at IS NULL",
                    [],
                    |row| row.get(0),
                )
                .map_err(|e| ReadmateError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

/// Repository for the weekly `user_meeting_recommendation` table.
pub struct RecommendationRepository {
    db: Arc<Database>,
}

impl RecommendationRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert rows, updating `rank` for rows that already exist for the same
    /// (user, meeting, week). Returns the number of rows submitted.
    ///
    /// Each (user, week) present in `rows` is replaced as a whole: stored
    /// meetings missing from the new list are removed, so ranks stay unique
    /// per user and week. All rows are written in one transaction.
    pub fn upsert(&self, rows: &[RecommendationRow]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut kept: BTreeMap<(UserId, String), HashSet<MeetingId>> = BTreeMap::new();
        for row in rows {
            kept.entry((row.user_id, row.week_start_date.format(WEEK_FORMAT).to_string()))
                .or_default()
                .insert(row.meeting_id);
        }

        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| ReadmateError::Storage(format!("Failed to begin upsert: {}", e)))?;
            let mut removed = 0usize;
            {
                let mut existing_stmt = tx
                    .prepare(
                        "SELECT meeting_id FROM user_meeting_recommendation
                         WHERE user_id = ?1 AND week_start_date = ?2",
                    )
                    .map_err(|e| ReadmateError::Storage(e.to_string()))?;
                let mut delete_stmt = tx
                    .prepare(
                        "DELETE FROM user_meeting_recommendation
                         WHERE user_id = ?1 AND meeting_id = ?2 AND week_start_date = ?3",
                    )
                    .map_err(|e| ReadmateError::Storage(e.to_string()))?;

                for ((user_id, week), meeting_ids) in &kept {
                    let existing = existing_stmt
                        .query_map(rusqlite::params![user_id, week], |row| {
                            row.get::<_, MeetingId>(0)
                        })
                        .map_err(|e| ReadmateError::Storage(e.to_string()))?
                        .collect::<rusqlite::Result<Vec<_>>>()
                        .map_err(|e| ReadmateError::Storage(e.to_string()))?;

                    for meeting_id in existing.into_iter().filter(|id| !meeting_ids.contains(id)) {
                        delete_stmt
                            .execute(rusqlite::params![user_id, meeting_id, week])
                            .map_err(|e| {
                                ReadmateError::Storage(format!(
                                    "Failed to remove stale recommendation: {}",
                                    e
                                ))
                            })?;
                        removed += 1;
                    }
                }
            }
            {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO user_meeting_recommendation
                            (user_id, meeting_id, week_start_date, \"rank\")
                         VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT (user_id, meeting_id, week_start_date) DO UPDATE SET
                            \"rank\" = excluded.\"rank\",
                            created_at = strftime('%s', 'now')",
                    )
                    .map_err(|e| ReadmateError::Storage(e.to_string()))?;

                for row in rows {
                    stmt.execute(rusqlite::params![
                        row.user_id,
                        row.meeting_id,
                        row.week_start_date.format(WEEK_FORMAT).to_string(),
                        row.rank,
                    ])
                    .map_err(|e| {
                        ReadmateError::Storage(format!("Failed to upsert recommendation: {}", e))
                    })?;
                }
            }
            tx.commit()
                .map_err(|e| ReadmateError::Storage(format!("Failed to commit upsert: {}", e)))?;

            debug!(rows = rows.len(), removed, "Recommendations upserted");
            Ok(rows.len())
        })
    }

    /// Rows for one week, ordered by user and rank.
    pub fn find_by_week(&self, week_start: NaiveDate) -> Result<Vec<RecommendationRow>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT user_id, meeting_id, week_start_date, \"rank\"
                     FROM user_meeting_recommendation
                     WHERE week_start_date = ?1
                     ORDER BY user_id, \"rank\"",
                )
                .map_err(|e| ReadmateError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(
                    rusqlite::params![week_start.format(WEEK_FORMAT).to_string()],
                    |row| Ok(row_to_recommendation(row)),
                )
                .map_err(|e| ReadmateError::Storage(e.to_string()))?;

            let mut out = Vec::new();
            for row in rows {
                out.push(row.map_err(|e| ReadmateError::Storage(e.to_string()))??);
            }
            Ok(out)
        })
    }

    /// Count all stored recommendation rows.
    pub fn count(&self) -> Result<u64> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM user_meeting_recommendation", [], |row| {
                    row.get(0)
                })
                .map_err(|e| ReadmateError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

impl RecommendationSink for RecommendationRepository {
    fn upsert(&self, rows: &[RecommendationRow]) -> Result<usize> {
        RecommendationRepository::upsert(self, rows)
    }
}

// =============================================================================
// Row mappers
// =============================================================================

fn row_to_meeting(row: &Row<'_>) -> rusqlite::Result<Meeting> {
    let status: Option<String> = row.get(5)?;
    Ok(Meeting {
        id: row.get(0)?,
        genre_code: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        leader_intro: row.get(4)?,
        status: status.as_deref().map(MeetingStatus::from_code),
        capacity: row.get(6)?,
        current_count: row.get(7)?,
        leader_user_id: row.get(8)?,
    })
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let purposes: String = row.get(2)?;
    let genres: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        reading_volume_code: row.get(1)?,
        purpose_codes: parse_code_list(&purposes),
        genre_codes: parse_code_list(&genres),
    })
}

fn row_to_recommendation(row: &Row<'_>) -> Result<RecommendationRow> {
    let week: String = row
        .get(2)
        .map_err(|e| ReadmateError::Storage(e.to_string()))?;
    let week_start_date = NaiveDate::parse_from_str(&week, WEEK_FORMAT)
        .map_err(|e| ReadmateError::Storage(format!("Bad week_start_date '{}': {}", week, e)))?;
    Ok(RecommendationRow {
        user_id: row
            .get(0)
            .map_err(|e| ReadmateError::Storage(e.to_string()))?,
        meeting_id: row
            .get(1)
            .map_err(|e| ReadmateError::Storage(e.to_string()))?,
        week_start_date,
        rank: row
            .get(3)
            .map_err(|e| ReadmateError::Storage(e.to_string()))?,
    })
}
