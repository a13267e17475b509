//! Database schema migrations.
//!
//! Applies the initial schema: meetings, users, the weekly recommendation
//! table, and schema_migrations.

use rusqlite::Connection;
use tracing::info;

use readmate_core::error::{ReadmateError, Result};

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| ReadmateError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| ReadmateError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS meetings (
            id                  INTEGER PRIMARY KEY NOT NULL,
            reading_genre_code  TEXT,
            title               TEXT NOT NULL DEFAULT '',
            description         TEXT NOT NULL DEFAULT '',
            leader_intro        TEXT NOT NULL DEFAULT '',
            status              TEXT,
            capacity            INTEGER,
            current_count       INTEGER,
            leader_user_id      INTEGER,
            deleted_at          INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_meetings_status
            ON meetings (status)
            WHERE deleted_at IS NULL;

        -- Code lists are JSON arrays of strings.
        CREATE TABLE IF NOT EXISTS users (
            id                   INTEGER PRIMARY KEY NOT NULL,
            reading_volume_code  TEXT,
            purpose_codes        TEXT NOT NULL DEFAULT '[]',
            genre_codes          TEXT NOT NULL DEFAULT '[]',
            deleted_at           INTEGER
        );

        CREATE TABLE IF NOT EXISTS user_meeting_recommendation (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id          INTEGER NOT NULL,
            meeting_id       INTEGER NOT NULL,
            week_start_date  TEXT NOT NULL,
            \"rank\"           INTEGER NOT NULL CHECK (\"rank\" >= 1),
            created_at       INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            UNIQUE (user_id, meeting_id, week_start_date)
        );

        CREATE INDEX IF NOT EXISTS idx_recommendation_week
            ON user_meeting_recommendation (week_start_date, user_id, \"rank\");

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| ReadmateError::Storage(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}
