//! Record sources: the SQLite tables or a directory of JSONL fixtures.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use readmate_core::error::{ReadmateError, Result};
use readmate_core::source::RecordSource;
use readmate_core::types::{Meeting, User};

use crate::db::Database;
use crate::records::{normalize_meeting, normalize_user, RawRecord};
use crate::repository::{MeetingRepository, UserRepository};

/// Reads meetings and users from the database.
pub struct SqliteSource {
    meetings: MeetingRepository,
    users: UserRepository,
}

impl SqliteSource {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            meetings: MeetingRepository::new(Arc::clone(&db)),
            users: UserRepository::new(db),
        }
    }
}

impl RecordSource for SqliteSource {
    fn meetings(&self) -> Result<Vec<Meeting>> {
        self.meetings.fetch_all()
    }

    fn users(&self) -> Result<Vec<User>> {
        self.users.fetch_all()
    }
}

/// Reads `meetings.jsonl` and `users.jsonl` from a fixtures directory.
#[derive(Debug, Clone)]
pub struct JsonlSource {
    dir: PathBuf,
}

impl JsonlSource {
    pub const MEETINGS_FILE: &'static str = "meetings.jsonl";
    pub const USERS_FILE: &'static str = "users.jsonl";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RecordSource for JsonlSource {
    fn meetings(&self) -> Result<Vec<Meeting>> {
        let path = self.dir.join(Self::MEETINGS_FILE);
        let meetings = load_jsonl(&path)?
            .iter()
            .map(normalize_meeting)
            .collect::<Result<Vec<_>>>()?;
        info!(count = meetings.len(), path = %path.display(), "Loaded meeting fixtures");
        Ok(meetings)
    }

    fn users(&self) -> Result<Vec<User>> {
        let path = self.dir.join(Self::USERS_FILE);
        let users = load_jsonl(&path)?
            .iter()
            .map(normalize_user)
            .collect::<Result<Vec<_>>>()?;
        info!(count = users.len(), path = %path.display(), "Loaded user fixtures");
        Ok(users)
    }
}

/// Read one JSON object per line. Blank lines are skipped.
pub fn load_jsonl(path: &Path) -> Result<Vec<RawRecord>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ReadmateError::Source(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|e| {
            ReadmateError::Source(format!("{}:{}: invalid JSON: {}", path.display(), idx + 1, e))
        })?;
        match value {
            Value::Object(map) => records.push(map),
            other => {
                return Err(ReadmateError::Source(format!(
                    "{}:{}: expected a JSON object, got {}",
                    path.display(),
                    idx + 1,
                    other
                )))
            }
        }
    }

    debug!(path = %path.display(), records = records.len(), "Read JSONL file");
    Ok(records)
}
