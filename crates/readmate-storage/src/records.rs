//! Normalization of raw meeting and user records.
//!
//! Upstream exports do not agree on column names: the genre code may arrive
//! as `reading_genre_code`, `reading_genre_id` or `genre_code`, and so on.
//! Everything is mapped to the canonical [`Meeting`] and [`User`] shapes
//! here, so nothing downstream sees the aliases.
//!
//! For every field the first alias holding a non-empty value wins. Numeric
//! codes are rendered as strings. Code lists may be JSON arrays, JSON text
//! holding an array, or a bare string, which becomes a one-element list.

use serde_json::{Map, Value};
use tracing::warn;

use readmate_core::error::{ReadmateError, Result};
use readmate_core::types::{Meeting, MeetingStatus, User};

/// One record as read from a fixture line or an export.
pub type RawRecord = Map<String, Value>;

const MEETING_ID_KEYS: &[&str] = &["id", "meeting_id"];
const MEETING_GENRE_KEYS: &[&str] = &["reading_genre_code", "reading_genre_id", "genre_code"];
const USER_ID_KEYS: &[&str] = &["user_id", "id"];
const USER_VOLUME_KEYS: &[&str] = &["reading_volume_code", "reading_volume_id", "volume_code"];
const USER_PURPOSE_KEYS: &[&str] = &["purpose_codes", "purpose_ids", "reading_purpose_codes"];
const USER_GENRE_KEYS: &[&str] = &["genre_codes", "genre_ids", "reading_genre_codes"];

/// Map a raw meeting record to a [`Meeting`].
///
/// Only the id is required. Unknown status codes are kept and logged.
pub fn normalize_meeting(raw: &RawRecord) -> Result<Meeting> {
    let id = first_present(raw, MEETING_ID_KEYS)
        .and_then(as_id)
        .ok_or_else(|| ReadmateError::Source("meeting record without a usable id".to_string()))?;

    let status = raw.get("status").and_then(as_code).map(|code| {
        let status = MeetingStatus::from_code(&code);
        if let MeetingStatus::Other(ref other) = status {
            warn!(meeting_id = id, status = %other, "Unknown meeting status");
        }
        status
    });

    Ok(Meeting {
        id,
        genre_code: first_present(raw, MEETING_GENRE_KEYS).and_then(as_code),
        title: text_field(raw, "title"),
        description: text_field(raw, "description"),
        leader_intro: text_field(raw, "leader_intro"),
        status,
        capacity: raw.get("capacity").and_then(as_count),
        current_count: raw.get("current_count").and_then(as_count),
        leader_user_id: raw.get("leader_user_id").and_then(as_id),
    })
}

/// Map a raw user record to a [`User`].
pub fn normalize_user(raw: &RawRecord) -> Result<User> {
    let id = first_present(raw, USER_ID_KEYS)
        .and_then(as_id)
        .ok_or_else(|| ReadmateError::Source("user record without a usable id".to_string()))?;

    Ok(User {
        id,
        reading_volume_code: first_present(raw, USER_VOLUME_KEYS).and_then(as_code),
        purpose_codes: first_present(raw, USER_PURPOSE_KEYS)
            .map(code_list)
            .unwrap_or_default(),
        genre_codes: first_present(raw, USER_GENRE_KEYS)
            .map(code_list)
            .unwrap_or_default(),
    })
}

/// Parse a code list stored as text.
///
/// JSON arrays are decoded; any other non-blank text is taken as a single
/// code.
pub fn parse_code_list(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => items.iter().filter_map(as_code).collect(),
        Ok(Value::Null) => Vec::new(),
        _ => vec![trimmed.to_string()],
    }
}

fn first_present<'a>(raw: &'a RawRecord, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| !is_blank(value))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn as_code(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_count(value: &Value) -> Option<u32> {
    as_id(value).and_then(|n| u32::try_from(n).ok())
}

fn text_field(raw: &RawRecord, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn code_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(as_code).collect(),
        Value::String(s) => parse_code_list(s),
        other => as_code(other).into_iter().collect(),
    }
}
