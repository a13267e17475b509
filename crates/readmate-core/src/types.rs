use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier of a reading-group meeting.
pub type MeetingId = i64;

/// Identifier of a user.
pub type UserId = i64;

// =============================================================================
// Enums
// =============================================================================

/// Lifecycle status of a meeting.
///
/// Only `Recruiting` meetings are eligible for recommendation. Codes that the
/// system does not know about are preserved in `Other` rather than rejected.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MeetingStatus {
    /// Open for signups.
    Recruiting,
    /// Already took place.
    Finished,
    /// Called off by the leader.
    Canceled,
    /// Any other status code, kept verbatim.
    Other(String),
}

impl MeetingStatus {
    /// Parse a status code. Matching is case-insensitive and ignores
    /// surrounding whitespace.
    pub fn from_code(code: &str) -> Self {
        let trimmed = code.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "RECRUITING" => MeetingStatus::Recruiting,
            "FINISHED" => MeetingStatus::Finished,
            "CANCELED" | "CANCELLED" => MeetingStatus::Canceled,
            _ => MeetingStatus::Other(trimmed.to_string()),
        }
    }

    /// The wire code for this status.
    pub fn as_code(&self) -> &str {
        match self {
            MeetingStatus::Recruiting => "RECRUITING",
            MeetingStatus::Finished => "FINISHED",
            MeetingStatus::Canceled => "CANCELED",
            MeetingStatus::Other(code) => code,
        }
    }
}

impl From<String> for MeetingStatus {
    fn from(code: String) -> Self {
        MeetingStatus::from_code(&code)
    }
}

impl From<MeetingStatus> for String {
    fn from(status: MeetingStatus) -> Self {
        status.as_code().to_string()
    }
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

// =============================================================================
// Records
// =============================================================================

/// A reading-group meeting, normalized to its canonical shape.
///
/// Immutable for the duration of one batch run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub genre_code: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub leader_intro: String,
    pub status: Option<MeetingStatus>,
    pub capacity: Option<u32>,
    pub current_count: Option<u32>,
    /// Owner of the meeting, if known.
    pub leader_user_id: Option<UserId>,
}

impl Meeting {
    /// Create a meeting with only the fields the recommender cares about.
    pub fn new(id: MeetingId, genre_code: Option<&str>, status: MeetingStatus) -> Self {
        Self {
            id,
            genre_code: genre_code.map(String::from),
            title: String::new(),
            description: String::new(),
            leader_intro: String::new(),
            status: Some(status),
            capacity: None,
            current_count: None,
            leader_user_id: None,
        }
    }

    /// True when the meeting is open for signups.
    pub fn is_recruiting(&self) -> bool {
        matches!(self.status, Some(MeetingStatus::Recruiting))
    }

    /// Genre code, treating blank codes as absent.
    pub fn genre(&self) -> Option<&str> {
        self.genre_code
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }
}

/// A user profile, normalized to its canonical shape.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub reading_volume_code: Option<String>,
    #[serde(default)]
    pub purpose_codes: Vec<String>,
    #[serde(default)]
    pub genre_codes: Vec<String>,
}

/// A meeting paired with its similarity to one user's query.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub meeting_id: MeetingId,
    pub score: f64,
}

impl ScoredCandidate {
    pub fn new(meeting_id: MeetingId, score: f64) -> Self {
        Self { meeting_id, score }
    }
}

/// The persisted artifact of a batch run.
///
/// `rank` is 1-based and unique per (user_id, week_start_date).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecommendationRow {
    pub user_id: UserId,
    pub meeting_id: MeetingId,
    pub week_start_date: NaiveDate,
    pub rank: u32,
}
