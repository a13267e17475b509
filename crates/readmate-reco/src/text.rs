//! Query text for meetings and users.
//!
//! The strings produced here are what gets embedded, so they must be
//! byte-for-byte reproducible: multi-valued fields are sorted before joining.

use readmate_core::types::{Meeting, User};

const MISSING: &str = "unknown";
const EMPTY_LIST: &str = "none";

/// Describe a meeting by its genre, title, description and leader intro.
pub fn meeting_text(meeting: &Meeting) -> String {
    format!(
        "Genre {} book club. Title: {}. About: {} Leader: {}",
        meeting.genre().unwrap_or(MISSING),
        meeting.title,
        meeting.description,
        meeting.leader_intro
    )
    .trim()
    .to_string()
}

/// Describe a user's reading profile as a search query.
pub fn user_query(user: &User) -> String {
    let volume = user
        .reading_volume_code
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(MISSING);

    format!(
        "Reads {} per month. Purposes: {}. Preferred genres: {}.",
        volume,
        sorted_list(&user.purpose_codes),
        sorted_list(&user.genre_codes)
    )
}

fn sorted_list(codes: &[String]) -> String {
    let mut sorted: Vec<&str> = codes.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    if sorted.is_empty() {
        EMPTY_LIST.to_string()
    } else {
        sorted.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readmate_core::types::MeetingStatus;

    fn meeting() -> Meeting {
        let mut m = Meeting::new(1, Some("ESSAY"), MeetingStatus::Recruiting);
        m.title = "Slow mornings".to_string();
        m.description = "One essay a week.".to_string();
        m.leader_intro = "Librarian for ten years.".to_string();
        m
    }

    #[test]
    fn test_meeting_text_template() {
        assert_eq!(
            meeting_text(&meeting()),
            "Genre ESSAY book club. Title: Slow mornings. About: One essay a week. \
             Leader: Librarian for ten years."
        );
    }

    #[test]
    fn test_meeting_text_missing_fields() {
        let mut m = meeting();
        m.genre_code = None;
        m.leader_intro.clear();
        let text = meeting_text(&m);
        assert!(text.starts_with("Genre unknown book club."));
        assert!(text.ends_with("Leader:"));
    }

    #[test]
    fn test_user_query_sorts_codes() {
        let a = User {
            id: 1,
            reading_volume_code: Some("V2".to_string()),
            purpose_codes: vec!["SOCIAL".to_string(), "HABIT".to_string()],
            genre_codes: vec!["SF".to_string(), "ESSAY".to_string(), "HISTORY".to_string()],
        };
        let b = User {
            purpose_codes: vec!["HABIT".to_string(), "SOCIAL".to_string()],
            genre_codes: vec!["HISTORY".to_string(), "SF".to_string(), "ESSAY".to_string()],
            ..a.clone()
        };

        assert_eq!(
            user_query(&a),
            "Reads V2 per month. Purposes: HABIT, SOCIAL. Preferred genres: ESSAY, HISTORY, SF."
        );
        assert_eq!(user_query(&a), user_query(&b));
    }

    #[test]
    fn test_user_query_empty_profile() {
        let user = User {
            id: 3,
            ..Default::default()
        };
        assert_eq!(
            user_query(&user),
            "Reads unknown per month. Purposes: none. Preferred genres: none."
        );
    }
}
