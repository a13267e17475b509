//! Read-only view of the meetings loaded for one run.

use std::collections::HashMap;

use readmate_core::types::{Meeting, MeetingId, UserId};

/// Meetings indexed by id, keeping the order they were loaded in.
///
/// If two records share an id the first one wins.
#[derive(Debug, Clone)]
pub struct MeetingCatalog<'a> {
    ordered: Vec<&'a Meeting>,
    by_id: HashMap<MeetingId, &'a Meeting>,
}

impl<'a> MeetingCatalog<'a> {
    pub fn new(meetings: &'a [Meeting]) -> Self {
        let mut ordered = Vec::with_capacity(meetings.len());
        let mut by_id = HashMap::with_capacity(meetings.len());
        for meeting in meetings {
            if let std::collections::hash_map::Entry::Vacant(slot) = by_id.entry(meeting.id) {
                slot.insert(meeting);
                ordered.push(meeting);
            }
        }
        Self { ordered, by_id }
    }

    pub fn get(&self, id: MeetingId) -> Option<&'a Meeting> {
        self.by_id.get(&id).copied()
    }

    /// Meetings in load order, without duplicates.
    pub fn iter(&self) -> impl Iterator<Item = &'a Meeting> + '_ {
        self.ordered.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Whether `id` may be recommended to `requester`: the meeting exists,
    /// is recruiting, and is not led by the requester.
    pub fn is_eligible(&self, id: MeetingId, requester: Option<UserId>) -> bool {
        self.get(id)
            .is_some_and(|meeting| is_eligible(meeting, requester))
    }
}

pub(crate) fn is_eligible(meeting: &Meeting, requester: Option<UserId>) -> bool {
    if !meeting.is_recruiting() {
        return false;
    }
    match (meeting.leader_user_id, requester) {
        (Some(leader), Some(user)) => leader != user,
        _ => true,
    }
}
