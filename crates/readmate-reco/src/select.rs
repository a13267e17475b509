//! Status-filtered Top-K selection and the backfill shared by every policy.
//!
//! Both policies start from the same candidate pool: the scored candidates
//! sorted by descending similarity and cut to `candidate_pool`. When a policy
//! ends up with fewer than `top_k` picks it backfills, first from eligible
//! pool candidates it has not taken yet (score order), then from eligible
//! meetings anywhere in the catalog in random order. Running short after
//! that is expected for small catalogs and is only logged.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use readmate_core::types::{MeetingId, ScoredCandidate, UserId};

use crate::catalog::{is_eligible, MeetingCatalog};

/// How many meetings to return and how many nearest neighbors to look at.
///
/// Callers must ensure `candidate_pool >= top_k`; the algorithms take the
/// values as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionParams {
    pub top_k: usize,
    pub candidate_pool: usize,
}

impl SelectionParams {
    pub fn new(top_k: usize, candidate_pool: usize) -> Self {
        Self {
            top_k,
            candidate_pool,
        }
    }
}

/// Pick up to `top_k` recruiting meetings, best similarity first.
///
/// Meetings led by `requester` are never picked. The backfill order for
/// unscored meetings comes from `rng`.
pub fn select_recruiting_top_k<R: Rng + ?Sized>(
    scores: &[ScoredCandidate],
    catalog: &MeetingCatalog<'_>,
    params: SelectionParams,
    requester: Option<UserId>,
    rng: &mut R,
) -> Vec<MeetingId> {
    let pool = candidate_pool(scores, params.candidate_pool);

    let mut selected: Vec<MeetingId> = pool
        .iter()
        .filter(|c| catalog.is_eligible(c.meeting_id, requester))
        .map(|c| c.meeting_id)
        .collect();

    backfill(&mut selected, &pool, catalog, requester, params.top_k, rng);
    selected.truncate(params.top_k);
    log_shortfall(requester, selected.len(), params.top_k);
    selected
}

/// Sort candidates by descending score and keep the first `size`.
///
/// The sort is stable, so equal scores keep their input order. A repeated
/// meeting id keeps only its best-scored entry.
pub(crate) fn candidate_pool(scores: &[ScoredCandidate], size: usize) -> Vec<ScoredCandidate> {
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut seen = HashSet::with_capacity(sorted.len());
    sorted.retain(|c| seen.insert(c.meeting_id));
    sorted.truncate(size);
    sorted
}

/// Top up `selected` to `top_k` entries.
pub(crate) fn backfill<R: Rng + ?Sized>(
    selected: &mut Vec<MeetingId>,
    pool: &[ScoredCandidate],
    catalog: &MeetingCatalog<'_>,
    requester: Option<UserId>,
    top_k: usize,
    rng: &mut R,
) {
    if selected.len() >= top_k {
        return;
    }

    let mut taken: HashSet<MeetingId> = selected.iter().copied().collect();

    for candidate in pool {
        if selected.len() >= top_k {
            return;
        }
        if !taken.contains(&candidate.meeting_id)
            && catalog.is_eligible(candidate.meeting_id, requester)
        {
            taken.insert(candidate.meeting_id);
            selected.push(candidate.meeting_id);
        }
    }

    let missing = top_k.saturating_sub(selected.len());
    if missing == 0 {
        return;
    }

    let mut unscored: Vec<MeetingId> = catalog
        .iter()
        .filter(|m| !taken.contains(&m.id) && is_eligible(m, requester))
        .map(|m| m.id)
        .collect();
    unscored.shuffle(rng);
    selected.extend(unscored.into_iter().take(missing));
}

pub(crate) fn log_shortfall(requester: Option<UserId>, got: usize, top_k: usize) {
    if got < top_k {
        info!(
            user_id = ?requester,
            got,
            top_k,
            "Insufficient recruiting meetings to fill top_k"
        );
    }
}
