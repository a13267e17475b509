//! Genre-aware greedy re-ranking.
//!
//! Each round scores every remaining candidate as
//! `similarity + genre_bonus * [genre preferred] - duplicate_penalty * picks_of_genre`
//! and takes the best one. The penalty term depends on what has already been
//! picked, so the adjusted scores are recomputed every round.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use readmate_core::types::{Meeting, MeetingId, ScoredCandidate, UserId};

use crate::catalog::MeetingCatalog;
use crate::select::{backfill, candidate_pool, log_shortfall, SelectionParams};

/// Tunables for the greedy re-rank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankParams {
    /// Added when the candidate's genre is one the user prefers.
    pub genre_bonus: f64,
    /// Subtracted once per earlier pick of the same genre.
    pub duplicate_penalty: f64,
}

impl Default for RerankParams {
    fn default() -> Self {
        Self {
            genre_bonus: 0.05,
            duplicate_penalty: 0.07,
        }
    }
}

/// One greedy pick and the adjusted score it won with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pick {
    pub meeting_id: MeetingId,
    pub adjusted_score: f64,
}

/// Adjusted score of one candidate given the genres picked so far.
///
/// A meeting without a genre gets neither bonus nor penalty.
pub fn adjusted_score(
    similarity: f64,
    genre: Option<&str>,
    preferred: &HashSet<&str>,
    picked_per_genre: &HashMap<&str, usize>,
    params: &RerankParams,
) -> f64 {
    let Some(genre) = genre else {
        return similarity;
    };
    let bonus = if preferred.contains(genre) {
        params.genre_bonus
    } else {
        0.0
    };
    let repeats = picked_per_genre.get(genre).copied().unwrap_or(0);
    similarity + bonus - params.duplicate_penalty * repeats as f64
}

/// Greedily pick up to `top_k` meetings out of `candidates`.
///
/// `candidates` must already be eligible and in pool order; on equal adjusted
/// scores the earlier candidate wins.
pub fn greedy_rerank<'a>(
    candidates: &[(ScoredCandidate, &'a Meeting)],
    preferred_genres: &[String],
    top_k: usize,
    params: &RerankParams,
) -> Vec<Pick> {
    let preferred: HashSet<&str> = preferred_genres.iter().map(String::as_str).collect();
    let mut remaining: Vec<(ScoredCandidate, &'a Meeting)> = candidates.to_vec();
    let mut picked_per_genre: HashMap<&'a str, usize> = HashMap::new();
    let mut picks = Vec::with_capacity(top_k.min(remaining.len()));

    while picks.len() < top_k && !remaining.is_empty() {
        let mut best: Option<(usize, f64)> = None;
        for (pos, (candidate, meeting)) in remaining.iter().enumerate() {
            let score = adjusted_score(
                candidate.score,
                meeting.genre(),
                &preferred,
                &picked_per_genre,
                params,
            );
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((pos, score)),
            }
        }

        let Some((pos, adjusted)) = best else {
            break;
        };
        let (candidate, meeting) = remaining.remove(pos);
        if let Some(genre) = meeting.genre() {
            *picked_per_genre.entry(genre).or_insert(0) += 1;
        }
        picks.push(Pick {
            meeting_id: candidate.meeting_id,
            adjusted_score: adjusted,
        });
    }

    picks
}

/// Re-rank the recruiting candidates for one user and backfill if short.
pub fn rerank_with_genre_bonus<R: Rng + ?Sized>(
    scores: &[ScoredCandidate],
    catalog: &MeetingCatalog<'_>,
    preferred_genres: &[String],
    params: SelectionParams,
    rerank: RerankParams,
    requester: Option<UserId>,
    rng: &mut R,
) -> Vec<MeetingId> {
    let pool = candidate_pool(scores, params.candidate_pool);

    let eligible: Vec<(ScoredCandidate, &Meeting)> = pool
        .iter()
        .filter(|c| catalog.is_eligible(c.meeting_id, requester))
        .filter_map(|c| catalog.get(c.meeting_id).map(|m| (*c, m)))
        .collect();

    let picks = greedy_rerank(&eligible, preferred_genres, params.top_k, &rerank);
    debug!(
        user_id = ?requester,
        pool = pool.len(),
        eligible = eligible.len(),
        picked = picks.len(),
        "Greedy re-rank finished"
    );

    let mut selected: Vec<MeetingId> = picks.into_iter().map(|p| p.meeting_id).collect();
    backfill(&mut selected, &pool, catalog, requester, params.top_k, rng);
    selected.truncate(params.top_k);
    log_shortfall(requester, selected.len(), params.top_k);
    selected
}
