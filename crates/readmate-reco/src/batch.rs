//! One weekly pass: embed, index, search, select, and assemble rows.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use readmate_core::config::RecommendConfig;
use readmate_core::error::{ReadmateError, Result};
use readmate_core::types::{Meeting, RecommendationRow, ScoredCandidate, User};
use readmate_vector::embedding::EmbeddingService;
use readmate_vector::index::{IndexMetadata, VectorIndex};

use crate::catalog::MeetingCatalog;
use crate::rerank::{rerank_with_genre_bonus, RerankParams};
use crate::rows::assemble_rows;
use crate::select::{select_recruiting_top_k, SelectionParams};
use crate::text::{meeting_text, user_query};

/// Users between two progress log lines.
const PROGRESS_EVERY: usize = 20;

/// Which selector turns nearest neighbors into the final list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Recruiting meetings in similarity order.
    RecruitingTopK,
    /// Greedy re-rank with genre bonus and duplicate-genre penalty.
    #[default]
    GenreRerank,
}

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::RecruitingTopK => "recruiting_top_k",
            Policy::GenreRerank => "genre_rerank",
        }
    }
}

impl FromStr for Policy {
    type Err = ReadmateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recruiting_top_k" | "top_k" => Ok(Policy::RecruitingTopK),
            "genre_rerank" | "rerank" => Ok(Policy::GenreRerank),
            other => Err(ReadmateError::Config(format!(
                "unknown policy '{}' (expected 'recruiting_top_k' or 'genre_rerank')",
                other
            ))),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one run needs besides its data and embedder.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSettings {
    pub top_k: usize,
    pub search_k: usize,
    pub policy: Policy,
    pub rerank: RerankParams,
    /// Seed for the random backfill order. `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            search_k: 20,
            policy: Policy::default(),
            rerank: RerankParams::default(),
            seed: None,
        }
    }
}

impl BatchSettings {
    /// Build settings from the `[recommend]` section. Validates the result.
    pub fn from_config(config: &RecommendConfig) -> Result<Self> {
        let settings = Self {
            top_k: config.top_k,
            search_k: config.search_k,
            policy: config.policy.parse()?,
            rerank: RerankParams {
                genre_bonus: config.genre_bonus,
                duplicate_penalty: config.duplicate_penalty,
            },
            seed: config.seed,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(ReadmateError::Config("top_k must be at least 1".to_string()));
        }
        if self.search_k < self.top_k {
            return Err(ReadmateError::PoolSmallerThanTopK {
                top_k: self.top_k,
                search_k: self.search_k,
            });
        }
        if !self.rerank.genre_bonus.is_finite() || !self.rerank.duplicate_penalty.is_finite() {
            return Err(ReadmateError::Config(
                "genre_bonus and duplicate_penalty must be finite".to_string(),
            ));
        }
        Ok(())
    }

    fn selection(&self) -> SelectionParams {
        SelectionParams::new(self.top_k, self.search_k)
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

/// Wall-clock time spent in the embedder, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTimings {
    pub embed_meeting_ms: u64,
    pub embed_user_ms: u64,
}

/// Rows produced by one batch plus bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    pub rows: Vec<RecommendationRow>,
    pub users: usize,
    pub timings: BatchTimings,
}

/// Generates weekly recommendation rows with a borrowed embedder.
pub struct RecommendationBatch<'e> {
    embedder: &'e dyn EmbeddingService,
    settings: BatchSettings,
}

impl<'e> RecommendationBatch<'e> {
    pub fn new(embedder: &'e dyn EmbeddingService, settings: BatchSettings) -> Self {
        Self { embedder, settings }
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Produce ranked rows for every user.
    ///
    /// Any embedding or index failure aborts the whole batch. Users that end
    /// up with no eligible meetings contribute no rows.
    pub fn generate_rows(
        &self,
        meetings: &[Meeting],
        users: &[User],
        week_start: NaiveDate,
    ) -> Result<BatchOutput> {
        self.settings.validate()?;

        let catalog = MeetingCatalog::new(meetings);
        if catalog.is_empty() {
            return Err(ReadmateError::NoData("no meetings to recommend".to_string()));
        }
        if users.is_empty() {
            return Err(ReadmateError::NoData("no users to recommend for".to_string()));
        }

        let meeting_texts: Vec<String> = catalog.iter().map(meeting_text).collect();
        let started = Instant::now();
        let meeting_vectors = self.encode_all(&meeting_texts, "meeting")?;
        let embed_meeting_ms = elapsed_ms(started);

        let metadata: Vec<IndexMetadata> = catalog
            .iter()
            .map(|m| IndexMetadata {
                meeting_id: m.id,
                status: m.status.clone(),
            })
            .collect();
        let mut index = VectorIndex::new();
        index.build(meeting_vectors, metadata)?;
        info!(
            meetings = index.len(),
            dimensions = index.dimensions(),
            embed_ms = embed_meeting_ms,
            "Meeting index built"
        );

        let queries: Vec<String> = users.iter().map(user_query).collect();
        let started = Instant::now();
        let user_vectors = self.encode_all(&queries, "user")?;
        let embed_user_ms = elapsed_ms(started);
        info!(users = users.len(), embed_ms = embed_user_ms, "User queries embedded");

        let selection = self.settings.selection();
        let mut rng = self.settings.rng();
        let per_user = self.settings.top_k.min(catalog.len());
        let mut rows = Vec::with_capacity(users.len().saturating_mul(per_user));

        for (done, (user, vector)) in users.iter().zip(&user_vectors).enumerate() {
            let scores: Vec<ScoredCandidate> = index
                .search(vector, self.settings.search_k)?
                .into_iter()
                .map(|hit| ScoredCandidate::new(hit.meeting_id, hit.score))
                .collect();

            let picked = match self.settings.policy {
                Policy::RecruitingTopK => {
                    select_recruiting_top_k(&scores, &catalog, selection, Some(user.id), &mut rng)
                }
                Policy::GenreRerank => rerank_with_genre_bonus(
                    &scores,
                    &catalog,
                    &user.genre_codes,
                    selection,
                    self.settings.rerank,
                    Some(user.id),
                    &mut rng,
                ),
            };
            debug!(user_id = user.id, picked = ?picked, "Recommendations selected");
            rows.extend(assemble_rows(user.id, &picked, week_start));

            if (done + 1) % PROGRESS_EVERY == 0 {
                info!(processed = done + 1, total = users.len(), "Batch progress");
            }
        }

        info!(
            rows = rows.len(),
            users = users.len(),
            policy = %self.settings.policy,
            %week_start,
            "Recommendation batch complete"
        );

        Ok(BatchOutput {
            rows,
            users: users.len(),
            timings: BatchTimings {
                embed_meeting_ms,
                embed_user_ms,
            },
        })
    }

    fn encode_all(&self, texts: &[String], kind: &str) -> Result<Vec<Vec<f32>>> {
        let vectors = self.embedder.encode(texts)?;
        if vectors.len() != texts.len() {
            return Err(ReadmateError::Embedding(format!(
                "{} embedding returned {} vectors for {} texts",
                kind,
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use readmate_core::types::MeetingStatus;
    use readmate_vector::embedding::MockEmbedding;

    struct ShortEmbedder;

    impl EmbeddingService for ShortEmbedder {
        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().skip(1).map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn meetings() -> Vec<Meeting> {
        (1..=8)
            .map(|i| {
                let status = if i % 4 == 0 {
                    MeetingStatus::Finished
                } else {
                    MeetingStatus::Recruiting
                };
                let mut m = Meeting::new(i, Some(["SF", "ESSAY", "HISTORY"][i as usize % 3]), status);
                m.title = format!("Circle {}", i);
                m.description = format!("Reading group number {}", i);
                m
            })
            .collect()
    }

    fn users() -> Vec<User> {
        (100..103)
            .map(|id| User {
                id,
                reading_volume_code: Some("V2".to_string()),
                purpose_codes: vec!["HABIT".to_string()],
                genre_codes: vec!["SF".to_string()],
            })
            .collect()
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("genre_rerank".parse::<Policy>().unwrap(), Policy::GenreRerank);
        assert_eq!(
            " Recruiting_Top_K ".parse::<Policy>().unwrap(),
            Policy::RecruitingTopK
        );
        assert!("nearest".parse::<Policy>().is_err());
        assert_eq!(Policy::RecruitingTopK.to_string(), "recruiting_top_k");
    }

    #[test]
    fn test_settings_from_config() {
        let config = RecommendConfig {
            policy: "recruiting_top_k".to_string(),
            seed: Some(7),
            ..RecommendConfig::default()
        };
        let settings = BatchSettings::from_config(&config).unwrap();
        assert_eq!(settings.policy, Policy::RecruitingTopK);
        assert_eq!(settings.top_k, 4);
        assert_eq!(settings.search_k, 20);
        assert_eq!(settings.seed, Some(7));
    }

    #[test]
    fn test_settings_reject_small_pool() {
        let settings = BatchSettings {
            top_k: 5,
            search_k: 3,
            ..BatchSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ReadmateError::PoolSmallerThanTopK { top_k: 5, search_k: 3 })
        ));
    }

    #[test]
    fn test_invalid_settings_fail_before_embedding() {
        let embedder = ShortEmbedder;
        let batch = RecommendationBatch::new(
            &embedder,
            BatchSettings {
                top_k: 4,
                search_k: 2,
                ..BatchSettings::default()
            },
        );
        let err = batch
            .generate_rows(&meetings(), &users(), monday())
            .unwrap_err();
        assert!(matches!(err, ReadmateError::PoolSmallerThanTopK { .. }));
    }

    #[test]
    fn test_generate_rows_for_every_user() {
        let embedder = MockEmbedding::with_dimensions(64);
        let settings = BatchSettings {
            top_k: 3,
            search_k: 6,
            seed: Some(1),
            ..BatchSettings::default()
        };
        let batch = RecommendationBatch::new(&embedder, settings);
        let meetings = meetings();
        let output = batch.generate_rows(&meetings, &users(), monday()).unwrap();

        assert_eq!(output.users, 3);
        assert_eq!(output.rows.len(), 9);
        for row in &output.rows {
            assert_eq!(row.week_start_date, monday());
            assert!((1..=3).contains(&row.rank));
            let meeting = meetings.iter().find(|m| m.id == row.meeting_id).unwrap();
            assert!(meeting.is_recruiting());
        }
    }

    #[test]
    fn test_huge_top_k_is_bounded_by_catalog() {
        let embedder = MockEmbedding::with_dimensions(16);
        let settings = BatchSettings {
            top_k: usize::MAX / 2,
            search_k: usize::MAX,
            seed: Some(3),
            ..BatchSettings::default()
        };
        assert!(settings.validate().is_ok());

        let batch = RecommendationBatch::new(&embedder, settings);
        let output = batch.generate_rows(&meetings(), &users(), monday()).unwrap();

        // Six of the eight meetings are recruiting.
        assert_eq!(output.rows.len(), 3 * 6);
    }

    #[test]
    fn test_embedding_count_mismatch_aborts() {
        let embedder = ShortEmbedder;
        let batch = RecommendationBatch::new(&embedder, BatchSettings::default());
        let err = batch
            .generate_rows(&meetings(), &users(), monday())
            .unwrap_err();
        assert!(matches!(err, ReadmateError::Embedding(_)));
    }

    #[test]
    fn test_empty_inputs_are_no_data() {
        let embedder = MockEmbedding::new();
        let batch = RecommendationBatch::new(&embedder, BatchSettings::default());
        assert!(matches!(
            batch.generate_rows(&[], &users(), monday()),
            Err(ReadmateError::NoData(_))
        ));
        assert!(matches!(
            batch.generate_rows(&meetings(), &[], monday()),
            Err(ReadmateError::NoData(_))
        ));
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let embedder = MockEmbedding::with_dimensions(32);
        let settings = BatchSettings {
            top_k: 4,
            search_k: 4,
            seed: Some(99),
            ..BatchSettings::default()
        };
        let batch = RecommendationBatch::new(&embedder, settings);
        let a = batch.generate_rows(&meetings(), &users(), monday()).unwrap();
        let b = batch.generate_rows(&meetings(), &users(), monday()).unwrap();
        assert_eq!(a.rows, b.rows);
    }
}
