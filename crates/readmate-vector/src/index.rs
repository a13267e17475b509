//! In-memory vector index with brute-force inner-product search.
//!
//! Rows are L2-normalized on the way in, and queries on the way in to
//! `search`, so the inner product is the cosine similarity. All searches are
//! O(n), which is fine for a weekly catalog of meetings.
//!
//! The index is rebuilt from scratch for every batch run and is read-only
//! afterwards, so it carries no lock.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use readmate_core::error::{ReadmateError, Result};
use readmate_core::types::{MeetingId, MeetingStatus};

/// Metadata stored alongside each indexed vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub meeting_id: MeetingId,
    pub status: Option<MeetingStatus>,
}

/// A single hit returned from a vector search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub meeting_id: MeetingId,
    /// Cosine similarity in [-1.0, 1.0].
    pub score: f64,
}

/// In-memory vector index over meeting embeddings.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    vectors: Vec<Vec<f32>>,
    metadata: Vec<IndexMetadata>,
    by_meeting: HashMap<MeetingId, usize>,
    dimensions: usize,
}

impl VectorIndex {
    /// Create a new empty vector index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the index contents with `vectors`, aligned by position with
    /// `metadata`.
    ///
    /// Fails if the two lengths differ or if the vectors do not form a
    /// matrix (empty or ragged rows). On failure the previous contents are
    /// left untouched.
    pub fn build(&mut self, mut vectors: Vec<Vec<f32>>, metadata: Vec<IndexMetadata>) -> Result<()> {
        if vectors.len() != metadata.len() {
            return Err(ReadmateError::Index(format!(
                "vectors and metadata length mismatch ({} vs {})",
                vectors.len(),
                metadata.len()
            )));
        }

        let dimensions = vectors.first().map(Vec::len).unwrap_or(0);
        if !vectors.is_empty() && dimensions == 0 {
            return Err(ReadmateError::Index("vectors must not be empty rows".to_string()));
        }
        if let Some((row, v)) = vectors
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != dimensions)
        {
            return Err(ReadmateError::Index(format!(
                "vectors must be 2D: row {} has {} columns, expected {}",
                row,
                v.len(),
                dimensions
            )));
        }

        for v in &mut vectors {
            l2_normalize(v);
        }

        let mut by_meeting = HashMap::with_capacity(metadata.len());
        for (pos, meta) in metadata.iter().enumerate() {
            by_meeting.entry(meta.meeting_id).or_insert(pos);
        }

        self.vectors = vectors;
        self.metadata = metadata;
        self.by_meeting = by_meeting;
        self.dimensions = dimensions;
        Ok(())
    }

    /// Return the `k` stored vectors with the highest inner product against
    /// the normalized query, sorted by descending score.
    ///
    /// Equal scores keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(ReadmateError::Index(format!(
                "query has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut q = query.to_vec();
        l2_normalize(&mut q);

        let mut scored: Vec<(usize, f64)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(pos, v)| (pos, inner_product(&q, v)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        let hits = scored
            .into_iter()
            .filter_map(|(pos, score)| {
                self.metadata.get(pos).map(|meta| SearchHit {
                    meeting_id: meta.meeting_id,
                    score,
                })
            })
            .collect();

        Ok(hits)
    }

    /// Look up the metadata stored for a meeting.
    pub fn get_metadata(&self, meeting_id: MeetingId) -> Option<&IndexMetadata> {
        self.by_meeting
            .get(&meeting_id)
            .and_then(|&pos| self.metadata.get(pos))
    }

    /// Return the number of vectors currently stored in the index.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Return true if the index contains no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Dimension of the stored vectors, or 0 for an empty index.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Scale `v` to unit L2 norm in place. Zero vectors are left as they are.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn inner_product(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: MeetingId) -> IndexMetadata {
        IndexMetadata {
            meeting_id: id,
            status: Some(MeetingStatus::Recruiting),
        }
    }

    fn built(vectors: Vec<Vec<f32>>) -> VectorIndex {
        let metadata = (0..vectors.len() as i64).map(|i| meta(i + 1)).collect();
        let mut index = VectorIndex::new();
        index.build(vectors, metadata).unwrap();
        index
    }

    #[test]
    fn test_build_and_search() {
        let index = built(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.dimensions(), 2);

        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].meeting_id, 1);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].meeting_id, 3);
        assert!((hits[1].score - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert_eq!(hits[2].meeting_id, 2);
        assert!(hits[2].score.abs() < 1e-6);
    }

    #[test]
    fn test_scores_are_cosine_regardless_of_magnitude() {
        let index = built(vec![vec![10.0, 0.0], vec![0.0, 0.5]]);
        let hits = index.search(&[3.0, 0.0], 2).unwrap();
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert!(hits[1].score.abs() < 1e-6);
    }

    #[test]
    fn test_search_respects_k_limit() {
        let index = built(vec![vec![1.0; 8]; 10]);
        let hits = index.search(&[1.0; 8], 3).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_search_returns_fewer_than_k() {
        let index = built(vec![vec![1.0, 2.0], vec![2.0, 1.0]]);
        let hits = index.search(&[1.0, 1.0], 20).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_search_ties_keep_insertion_order() {
        let index = built(vec![vec![1.0, 0.0]; 4]);
        let hits = index.search(&[1.0, 0.0], 4).unwrap();
        let ids: Vec<MeetingId> = hits.iter().map(|h| h.meeting_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_search_empty_index() {
        let index = VectorIndex::new();
        let hits = index.search(&[1.0; 4], 10).unwrap();
        assert!(hits.is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_search_dimension_mismatch() {
        let index = built(vec![vec![1.0, 0.0]]);
        let result = index.search(&[1.0, 0.0, 0.0], 1);
        assert!(matches!(result, Err(ReadmateError::Index(_))));
    }

    #[test]
    fn test_build_length_mismatch() {
        let mut index = VectorIndex::new();
        let result = index.build(vec![vec![1.0, 0.0], vec![0.0, 1.0]], vec![meta(1)]);
        assert!(matches!(result, Err(ReadmateError::Index(_))));
    }

    #[test]
    fn test_build_rejects_ragged_rows() {
        let mut index = VectorIndex::new();
        let result = index.build(vec![vec![1.0, 0.0], vec![1.0]], vec![meta(1), meta(2)]);
        assert!(matches!(result, Err(ReadmateError::Index(_))));
    }

    #[test]
    fn test_build_rejects_empty_rows() {
        let mut index = VectorIndex::new();
        let result = index.build(vec![vec![]], vec![meta(1)]);
        assert!(matches!(result, Err(ReadmateError::Index(_))));
    }

    #[test]
    fn test_failed_build_keeps_previous_state() {
        let mut index = built(vec![vec![1.0, 0.0]]);
        let result = index.build(vec![vec![1.0], vec![1.0, 0.0]], vec![meta(5), meta(6)]);
        assert!(result.is_err());
        assert_eq!(index.len(), 1);
        assert!(index.get_metadata(1).is_some());
    }

    #[test]
    fn test_rebuild_discards_prior_state() {
        let mut index = built(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        index
            .build(vec![vec![0.0, 0.0, 1.0]], vec![meta(9)])
            .unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.dimensions(), 3);
        assert!(index.get_metadata(1).is_none());
        assert_eq!(index.get_metadata(9).unwrap().meeting_id, 9);
    }

    #[test]
    fn test_get_metadata() {
        let mut index = VectorIndex::new();
        index
            .build(
                vec![vec![1.0, 0.0], vec![0.0, 1.0]],
                vec![
                    meta(10),
                    IndexMetadata {
                        meeting_id: 20,
                        status: Some(MeetingStatus::Finished),
                    },
                ],
            )
            .unwrap();

        assert_eq!(
            index.get_metadata(20).unwrap().status,
            Some(MeetingStatus::Finished)
        );
        assert!(index.get_metadata(30).is_none());
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0f32, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0f32; 3];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0; 3]);
    }
}
