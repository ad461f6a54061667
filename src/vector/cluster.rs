//! Cluster Service
//!
//! Top-k nearest terms of a centroid term, memoized per centroid.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use super::cluster_cache::{ClusterCache, ClusterCacheStats};
use super::index::LookupIndex;
use crate::error::{GloveError, Result};

/// A cluster member and its cosine similarity to the centroid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub term: String,
    pub score: f32,
}

/// Descending score, ties by ascending row (first-seen order)
fn rank(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

/// Select the `k` best `(row, score)` pairs, best first.
///
/// `NaN` scores (degenerate rows) and `exclude` never appear in the output.
pub fn top_k(scores: &[f32], k: usize, exclude: Option<usize>) -> Vec<(usize, f32)> {
    if k == 0 {
        return Vec::new();
    }

    let mut candidates: Vec<(usize, f32)> = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(i, s)| !s.is_nan() && Some(*i) != exclude)
        .collect();

    if k < candidates.len() {
        candidates.select_nth_unstable_by(k - 1, rank);
        candidates.truncate(k);
    }
    candidates.sort_unstable_by(rank);
    candidates
}

/// Nearest-neighbor cluster queries over a lookup index
#[derive(Debug)]
pub struct ClusterService {
    index: Arc<LookupIndex>,
    cache: ClusterCache,
}

impl ClusterService {
    /// Create a service; `cache_capacity` 0 means unbounded memoization
    pub fn new(index: Arc<LookupIndex>, cache_capacity: usize) -> Self {
        Self {
            index,
            cache: ClusterCache::new(cache_capacity),
        }
    }

    /// Up to `k` terms nearest to `centroid`, the centroid itself first.
    ///
    /// Repeated queries for the same centroid with the same or a smaller `k`
    /// are answered from the memo table.
    pub fn get_cluster(&self, centroid: &str, k: usize) -> Result<Vec<Neighbor>> {
        if !self.index.contains(centroid) {
            return Err(GloveError::not_found(centroid));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        if let Some(hit) = self.cache.get(centroid, k) {
            debug!(centroid, k, "Cluster cache hit");
            return Ok(hit);
        }

        let generation = self.cache.generation();
        let neighbors = self.compute(centroid, k)?;
        self.cache.insert(centroid, k, neighbors.clone(), generation);
        Ok(neighbors)
    }

    /// Compute a cluster without consulting or filling the memo table
    pub fn compute(&self, centroid: &str, k: usize) -> Result<Vec<Neighbor>> {
        let row = self
            .index
            .index_of(centroid)
            .ok_or_else(|| GloveError::not_found(centroid))?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let matrix = self.index.matrix();
        let query = matrix.row(row).ok_or_else(|| GloveError::not_found(centroid))?;
        let scores = matrix.similarities(query).map_err(|e| match e {
            GloveError::DegenerateVector { .. } => GloveError::DegenerateVector {
                context: format!("centroid {:?}", centroid),
            },
            other => other,
        })?;

        let mut neighbors = Vec::with_capacity(k.min(matrix.len()));
        neighbors.push(Neighbor {
            term: centroid.to_string(),
            score: 1.0,
        });
        neighbors.extend(top_k(&scores, k - 1, Some(row)).into_iter().filter_map(
            |(i, score)| {
                matrix.term(i).map(|term| Neighbor {
                    term: term.to_string(),
                    score,
                })
            },
        ));
        Ok(neighbors)
    }

    /// Swap in a rebuilt index and drop every memoized cluster
    pub fn reset(&mut self, index: Arc<LookupIndex>) {
        self.index = index;
        self.cache.invalidate();
    }

    pub fn index(&self) -> &Arc<LookupIndex> {
        &self.index
    }

    pub fn cache_stats(&self) -> ClusterCacheStats {
        self.cache.stats()
    }
}
