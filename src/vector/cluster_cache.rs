//! Cluster Memoization
//!
//! Per-centroid cluster results with LRU eviction and generation-based
//! invalidation.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::cluster::Neighbor;

/// Entries inspected per eviction
const EVICTION_SAMPLES: usize = 5;

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterCacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub generation: u64,
}

#[derive(Debug)]
struct CachedCluster {
    neighbors: Arc<[Neighbor]>,
    /// k the entry was computed for
    requested_k: usize,
    generation: u64,
    last_access: AtomicU64,
}

impl CachedCluster {
    /// A shorter list than requested means the whole vocabulary was ranked
    fn covers(&self, k: usize) -> bool {
        k <= self.requested_k || self.neighbors.len() < self.requested_k
    }
}

/// Concurrent memoization table keyed by centroid term
///
/// Capacity 0 means unbounded. When bounded, overflow evicts the least
/// recently used of a small sample of centroids (approximate LRU).
#[derive(Debug)]
pub struct ClusterCache {
    entries: DashMap<String, CachedCluster>,
    capacity: usize,
    generation: AtomicU64,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ClusterCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
            generation: AtomicU64::new(0),
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Generation results must be computed against to be cached
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Cached top-`k` for `term`, if a covering entry exists
    pub fn get(&self, term: &str, k: usize) -> Option<Vec<Neighbor>> {
        let generation = self.generation();
        let hit = self.entries.get(term).and_then(|entry| {
            if entry.generation != generation || !entry.covers(k) {
                return None;
            }
            entry.last_access.store(self.tick(), Ordering::Relaxed);
            let n = k.min(entry.neighbors.len());
            Some(entry.neighbors[..n].to_vec())
        });

        match hit {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        hit
    }

    /// Store a result computed against `generation`.
    ///
    /// Stale results and results covering less than the existing entry are
    /// dropped.
    pub fn insert(&self, term: &str, k: usize, neighbors: Vec<Neighbor>, generation: u64) {
        if generation != self.generation() {
            debug!(term, "Dropping cluster computed against stale matrix");
            return;
        }

        let fresh = CachedCluster {
            neighbors: neighbors.into(),
            requested_k: k,
            generation,
            last_access: AtomicU64::new(self.tick()),
        };

        match self.entries.entry(term.to_string()) {
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get();
                if existing.generation != generation || existing.requested_k < k {
                    occupied.insert(fresh);
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
            }
        }

        self.evict_overflow();
    }

    /// Drop every entry and advance the generation
    pub fn invalidate(&self) -> u64 {
        let next = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.entries.clear();
        debug!(generation = next, "Cluster cache invalidated");
        next
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> ClusterCacheStats {
        ClusterCacheStats {
            entries: self.entries.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            generation: self.generation(),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn evict_overflow(&self) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() > self.capacity {
            let oldest = self
                .entries
                .iter()
                .take(EVICTION_SAMPLES)
                .min_by_key(|e| e.value().last_access.load(Ordering::Relaxed))
                .map(|e| e.key().clone());

            match oldest {
                Some(key) => {
                    if self.entries.remove(&key).is_some() {
                        self.evictions.fetch_add(1, Ordering::Relaxed);
                        debug!(term = %key, "Evicted cluster");
                    }
                }
                None => break,
            }
        }
    }
}
