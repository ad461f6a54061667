//! Embedding Backends
//!
//! Lookup surface shared by the in-memory engine and the relational store.

use crate::error::{GloveError, Result};
use crate::persistence::SqliteStore;
use crate::vector::{cosine_similarity, Neighbor};

/// Pluggable term lookup and cluster retrieval
pub trait EmbeddingBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    fn contains_term(&self, term: &str) -> Result<bool>;

    /// Vector for `term`, `None` when out of vocabulary
    fn vector(&self, term: &str) -> Result<Option<Vec<f32>>>;

    /// Up to `k` nearest terms, `term` itself first
    fn nearest(&self, term: &str, k: usize) -> Result<Vec<Neighbor>>;

    fn vocabulary_size(&self) -> Result<usize>;

    fn dimension(&self) -> Result<usize>;

    /// Vector for `term`, failing with `NotFound` when out of vocabulary
    fn require_vector(&self, term: &str) -> Result<Vec<f32>> {
        self.vector(term)?
            .ok_or_else(|| GloveError::not_found(term))
    }

    /// Cosine similarity between two terms
    fn similarity(&self, a: &str, b: &str) -> Result<f32> {
        let va = self.require_vector(a)?;
        let vb = self.require_vector(b)?;
        cosine_similarity(&va, &vb)
    }
}

impl EmbeddingBackend for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn contains_term(&self, term: &str) -> Result<bool> {
        self.contains(term)
    }

    fn vector(&self, term: &str) -> Result<Option<Vec<f32>>> {
        self.try_get(term)
    }

    fn nearest(&self, term: &str, k: usize) -> Result<Vec<Neighbor>> {
        SqliteStore::nearest(self, term, k)
    }

    fn vocabulary_size(&self) -> Result<usize> {
        self.len()
    }

    fn dimension(&self) -> Result<usize> {
        SqliteStore::dimension(self)
    }
}
