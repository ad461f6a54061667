//! Lookup Index
//!
//! Term to row mapping over an immutable embedding matrix.

use hashbrown::HashMap;
use std::sync::Arc;

use super::matrix::EmbeddingMatrix;
use crate::error::{GloveError, Result};

/// O(1) membership and vector retrieval
///
/// Built in full from a matrix; a new vocabulary means a new index.
#[derive(Debug, Clone)]
pub struct LookupIndex {
    rows: HashMap<String, usize>,
    matrix: Arc<EmbeddingMatrix>,
}

impl LookupIndex {
    pub fn build(matrix: Arc<EmbeddingMatrix>) -> Self {
        let mut rows = HashMap::with_capacity(matrix.len());
        for (i, term) in matrix.terms().iter().enumerate() {
            // First occurrence wins; loaded vocabularies are already unique
            rows.entry(term.clone()).or_insert(i);
        }
        Self { rows, matrix }
    }

    #[inline]
    pub fn contains(&self, term: &str) -> bool {
        self.rows.contains_key(term)
    }

    #[inline]
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.rows.get(term).copied()
    }

    /// Vector for `term`, or `None` when out of vocabulary
    pub fn try_get(&self, term: &str) -> Option<&[f32]> {
        self.index_of(term).and_then(|i| self.matrix.row(i))
    }

    /// Vector for `term`, failing with `NotFound` when out of vocabulary
    pub fn get(&self, term: &str) -> Result<&[f32]> {
        self.try_get(term).ok_or_else(|| GloveError::not_found(term))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn matrix(&self) -> &Arc<EmbeddingMatrix> {
        &self.matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Embeddings;

    fn index() -> LookupIndex {
        let mut emb = Embeddings::new(2);
        emb.push("cat".into(), &[1.0, 0.0]).unwrap();
        emb.push("dog".into(), &[0.9, 0.1]).unwrap();
        emb.push("car".into(), &[0.0, 1.0]).unwrap();
        LookupIndex::build(Arc::new(EmbeddingMatrix::new(emb)))
    }

    #[test]
    fn test_contains_matches_vocabulary() {
        let idx = index();
        for term in idx.matrix().terms() {
            assert!(idx.contains(term));
            assert!(idx.get(term).is_ok());
        }
        assert!(!idx.contains("xyzzy"));
        assert!(!idx.contains("Cat"));
        assert_eq!(idx.len(), 3);
    }

    #[test]
    fn test_get_returns_row() {
        let idx = index();
        assert_eq!(idx.get("dog").unwrap(), &[0.9f32, 0.1][..]);
        assert_eq!(idx.index_of("car"), Some(2));
    }

    #[test]
    fn test_missing_term_is_not_found() {
        let idx = index();
        assert!(idx.try_get("xyzzy").is_none());
        match idx.get("xyzzy") {
            Err(GloveError::NotFound { term }) => assert_eq!(term, "xyzzy"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
