//! Corpus Module
//!
//! Parsing of GloVe-style embedding files into a vocabulary and a
//! row-major matrix of vectors.

mod loader;
mod progress;

pub use loader::{parse_line, CorpusLoader, LoadOptions};
pub use progress::{log_progress, LoadProgress, ProgressFn};

use crate::error::{GloveError, Result};
use hashbrown::HashSet;

/// Vocabulary plus its parallel embedding rows
///
/// Row `i` of `values` (length `dimension`) belongs to `terms[i]`.
/// Terms are unique and keep their first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Embeddings {
    terms: Vec<String>,
    values: Vec<f32>,
    dimension: usize,
}

impl Embeddings {
    /// Create an empty set with a fixed dimension
    pub fn new(dimension: usize) -> Self {
        Self {
            terms: Vec::new(),
            values: Vec::new(),
            dimension,
        }
    }

    /// Build from already-separated parts, validating shape and uniqueness
    pub fn from_parts(terms: Vec<String>, values: Vec<f32>, dimension: usize) -> Result<Self> {
        let expected = terms.len() * dimension;
        if values.len() != expected {
            return Err(GloveError::DimensionMismatch {
                expected,
                actual: values.len(),
            });
        }

        {
            let mut seen = HashSet::with_capacity(terms.len());
            for term in &terms {
                if !seen.insert(term.as_str()) {
                    return Err(GloveError::DuplicateTerm { term: term.clone() });
                }
            }
        }

        Ok(Self {
            terms,
            values,
            dimension,
        })
    }

    /// Append a row. The first row fixes the dimension of an empty set.
    pub fn push(&mut self, term: String, vector: &[f32]) -> Result<()> {
        if self.terms.is_empty() && self.dimension == 0 {
            self.dimension = vector.len();
        }
        if vector.len() != self.dimension {
            return Err(GloveError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        self.terms.push(term);
        self.values.extend_from_slice(vector);
        Ok(())
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Vector stored at row `index`
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.terms.len() {
            return None;
        }
        let start = index * self.dimension;
        Some(&self.values[start..start + self.dimension])
    }

    /// Iterate `(term, vector)` pairs in vocabulary order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> + '_ {
        self.terms.iter().enumerate().map(move |(i, term)| {
            let start = i * self.dimension;
            (term.as_str(), &self.values[start..start + self.dimension])
        })
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<f32>, usize) {
        (self.terms, self.values, self.dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_fixes_dimension() {
        let mut emb = Embeddings::default();
        emb.push("cat".into(), &[1.0, 0.0]).unwrap();
        assert_eq!(emb.dimension(), 2);

        let err = emb.push("dog".into(), &[1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, GloveError::DimensionMismatch { expected: 2, actual: 3 }));
        assert_eq!(emb.len(), 1);
    }

    #[test]
    fn test_row_and_iter() {
        let mut emb = Embeddings::new(2);
        emb.push("cat".into(), &[1.0, 0.0]).unwrap();
        emb.push("dog".into(), &[0.9, 0.1]).unwrap();

        assert_eq!(emb.row(1), Some(&[0.9f32, 0.1][..]));
        assert_eq!(emb.row(2), None);

        let pairs: Vec<_> = emb.iter().collect();
        assert_eq!(pairs[0], ("cat", &[1.0f32, 0.0][..]));
        assert_eq!(pairs[1].0, "dog");
    }

    #[test]
    fn test_from_parts_keeps_terms() {
        let emb =
            Embeddings::from_parts(vec!["cat".into(), "dog".into()], vec![1.0, 0.0, 0.9, 0.1], 2)
                .unwrap();
        assert_eq!(emb.terms(), &["cat".to_string(), "dog".to_string()][..]);
        assert_eq!(emb.row(1), Some(&[0.9f32, 0.1][..]));
    }

    #[test]
    fn test_from_parts_rejects_bad_shape_and_duplicates() {
        let bad_shape = Embeddings::from_parts(vec!["a".into()], vec![1.0, 2.0, 3.0], 2);
        assert!(matches!(bad_shape, Err(GloveError::DimensionMismatch { .. })));

        let dup = Embeddings::from_parts(vec!["a".into(), "a".into()], vec![1.0, 2.0], 1);
        assert!(matches!(dup, Err(GloveError::DuplicateTerm { .. })));
    }
}
