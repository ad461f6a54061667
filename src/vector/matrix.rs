//! Embedding Matrix
//!
//! Immutable row-major matrix with per-row norms computed once at build time.

use super::similarity::{batch_similarity, magnitude};
use crate::corpus::Embeddings;
use crate::error::Result;

/// Embedding matrix with precomputed row norms
#[derive(Debug, Clone)]
pub struct EmbeddingMatrix {
    embeddings: Embeddings,
    norms: Vec<f32>,
}

impl EmbeddingMatrix {
    pub fn new(embeddings: Embeddings) -> Self {
        let norms: Vec<f32> = embeddings.iter().map(|(_, row)| magnitude(row)).collect();
        Self { embeddings, norms }
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.embeddings.dimension()
    }

    pub fn terms(&self) -> &[String] {
        self.embeddings.terms()
    }

    pub fn term(&self, index: usize) -> Option<&str> {
        self.embeddings.terms().get(index).map(String::as_str)
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        self.embeddings.row(index)
    }

    /// Precomputed L2 norm of row `index`
    pub fn norm(&self, index: usize) -> Option<f32> {
        self.norms.get(index).copied()
    }

    /// Number of rows whose norm is zero
    pub fn degenerate_rows(&self) -> usize {
        self.norms.iter().filter(|n| **n == 0.0).count()
    }

    pub fn embeddings(&self) -> &Embeddings {
        &self.embeddings
    }

    /// Cosine similarity of `query` against every row
    pub fn similarities(&self, query: &[f32]) -> Result<Vec<f32>> {
        batch_similarity(
            query,
            self.embeddings.values(),
            self.embeddings.dimension(),
            &self.norms,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norms_precomputed() {
        let mut emb = Embeddings::new(2);
        emb.push("a".into(), &[3.0, 4.0]).unwrap();
        emb.push("z".into(), &[0.0, 0.0]).unwrap();
        let matrix = EmbeddingMatrix::new(emb);

        assert_eq!(matrix.norm(0), Some(5.0));
        assert_eq!(matrix.norm(1), Some(0.0));
        assert_eq!(matrix.degenerate_rows(), 1);
        assert_eq!(matrix.term(1), Some("z"));

        let scores = matrix.similarities(&[3.0, 4.0]).unwrap();
        assert!((scores[0] - 1.0).abs() < 1e-6);
        assert!(scores[1].is_nan());
    }
}
