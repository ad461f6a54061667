//! Vector Similarity Functions
//!
//! Cosine similarity uses the raw convention: results lie in [-1, 1],
//! 1 meaning identical direction.

use crate::error::{GloveError, Result};

/// Compute dot product of two vectors
///
/// Uses unrolled loop for better CPU performance.
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let len = a.len().min(b.len());
    let mut sum = 0.0f32;

    // Process 4 elements at a time (manual unrolling)
    let chunks = len / 4;
    let remainder = len % 4;

    for i in 0..chunks {
        let idx = i * 4;
        sum += a[idx] * b[idx];
        sum += a[idx + 1] * b[idx + 1];
        sum += a[idx + 2] * b[idx + 2];
        sum += a[idx + 3] * b[idx + 3];
    }

    for i in (len - remainder)..len {
        sum += a[i] * b[i];
    }

    sum
}

/// L2 norm
#[inline]
pub fn magnitude(v: &[f32]) -> f32 {
    dot_product(v, v).sqrt()
}

/// Compute cosine similarity between two vectors
///
/// Fails on mismatched dimensions or when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(GloveError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mag_a = magnitude(a);
    if mag_a == 0.0 {
        return Err(degenerate("left operand"));
    }
    let mag_b = magnitude(b);
    if mag_b == 0.0 {
        return Err(degenerate("right operand"));
    }

    Ok(clamp_score(dot_product(a, b) / (mag_a * mag_b)))
}

/// Score every row of a row-major matrix against `query`.
///
/// `row_norms[i]` must be the norm of row `i`. Rows with zero norm score
/// `NaN`; a zero-norm query fails.
pub fn batch_similarity(
    query: &[f32],
    values: &[f32],
    dimension: usize,
    row_norms: &[f32],
) -> Result<Vec<f32>> {
    if query.len() != dimension {
        return Err(GloveError::DimensionMismatch {
            expected: dimension,
            actual: query.len(),
        });
    }
    let query_norm = magnitude(query);
    if query_norm == 0.0 {
        return Err(degenerate("query"));
    }

    let scores = values
        .chunks_exact(dimension.max(1))
        .zip(row_norms)
        .map(|(row, &norm)| {
            if norm == 0.0 {
                f32::NAN
            } else {
                clamp_score(dot_product(query, row) / (query_norm * norm))
            }
        })
        .collect();
    Ok(scores)
}

#[inline]
fn clamp_score(score: f32) -> f32 {
    score.clamp(-1.0, 1.0)
}

fn degenerate(context: &str) -> GloveError {
    GloveError::DegenerateVector {
        context: context.to_string(),
    }
}
