//! Error Types
//!
//! Typed failures for loading, caching, lookup and similarity.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, GloveError>;

/// Errors raised by the embedding cache
#[derive(Debug, Error)]
pub enum GloveError {
    /// Malformed line in the embeddings source file
    #[error("format error in {path} line {line}: {reason}")]
    Format {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Term is not part of the vocabulary
    #[error("term not found: {term:?}")]
    NotFound { term: String },

    /// A zero-norm vector took part in a similarity computation
    #[error("degenerate (zero-norm) vector: {context}")]
    DegenerateVector { context: String },

    #[error("duplicate term in vocabulary: {term:?}")]
    DuplicateTerm { term: String },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Cache snapshot could not be deserialized
    #[error("cache corruption in {path}: {reason}")]
    CacheCorruption { path: PathBuf, reason: String },

    #[error("load cancelled after {lines_read} lines")]
    Cancelled { lines_read: usize },

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GloveError {
    pub fn not_found(term: impl Into<String>) -> Self {
        Self::NotFound { term: term.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the caller can recover by skipping or substituting the term
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = GloveError::Format {
            path: PathBuf::from("glove.txt"),
            line: 17,
            reason: "non-numeric value \"abc\"".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("glove.txt"));
        assert!(msg.contains("line 17"));

        let err = GloveError::not_found("xyzzy");
        assert!(err.to_string().contains("xyzzy"));
        assert!(err.is_not_found());
    }
}
