//! Load Progress Reporting

use std::sync::Arc;
use tracing::info;

/// Snapshot of loader progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    /// Source lines consumed so far
    pub lines_read: usize,
    /// Source bytes consumed so far
    pub bytes_read: u64,
    /// Distinct terms accepted so far
    pub terms_loaded: usize,
    /// Size of the source, when known
    pub total_bytes: Option<u64>,
}

impl LoadProgress {
    /// Fraction of the source consumed, in [0, 1]
    pub fn fraction(&self) -> Option<f64> {
        self.total_bytes.map(|total| {
            if total == 0 {
                1.0
            } else {
                (self.bytes_read as f64 / total as f64).min(1.0)
            }
        })
    }
}

/// Progress observer invoked by the loader
pub type ProgressFn = Arc<dyn Fn(&LoadProgress) + Send + Sync>;

/// Observer that reports progress through `tracing`
pub fn log_progress() -> ProgressFn {
    Arc::new(|p: &LoadProgress| match p.fraction() {
        Some(f) => info!(
            lines = p.lines_read,
            terms = p.terms_loaded,
            "Loading embeddings: {:.1}%",
            f * 100.0
        ),
        None => info!(lines = p.lines_read, terms = p.terms_loaded, "Loading embeddings"),
    })
}
