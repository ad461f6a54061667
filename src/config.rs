//! Engine Configuration

use std::path::PathBuf;

use crate::corpus::LoadOptions;

/// Configuration for opening a `Glove` engine
#[derive(Debug, Clone)]
pub struct GloveConfig {
    /// GloVe-format embeddings file
    pub source_path: PathBuf,

    /// Snapshot cache location (None = always parse the source)
    pub cache_path: Option<PathBuf>,

    /// Maximum number of distinct terms to load (None = whole file)
    pub limit: Option<usize>,

    /// Memoized clusters kept before LRU eviction (0 = unbounded)
    pub cluster_cache_capacity: usize,

    /// Source lines between progress reports
    pub progress_interval: usize,

    /// Stopword list, one per line (None = built-in English list)
    pub stopwords_path: Option<PathBuf>,
}

impl Default for GloveConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("glove.txt"),
            cache_path: None,
            limit: Some(100_000),
            cluster_cache_capacity: 10_000,
            progress_interval: 50_000,
            stopwords_path: None,
        }
    }
}

impl GloveConfig {
    pub fn new<P: Into<PathBuf>>(source_path: P) -> Self {
        Self {
            source_path: source_path.into(),
            ..Self::default()
        }
    }

    pub fn with_cache_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_cluster_cache_capacity(mut self, capacity: usize) -> Self {
        self.cluster_cache_capacity = capacity;
        self
    }

    pub fn with_progress_interval(mut self, lines: usize) -> Self {
        self.progress_interval = lines;
        self
    }

    pub fn with_stopwords_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.stopwords_path = Some(path.into());
        self
    }

    /// Loader options derived from this configuration
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions::default()
            .with_limit(self.limit)
            .with_progress_interval(self.progress_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = GloveConfig::new("vectors.txt")
            .with_cache_path("/tmp/vectors.cache")
            .with_limit(None)
            .with_cluster_cache_capacity(0);

        assert_eq!(config.source_path, PathBuf::from("vectors.txt"));
        assert_eq!(config.cache_path, Some(PathBuf::from("/tmp/vectors.cache")));
        assert_eq!(config.limit, None);
        assert_eq!(config.cluster_cache_capacity, 0);
        assert_eq!(config.load_options().limit, None);
    }
}
