//! Glove Engine
//!
//! Wires the loader, snapshot cache, lookup index and cluster service
//! into one in-memory engine.

use std::io::Write;
use std::sync::Arc;
use tracing::info;

use crate::backend::EmbeddingBackend;
use crate::config::GloveConfig;
use crate::corpus::{CorpusLoader, Embeddings, LoadOptions};
use crate::error::{GloveError, Result};
use crate::persistence::{export_distances, CacheOutcome, CacheStore, ExportOptions};
use crate::text::{tokenize, Stopwords};
use crate::vector::{
    cosine_similarity, ClusterCacheStats, ClusterService, EmbeddingMatrix, LookupIndex, Neighbor,
};

/// In-memory embedding engine
///
/// Vocabulary, matrix and index are immutable once built; only the cluster
/// memo table changes under shared access.
#[derive(Debug)]
pub struct Glove {
    index: Arc<LookupIndex>,
    clusters: ClusterService,
    stopwords: Stopwords,
    cache_outcome: Option<CacheOutcome>,
}

impl Glove {
    /// Load embeddings as configured, going through the snapshot cache when
    /// one is configured
    pub fn open(config: &GloveConfig) -> Result<Self> {
        Self::open_with(config, config.load_options())
    }

    /// Like `open`, with caller-supplied progress and cancellation hooks
    pub fn open_with(config: &GloveConfig, options: LoadOptions) -> Result<Self> {
        let options = options.with_limit(config.limit);
        let (embeddings, outcome) = match &config.cache_path {
            Some(cache_path) => {
                let store = CacheStore::new(cache_path).with_loader_options(options);
                let (embeddings, outcome) = store.load(&config.source_path, config.limit)?;
                (embeddings, Some(outcome))
            }
            None => (CorpusLoader::new(options).load(&config.source_path)?, None),
        };

        let mut glove = Self::from_embeddings(embeddings, config)?;
        glove.cache_outcome = outcome;
        Ok(glove)
    }

    /// Build from already-loaded embeddings; the source and cache settings
    /// of `config` are unused
    pub fn from_embeddings(embeddings: Embeddings, config: &GloveConfig) -> Result<Self> {
        let stopwords = match &config.stopwords_path {
            Some(path) => Stopwords::from_file(path)?,
            None => Stopwords::english(),
        };
        Ok(Self::build(embeddings, config.cluster_cache_capacity, stopwords))
    }

    fn build(embeddings: Embeddings, cluster_cache_capacity: usize, stopwords: Stopwords) -> Self {
        let index = Arc::new(Self::index_for(embeddings));
        info!(
            terms = index.len(),
            dimension = index.matrix().dimension(),
            "Lookup index built"
        );
        Self {
            clusters: ClusterService::new(index.clone(), cluster_cache_capacity),
            index,
            stopwords,
            cache_outcome: None,
        }
    }

    fn index_for(embeddings: Embeddings) -> LookupIndex {
        let matrix = EmbeddingMatrix::new(embeddings);
        let degenerate = matrix.degenerate_rows();
        if degenerate > 0 {
            tracing::warn!(rows = degenerate, "Zero-norm vectors excluded from clusters");
        }
        LookupIndex::build(Arc::new(matrix))
    }

    /// Replace the vocabulary, rebuilding the index and dropping every
    /// memoized cluster
    pub fn replace(&mut self, embeddings: Embeddings) {
        let index = Arc::new(Self::index_for(embeddings));
        self.clusters.reset(index.clone());
        self.index = index;
        self.cache_outcome = None;
        info!(terms = self.index.len(), "Vocabulary replaced");
    }

    #[inline]
    pub fn contains(&self, term: &str) -> bool {
        self.index.contains(term)
    }

    pub fn try_get(&self, term: &str) -> Option<&[f32]> {
        self.index.try_get(term)
    }

    pub fn get(&self, term: &str) -> Result<&[f32]> {
        self.index.get(term)
    }

    /// Cosine similarity between two in-vocabulary terms
    pub fn similarity(&self, a: &str, b: &str) -> Result<f32> {
        let va = self.get(a)?;
        let vb = self.get(b)?;
        cosine_similarity(va, vb).map_err(|e| match e {
            GloveError::DegenerateVector { .. } => GloveError::DegenerateVector {
                context: format!("similarity of {:?} and {:?}", a, b),
            },
            other => other,
        })
    }

    /// Up to `k` nearest terms to `term`, memoized
    pub fn cluster(&self, term: &str, k: usize) -> Result<Vec<Neighbor>> {
        self.clusters.get_cluster(term, k)
    }

    /// In-vocabulary, non-stopword terms of `text`
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        tokenize(text, &self.stopwords, |t| self.contains(t))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.matrix().dimension()
    }

    pub fn terms(&self) -> &[String] {
        self.index.matrix().terms()
    }

    pub fn embeddings(&self) -> &Embeddings {
        self.index.matrix().embeddings()
    }

    pub fn stopwords(&self) -> &Stopwords {
        &self.stopwords
    }

    pub fn cluster_service(&self) -> &ClusterService {
        &self.clusters
    }

    pub fn cluster_stats(&self) -> ClusterCacheStats {
        self.clusters.cache_stats()
    }

    /// Write every term's cluster as distance lines; returns lines written
    pub fn export_distances<W: Write>(&self, writer: &mut W, options: &ExportOptions) -> Result<usize> {
        export_distances(&self.clusters, writer, options)
    }

    /// How the snapshot cache served the last `open`, if one was used
    pub fn cache_outcome(&self) -> Option<CacheOutcome> {
        self.cache_outcome
    }
}

impl EmbeddingBackend for Glove {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn contains_term(&self, term: &str) -> Result<bool> {
        Ok(self.contains(term))
    }

    fn vector(&self, term: &str) -> Result<Option<Vec<f32>>> {
        Ok(self.try_get(term).map(<[f32]>::to_vec))
    }

    fn nearest(&self, term: &str, k: usize) -> Result<Vec<Neighbor>> {
        self.cluster(term, k)
    }

    fn vocabulary_size(&self) -> Result<usize> {
        Ok(self.len())
    }

    fn dimension(&self) -> Result<usize> {
        Ok(Glove::dimension(self))
    }

    fn similarity(&self, a: &str, b: &str) -> Result<f32> {
        Glove::similarity(self, a, b)
    }
}
