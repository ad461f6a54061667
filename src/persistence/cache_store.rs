//! Cache Store
//!
//! Read-through cache in front of the corpus loader.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::snapshot::{self, SnapshotHeader};
use crate::corpus::{CorpusLoader, Embeddings, LoadOptions};
use crate::error::{GloveError, Result};

/// How a `CacheStore::load` call was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Snapshot was fresh and returned as-is
    Hit,
    /// No snapshot existed
    Miss,
    /// Snapshot was built with a different limit
    Stale,
    /// Snapshot could not be decoded
    Corrupt,
}

/// Snapshot-backed cache of parsed embeddings
///
/// Freshness is judged only by the limit the snapshot was built with.
/// Edits to the source file are not detected; call `invalidate` after
/// replacing the source.
#[derive(Debug, Clone)]
pub struct CacheStore {
    cache_path: PathBuf,
    loader_options: LoadOptions,
}

impl CacheStore {
    pub fn new<P: Into<PathBuf>>(cache_path: P) -> Self {
        Self {
            cache_path: cache_path.into(),
            loader_options: LoadOptions::default(),
        }
    }

    /// Options used when the source has to be parsed (limit is overridden)
    pub fn with_loader_options(mut self, options: LoadOptions) -> Self {
        self.loader_options = options;
        self
    }

    pub fn path(&self) -> &Path {
        &self.cache_path
    }

    /// Whether a snapshot header satisfies a request for `limit` terms
    pub fn is_fresh(header: &SnapshotHeader, limit: Option<usize>) -> bool {
        header.limit == limit && limit.map_or(true, |l| header.count <= l)
    }

    /// Return cached embeddings for `limit`, parsing `source` on a miss.
    ///
    /// Parsed results are written back to the cache before returning.
    pub fn load(&self, source: &Path, limit: Option<usize>) -> Result<(Embeddings, CacheOutcome)> {
        let outcome = match snapshot::read_header(&self.cache_path) {
            Ok(header) if Self::is_fresh(&header, limit) => match snapshot::load(&self.cache_path) {
                Ok((_, embeddings)) => {
                    info!(
                        path = %self.cache_path.display(),
                        terms = embeddings.len(),
                        "Embeddings cache hit"
                    );
                    return Ok((embeddings, CacheOutcome::Hit));
                }
                Err(e) => self.classify_failure(e)?,
            },
            Ok(header) => {
                info!(
                    path = %self.cache_path.display(),
                    cached_limit = ?header.limit,
                    requested_limit = ?limit,
                    "Embeddings cache stale"
                );
                CacheOutcome::Stale
            }
            Err(e) => self.classify_failure(e)?,
        };

        let loader = CorpusLoader::new(self.loader_options.clone().with_limit(limit));
        let embeddings = loader.load(source)?;

        if let Err(e) = self.save(&embeddings, limit) {
            warn!(path = %self.cache_path.display(), error = %e, "Failed to write embeddings cache");
        }
        Ok((embeddings, outcome))
    }

    /// Atomically persist `embeddings` as the snapshot for `limit`
    pub fn save(&self, embeddings: &Embeddings, limit: Option<usize>) -> Result<()> {
        snapshot::save(&self.cache_path, embeddings, limit)?;
        info!(
            path = %self.cache_path.display(),
            terms = embeddings.len(),
            "Embeddings cache written"
        );
        Ok(())
    }

    /// Delete the snapshot; returns whether one existed
    pub fn invalidate(&self) -> Result<bool> {
        match fs::remove_file(&self.cache_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(GloveError::io(&self.cache_path, e)),
        }
    }

    /// Map a snapshot read failure onto a fallback outcome.
    ///
    /// A missing file is a miss; any other unreadable snapshot is treated as
    /// corrupt and the source is parsed again.
    fn classify_failure(&self, err: GloveError) -> Result<CacheOutcome> {
        match err {
            GloveError::Io { ref source, .. } if source.kind() == io::ErrorKind::NotFound => {
                Ok(CacheOutcome::Miss)
            }
            GloveError::CacheCorruption { .. } | GloveError::Io { .. } => {
                warn!(error = %err, "Embeddings cache unreadable, re-parsing source");
                Ok(CacheOutcome::Corrupt)
            }
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SOURCE: &str = "cat 1 0\ndog 0.9 0.1\ncar 0 1\n";

    fn fixture() -> (tempfile::TempDir, PathBuf, CacheStore) {
        let dir = tempdir().unwrap();
        let source = dir.path().join("glove.txt");
        fs::write(&source, SOURCE).unwrap();
        let store = CacheStore::new(dir.path().join("glove.cache"));
        (dir, source, store)
    }

    #[test]
    fn test_miss_then_hit() {
        let (_dir, source, store) = fixture();

        let (first, outcome) = store.load(&source, Some(2)).unwrap();
        assert_eq!(outcome, CacheOutcome::Miss);
        assert!(store.path().exists());

        let (second, outcome) = store.load(&source, Some(2)).unwrap();
        assert_eq!(outcome, CacheOutcome::Hit);
        assert_eq!(first, second);
        assert_eq!(second.terms(), &["cat", "dog"]);
    }

    #[test]
    fn test_hit_matches_fresh_parse() {
        let (_dir, source, store) = fixture();
        store.load(&source, None).unwrap();
        let (cached, outcome) = store.load(&source, None).unwrap();
        assert_eq!(outcome, CacheOutcome::Hit);

        let fresh = CorpusLoader::default().load(&source).unwrap();
        assert_eq!(cached, fresh);
    }

    #[test]
    fn test_limit_mismatch_reparses() {
        let (_dir, source, store) = fixture();
        store.load(&source, Some(2)).unwrap();

        let (emb, outcome) = store.load(&source, Some(3)).unwrap();
        assert_eq!(outcome, CacheOutcome::Stale);
        assert_eq!(emb.len(), 3);
        assert_eq!(snapshot::read_header(store.path()).unwrap().limit, Some(3));
    }

    #[test]
    fn test_short_source_still_hits() {
        let (_dir, source, store) = fixture();
        store.load(&source, Some(1000)).unwrap();
        let (emb, outcome) = store.load(&source, Some(1000)).unwrap();
        assert_eq!(outcome, CacheOutcome::Hit);
        assert_eq!(emb.len(), 3);
    }

    #[test]
    fn test_stale_source_returned_until_invalidated() {
        let (_dir, source, store) = fixture();
        store.load(&source, None).unwrap();

        fs::write(&source, "zebra 1 1\n").unwrap();
        let (emb, outcome) = store.load(&source, None).unwrap();
        assert_eq!(outcome, CacheOutcome::Hit);
        assert_eq!(emb.terms()[0], "cat");

        assert!(store.invalidate().unwrap());
        assert!(!store.invalidate().unwrap());
        let (emb, outcome) = store.load(&source, None).unwrap();
        assert_eq!(outcome, CacheOutcome::Miss);
        assert_eq!(emb.terms(), &["zebra"]);
    }

    #[test]
    fn test_corrupt_cache_is_rewritten() {
        let (_dir, source, store) = fixture();
        fs::write(store.path(), b"GLVS garbage").unwrap();

        let (emb, outcome) = store.load(&source, None).unwrap();
        assert_eq!(outcome, CacheOutcome::Corrupt);
        assert_eq!(emb.len(), 3);

        let (_, outcome) = store.load(&source, None).unwrap();
        assert_eq!(outcome, CacheOutcome::Hit);
    }

    #[test]
    fn test_format_error_is_not_cached() {
        let (_dir, source, store) = fixture();
        fs::write(&source, "cat 1 0\ndog x y\n").unwrap();
        assert!(matches!(
            store.load(&source, None),
            Err(GloveError::Format { line: 2, .. })
        ));
        assert!(!store.path().exists());
    }
}
