//! Relational Store
//!
//! SQLite-backed `embeddings` and `clusters` tables. Every call is a single
//! round trip with no retry.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::distances::{read_distances, DistanceRecord};
use crate::corpus::Embeddings;
use crate::error::{GloveError, Result};
use crate::vector::{ClusterService, EmbeddingMatrix, LookupIndex, Neighbor};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS embeddings (
    key TEXT PRIMARY KEY,
    embedding TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS clusters (
    term_a TEXT NOT NULL,
    term_b TEXT NOT NULL,
    distance REAL NOT NULL,
    UNIQUE (term_a, term_b)
);
CREATE INDEX IF NOT EXISTS idx_clusters_term_a ON clusters (term_a);
";

/// Embedding and precomputed-cluster tables in SQLite
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| GloveError::io(parent, e))?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert every embedding; existing keys are left untouched.
    ///
    /// Returns the number of rows actually inserted.
    pub fn import_embeddings(&self, embeddings: &Embeddings) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO embeddings (key, embedding) VALUES (?1, ?2)")?;
            for (term, vector) in embeddings.iter() {
                let json = serde_json::to_string(vector)?;
                inserted += stmt.execute(params![term, json])?;
            }
        }
        tx.commit()?;
        info!(inserted, total = embeddings.len(), "Imported embeddings");
        Ok(inserted)
    }

    /// Read all embeddings back in insertion order
    pub fn load_embeddings(&self) -> Result<Embeddings> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key, embedding FROM embeddings ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut embeddings = Embeddings::default();
        for row in rows {
            let (term, json) = row?;
            let vector: Vec<f32> = serde_json::from_str(&json)?;
            embeddings.push(term, &vector)?;
        }
        Ok(embeddings)
    }

    pub fn contains(&self, term: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let found = conn
            .query_row(
                "SELECT 1 FROM embeddings WHERE key = ?1",
                params![term],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn try_get(&self, term: &str) -> Result<Option<Vec<f32>>> {
        let json: Option<String> = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT embedding FROM embeddings WHERE key = ?1",
                params![term],
                |row| row.get(0),
            )
            .optional()?
        };
        json.map(|j| serde_json::from_str(&j).map_err(GloveError::from))
            .transpose()
    }

    pub fn get(&self, term: &str) -> Result<Vec<f32>> {
        self.try_get(term)?
            .ok_or_else(|| GloveError::not_found(term))
    }

    /// Insert or replace precomputed pairs; returns rows written
    pub fn import_clusters<I>(&self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = DistanceRecord>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO clusters (term_a, term_b, distance) VALUES (?1, ?2, ?3)",
            )?;
            for rec in records {
                written += stmt.execute(params![rec.term_a, rec.term_b, rec.score as f64])?;
            }
        }
        tx.commit()?;
        info!(written, "Imported cluster pairs");
        Ok(written)
    }

    /// Bulk-load a distances export file
    pub fn import_distances_file(&self, path: &Path) -> Result<usize> {
        let file = File::open(path).map_err(|e| GloveError::io(path, e))?;
        let records = read_distances(BufReader::new(file), path)?;
        self.import_clusters(records)
    }

    /// Cluster of `term`, best first.
    ///
    /// Served from the precomputed `clusters` rows, so the result is capped at
    /// the k the distances were exported with. A term with no precomputed rows
    /// is clustered on the fly from the stored embeddings.
    pub fn nearest(&self, term: &str, k: usize) -> Result<Vec<Neighbor>> {
        if !self.contains(term)? {
            return Err(GloveError::not_found(term));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let neighbors = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(
                "SELECT term_b, distance FROM clusters WHERE term_a = ?1 \
                 ORDER BY distance DESC, rowid LIMIT ?2",
            )?;
            let limit = i64::try_from(k).unwrap_or(i64::MAX);
            let rows = stmt.query_map(params![term, limit], |row| {
                Ok(Neighbor {
                    term: row.get(0)?,
                    score: row.get::<_, f64>(1)? as f32,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        if !neighbors.is_empty() {
            return Ok(neighbors);
        }

        debug!(term, k, "No precomputed cluster, scanning embeddings");
        self.scan_nearest(term, k)
    }

    fn scan_nearest(&self, term: &str, k: usize) -> Result<Vec<Neighbor>> {
        let matrix = EmbeddingMatrix::new(self.load_embeddings()?);
        let index = Arc::new(LookupIndex::build(Arc::new(matrix)));
        ClusterService::new(index, 1).compute(term, k)
    }

    pub fn len(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn cluster_pairs(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM clusters", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Vector length of the first stored embedding (0 when empty)
    pub fn dimension(&self) -> Result<usize> {
        let json: Option<String> = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT embedding FROM embeddings ORDER BY rowid LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?
        };
        match json {
            Some(j) => Ok(serde_json::from_str::<Vec<f32>>(&j)?.len()),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Embeddings {
        let mut emb = Embeddings::new(2);
        emb.push("cat".into(), &[1.0, 0.0]).unwrap();
        emb.push("dog".into(), &[0.9, 0.1]).unwrap();
        emb.push("car".into(), &[0.0, 1.0]).unwrap();
        emb
    }

    fn record(a: &str, b: &str, score: f32) -> DistanceRecord {
        DistanceRecord {
            term_a: a.into(),
            term_b: b.into(),
            score,
        }
    }

    #[test]
    fn test_import_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.import_embeddings(&sample()).unwrap(), 3);
        assert_eq!(store.import_embeddings(&sample()).unwrap(), 0);
        assert_eq!(store.len().unwrap(), 3);
        assert_eq!(store.dimension().unwrap(), 2);
    }

    #[test]
    fn test_lookup() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.import_embeddings(&sample()).unwrap();

        assert!(store.contains("dog").unwrap());
        assert!(!store.contains("xyzzy").unwrap());
        assert_eq!(store.get("dog").unwrap(), vec![0.9, 0.1]);
        assert!(store.try_get("xyzzy").unwrap().is_none());
        assert!(matches!(store.get("xyzzy"), Err(GloveError::NotFound { .. })));
    }

    #[test]
    fn test_load_embeddings_preserves_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.import_embeddings(&sample()).unwrap();
        assert_eq!(store.load_embeddings().unwrap(), sample());
    }

    #[test]
    fn test_nearest_from_precomputed_pairs() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.import_embeddings(&sample()).unwrap();
        store
            .import_clusters(vec![
                record("cat", "cat", 1.0),
                record("cat", "dog", 0.993884),
                record("cat", "car", 0.0),
            ])
            .unwrap();
        // Re-import replaces instead of duplicating
        store.import_clusters(vec![record("cat", "car", 0.0)]).unwrap();
        assert_eq!(store.cluster_pairs().unwrap(), 3);

        let cluster = store.nearest("cat", 2).unwrap();
        let terms: Vec<_> = cluster.iter().map(|n| n.term.as_str()).collect();
        assert_eq!(terms, vec!["cat", "dog"]);
        assert!(matches!(store.nearest("xyzzy", 2), Err(GloveError::NotFound { .. })));
    }

    #[test]
    fn test_nearest_without_precomputed_pairs_scans_embeddings() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.import_embeddings(&sample()).unwrap();
        store.import_clusters(vec![record("cat", "cat", 1.0)]).unwrap();

        let cluster = store.nearest("dog", 5).unwrap();
        let terms: Vec<_> = cluster.iter().map(|n| n.term.as_str()).collect();
        assert_eq!(terms, vec!["dog", "cat", "car"]);
        assert_eq!(cluster[0].score, 1.0);
        assert!(store.nearest("car", 0).unwrap().is_empty());

        let backend: &dyn crate::EmbeddingBackend = &store;
        let car = backend.nearest("car", 2).unwrap();
        assert_eq!(car.len(), 2);
        assert_eq!(car[0].term, "car");
    }

    #[test]
    fn test_open_file_and_import_distances() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("db").join("glove.sqlite");
        let distances = dir.path().join("distances.txt");
        std::fs::write(&distances, "\"cat\"|\"cat\"|1.000000\n\"cat\"|\"dog\"|0.993884\n").unwrap();

        let store = SqliteStore::open(&db).unwrap();
        store.import_embeddings(&sample()).unwrap();
        assert_eq!(store.import_distances_file(&distances).unwrap(), 2);
        drop(store);

        let reopened = SqliteStore::open(&db).unwrap();
        assert_eq!(reopened.nearest("cat", 10).unwrap().len(), 2);
    }
}
