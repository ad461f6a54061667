//! Persistence Module
//!
//! Snapshot cache, precomputed distance export and the relational store.

mod cache_store;
pub mod distances;
pub mod snapshot;
mod sqlite;

pub use cache_store::{CacheOutcome, CacheStore};
pub use distances::{export_distances, DistanceRecord, ExportOptions};
pub use snapshot::SnapshotHeader;
pub use sqlite::SqliteStore;
