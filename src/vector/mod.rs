//! Vector Module
//!
//! Embedding matrix, lookup index, similarity and cluster queries.

mod cluster;
mod cluster_cache;
mod index;
mod matrix;
mod similarity;

pub use cluster::{top_k, ClusterService, Neighbor};
pub use cluster_cache::{ClusterCache, ClusterCacheStats};
pub use index::LookupIndex;
pub use matrix::EmbeddingMatrix;
pub use similarity::{batch_similarity, cosine_similarity, dot_product, magnitude};
