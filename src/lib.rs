//! glovecache - GloVe Embedding Cache and Nearest-Neighbor Engine
//!
//! Loads GloVe-format word vectors, keeps a binary snapshot cache of the
//! parsed vocabulary, and answers membership, vector, similarity and
//! nearest-neighbor cluster queries in process, over a relational store,
//! or through a binary TCP protocol (GLVC).

pub mod backend;
pub mod client;
pub mod config;
pub mod corpus;
pub mod error;
pub mod glove;
pub mod metrics;
pub mod persistence;
pub mod protocol;
pub mod server;
pub mod text;
pub mod vector;

pub use backend::EmbeddingBackend;
pub use client::{Client, ClientError};
pub use config::GloveConfig;
pub use corpus::{CorpusLoader, Embeddings, LoadOptions, LoadProgress};
pub use error::{GloveError, Result};
pub use glove::Glove;
pub use metrics::Metrics;
pub use persistence::{CacheOutcome, CacheStore, ExportOptions, SqliteStore};
pub use protocol::{Command, Frame, GlvcCodec, Response};
pub use server::{Config, Server};
pub use text::Stopwords;
pub use vector::{ClusterService, LookupIndex, Neighbor};
