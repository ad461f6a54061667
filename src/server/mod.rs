//! Server Module
//!
//! TCP server answering GLVC requests from an embedding backend. Network
//! I/O runs on tokio; lookups and cluster computation run on a pool of OS
//! worker threads fed through a bounded queue.

mod command_queue;
mod config;
mod handler;
mod worker_pool;

pub use command_queue::{CommandQueue, WorkItem};
pub use config::Config;
pub use handler::{Executor, Handler};
pub use worker_pool::{WorkerPool, WorkerPoolConfig};

use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::codec::Framed;
use tracing::{debug, error, info};

use crate::backend::EmbeddingBackend;
use crate::metrics::Metrics;
use crate::protocol::GlvcCodec;
use crate::text::Stopwords;

/// Embedding lookup server
pub struct Server {
    config: Config,
    executor: Executor,
}

impl Server {
    pub fn new(config: Config, backend: Arc<dyn EmbeddingBackend>, stopwords: Stopwords) -> Self {
        let executor = Executor::new(
            backend,
            Arc::new(stopwords),
            Arc::new(Metrics::new()),
            config.default_k,
        );
        Self { config, executor }
    }

    /// Bind the configured address and serve forever
    pub async fn run(self) -> std::io::Result<()> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already-bound listener
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let worker_config = WorkerPoolConfig {
            num_workers: self.config.effective_workers(),
            pin_to_cores: self.config.pin_to_cores,
            queue_capacity: self.config.queue_capacity,
        };
        let mut worker_pool = WorkerPool::new(worker_config, self.executor.clone());
        worker_pool.start()?;

        info!(
            "Server listening on {} with {} workers",
            listener.local_addr()?,
            worker_pool.num_workers()
        );

        let queue = worker_pool.queue().clone();

        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    debug!("New connection from {}", peer_addr);
                    let _ = socket.set_nodelay(true);

                    let handler = Handler::new(queue.clone());
                    tokio::spawn(async move {
                        let framed = Framed::new(socket, GlvcCodec::new());
                        if let Err(e) = handler.run(framed).await {
                            error!("Connection error from {}: {}", peer_addr, e);
                        }
                        debug!("Connection closed: {}", peer_addr);
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        self.executor.metrics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::config::GloveConfig;
    use crate::corpus::Embeddings;
    use crate::glove::Glove;
    use crate::persistence::SqliteStore;

    fn sample() -> Embeddings {
        let mut emb = Embeddings::new(2);
        emb.push("cat".into(), &[1.0, 0.0]).unwrap();
        emb.push("dog".into(), &[0.9, 0.1]).unwrap();
        emb.push("car".into(), &[0.0, 1.0]).unwrap();
        emb
    }

    async fn spawn(backend: Arc<dyn EmbeddingBackend>) -> (String, Arc<Metrics>) {
        let config = Config::default().with_workers(2).with_default_k(2);
        let server = Server::new(config, backend, Stopwords::english());
        let metrics = server.metrics().clone();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(server.serve(listener));
        (addr, metrics)
    }

    #[tokio::test]
    async fn test_serve_memory_backend() {
        let glove = Glove::from_embeddings(sample(), &GloveConfig::default()).unwrap();
        let (addr, metrics) = spawn(Arc::new(glove)).await;
        let mut client = Client::connect(&addr).await.unwrap();

        client.ping().await.unwrap();
        assert!(client.contains("cat").await.unwrap());
        assert!(!client.contains("xyzzy").await.unwrap());
        assert_eq!(client.get("dog").await.unwrap(), Some(vec![0.9, 0.1]));
        assert_eq!(client.get("xyzzy").await.unwrap(), None);

        let cluster = client.cluster("cat", None).await.unwrap().unwrap();
        let terms: Vec<_> = cluster.iter().map(|n| n.term.as_str()).collect();
        assert_eq!(terms, vec!["cat", "dog"]);
        assert_eq!(client.cluster("cat", Some(100)).await.unwrap().unwrap().len(), 3);
        assert!(client.cluster("xyzzy", Some(2)).await.unwrap().is_none());

        let score = client.similarity("car", "car").await.unwrap().unwrap();
        assert!((score - 1.0).abs() < 1e-6);
        assert_eq!(
            client.tokenize("the cat chased a car").await.unwrap(),
            vec!["cat", "car"]
        );

        assert_eq!(metrics.total_ops(), 10);
    }

    #[tokio::test]
    async fn test_serve_sqlite_backend() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.import_embeddings(&sample()).unwrap();
        store
            .import_clusters(vec![
                crate::persistence::DistanceRecord {
                    term_a: "cat".into(),
                    term_b: "cat".into(),
                    score: 1.0,
                },
                crate::persistence::DistanceRecord {
                    term_a: "cat".into(),
                    term_b: "dog".into(),
                    score: 0.99,
                },
            ])
            .unwrap();
        let (addr, _) = spawn(Arc::new(store)).await;
        let mut client = Client::connect(&addr).await.unwrap();

        let cluster = client.cluster("cat", Some(5)).await.unwrap().unwrap();
        assert_eq!(cluster.len(), 2);
        assert_eq!(cluster[1].term, "dog");

        let info = client.info().await.unwrap();
        assert!(info.contains(&"backend:sqlite".to_string()));
        assert!(info.contains(&"terms:3".to_string()));
    }

    #[tokio::test]
    async fn test_many_clients() {
        let glove = Glove::from_embeddings(sample(), &GloveConfig::default()).unwrap();
        let (addr, metrics) = spawn(Arc::new(glove)).await;

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let addr = addr.clone();
            tasks.push(tokio::spawn(async move {
                let mut client = Client::connect(&addr).await.unwrap();
                for _ in 0..10 {
                    assert_eq!(client.cluster("dog", Some(3)).await.unwrap().unwrap().len(), 3);
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(metrics.total_ops(), 80);
    }
}
