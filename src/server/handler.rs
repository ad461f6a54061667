//! Command Execution and Connection Handling
//!
//! `Executor` turns commands into responses against an embedding backend.
//! `Handler` drives one connection, routing each request through the
//! worker queue.

use chrono::{DateTime, Utc};
use crossbeam::channel::TrySendError;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use crate::backend::EmbeddingBackend;
use crate::error::GloveError;
use crate::metrics::Metrics;
use crate::protocol::{Command, GlvcCodec, Response};
use crate::text::{try_tokenize, Stopwords};

use super::command_queue::{CommandQueue, WorkItem};

/// Executes commands against a shared backend
#[derive(Clone)]
pub struct Executor {
    backend: Arc<dyn EmbeddingBackend>,
    stopwords: Arc<Stopwords>,
    metrics: Arc<Metrics>,
    default_k: usize,
    started_at: DateTime<Utc>,
}

impl Executor {
    pub fn new(
        backend: Arc<dyn EmbeddingBackend>,
        stopwords: Arc<Stopwords>,
        metrics: Arc<Metrics>,
        default_k: usize,
    ) -> Self {
        Self {
            backend,
            stopwords,
            metrics,
            default_k,
            started_at: Utc::now(),
        }
    }

    /// Execute one command, recording its latency
    pub fn execute(&self, cmd: Command) -> Response {
        let start = Instant::now();
        let name = cmd.name();
        let response = match self.dispatch(cmd) {
            Ok(response) => response,
            Err(GloveError::NotFound { term }) => Response::NotFound(term),
            Err(e) => {
                self.metrics.record_error();
                Response::Error(e.to_string())
            }
        };
        let elapsed = start.elapsed();
        self.metrics.record_operation(name, elapsed);
        debug!(cmd = name, latency = ?elapsed, "Command executed");
        response
    }

    fn dispatch(&self, cmd: Command) -> crate::Result<Response> {
        let backend = self.backend.as_ref();
        Ok(match cmd {
            Command::Ping => Response::Pong,

            Command::Contains { term } => Response::Integer(backend.contains_term(&term)? as i64),

            Command::Get { term } => Response::Vector(backend.require_vector(&term)?),

            Command::Cluster { term, k } => {
                let k = k.map_or(self.default_k, |k| k as usize);
                Response::Neighbors(backend.nearest(&term, k)?)
            }

            Command::Similarity { a, b } => Response::Float(backend.similarity(&a, &b)?),

            Command::Tokenize { text } => {
                Response::Array(try_tokenize(&text, &self.stopwords, |t| backend.contains_term(t))?)
            }

            Command::Info => Response::Array(self.info()?),
        })
    }

    fn info(&self) -> crate::Result<Vec<String>> {
        let uptime = Utc::now().signed_duration_since(self.started_at);
        let mut lines = vec![
            format!("backend:{}", self.backend.name()),
            format!("terms:{}", self.backend.vocabulary_size()?),
            format!("dimension:{}", self.backend.dimension()?),
            format!("started_at:{}", self.started_at.to_rfc3339()),
            format!("uptime_secs:{}", uptime.num_seconds()),
            format!("default_k:{}", self.default_k),
            format!("total_ops:{}", self.metrics.total_ops()),
            format!("errors:{}", self.metrics.errors()),
            format!("avg_latency_us:{:.1}", self.metrics.avg_latency_us()),
        ];
        for (cmd, count) in self.metrics.ops_by_command() {
            lines.push(format!("ops_{}:{}", cmd.to_lowercase(), count));
        }
        Ok(lines)
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

/// Per-connection handler that routes requests to the worker pool
pub struct Handler {
    queue: CommandQueue,
}

impl Handler {
    pub fn new(queue: CommandQueue) -> Self {
        Self { queue }
    }

    /// Serve requests until the peer disconnects
    pub async fn run<S>(self, mut framed: Framed<S, GlvcCodec>) -> std::io::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        while let Some(result) = framed.next().await {
            let frame = result?;
            let request_id = frame.request_id();

            let response = match Command::from_frame(&frame) {
                Ok(command) => self.submit(command, request_id).await,
                Err(e) => Response::Error(e.to_string()),
            };

            framed.send(response.to_frame(request_id)).await?;
        }

        Ok(())
    }

    async fn submit(&self, command: Command, request_id: u64) -> Response {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let item = WorkItem {
            command,
            request_id,
            response_tx: tx,
        };

        match self.queue.try_send(item) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(request_id, "Command queue full");
                return Response::Error("Queue full".to_string());
            }
            Err(TrySendError::Disconnected(_)) => {
                return Response::Error("Server shutting down".to_string());
            }
        }

        match rx.await {
            Ok(response) => response,
            Err(_) => Response::Error("Worker error".to_string()),
        }
    }
}
