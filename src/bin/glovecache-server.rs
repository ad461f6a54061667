//! glovecache Server Binary
//!
//! Serves embedding lookups and clusters over the GLVC protocol, from the
//! in-memory engine or a SQLite store.

use anyhow::Context;
use clap::Parser;
use glovecache::corpus::log_progress;
use glovecache::server::Config;
use glovecache::{EmbeddingBackend, Glove, GloveConfig, Server, SqliteStore, Stopwords};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// glovecache Server - GloVe Embedding Lookup Service
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// GloVe-format embeddings file
    #[arg(short, long, required_unless_present = "sqlite")]
    source: Option<PathBuf>,

    /// Snapshot cache file for the parsed embeddings
    #[arg(short, long)]
    cache: Option<PathBuf>,

    /// Maximum number of terms to load (0 = whole file)
    #[arg(short, long, default_value_t = 100_000)]
    limit: usize,

    /// Serve from a SQLite database built with `glovecache-tool import-sqlite`
    #[arg(long, conflicts_with = "source")]
    sqlite: Option<PathBuf>,

    /// Stopword file, one word per line
    #[arg(long)]
    stopwords: Option<PathBuf>,

    /// Bind address
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: String,

    /// Port number
    #[arg(short, long, default_value_t = 6390)]
    port: u16,

    /// Worker threads (0 = auto-detect based on CPU cores)
    #[arg(long, default_value_t = 0)]
    workers: usize,

    /// Pin worker threads to CPU cores
    #[arg(long)]
    pin_cores: bool,

    /// Command queue capacity
    #[arg(long, default_value_t = 10_000)]
    queue_capacity: usize,

    /// Cluster size when a request omits k
    #[arg(long, default_value_t = 10)]
    default_k: usize,

    /// Memoized clusters kept in memory (0 = unbounded)
    #[arg(long, default_value_t = 10_000)]
    cluster_cache: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("glovecache=info".parse()?))
        .init();

    let args = Args::parse();

    let mut config = Config::default()
        .with_bind(&args.bind)
        .with_port(args.port)
        .with_workers(args.workers)
        .with_queue_capacity(args.queue_capacity)
        .with_default_k(args.default_k);
    config.pin_to_cores = args.pin_cores;

    let stopwords = match &args.stopwords {
        Some(path) => Stopwords::from_file(path)?,
        None => Stopwords::english(),
    };

    let backend: Arc<dyn EmbeddingBackend> = match (&args.sqlite, &args.source) {
        (Some(db), _) => {
            let store = SqliteStore::open(db)
                .with_context(|| format!("opening {}", db.display()))?;
            info!(db = %db.display(), terms = store.len()?, "Serving from SQLite");
            Arc::new(store)
        }
        (None, Some(source)) => Arc::new(load_glove(&args, source.clone()).await?),
        (None, None) => anyhow::bail!("either --source or --sqlite is required"),
    };

    info!(
        "Starting glovecache server on {} with {} workers",
        config.addr(),
        config.effective_workers()
    );

    let server = Server::new(config, backend, stopwords);
    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}

/// Load the engine off the async runtime; Ctrl-C cancels the parse
async fn load_glove(args: &Args, source: PathBuf) -> anyhow::Result<Glove> {
    let mut config = GloveConfig::new(source)
        .with_limit((args.limit > 0).then_some(args.limit))
        .with_cluster_cache_capacity(args.cluster_cache);
    if let Some(cache) = &args.cache {
        config = config.with_cache_path(cache);
    }
    if let Some(stopwords) = &args.stopwords {
        config = config.with_stopwords_path(stopwords);
    }

    let cancel = CancellationToken::new();
    let options = config
        .load_options()
        .with_progress(log_progress())
        .with_cancel(cancel.clone());

    let mut load = tokio::task::spawn_blocking(move || Glove::open_with(&config, options));
    let glove = tokio::select! {
        joined = &mut load => joined??,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            load.await??
        }
    };

    info!(
        terms = glove.len(),
        dimension = glove.dimension(),
        cache = ?glove.cache_outcome(),
        "Embeddings ready"
    );
    Ok(glove)
}
