//! glovecache Offline Tool
//!
//! Builds the snapshot cache, queries clusters, exports precomputed
//! distances, and imports embeddings and distances into SQLite.

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use glovecache::corpus::log_progress;
use glovecache::{ExportOptions, Glove, GloveConfig, SqliteStore};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// glovecache Tool - Offline Cache and Export Utilities
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(ClapArgs, Debug)]
struct SourceArgs {
    /// GloVe-format embeddings file
    #[arg(short, long)]
    source: PathBuf,

    /// Snapshot cache file for the parsed embeddings
    #[arg(short, long)]
    cache: Option<PathBuf>,

    /// Maximum number of terms to load (0 = whole file)
    #[arg(short, long, default_value_t = 100_000)]
    limit: usize,
}

impl SourceArgs {
    fn open(&self) -> anyhow::Result<Glove> {
        let mut config =
            GloveConfig::new(&self.source).with_limit((self.limit > 0).then_some(self.limit));
        if let Some(cache) = &self.cache {
            config = config.with_cache_path(cache);
        }
        let options = config.load_options().with_progress(log_progress());
        let glove = Glove::open_with(&config, options)
            .with_context(|| format!("loading {}", self.source.display()))?;
        info!(
            terms = glove.len(),
            dimension = glove.dimension(),
            cache = ?glove.cache_outcome(),
            "Embeddings ready"
        );
        Ok(glove)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse the source and write the snapshot cache
    Build {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the nearest terms to a term
    Cluster {
        #[command(flatten)]
        source: SourceArgs,

        /// Centroid term
        term: String,

        /// Cluster size, the term itself included
        #[arg(short, default_value_t = 10)]
        k: usize,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Write every term's cluster as `"a"|"b"|score` lines
    ExportDistances {
        #[command(flatten)]
        source: SourceArgs,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Neighbors per term, the term itself included
        #[arg(short, default_value_t = 10)]
        k: usize,

        /// Worker threads (0 = auto-detect)
        #[arg(long, default_value_t = 0)]
        workers: usize,
    },

    /// Import embeddings and/or a distances file into SQLite
    ImportSqlite {
        /// SQLite database path
        #[arg(long)]
        db: PathBuf,

        /// GloVe-format embeddings file to import
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Maximum number of terms to import (0 = whole file)
        #[arg(short, long, default_value_t = 100_000)]
        limit: usize,

        /// Distances file written by `export-distances`
        #[arg(long)]
        distances: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("glovecache=info".parse()?))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        Commands::Build { source } => {
            if source.cache.is_none() {
                anyhow::bail!("build requires --cache");
            }
            let glove = source.open()?;
            println!(
                "{} terms, dimension {}, cache {:?}",
                glove.len(),
                glove.dimension(),
                glove.cache_outcome()
            );
        }

        Commands::Cluster { source, term, k, json } => {
            let glove = source.open()?;
            let neighbors = glove.cluster(&term, k)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&neighbors)?);
            } else {
                for (rank, n) in neighbors.iter().enumerate() {
                    println!("{:>4}  {:<24} {:.6}", rank, n.term, n.score);
                }
            }
        }

        Commands::ExportDistances { source, output, k, workers } => {
            let glove = source.open()?;
            let options = ExportOptions { k, workers };
            let lines = match &output {
                Some(path) => {
                    let file = File::create(path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    glove.export_distances(&mut BufWriter::new(file), &options)?
                }
                None => {
                    let stdout = io::stdout();
                    let mut writer = BufWriter::new(stdout.lock());
                    let lines = glove.export_distances(&mut writer, &options)?;
                    writer.flush()?;
                    lines
                }
            };
            info!(lines, "Export complete");
        }

        Commands::ImportSqlite { db, source, limit, distances } => {
            if source.is_none() && distances.is_none() {
                anyhow::bail!("nothing to import: pass --source and/or --distances");
            }
            let store = SqliteStore::open(&db)
                .with_context(|| format!("opening {}", db.display()))?;

            if let Some(source) = source {
                let config = GloveConfig::new(&source).with_limit((limit > 0).then_some(limit));
                let options = config.load_options().with_progress(log_progress());
                let embeddings = glovecache::CorpusLoader::new(options).load(&config.source_path)?;
                let inserted = store.import_embeddings(&embeddings)?;
                println!("imported {} embeddings ({} new)", embeddings.len(), inserted);
            }
            if let Some(distances) = distances {
                let written = store.import_distances_file(&distances)?;
                println!("imported {} cluster pairs", written);
            }
            println!("{}: {} terms, {} cluster pairs", db.display(), store.len()?, store.cluster_pairs()?);
        }
    }

    info!(elapsed = ?start.elapsed(), "Done");
    Ok(())
}
