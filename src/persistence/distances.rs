//! Precomputed Distances
//!
//! Text export of cluster pairs for bulk loading into a relational table.
//! One line per ordered pair: `"term_a"|"term_b"|0.123456`. Quotes inside
//! a term are doubled.

use std::borrow::Cow;
use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::error::{GloveError, Result};
use crate::vector::{ClusterService, Neighbor};

/// Decimal digits written for each score
pub const SCORE_DECIMALS: usize = 6;

/// Terms exported per parallel batch
const BATCH_SIZE: usize = 1024;

/// A parsed export line
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceRecord {
    pub term_a: String,
    pub term_b: String,
    pub score: f32,
}

/// Export settings
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Neighbors written per term, the term itself included
    pub k: usize,
    /// Worker threads (0 = number of CPUs)
    pub workers: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { k: 10, workers: 0 }
    }
}

fn is_punctuation(term: &str) -> bool {
    !term.is_empty() && term.chars().all(|c| c.is_ascii_punctuation())
}

/// Escape pure-punctuation terms with a leading backslash
pub fn escape_term(term: &str) -> Cow<'_, str> {
    if is_punctuation(term) {
        Cow::Owned(format!("\\{}", term))
    } else {
        Cow::Borrowed(term)
    }
}

/// Reverse of `escape_term`
pub fn unescape_term(field: &str) -> &str {
    match field.strip_prefix('\\') {
        Some(rest) if is_punctuation(rest) => rest,
        _ => field,
    }
}

fn quote_field(term: &str) -> String {
    format!("\"{}\"", escape_term(term).replace('"', "\"\""))
}

/// Split a leading quoted field off `input`, returning its unquoted content
/// and the remainder after the closing quote
fn take_quoted(input: &str) -> std::result::Result<(String, &str), String> {
    let rest = input
        .strip_prefix('"')
        .ok_or_else(|| "terms must be quoted".to_string())?;
    let mut field = String::new();
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        if c != '"' {
            field.push(c);
        } else if rest[i + 1..].starts_with('"') {
            field.push('"');
            chars.next();
        } else {
            return Ok((field, &rest[i + 1..]));
        }
    }
    Err("unterminated quoted term".to_string())
}

/// Format one export line (without newline)
pub fn format_line(term_a: &str, term_b: &str, score: f32) -> String {
    format!(
        "{}|{}|{:.*}",
        quote_field(term_a),
        quote_field(term_b),
        SCORE_DECIMALS,
        score
    )
}

/// Parse one export line
pub fn parse_distance_line(line: &str) -> std::result::Result<DistanceRecord, String> {
    let (a, rest) = take_quoted(line)?;
    let rest = rest
        .strip_prefix('|')
        .ok_or_else(|| "missing term separator".to_string())?;
    let (b, rest) = take_quoted(rest)?;
    let score = rest
        .strip_prefix('|')
        .ok_or_else(|| "missing score field".to_string())?;
    let score: f32 = score
        .trim()
        .parse()
        .map_err(|_| format!("invalid score {:?}", score))?;

    Ok(DistanceRecord {
        term_a: unescape_term(&a).to_string(),
        term_b: unescape_term(&b).to_string(),
        score,
    })
}

/// Read every record of an export file
pub fn read_distances<R: BufRead>(reader: R, path: &Path) -> Result<Vec<DistanceRecord>> {
    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| GloveError::io(path, e))?;
        if line.is_empty() {
            continue;
        }
        let record = parse_distance_line(&line).map_err(|reason| GloveError::Format {
            path: path.to_path_buf(),
            line: i + 1,
            reason,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Write the top-`k` cluster of every vocabulary term.
///
/// Clusters are computed in parallel batches and written in vocabulary
/// order. Centroids with zero-norm vectors are skipped. Returns the number
/// of lines written.
pub fn export_distances<W: Write>(
    service: &ClusterService,
    writer: &mut W,
    options: &ExportOptions,
) -> Result<usize> {
    let start = Instant::now();
    let terms = service.index().matrix().terms();
    let workers = if options.workers == 0 {
        num_cpus::get()
    } else {
        options.workers
    };
    info!(terms = terms.len(), k = options.k, workers, "Exporting distances");

    let mut lines = 0usize;
    for batch in terms.chunks(BATCH_SIZE) {
        for (term, cluster) in batch.iter().zip(compute_batch(service, batch, options.k, workers)) {
            let neighbors = match cluster {
                Ok(n) => n,
                Err(GloveError::DegenerateVector { .. }) => {
                    warn!(term = %term, "Skipping zero-norm centroid");
                    continue;
                }
                Err(e) => return Err(e),
            };
            for neighbor in neighbors {
                writeln!(writer, "{}", format_line(term, &neighbor.term, neighbor.score))
                    .map_err(|e| GloveError::io("<distances>", e))?;
                lines += 1;
            }
        }
    }
    writer.flush().map_err(|e| GloveError::io("<distances>", e))?;

    info!(lines, elapsed = ?start.elapsed(), "Distances exported");
    Ok(lines)
}

fn compute_batch(
    service: &ClusterService,
    batch: &[String],
    k: usize,
    workers: usize,
) -> Vec<Result<Vec<Neighbor>>> {
    let per_worker = batch.len().div_ceil(workers.max(1)).max(1);

    crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = batch
            .chunks(per_worker)
            .map(|chunk| {
                scope.spawn(move |_| {
                    chunk
                        .iter()
                        .map(|term| service.compute(term, k))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    })
    .unwrap_or_else(|e| std::panic::resume_unwind(e))
}
