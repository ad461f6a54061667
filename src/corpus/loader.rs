//! Corpus Loader
//!
//! Streams a `term v1 v2 ... vD` file in a single pass.

use hashbrown::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::progress::{LoadProgress, ProgressFn};
use super::Embeddings;
use crate::error::{GloveError, Result};

/// Loader options
#[derive(Clone)]
pub struct LoadOptions {
    /// Maximum number of distinct terms to load (None = whole file)
    pub limit: Option<usize>,
    /// Lines between progress callbacks
    pub progress_interval: usize,
    /// Progress observer
    pub progress: Option<ProgressFn>,
    /// Checked between lines; cancelling aborts the load
    pub cancel: Option<CancellationToken>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            limit: None,
            progress_interval: 10_000,
            progress: None,
            cancel: None,
        }
    }
}

impl std::fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOptions")
            .field("limit", &self.limit)
            .field("progress_interval", &self.progress_interval)
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel.is_some())
            .finish()
    }
}

impl LoadOptions {
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_progress_interval(mut self, lines: usize) -> Self {
        self.progress_interval = lines.max(1);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Parse one source line into its term and vector.
///
/// Fields are separated by single spaces; empty fields after the term
/// (trailing or doubled spaces) are ignored.
pub fn parse_line(line: &str) -> std::result::Result<(&str, Vec<f32>), String> {
    let mut fields = line.split(' ');
    let term = fields.next().unwrap_or_default();
    if term.is_empty() {
        return Err("empty term field".to_string());
    }

    let vector = fields
        .filter(|f| !f.is_empty())
        .map(|f| {
            f.parse::<f32>()
                .map_err(|_| format!("non-numeric value {:?} for term {:?}", f, term))
        })
        .collect::<std::result::Result<Vec<f32>, String>>()?;

    if vector.is_empty() {
        return Err(format!("term {:?} has no vector components", term));
    }
    Ok((term, vector))
}

/// Streaming loader for embedding files
#[derive(Debug, Clone, Default)]
pub struct CorpusLoader {
    options: LoadOptions,
}

impl CorpusLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Load embeddings from a file on disk
    pub fn load(&self, path: &Path) -> Result<Embeddings> {
        let file = File::open(path).map_err(|e| GloveError::io(path, e))?;
        let total_bytes = file.metadata().ok().map(|m| m.len());
        self.load_from_reader(BufReader::new(file), path, total_bytes)
    }

    /// Load embeddings from any buffered reader.
    ///
    /// `path` is only used to label errors.
    pub fn load_from_reader<R: BufRead>(
        &self,
        mut reader: R,
        path: &Path,
        total_bytes: Option<u64>,
    ) -> Result<Embeddings> {
        let start = Instant::now();
        let limit = self.options.limit;
        info!(path = %path.display(), ?limit, "Loading embeddings");

        let mut embeddings = Embeddings::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut progress = LoadProgress {
            lines_read: 0,
            bytes_read: 0,
            terms_loaded: 0,
            total_bytes,
        };
        let mut buf = Vec::with_capacity(4096);

        while limit.map_or(true, |l| embeddings.len() < l) {
            if let Some(token) = &self.options.cancel {
                if token.is_cancelled() {
                    return Err(GloveError::Cancelled {
                        lines_read: progress.lines_read,
                    });
                }
            }

            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| GloveError::io(path, e))?;
            if n == 0 {
                break;
            }
            progress.lines_read += 1;
            progress.bytes_read += n as u64;
            let line_no = progress.lines_read;

            let line = std::str::from_utf8(&buf).map_err(|e| format_error(path, line_no, e))?;
            let line = line.trim_end_matches(['\n', '\r']);
            if !line.is_empty() {
                let (term, vector) =
                    parse_line(line).map_err(|r| format_error(path, line_no, r))?;
                if seen.contains(term) {
                    debug!(term, line = line_no, "Skipping duplicate term");
                } else {
                    embeddings.push(term.to_string(), &vector).map_err(|e| match e {
                        GloveError::DimensionMismatch { expected, actual } => format_error(
                            path,
                            line_no,
                            format!("expected {} vector components, got {}", expected, actual),
                        ),
                        other => other,
                    })?;
                    seen.insert(term.to_string());
                    progress.terms_loaded = embeddings.len();
                }
            }

            if line_no % self.options.progress_interval.max(1) == 0 {
                self.report(&progress);
            }
        }

        self.report(&progress);
        info!(
            terms = embeddings.len(),
            dimension = embeddings.dimension(),
            lines = progress.lines_read,
            elapsed = ?start.elapsed(),
            "Embeddings loaded"
        );
        Ok(embeddings)
    }

    fn report(&self, progress: &LoadProgress) {
        if let Some(hook) = &self.options.progress {
            hook(progress);
        }
    }
}

fn format_error(path: &Path, line: usize, reason: impl ToString) -> GloveError {
    GloveError::Format {
        path: PathBuf::from(path),
        line,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const SAMPLE: &str = "cat 1 0\ndog 0.9 0.1\ncar 0 1\n";

    fn load_str(input: &str, options: LoadOptions) -> Result<Embeddings> {
        CorpusLoader::new(options).load_from_reader(Cursor::new(input), Path::new("test.txt"), None)
    }

    #[test]
    fn test_parse_line() {
        let (term, vector) = parse_line("the 0.5 -1.25 3").unwrap();
        assert_eq!(term, "the");
        assert_eq!(vector, vec![0.5, -1.25, 3.0]);

        let (term, vector) = parse_line("... 1 2 ").unwrap();
        assert_eq!(term, "...");
        assert_eq!(vector, vec![1.0, 2.0]);

        assert!(parse_line("lonely").is_err());
        assert!(parse_line("bad 1 x").is_err());
        assert!(parse_line(" 1 2").is_err());
    }

    #[test]
    fn test_load_preserves_order() {
        let emb = load_str(SAMPLE, LoadOptions::default()).unwrap();
        assert_eq!(emb.terms(), &["cat", "dog", "car"]);
        assert_eq!(emb.dimension(), 2);
        assert_eq!(emb.row(1), Some(&[0.9f32, 0.1][..]));
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let input = "cat 1 0\ndog 0.9 0.1\ncat 5 5\ncar 0 1\n";
        let emb = load_str(input, LoadOptions::default()).unwrap();
        assert_eq!(emb.terms(), &["cat", "dog", "car"]);
        assert_eq!(emb.row(0), Some(&[1.0f32, 0.0][..]));
    }

    #[test]
    fn test_limit_counts_distinct_terms() {
        let input = "cat 1 0\ncat 2 2\ndog 0.9 0.1\ncar 0 1\n";
        let emb = load_str(input, LoadOptions::default().with_limit(Some(2))).unwrap();
        assert_eq!(emb.terms(), &["cat", "dog"]);

        let none = load_str(input, LoadOptions::default().with_limit(Some(0))).unwrap();
        assert!(none.is_empty());

        let all = load_str(input, LoadOptions::default().with_limit(Some(100))).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_format_errors_abort_with_line_number() {
        let err = load_str("cat 1 0\ndog 0.9 abc\n", LoadOptions::default()).unwrap_err();
        match err {
            GloveError::Format { line, path, .. } => {
                assert_eq!(line, 2);
                assert_eq!(path, PathBuf::from("test.txt"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = load_str("cat 1 0\nlonely\n", LoadOptions::default()).unwrap_err();
        assert!(matches!(err, GloveError::Format { line: 2, .. }));

        let err = load_str("cat 1 0\ndog 1 0 0\n", LoadOptions::default()).unwrap_err();
        assert!(matches!(err, GloveError::Format { line: 2, .. }));
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let emb = load_str("cat 1 0\r\n\r\ndog 0 1\r\n\n", LoadOptions::default()).unwrap();
        assert_eq!(emb.terms(), &["cat", "dog"]);
        assert_eq!(emb.row(1), Some(&[0.0f32, 1.0][..]));
    }

    #[test]
    fn test_deterministic_reload() {
        let a = load_str(SAMPLE, LoadOptions::default()).unwrap();
        let b = load_str(SAMPLE, LoadOptions::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_progress_and_cancel() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let options = LoadOptions::default()
            .with_progress_interval(1)
            .with_progress(Arc::new(move |_p: &LoadProgress| {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        load_str(SAMPLE, options).unwrap();
        // One per line plus the final report
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        let token = CancellationToken::new();
        token.cancel();
        let err = load_str(SAMPLE, LoadOptions::default().with_cancel(token)).unwrap_err();
        assert!(matches!(err, GloveError::Cancelled { lines_read: 0 }));
    }

    #[test]
    fn test_progress_counts_blank_and_duplicate_lines() {
        let reports = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = reports.clone();
        let options = LoadOptions::default()
            .with_progress_interval(2)
            .with_progress(Arc::new(move |p: &LoadProgress| {
                sink.lock().push((p.lines_read, p.terms_loaded));
            }));
        load_str("cat 1 0\n\ndog 0.9 0.1\ncat 7 7\n", options).unwrap();

        assert_eq!(*reports.lock(), vec![(2, 1), (4, 2), (4, 2)]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glove.txt");
        std::fs::write(&path, SAMPLE).unwrap();

        let emb = CorpusLoader::default().load(&path).unwrap();
        assert_eq!(emb.len(), 3);

        let missing = CorpusLoader::default().load(&dir.path().join("nope.txt"));
        assert!(matches!(missing, Err(GloveError::Io { .. })));
    }
}
