//! Embeddings Snapshot
//!
//! Binary snapshot of a loaded vocabulary and its vectors.

use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::corpus::Embeddings;
use crate::error::{GloveError, Result};

/// Snapshot file format (little-endian):
/// - Magic: 4 bytes "GLVS"
/// - Version: 1 byte
/// - Created at: 8 bytes (unix millis)
/// - Limit: 8 bytes (u64::MAX = unbounded)
/// - Term count: 4 bytes
/// - Dimension: 4 bytes
/// - Terms: [len (4) + utf8 bytes]*
/// - Values: count * dimension f32 bit patterns

const SNAPSHOT_MAGIC: &[u8] = b"GLVS";
const SNAPSHOT_VERSION: u8 = 1;
const UNBOUNDED: u64 = u64::MAX;

/// Upper bound on speculative pre-allocation from an untrusted header
const MAX_PREALLOC: usize = 1 << 20;

/// Distinguishes concurrent saves within one process
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Snapshot header, readable without decoding the vectors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub version: u8,
    pub created_at: Option<DateTime<Utc>>,
    /// Limit the snapshot was built with
    pub limit: Option<usize>,
    pub count: usize,
    pub dimension: usize,
}

impl SnapshotHeader {
    fn for_embeddings(embeddings: &Embeddings, limit: Option<usize>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            created_at: Some(Utc::now()),
            limit,
            count: embeddings.len(),
            dimension: embeddings.dimension(),
        }
    }

    fn encode(&self, writer: &mut impl Write) -> io::Result<()> {
        let created_ms = self.created_at.map(|t| t.timestamp_millis()).unwrap_or(0);
        let limit = self.limit.map(|l| l as u64).unwrap_or(UNBOUNDED);

        writer.write_all(SNAPSHOT_MAGIC)?;
        writer.write_all(&[self.version])?;
        writer.write_all(&created_ms.to_le_bytes())?;
        writer.write_all(&limit.to_le_bytes())?;
        writer.write_all(&(self.count as u32).to_le_bytes())?;
        writer.write_all(&(self.dimension as u32).to_le_bytes())?;
        Ok(())
    }

    fn decode(reader: &mut impl Read) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != SNAPSHOT_MAGIC {
            return Err(invalid("Invalid snapshot magic"));
        }

        let mut version = [0u8; 1];
        reader.read_exact(&mut version)?;
        if version[0] != SNAPSHOT_VERSION {
            return Err(invalid(format!(
                "Unsupported snapshot version: {}",
                version[0]
            )));
        }

        let created_ms = i64::from_le_bytes(read_array(reader)?);
        let limit = u64::from_le_bytes(read_array(reader)?);
        let count = u32::from_le_bytes(read_array(reader)?) as usize;
        let dimension = u32::from_le_bytes(read_array(reader)?) as usize;

        Ok(Self {
            version: version[0],
            created_at: DateTime::<Utc>::from_timestamp_millis(created_ms),
            limit: if limit == UNBOUNDED {
                None
            } else {
                Some(limit as usize)
            },
            count,
            dimension,
        })
    }
}

/// Serialize embeddings into any writer
pub fn write_snapshot(
    writer: &mut impl Write,
    embeddings: &Embeddings,
    limit: Option<usize>,
) -> io::Result<()> {
    SnapshotHeader::for_embeddings(embeddings, limit).encode(writer)?;

    for term in embeddings.terms() {
        writer.write_all(&(term.len() as u32).to_le_bytes())?;
        writer.write_all(term.as_bytes())?;
    }
    for value in embeddings.values() {
        writer.write_all(&value.to_bits().to_le_bytes())?;
    }
    Ok(())
}

/// Deserialize embeddings from any reader; trailing bytes are rejected
pub fn read_snapshot(reader: &mut impl Read) -> io::Result<(SnapshotHeader, Embeddings)> {
    let header = SnapshotHeader::decode(reader)?;

    let mut terms = Vec::with_capacity(header.count.min(MAX_PREALLOC));
    for _ in 0..header.count {
        let len = u32::from_le_bytes(read_array(reader)?) as usize;
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;
        let term = String::from_utf8(buf).map_err(|_| invalid("Term is not valid UTF-8"))?;
        terms.push(term);
    }

    let total = header
        .count
        .checked_mul(header.dimension)
        .ok_or_else(|| invalid("Snapshot shape overflows"))?;
    let mut values = Vec::with_capacity(total.min(MAX_PREALLOC));
    for _ in 0..total {
        values.push(f32::from_bits(u32::from_le_bytes(read_array(reader)?)));
    }

    let mut probe = [0u8; 1];
    if reader.read(&mut probe)? != 0 {
        return Err(invalid("Trailing bytes after snapshot payload"));
    }

    let embeddings = Embeddings::from_parts(terms, values, header.dimension)
        .map_err(|e| invalid(e.to_string()))?;
    Ok((header, embeddings))
}

/// Read only the header of a snapshot file
pub fn read_header(path: &Path) -> Result<SnapshotHeader> {
    let file = File::open(path).map_err(|e| GloveError::io(path, e))?;
    SnapshotHeader::decode(&mut BufReader::new(file)).map_err(|e| corruption(path, e))
}

/// Load a snapshot file.
///
/// A missing file is an `Io` error; anything undecodable is
/// `CacheCorruption`.
pub fn load(path: &Path) -> Result<(SnapshotHeader, Embeddings)> {
    let file = File::open(path).map_err(|e| GloveError::io(path, e))?;
    read_snapshot(&mut BufReader::new(file)).map_err(|e| corruption(path, e))
}

/// Atomically write a snapshot file.
///
/// The payload goes to a sibling temp file which is synced and then renamed
/// over `path`, so readers see either the old snapshot or the new one.
pub fn save(path: &Path, embeddings: &Embeddings, limit: Option<usize>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| GloveError::io(parent, e))?;
    }

    let temp_path = temp_path_for(path);
    let result = write_file(&temp_path, embeddings, limit)
        .and_then(|_| fs::rename(&temp_path, path).map_err(|e| GloveError::io(path, e)));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_file(path: &Path, embeddings: &Embeddings, limit: Option<usize>) -> Result<()> {
    let file = File::create(path).map_err(|e| GloveError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write_snapshot(&mut writer, embeddings, limit).map_err(|e| GloveError::io(path, e))?;
    let file = writer
        .into_inner()
        .map_err(|e| GloveError::io(path, e.into_error()))?;
    file.sync_all().map_err(|e| GloveError::io(path, e))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{}.tmp.{}.{}", name, std::process::id(), seq))
}

fn read_array<const N: usize>(reader: &mut impl Read) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn corruption(path: &Path, err: io::Error) -> GloveError {
    GloveError::CacheCorruption {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
