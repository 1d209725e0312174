//! On-disk snapshots of a loaded table and model.
//!
//! File layout (little-endian):
//!
//! ```text
//! magic "FNCS" | version u8 | created_at u64 (ns since epoch)
//! | body_len u64 | crc32(body) u32 | body (bincode SnapshotData)
//! ```
//!
//! A snapshot is used only when it was written after the last
//! modification of every source it was built from. Files are replaced by
//! rename, so readers never observe a partial write.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use fenci_core::dict::{DuplicatePolicy, FrequencyTable};
use fenci_core::hmm::HmmModel;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::source::ResourceKey;

const MAGIC: &[u8; 4] = b"FNCS";
const VERSION: u8 = 1;
const HEADER_SIZE: usize = 4 + 1 + 8 + 8 + 4;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid header")]
    InvalidHeader,

    #[error("invalid magic bytes (expected FNCS)")]
    InvalidMagic,

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),

    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("serialization error: {0}")]
    Serialize(bincode::Error),

    #[error("deserialization error: {0}")]
    Deserialize(bincode::Error),
}

#[derive(Serialize, Deserialize)]
struct SnapshotData {
    fingerprint: String,
    words: Vec<(String, u64)>,
    model: HmmModel,
}

/// A snapshot read back from disk.
#[derive(Debug)]
pub struct Snapshot {
    pub dict: FrequencyTable,
    pub model: HmmModel,
    pub created_at: SystemTime,
}

impl Snapshot {
    /// Whether the snapshot was written strictly after `source_modified`.
    pub fn is_fresh(&self, source_modified: Option<SystemTime>) -> bool {
        source_modified.map_or(true, |m| self.created_at > m)
    }
}

/// Directory of snapshot files, one per [`ResourceKey`].
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    prefix: String,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &ResourceKey) -> PathBuf {
        let hash = crc32fast::hash(key.fingerprint().as_bytes());
        self.dir.join(format!("{}.{hash:08x}.cache", self.prefix))
    }

    /// Read the snapshot for `key`. `Ok(None)` when there is none, or when
    /// the file belongs to another key with the same hash.
    pub fn read(&self, key: &ResourceKey) -> Result<Option<Snapshot>, CacheError> {
        let path = self.path_for(key);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if file.metadata()?.len() < HEADER_SIZE as u64 {
            return Err(CacheError::InvalidHeader);
        }
        // SAFETY: snapshot files are only ever replaced by rename, never
        // rewritten in place, so the mapped bytes stay valid while mapped.
        let mmap = unsafe { Mmap::map(&file)? };
        let (created_at, body) = parse_header(&mmap)?;
        let data: SnapshotData = bincode::deserialize(body).map_err(CacheError::Deserialize)?;
        if data.fingerprint != key.fingerprint() {
            debug!(path = %path.display(), "cache belongs to another source");
            return Ok(None);
        }
        let dict = FrequencyTable::from_entries(data.words, DuplicatePolicy::Overwrite);
        Ok(Some(Snapshot {
            dict,
            model: data.model,
            created_at,
        }))
    }

    /// Write a snapshot for `key`, atomically replacing any previous one.
    pub fn write(
        &self,
        key: &ResourceKey,
        dict: &FrequencyTable,
        model: &HmmModel,
    ) -> Result<PathBuf, CacheError> {
        let data = SnapshotData {
            fingerprint: key.fingerprint(),
            words: dict.iter().map(|(w, c)| (w.to_string(), c)).collect(),
            model: model.clone(),
        };
        let body = bincode::serialize(&data).map_err(CacheError::Serialize)?;
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);

        let mut buf = Vec::with_capacity(HEADER_SIZE + body.len());
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.extend_from_slice(&created_at.to_le_bytes());
        buf.extend_from_slice(&(body.len() as u64).to_le_bytes());
        buf.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
        buf.extend_from_slice(&body);

        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&buf)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| CacheError::Io(e.error))?;
        Ok(path)
    }

    /// Use a fresh snapshot for `key` if there is one, otherwise run
    /// `build` and store its result. Cache problems are logged and never
    /// returned; only `build` errors are.
    pub fn load_or_build<F>(
        &self,
        key: &ResourceKey,
        source_modified: Option<SystemTime>,
        build: F,
    ) -> Result<(FrequencyTable, HmmModel)>
    where
        F: FnOnce() -> Result<(FrequencyTable, HmmModel)>,
    {
        let started = Instant::now();
        match self.read(key) {
            Ok(Some(snapshot)) if snapshot.is_fresh(source_modified) => {
                info!(
                    entries = snapshot.dict.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "loaded from cache"
                );
                return Ok((snapshot.dict, snapshot.model));
            }
            Ok(Some(_)) => {
                warn!(path = %self.path_for(key).display(), "cache is older than its sources, rebuilding");
            }
            Ok(None) => debug!("no cache, building"),
            Err(e) => {
                warn!(path = %self.path_for(key).display(), error = %e, "unreadable cache, rebuilding");
            }
        }

        let (dict, model) = build()?;
        self.store(key, &dict, &model);
        Ok((dict, model))
    }

    /// Write a snapshot, logging instead of failing.
    pub fn store(&self, key: &ResourceKey, dict: &FrequencyTable, model: &HmmModel) {
        match self.write(key, dict, model) {
            Ok(path) => debug!(path = %path.display(), "cache written"),
            Err(e) => warn!(dir = %self.dir.display(), error = %e, "failed to write cache"),
        }
    }
}

fn parse_header(data: &[u8]) -> Result<(SystemTime, &[u8]), CacheError> {
    if data.len() < HEADER_SIZE {
        return Err(CacheError::InvalidHeader);
    }
    if &data[..4] != MAGIC {
        return Err(CacheError::InvalidMagic);
    }
    if data[4] != VERSION {
        return Err(CacheError::UnsupportedVersion(data[4]));
    }
    let created_ns = read_u64(&data[5..13]);
    let body_len = read_u64(&data[13..21]);
    let expected = u32::from_le_bytes([data[21], data[22], data[23], data[24]]);
    let body = &data[HEADER_SIZE..];
    if body.len() as u64 != body_len {
        return Err(CacheError::InvalidHeader);
    }
    let actual = crc32fast::hash(body);
    if actual != expected {
        return Err(CacheError::ChecksumMismatch { expected, actual });
    }
    let created_at = UNIX_EPOCH + std::time::Duration::from_nanos(created_ns);
    Ok((created_at, body))
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}
