//! On-disk recovery ledger.
//!
//! One postcard-encoded [`RecoveryRecord`] per file, keyed by URL, in a sled
//! database under the download directory. The ledger is loaded once when a
//! run starts; workers then append completed chunks as their bytes reach
//! disk. A ledger that cannot be read is discarded and the run starts with
//! no prior progress, which costs redundant downloads but never trusts bad
//! state.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::Chunk;
use crate::error::LedgerError;

/// Directory, inside the download directory, holding the ledger database.
pub const LEDGER_DIR: &str = ".harvest-ledger";

/// Completion state of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryRecord {
    /// Chunk size the offsets in `chunks` were produced with. `None` for
    /// files fetched whole, which have no chunks to misalign.
    pub chunk_size: Option<u64>,
    /// Start offsets of chunks whose bytes are on disk.
    pub chunks:     BTreeSet<u64>,
    /// Every byte of the file is on disk.
    pub complete:   bool,
}

pub struct Ledger {
    db:         sled::Db,
    path:       PathBuf,
    chunk_size: u64,
    records:    Mutex<HashMap<String, RecoveryRecord>>,
    writer:     tokio::sync::Mutex<()>,
}

struct LedgerKeys;

impl LedgerKeys {
    const PREFIX: &'static str = "file:";

    fn record(url: &str) -> Vec<u8> { format!("{}{}", Self::PREFIX, hex::encode(url)).into_bytes() }

    fn url(key: &[u8]) -> Option<String> {
        let encoded = key.strip_prefix(Self::PREFIX.as_bytes())?;
        let raw = hex::decode(encoded).ok()?;
        String::from_utf8(raw).ok()
    }
}

impl Ledger {
    /// Open or create the ledger under `directory`.
    ///
    /// With `restart`, every record is discarded. Otherwise records made
    /// with a chunk size other than `chunk_size` are discarded one file at
    /// a time; the rest are trusted.
    pub fn open(directory: &Path, chunk_size: u64, restart: bool) -> Result<Self, LedgerError> {
        std::fs::create_dir_all(directory)?;
        let path = directory.join(LEDGER_DIR);
        let db = match sled::open(&path) {
            Ok(db) => db,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "recovery ledger unreadable, starting over");
                remove_path(&path)?;
                sled::open(&path)?
            }
        };

        if restart {
            info!(path = %path.display(), "discarding recovery ledger");
            db.clear()?;
            db.flush()?;
        }

        let records = load_records(&db, chunk_size)?;
        debug!(files = records.len(), "recovery ledger loaded");

        Ok(Self {
            db,
            path,
            chunk_size,
            records: Mutex::new(records),
            writer: tokio::sync::Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn chunk_size(&self) -> u64 { self.chunk_size }

    /// The chunk starting at `start` was completed by an earlier run.
    pub fn is_done(&self, url: &str, start: u64) -> bool {
        self.with_record(url, |r| r.complete || r.chunks.contains(&start))
    }

    pub fn is_file_done(&self, url: &str) -> bool { self.with_record(url, |r| r.complete) }

    /// The file has any recorded progress.
    pub fn has_progress(&self, url: &str) -> bool {
        self.with_record(url, |r| r.complete || !r.chunks.is_empty())
    }

    pub fn record(&self, url: &str) -> Option<RecoveryRecord> {
        self.lock_records().get(url).cloned()
    }

    /// Record a chunk whose bytes are flushed at their offset.
    pub async fn mark_done(&self, url: &str, chunk: &Chunk) -> Result<(), LedgerError> {
        let chunk_size = self.chunk_size;
        self.update(url, |record| {
            record.chunk_size = Some(chunk_size);
            record.chunks.insert(chunk.start);
        })
        .await
    }

    /// Record that every byte of the file is on disk.
    pub async fn mark_file_done(&self, url: &str) -> Result<(), LedgerError> {
        self.update(url, |record| record.complete = true).await
    }

    /// Record a file fetched whole, outside of chunk bookkeeping.
    pub async fn mark_whole_file_done(&self, url: &str) -> Result<(), LedgerError> {
        self.update(url, |record| {
            *record = RecoveryRecord {
                chunk_size: None,
                chunks:     BTreeSet::new(),
                complete:   true,
            };
        })
        .await
    }

    /// Drop all progress of a file.
    pub async fn forget(&self, url: &str) -> Result<(), LedgerError> {
        let _guard = self.writer.lock().await;
        self.db.remove(LedgerKeys::record(url))?;
        self.db.flush_async().await?;
        self.lock_records().remove(url);
        Ok(())
    }

    /// Flush and release the ledger.
    pub async fn close(self) -> Result<(), LedgerError> {
        let _guard = self.writer.lock().await;
        self.db.flush_async().await?;
        Ok(())
    }

    async fn update(
        &self,
        url: &str,
        apply: impl FnOnce(&mut RecoveryRecord),
    ) -> Result<(), LedgerError> {
        let _guard = self.writer.lock().await;

        let mut record = self.record(url).unwrap_or_default();
        apply(&mut record);
        let value = postcard::to_allocvec(&record)?;
        self.db.insert(LedgerKeys::record(url), value)?;
        self.db.flush_async().await?;

        self.lock_records().insert(url.to_string(), record);
        Ok(())
    }

    fn with_record(&self, url: &str, f: impl FnOnce(&RecoveryRecord) -> bool) -> bool {
        self.lock_records().get(url).is_some_and(f)
    }

    fn lock_records(&self) -> std::sync::MutexGuard<'_, HashMap<String, RecoveryRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Ledger {
    fn drop(&mut self) {
        if let Err(e) = self.db.flush() {
            warn!(path = %self.path.display(), error = %e, "failed to flush recovery ledger");
        }
    }
}

fn load_records(
    db: &sled::Db,
    chunk_size: u64,
) -> Result<HashMap<String, RecoveryRecord>, LedgerError> {
    let mut records = HashMap::new();
    let mut stale = Vec::new();

    for entry in db.scan_prefix(LedgerKeys::PREFIX) {
        let (key, value) = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "recovery ledger corrupt, starting over");
                db.clear()?;
                db.flush()?;
                return Ok(HashMap::new());
            }
        };

        let decoded = LedgerKeys::url(&key)
            .zip(postcard::from_bytes::<RecoveryRecord>(&value).ok());
        match decoded {
            Some((url, record)) => match record.chunk_size {
                Some(size) if size != chunk_size => {
                    info!(%url, recorded = size, requested = chunk_size, "chunk size changed, discarding progress");
                    stale.push(key);
                }
                _ => {
                    records.insert(url, record);
                }
            },
            None => {
                warn!(key = %String::from_utf8_lossy(&key), "undecodable recovery record, discarding");
                stale.push(key);
            }
        }
    }

    for key in stale {
        db.remove(key)?;
    }
    db.flush()?;
    Ok(records)
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
