//! Persistent cache store.
//!
//! The engine keeps two entries in a durable key/value store: the serialized
//! snapshot under [`SNAPSHOT_KEY`] and the last successful full sync time
//! under [`LAST_SYNCED_KEY`]. Both are written independently, one right after
//! the other, with no transaction spanning them.
//!
//! Everything here is best-effort. Malformed entries load as absent and
//! failed writes are logged and dropped, so the in-memory state stays
//! authoritative for the session.

use crate::{error::Result, Error, Snapshot};
use chrono::{DateTime, SecondsFormat, Utc};
use dashmap::DashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Key of the serialized snapshot.
pub const SNAPSHOT_KEY: &str = "APP_CACHE";

/// Key of the last-synced timestamp.
pub const LAST_SYNCED_KEY: &str = "LAST_SYNCED";

/// Durable string key/value storage.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// In-memory key/value store. Does not survive the process, but survives
/// engine re-initialization when shared between engines.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: DashMap<String, String>,
    fail_writes: AtomicBool,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, as a full storage quota would.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Storage(io::Error::other("storage quota exceeded")));
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Directory-backed key/value store: one file per key.
#[derive(Debug, Clone)]
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    /// Use `dir` for storage. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        // Write then rename so a crash never leaves a torn entry behind.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// The engine's view of the persistent cache.
#[derive(Clone)]
pub struct CacheStore {
    kv: Arc<dyn KeyValueStore>,
}

impl CacheStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Load the persisted snapshot. Missing or malformed data is `None`.
    pub fn load_snapshot(&self) -> Option<Snapshot> {
        let raw = match self.kv.get(SNAPSHOT_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read cached snapshot");
                return None;
            }
        };
        match Snapshot::from_json(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable cached snapshot");
                None
            }
        }
    }

    /// Load the last-synced timestamp. Missing or malformed data is `None`.
    pub fn load_last_synced(&self) -> Option<DateTime<Utc>> {
        let raw = match self.kv.get(LAST_SYNCED_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read last-synced time");
                return None;
            }
        };
        match parse_timestamp(&raw) {
            Ok(at) => Some(at),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable last-synced time");
                None
            }
        }
    }

    /// Persist a snapshot. Failures are logged and swallowed.
    pub fn save_snapshot(&self, snapshot: &Snapshot) {
        let result = snapshot
            .to_json()
            .and_then(|json| self.kv.set(SNAPSHOT_KEY, &json));
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist snapshot");
        }
    }

    /// Persist the last-synced timestamp. Failures are logged and swallowed.
    pub fn save_last_synced(&self, at: DateTime<Utc>) {
        let value = at.to_rfc3339_opts(SecondsFormat::Millis, true);
        if let Err(e) = self.kv.set(LAST_SYNCED_KEY, &value) {
            tracing::warn!(error = %e, "failed to persist last-synced time");
        }
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore").finish_non_exhaustive()
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| Error::InvalidTimestamp(e.to_string()))
}
