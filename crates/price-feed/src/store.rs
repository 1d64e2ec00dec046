//! Persisted last-fetch stamp and the cache window policy
//!
//! The only state that survives a restart is the epoch-millisecond time of the
//! last successful fetch, stored under [`LAST_FETCH_KEY`].

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Storage key of the last successful fetch time
pub const LAST_FETCH_KEY: &str = "nerkh_last_fetch_v3";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("State file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("State file is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Where the last-fetch stamp lives
pub trait StampStore: Send + Sync {
    fn load(&self) -> StoreResult<Option<i64>>;
    fn save(&self, epoch_ms: i64) -> StoreResult<()>;
}

/// Key/value JSON file, other keys in the file are preserved
pub struct FileStampStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStampStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> StoreResult<Map<String, Value>> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(Map::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl StampStore for FileStampStore {
    fn load(&self) -> StoreResult<Option<i64>> {
        let _guard = self.lock.lock();
        let map = self.read_map()?;

        // Stored as a string, like browser storage does
        Ok(map.get(LAST_FETCH_KEY).and_then(|v| match v {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        }))
    }

    fn save(&self, epoch_ms: i64) -> StoreResult<()> {
        let _guard = self.lock.lock();
        let mut map = self.read_map().unwrap_or_default();
        map.insert(LAST_FETCH_KEY.to_string(), Value::String(epoch_ms.to_string()));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        // Write-then-rename so readers never see a half-written file
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&Value::Object(map))?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStampStore {
    stamp: Mutex<Option<i64>>,
}

impl MemoryStampStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stamp(epoch_ms: i64) -> Self {
        Self { stamp: Mutex::new(Some(epoch_ms)) }
    }
}

impl StampStore for MemoryStampStore {
    fn load(&self) -> StoreResult<Option<i64>> {
        Ok(*self.stamp.lock())
    }

    fn save(&self, epoch_ms: i64) -> StoreResult<()> {
        *self.stamp.lock() = Some(epoch_ms);
        Ok(())
    }
}

/// Reuse window for a previous snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub window: Duration,
}

impl CachePolicy {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Last fetch happened less than `window` before `now_ms`
    pub fn is_recent(&self, last_fetch_ms: Option<i64>, now_ms: i64) -> bool {
        match last_fetch_ms {
            Some(last) => {
                let age = now_ms.saturating_sub(last);
                age >= 0 && (age as u128) < self.window.as_millis()
            }
            None => false,
        }
    }

    /// Forced refreshes always fetch; otherwise only a recent stamp with a snapshot to reuse skips the network
    pub fn should_fetch(
        &self,
        force: bool,
        last_fetch_ms: Option<i64>,
        now_ms: i64,
        has_snapshot: bool,
    ) -> bool {
        force || !has_snapshot || !self.is_recent(last_fetch_ms, now_ms)
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(30 * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use temp_dir::TempDir;

    const MINUTE_MS: i64 = 60_000;

    #[test]
    fn test_file_store_roundtrip_and_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = FileStampStore::new(dir.child("nested/state.json"));

        assert_eq!(store.load().unwrap(), None);
        store.save(1_700_000_000_000).unwrap();
        assert_eq!(store.load().unwrap(), Some(1_700_000_000_000));

        let raw: Value = serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw[LAST_FETCH_KEY], "1700000000000");
    }

    #[test]
    fn test_file_store_keeps_other_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.child("state.json");
        std::fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

        let store = FileStampStore::new(&path);
        store.save(42).unwrap();

        let raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(store.load().unwrap(), Some(42));
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.child("state.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStampStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));

        // A save replaces the corrupt file
        store.save(7).unwrap();
        assert_eq!(store.load().unwrap(), Some(7));
    }

    #[test]
    fn test_cache_window() {
        let policy = CachePolicy::default();
        let now = 1_700_000_000_000;

        assert!(policy.is_recent(Some(now - 29 * MINUTE_MS), now));
        assert!(!policy.is_recent(Some(now - 30 * MINUTE_MS), now));
        assert!(!policy.is_recent(None, now));
        // Clock moved backwards
        assert!(!policy.is_recent(Some(now + MINUTE_MS), now));
    }

    #[test]
    fn test_should_fetch() {
        let policy = CachePolicy::default();
        let now = 1_700_000_000_000;
        let recent = Some(now - 5 * MINUTE_MS);
        let stale = Some(now - 45 * MINUTE_MS);

        assert!(!policy.should_fetch(false, recent, now, true));
        assert!(policy.should_fetch(true, recent, now, true));
        assert!(policy.should_fetch(false, recent, now, false));
        assert!(policy.should_fetch(false, stale, now, true));
        assert!(policy.should_fetch(false, None, now, true));
    }
}
