//! TTL cache for fetched package metadata, with debounced snapshot
//! persistence.
//!
//! The in-memory map is the source of truth. Every mutation schedules a
//! snapshot write after a quiet period; a new mutation inside that
//! period resets the timer, so a burst of writes costs one flush.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::FLUSH_DEBOUNCE;
use crate::error::CacheError;
use crate::types::PackageVersions;

/// Milliseconds since the UNIX epoch.
pub fn current_timestamp_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: PackageVersions,
    /// Insertion time in milliseconds since the UNIX epoch.
    pub timestamp: i64,
}

/// Durable backing for cache snapshots.
pub trait SnapshotStore: Send + Sync {
    fn load(&self) -> Result<HashMap<String, CacheEntry>, CacheError>;
    fn save(&self, entries: &HashMap<String, CacheEntry>) -> Result<(), CacheError>;
    fn erase(&self) -> Result<(), CacheError>;
}

/// Snapshot store writing one JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<HashMap<String, CacheEntry>, CacheError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn save(&self, entries: &HashMap<String, CacheEntry>) -> Result<(), CacheError> {
        let text = serde_json::to_string(entries)?;
        // Write to a sibling file first so a crash mid-write never
        // leaves a truncated snapshot behind.
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, text)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn erase(&self) -> Result<(), CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug)]
struct Shared {
    entries: Mutex<HashMap<String, CacheEntry>>,
    store: Mutex<Option<Arc<dyn SnapshotStore>>>,
}

impl std::fmt::Debug for dyn SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SnapshotStore")
    }
}

impl Shared {
    fn flush_now(&self) {
        let store = lock(&self.store);
        let Some(store) = store.as_ref() else {
            return;
        };
        let entries = lock(&self.entries).clone();
        if let Err(e) = store.save(&entries) {
            warn!(error = %e, "failed to persist cache snapshot");
        } else {
            debug!(entries = entries.len(), "cache snapshot persisted");
        }
    }
}

/// In-memory TTL cache over [`PackageVersions`] records.
///
/// Keys are normalized to lowercase. Construction never fails: a broken
/// snapshot is logged and the cache starts empty.
pub struct CacheManager {
    shared: Arc<Shared>,
    pending_flush: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CacheManager {
    pub fn new(store: Option<Arc<dyn SnapshotStore>>) -> Self {
        let entries = match &store {
            Some(store) => store.load().unwrap_or_else(|e| {
                warn!(error = %e, "failed to load cache snapshot, starting empty");
                HashMap::new()
            }),
            None => HashMap::new(),
        };

        Self {
            shared: Arc::new(Shared {
                entries: Mutex::new(entries),
                store: Mutex::new(store),
            }),
            pending_flush: Mutex::new(None),
        }
    }

    /// Attach (or replace) the snapshot store and merge its contents in.
    /// On key collision the newly loaded entry wins.
    pub fn bind_store(&self, store: Arc<dyn SnapshotStore>) {
        match store.load() {
            Ok(loaded) => {
                let mut entries = lock(&self.shared.entries);
                entries.extend(loaded);
            }
            Err(e) => warn!(error = %e, "failed to load cache snapshot on rebind"),
        }
        *lock(&self.shared.store) = Some(store);
        self.schedule_flush();
    }

    /// Look up a fresh entry, evicting it if older than the TTL.
    pub fn get(&self, package_name: &str, ttl_minutes: u64) -> Option<PackageVersions> {
        self.get_at(package_name, ttl_minutes, current_timestamp_ms())
    }

    fn get_at(&self, package_name: &str, ttl_minutes: u64, now_ms: i64) -> Option<PackageVersions> {
        let key = package_name.to_lowercase();
        let ttl_ms = ttl_minutes as i64 * 60_000;

        let expired = {
            let mut entries = lock(&self.shared.entries);
            let entry = entries.get(&key)?;
            if now_ms - entry.timestamp > ttl_ms {
                entries.remove(&key);
                true
            } else {
                return Some(entry.data.clone());
            }
        };

        if expired {
            self.schedule_flush();
        }
        None
    }

    pub fn set(&self, package_name: &str, data: PackageVersions) {
        let key = package_name.to_lowercase();
        lock(&self.shared.entries).insert(
            key,
            CacheEntry {
                data,
                timestamp: current_timestamp_ms(),
            },
        );
        self.schedule_flush();
    }

    /// Drop everything, in memory and on disk.
    pub fn clear(&self) {
        if let Some(handle) = lock(&self.pending_flush).take() {
            handle.abort();
        }
        lock(&self.shared.entries).clear();
        if let Some(store) = lock(&self.shared.store).as_ref() {
            if let Err(e) = store.erase() {
                warn!(error = %e, "failed to erase cache snapshot");
            }
        }
    }

    pub fn size(&self) -> usize {
        lock(&self.shared.entries).len()
    }

    /// Arm (or re-arm) the debounced snapshot write. Outside a runtime
    /// the flush happens synchronously instead.
    fn schedule_flush(&self) {
        if lock(&self.shared.store).is_none() {
            return;
        }

        let mut pending = lock(&self.pending_flush);
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let shared = Arc::clone(&self.shared);
                *pending = Some(runtime.spawn(async move {
                    tokio::time::sleep(FLUSH_DEBOUNCE).await;
                    shared.flush_now();
                }));
            }
            Err(_) => self.shared.flush_now(),
        }
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn sample(package: &str) -> PackageVersions {
        PackageVersions {
            package_name: package.to_string(),
            versions: vec!["1.0.0".to_string(), "2.0.0".to_string()],
            summary: Some("sample".to_string()),
            fetched_at: current_timestamp_ms(),
        }
    }

    #[test]
    fn get_returns_fresh_entries() {
        let cache = CacheManager::new(None);
        cache.set("Requests", sample("requests"));

        // Keys are case-insensitive.
        let hit = cache.get("requests", 60).unwrap();
        assert_eq!(hit.package_name, "requests");
        let hit = cache.get("REQUESTS", 60).unwrap();
        assert_eq!(hit.package_name, "requests");
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn expired_entries_are_evicted_on_read() {
        let cache = CacheManager::new(None);
        cache.set("requests", sample("requests"));

        let later = current_timestamp_ms() + 61 * 60_000;
        assert!(cache.get_at("requests", 60, later).is_none());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn entries_at_exactly_the_ttl_are_still_fresh() {
        let cache = CacheManager::new(None);
        cache.set("requests", sample("requests"));

        let timestamp = lock(&cache.shared.entries)["requests"].timestamp;
        assert!(cache.get_at("requests", 60, timestamp + 60 * 60_000).is_some());
        assert!(cache.get_at("requests", 60, timestamp + 60 * 60_000 + 1).is_none());
    }

    #[test]
    fn clear_empties_memory_and_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let store = Arc::new(JsonFileStore::new(&path));

        let cache = CacheManager::new(Some(store));
        cache.set("requests", sample("requests"));
        // No runtime here, so the flush ran synchronously.
        assert!(path.exists());

        cache.clear();
        assert_eq!(cache.size(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn snapshot_round_trips_through_a_new_manager() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let cache = CacheManager::new(Some(Arc::new(JsonFileStore::new(&path))));
        cache.set("requests", sample("requests"));
        cache.set("numpy", sample("numpy"));

        let reloaded = CacheManager::new(Some(Arc::new(JsonFileStore::new(&path))));
        assert_eq!(reloaded.size(), 2);
        assert!(reloaded.get("numpy", 60).is_some());
    }

    #[test]
    fn save_replaces_the_snapshot_atomically() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let store = JsonFileStore::new(&path);

        let mut entries = HashMap::new();
        entries.insert(
            "requests".to_string(),
            CacheEntry {
                data: sample("requests"),
                timestamp: current_timestamp_ms(),
            },
        );
        store.save(&entries).unwrap();

        // The staging file is gone and the snapshot loads whole.
        assert!(path.exists());
        assert!(!dir.path().join("cache.tmp").exists());
        assert_eq!(store.load().unwrap().len(), 1);

        // A second save overwrites cleanly.
        entries.insert(
            "numpy".to_string(),
            CacheEntry {
                data: sample("numpy"),
                timestamp: current_timestamp_ms(),
            },
        );
        store.save(&entries).unwrap();
        assert_eq!(store.load().unwrap().len(), 2);
        assert!(!dir.path().join("cache.tmp").exists());
    }

    #[test]
    fn corrupt_snapshot_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{{not json").unwrap();

        let cache = CacheManager::new(Some(Arc::new(JsonFileStore::new(&path))));
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn bind_store_merges_with_loaded_entries_winning() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let mut on_disk = HashMap::new();
        let mut disk_record = sample("requests");
        disk_record.summary = Some("from disk".to_string());
        on_disk.insert(
            "requests".to_string(),
            CacheEntry {
                data: disk_record,
                timestamp: current_timestamp_ms(),
            },
        );
        JsonFileStore::new(&path).save(&on_disk).unwrap();

        let cache = CacheManager::new(None);
        cache.set("requests", sample("requests"));
        cache.set("numpy", sample("numpy"));

        cache.bind_store(Arc::new(JsonFileStore::new(&path)));
        assert_eq!(cache.size(), 2);
        let hit = cache.get("requests", 60).unwrap();
        assert_eq!(hit.summary.as_deref(), Some("from disk"));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_waits_for_the_quiet_period() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let cache = CacheManager::new(Some(Arc::new(JsonFileStore::new(&path))));
        cache.set("requests", sample("requests"));
        assert!(!path.exists());

        tokio::time::sleep(FLUSH_DEBOUNCE + std::time::Duration::from_millis(50)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(path.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn writes_inside_the_quiet_period_reset_the_timer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let cache = CacheManager::new(Some(Arc::new(JsonFileStore::new(&path))));
        cache.set("requests", sample("requests"));

        tokio::time::sleep(std::time::Duration::from_millis(600)).await;
        cache.set("numpy", sample("numpy"));

        // 600ms past the first write, the reset timer is still running.
        tokio::time::sleep(std::time::Duration::from_millis(600)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!path.exists());

        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(path.exists());

        let reloaded = CacheManager::new(Some(Arc::new(JsonFileStore::new(&path))));
        assert_eq!(reloaded.size(), 2);
    }
}
