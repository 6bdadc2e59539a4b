//! Bounded in-memory session store with LRU eviction, per-entry expiry and
//! optional periodic snapshots to disk.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use lru::LruCache;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::MemoryStoreConfig;
use crate::error::{Error, Result};
use crate::snapshot::{self, Snapshot, SnapshotEntry};
use crate::store::Store;

/// Entry stored in the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Absolute expiry. The entry reads as absent from this instant on.
    pub expires_at: DateTime<Utc>,

    /// Opaque session payload.
    pub data: Vec<u8>,
}

impl CacheEntry {
    /// Create an entry that expires `ttl` after `now`.
    pub fn new(data: Vec<u8>, now: DateTime<Utc>, ttl: Duration) -> Self {
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { expires_at, data }
    }

    /// Whether the entry has expired as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl From<SnapshotEntry> for CacheEntry {
    fn from(entry: SnapshotEntry) -> Self {
        Self {
            expires_at: entry.expires_at(),
            data: entry.data,
        }
    }
}

/// State of the background snapshot task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStatus {
    /// No task is running: persistence is disabled or the task was stopped.
    Stopped,
    /// The task is snapshotting on its interval.
    Running,
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Entries currently occupying a slot, expired or not.
    pub size: usize,

    /// Maximum capacity.
    pub capacity: usize,

    /// Entries that have expired but not yet been purged.
    pub expired: usize,
}

/// `None` once the store has been closed.
type Cache = RwLock<Option<LruCache<String, CacheEntry>>>;
type SharedCache = Arc<Cache>;

/// Bounded in-memory [`Store`].
///
/// - LRU eviction once `capacity` entries are held, regardless of expiry
/// - Absolute per-entry expiry, checked lazily on `get`
/// - Optional background task that purges expired entries and snapshots the
///   live ones to a file, restored from on startup
///
/// Clones share the same cache and snapshot task.
#[derive(Clone)]
pub struct MemoryStore {
    inner: SharedCache,
    capacity: NonZeroUsize,
    flush: Option<FlushTask>,
}

#[derive(Clone)]
struct FlushTask {
    path: PathBuf,
    interval: Duration,
    stop: CancellationToken,
}

impl MemoryStore {
    /// Create a store holding at most `capacity` sessions, without persistence.
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or(Error::InvalidCapacity(capacity))?;
        Ok(Self {
            inner: Arc::new(RwLock::new(Some(LruCache::new(capacity)))),
            capacity,
            flush: None,
        })
    }

    /// Create a store from configuration.
    ///
    /// When a snapshot path is configured the store is first restored from
    /// that file, then a background task is spawned on the current tokio
    /// runtime to snapshot it every interval. A missing or unreadable
    /// snapshot is not an error: the store simply starts empty.
    pub async fn from_config(config: MemoryStoreConfig) -> Result<Self> {
        let mut store = Self::new(config.capacity)?;

        let Some(path) = config.snapshot_file().cloned() else {
            return Ok(store);
        };

        store.restore(&path).await;

        let task = FlushTask {
            path,
            interval: config.effective_interval(),
            stop: CancellationToken::new(),
        };
        spawn_flush(Arc::downgrade(&store.inner), task.clone());
        store.flush = Some(task);

        Ok(store)
    }

    /// Load entries from a snapshot file, best-effort.
    ///
    /// Entries are inserted as stored, expired ones included. Returns the
    /// number of entries loaded.
    pub async fn restore(&self, path: &Path) -> usize {
        let snapshot = match snapshot::read_snapshot(path).await {
            Ok(snapshot) => snapshot,
            Err(Error::Snapshot { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                debug!(path = %path.display(), "No session snapshot to restore");
                return 0;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable session snapshot");
                return 0;
            }
        };

        let mut guard = self.inner.write().await;
        let Some(lru) = guard.as_mut() else {
            return 0;
        };
        let count = snapshot.len();
        for (id, entry) in snapshot {
            lru.put(id, entry.into());
        }

        debug!(
            path = %path.display(),
            count = count,
            cache_size = lru.len(),
            "Restored sessions from snapshot"
        );
        count
    }

    /// Write every live entry to `path`.
    ///
    /// Returns the number of entries written. Entries are read without
    /// affecting their recency.
    pub async fn persist(&self, path: &Path) -> Result<usize> {
        let snapshot = {
            let guard = self.inner.read().await;
            let lru = guard.as_ref().ok_or(Error::NotInitialized)?;
            collect_live(lru, Utc::now())
        };
        snapshot::write_snapshot(path, &snapshot).await?;
        Ok(snapshot.len())
    }

    /// Remove all expired entries, returning how many were dropped.
    pub async fn purge_expired(&self) -> Result<usize> {
        let mut guard = self.inner.write().await;
        let lru = guard.as_mut().ok_or(Error::NotInitialized)?;
        Ok(purge(lru, Utc::now()))
    }

    /// Whether a live entry exists for `id`, without touching its recency.
    pub async fn contains(&self, id: &str) -> bool {
        let guard = self.inner.read().await;
        guard
            .as_ref()
            .and_then(|lru| lru.peek(id))
            .is_some_and(|entry| !entry.is_expired(Utc::now()))
    }

    /// Number of occupied slots, including expired entries not yet purged.
    pub async fn len(&self) -> usize {
        self.inner.read().await.as_ref().map_or(0, |lru| lru.len())
    }

    /// Whether no slots are occupied.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> StoreStats {
        let guard = self.inner.read().await;
        let now = Utc::now();
        let (size, expired) = guard.as_ref().map_or((0, 0), |lru| {
            let expired = lru.iter().filter(|(_, e)| e.is_expired(now)).count();
            (lru.len(), expired)
        });
        StoreStats {
            size,
            capacity: self.capacity.get(),
            expired,
        }
    }

    /// Snapshot file this store persists to, if any.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.flush.as_ref().map(|task| task.path.as_path())
    }

    /// State of the background snapshot task.
    pub fn flush_status(&self) -> FlushStatus {
        match &self.flush {
            Some(task) if !task.stop.is_cancelled() => FlushStatus::Running,
            _ => FlushStatus::Stopped,
        }
    }

    /// Stop the background snapshot task.
    ///
    /// A snapshot already being written completes; the task exits before its
    /// next tick and is never restarted.
    pub fn stop_flush(&self) {
        if let Some(task) = &self.flush {
            task.stop.cancel();
        }
    }

    /// Stop the snapshot task and release the cache.
    ///
    /// Every later `get`, `set` or `destroy` fails with
    /// [`Error::NotInitialized`].
    pub async fn close(&self) {
        self.stop_flush();
        self.inner.write().await.take();
        debug!("Memory store closed");
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let mut guard = self.inner.write().await;
        let lru = guard.as_mut().ok_or(Error::NotInitialized)?;

        match lru.peek(id) {
            None => {
                trace!(session_id = %id, "Session not in store");
                return Ok(None);
            }
            Some(entry) if entry.is_expired(Utc::now()) => {
                trace!(session_id = %id, "Session expired");
                return Ok(None);
            }
            Some(_) => {}
        }

        trace!(session_id = %id, "Session found in store");
        Ok(lru.get(id).map(|entry| entry.data.clone()))
    }

    async fn set(&self, id: &str, data: &[u8], ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(data.to_vec(), Utc::now(), ttl);

        let mut guard = self.inner.write().await;
        let lru = guard.as_mut().ok_or(Error::NotInitialized)?;

        if let Some((evicted, _)) = lru.push(id.to_string(), entry)
            && evicted != id
        {
            debug!(evicted = %evicted, "Evicting LRU session to make room");
        }

        trace!(
            session_id = %id,
            cache_size = lru.len(),
            "Session stored"
        );
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<()> {
        let mut guard = self.inner.write().await;
        let lru = guard.as_mut().ok_or(Error::NotInitialized)?;
        if lru.pop(id).is_some() {
            debug!(session_id = %id, "Session destroyed");
        }
        Ok(())
    }
}

fn collect_live(lru: &LruCache<String, CacheEntry>, now: DateTime<Utc>) -> Snapshot {
    lru.iter()
        .filter(|(_, entry)| !entry.is_expired(now))
        .map(|(id, entry)| {
            (
                id.clone(),
                SnapshotEntry::new(entry.expires_at, entry.data.clone()),
            )
        })
        .collect()
}

fn purge(lru: &mut LruCache<String, CacheEntry>, now: DateTime<Utc>) -> usize {
    let expired: Vec<String> = lru
        .iter()
        .filter(|(_, entry)| entry.is_expired(now))
        .map(|(id, _)| id.clone())
        .collect();

    for id in &expired {
        lru.pop(id);
    }
    if !expired.is_empty() {
        debug!(count = expired.len(), "Purged expired sessions");
    }
    expired.len()
}

/// Purge expired entries and write the live ones to the snapshot file.
async fn sweep(inner: &SharedCache, path: &Path) -> Result<usize> {
    let snapshot = {
        let mut guard = inner.write().await;
        let lru = guard.as_mut().ok_or(Error::NotInitialized)?;
        let now = Utc::now();
        purge(lru, now);
        collect_live(lru, now)
    };
    snapshot::write_snapshot(path, &snapshot).await?;
    Ok(snapshot.len())
}

/// The task only holds a weak reference to the cache, so it exits once the
/// last store handle is dropped even without an explicit stop.
fn spawn_flush(inner: Weak<Cache>, task: FlushTask) {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + task.interval;
        let mut ticker = tokio::time::interval_at(start, task.interval);

        info!(
            path = %task.path.display(),
            interval_secs = task.interval.as_secs(),
            "Session snapshot task started"
        );

        loop {
            tokio::select! {
                biased;
                _ = task.stop.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(inner) = inner.upgrade() else {
                        debug!("Memory store dropped, ending snapshot task");
                        break;
                    };
                    match sweep(&inner, &task.path).await {
                        Ok(count) => trace!(count = count, "Session snapshot written"),
                        Err(Error::NotInitialized) => break,
                        Err(e) => warn!(
                            path = %task.path.display(),
                            error = %e,
                            "Failed to write session snapshot"
                        ),
                    }
                }
            }
        }

        info!(path = %task.path.display(), "Session snapshot task stopped");
    });
}
