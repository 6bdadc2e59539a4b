//! Configuration for the in-memory session store.

use std::path::PathBuf;
use std::time::Duration;

/// Default number of sessions kept before LRU eviction.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Snapshot interval used when the configured one is below [`MIN_SNAPSHOT_INTERVAL`].
pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(60);

/// Smallest snapshot interval honored as configured.
pub const MIN_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for [`MemoryStore`](crate::MemoryStore).
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Maximum number of sessions held before the least recently used is evicted.
    pub capacity: usize,

    /// File the store restores from at startup and snapshots to periodically.
    /// `None` (or an empty path) disables persistence.
    pub snapshot_path: Option<PathBuf>,

    /// How often live entries are written to `snapshot_path`.
    pub snapshot_interval: Duration,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            snapshot_path: None,
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
        }
    }
}

impl MemoryStoreConfig {
    /// Create a configuration with the given capacity and no persistence.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Set the maximum number of cached sessions.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Enable periodic snapshots to the given file.
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// Set the snapshot interval.
    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = interval;
        self
    }

    /// The snapshot file, if persistence is enabled.
    pub fn snapshot_file(&self) -> Option<&PathBuf> {
        self.snapshot_path
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Interval the flush task actually runs at.
    ///
    /// Anything below one second falls back to the 60 second default rather
    /// than being clamped up to the floor.
    pub fn effective_interval(&self) -> Duration {
        if self.snapshot_interval < MIN_SNAPSHOT_INTERVAL {
            DEFAULT_SNAPSHOT_INTERVAL
        } else {
            self.snapshot_interval
        }
    }
}
