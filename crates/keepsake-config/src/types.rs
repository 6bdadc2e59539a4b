//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [store]      # in-memory session store
//! [session]    # request session behavior
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default values shared with callers that build config programmatically.
pub mod defaults {
    pub const CAPACITY: usize = 10_000;
    pub const SNAPSHOT_INTERVAL_SECS: u64 = 60;
    /// Ten hours.
    pub const EXPIRY_SECS: u64 = 36_000;
}

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepsakeConfig {
    /// Session store configuration.
    pub store: Option<StoreConfig>,

    /// Request session configuration.
    pub session: Option<SessionConfig>,
}

impl KeepsakeConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: KeepsakeConfig) {
        if other.store.is_some() {
            self.store = other.store;
        }

        if other.session.is_some() {
            self.session = other.session;
        }
    }

    /// The store section, or defaults if absent.
    pub fn store(&self) -> StoreConfig {
        self.store.clone().unwrap_or_default()
    }

    /// The session section, or defaults if absent.
    pub fn session(&self) -> SessionConfig {
        self.session.clone().unwrap_or_default()
    }

    /// Check that every configured value is usable.
    pub fn validate(&self) -> Result<()> {
        let store = self.store();
        if store.capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "store.capacity".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let session = self.session();
        if session.expiry_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "session.expiry_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory session store configuration.
///
/// ```toml
/// [store]
/// capacity = 10000
/// snapshot_path = "/var/lib/keepsake/sessions.json"
/// snapshot_interval_secs = 60
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum number of sessions held before LRU eviction.
    pub capacity: usize,
    /// Snapshot file; snapshots are disabled when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,
    /// Seconds between snapshots. Values below 1 fall back to 60.
    pub snapshot_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::CAPACITY,
            snapshot_path: None,
            snapshot_interval_secs: defaults::SNAPSHOT_INTERVAL_SECS,
        }
    }
}

impl StoreConfig {
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Request session configuration.
///
/// ```toml
/// [session]
/// expiry_secs = 36000
/// lazy_fetch = false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lifetime of a committed session in the store.
    pub expiry_secs: u64,
    /// Defer loading a session until it is first written.
    pub lazy_fetch: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiry_secs: defaults::EXPIRY_SECS,
            lazy_fetch: false,
        }
    }
}

impl SessionConfig {
    pub fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_secs)
    }
}
