//! CLI command handlers.

use std::path::PathBuf;

use anyhow::Result;
use keepsake_config::{KeepsakeConfig, LoadedConfig};
use keepsake_session::{MemoryStoreConfig, SessionOptions};

pub mod check;
pub mod config;
pub mod snapshot;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit config file, bypassing discovery.
    pub config_path: Option<PathBuf>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Load the config: the explicit file if given, otherwise the discovered layers.
    pub fn load_config(&self) -> Result<LoadedConfig> {
        let loaded = match &self.config_path {
            Some(path) => LoadedConfig::from_file(path)?,
            None => keepsake_config::load_config(),
        };

        for warning in &loaded.warnings {
            tracing::warn!("{}", warning);
        }
        loaded.config.validate()?;
        Ok(loaded)
    }
}

/// Store settings from the `[store]` section.
pub fn store_config(config: &KeepsakeConfig) -> MemoryStoreConfig {
    let store = config.store();
    let mut out = MemoryStoreConfig::new(store.capacity)
        .with_snapshot_interval(store.snapshot_interval());
    if let Some(path) = store.snapshot_path {
        out = out.with_snapshot_path(path);
    }
    out
}

/// Session settings from the `[session]` section.
pub fn session_options(config: &KeepsakeConfig) -> SessionOptions {
    let session = config.session();
    SessionOptions::new(session.expiry()).with_lazy_fetch(session.lazy_fetch)
}
