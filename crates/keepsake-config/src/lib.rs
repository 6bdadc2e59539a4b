//! Configuration system for Keepsake.
//!
//! Provides TOML-based configuration with:
//! - A `[store]` section for the in-memory session store (capacity, snapshots)
//! - A `[session]` section for request sessions (expiry, lazy fetching)
//! - Config file layering (user config + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigLayers, ConfigSource, LoadedConfig, load_config, load_config_file, save_config,
    user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
