//! Server-side session storage with a strict commit protocol.
//!
//! This crate provides:
//! - A [`Store`] contract for session backends
//! - [`MemoryStore`], a bounded in-memory store with LRU eviction, per-entry
//!   expiry and optional periodic snapshots to disk
//! - [`Session`], request-scoped session state that is written back at most
//!   once, and only when modified
//! - [`SessionManager`], which runs a session through a request
//!
//! # Example
//!
//! ```rust,ignore
//! use keepsake_session::{MemoryStore, MemoryTransport, SessionManager, SessionOptions};
//!
//! let store = Arc::new(MemoryStore::new(1000)?);
//! let manager = SessionManager::new(store, SessionOptions::new(Duration::from_secs(3600)))?;
//!
//! let mut transport = MemoryTransport::new(None);
//! let mut session = manager.begin(&transport).await?;
//! let views = session.get_int("views");
//! session.set("views", views + 1).await?;
//! manager.finish(&mut session, &mut transport).await?;
//! ```

mod config;
mod error;
mod id;
mod manager;
mod memory;
mod session;
pub mod snapshot;
mod store;
mod value;

pub use config::{
    DEFAULT_CAPACITY, DEFAULT_SNAPSHOT_INTERVAL, MIN_SNAPSHOT_INTERVAL, MemoryStoreConfig,
};
pub use error::{Error, Result};
pub use id::{ID_LENGTH, IdGenerator, default_generator, random_id};
pub use manager::{IdTransport, MemoryTransport, SessionManager, SessionOptions};
pub use memory::{CacheEntry, FlushStatus, MemoryStore, StoreStats};
pub use session::{CREATED_AT, Patch, Session, SessionData, UPDATED_AT};
pub use store::Store;
pub use value::Value;
