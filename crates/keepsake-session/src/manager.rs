//! Per-request session lifecycle.
//!
//! [`SessionManager`] drives a [`Session`] through one request:
//!
//! 1. [`begin`](SessionManager::begin) resolves the id through an
//!    [`IdTransport`] and fetches the session (unless lazy fetching is on).
//! 2. Request handlers read and write the session.
//! 3. [`finish`](SessionManager::finish) commits it if it was modified,
//!    first assigning and publishing a new id for anonymous sessions.
//!
//! How the id travels (cookie, header, ...) is up to the transport.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::id::{IdGenerator, default_generator};
use crate::session::Session;
use crate::store::Store;

/// Carries the session id between client and server.
pub trait IdTransport {
    /// Read the id the client presented, if any.
    fn extract_id(&self) -> Result<Option<String>>;

    /// Hand a newly assigned id back to the client.
    fn publish_id(&mut self, id: &str) -> Result<()>;
}

/// An [`IdTransport`] that keeps the id in memory.
///
/// Suitable for callers that manage ids themselves, such as background jobs
/// or tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    incoming: Option<String>,
    published: Option<String>,
}

impl MemoryTransport {
    /// A transport presenting `id` (or nothing, for an anonymous client).
    pub fn new(id: Option<String>) -> Self {
        Self {
            incoming: id.filter(|id| !id.is_empty()),
            published: None,
        }
    }

    /// The id published during the request, if one was assigned.
    pub fn published(&self) -> Option<&str> {
        self.published.as_deref()
    }
}

impl IdTransport for MemoryTransport {
    fn extract_id(&self) -> Result<Option<String>> {
        Ok(self.incoming.clone())
    }

    fn publish_id(&mut self, id: &str) -> Result<()> {
        self.published = Some(id.to_string());
        Ok(())
    }
}

/// Options for [`SessionManager`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// TTL applied to every committed session.
    pub expiry: Duration,

    /// Skip the fetch in [`SessionManager::begin`]; the session is then loaded
    /// by its first write or an explicit [`Session::fetch`].
    pub lazy_fetch: bool,
}

impl SessionOptions {
    pub fn new(expiry: Duration) -> Self {
        Self {
            expiry,
            lazy_fetch: false,
        }
    }

    pub fn with_lazy_fetch(mut self, lazy: bool) -> Self {
        self.lazy_fetch = lazy;
        self
    }
}

/// Creates request sessions over a shared store and commits them afterwards.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn Store>,
    options: SessionOptions,
    generate_id: IdGenerator,
}

impl SessionManager {
    /// Create a manager. The expiry must be non-zero.
    pub fn new(store: Arc<dyn Store>, options: SessionOptions) -> Result<Self> {
        if options.expiry.is_zero() {
            return Err(Error::InvalidExpiry);
        }
        Ok(Self {
            store,
            options,
            generate_id: default_generator(),
        })
    }

    /// Replace the id generator used for anonymous sessions.
    pub fn with_id_generator(mut self, generator: IdGenerator) -> Self {
        self.generate_id = generator;
        self
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Start a request: resolve the id and, unless lazy, fetch the session.
    pub async fn begin<T: IdTransport + ?Sized>(&self, transport: &T) -> Result<Session> {
        let id = transport.extract_id()?.unwrap_or_default();
        let mut session = Session::new(Arc::clone(&self.store), id);
        if !self.options.lazy_fetch {
            session.fetch().await?;
        }
        Ok(session)
    }

    /// End a request: commit the session if it was modified.
    ///
    /// An anonymous session gets a fresh id, published through `transport`
    /// before the commit. Returns whether anything was written.
    pub async fn finish<T: IdTransport + ?Sized>(
        &self,
        session: &mut Session,
        transport: &mut T,
    ) -> Result<bool> {
        if !session.is_modified() || session.ignores_modified() {
            return Ok(false);
        }

        if session.id().is_empty() {
            let id = (self.generate_id)();
            transport.publish_id(&id)?;
            debug!(session_id = %id, "Assigned new session id");
            session.set_id(id);
        }

        session.commit(self.options.expiry).await?;
        Ok(true)
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
