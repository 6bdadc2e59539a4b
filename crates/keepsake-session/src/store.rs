//! The storage contract sessions are persisted through.
//!
//! A [`Store`] maps an opaque session id to an opaque byte payload with a
//! time-to-live. It knows nothing about the session's shape; encoding and the
//! commit protocol live in [`Session`](crate::Session). Backends are shared
//! across every in-flight request, so implementations must serialize their own
//! internal mutations.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Trait for session storage backends.
///
/// All methods take a non-empty session id and must be safe to call
/// concurrently from multiple requests.
#[async_trait]
pub trait Store: Send + Sync {
    /// Load the payload stored for `id`.
    ///
    /// Returns `Ok(None)` when the id is unknown or its entry has expired;
    /// a miss is never an error.
    async fn get(&self, id: &str) -> Result<Option<Vec<u8>>>;

    /// Store `data` under `id`, replacing any previous payload.
    ///
    /// A zero `ttl` stores an entry that is already expired: subsequent
    /// `get` calls treat it as absent.
    async fn set(&self, id: &str, data: &[u8], ttl: Duration) -> Result<()>;

    /// Remove the payload for `id`. Removing an unknown id is not an error.
    async fn destroy(&self, id: &str) -> Result<()>;
}
