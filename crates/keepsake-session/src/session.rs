//! Request-scoped session state and its fetch → mutate → commit protocol.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::store::Store;
use crate::value::Value;

/// Key holding the session's creation time (RFC 3339).
pub const CREATED_AT: &str = "_createdAt";

/// Key holding the time of the session's last modification (RFC 3339).
pub const UPDATED_AT: &str = "_updatedAt";

/// Session data as stored.
pub type SessionData = BTreeMap<String, Value>;

/// A batch of writes for [`Session::set_map`]. `None` deletes the key.
pub type Patch = BTreeMap<String, Option<Value>>;

/// One client's session for the duration of a request.
///
/// The session is loaded lazily from its [`Store`], mutated by request
/// handlers, and written back at most once. Only modified sessions are
/// written.
///
/// A session is owned by a single request flow and is not internally
/// synchronized; the store it wraps is shared.
pub struct Session {
    store: Arc<dyn Store>,
    id: String,
    data: SessionData,
    fetched: bool,
    modified: bool,
    committed: bool,
    readonly: bool,
    ignore_modified: bool,
}

impl Session {
    /// Create an unfetched session. `id` may be empty for a new visitor.
    pub fn new(store: Arc<dyn Store>, id: impl Into<String>) -> Self {
        Self {
            store,
            id: id.into(),
            data: SessionData::new(),
            fetched: false,
            modified: false,
            committed: false,
            readonly: false,
            ignore_modified: false,
        }
    }

    /// The session id; empty if none has been assigned yet.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Assign the session id, typically a freshly generated one before commit.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn is_fetched(&self) -> bool {
        self.fetched
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Reject all further writes with [`Error::Readonly`].
    pub fn enable_readonly(&mut self) {
        self.readonly = true;
    }

    pub fn ignores_modified(&self) -> bool {
        self.ignore_modified
    }

    /// While set, [`commit`](Self::commit) succeeds without writing anything,
    /// even if the session was modified. The flag stays until cleared.
    pub fn set_ignore_modified(&mut self, ignore: bool) {
        self.ignore_modified = ignore;
    }

    /// All session data; empty until fetched.
    pub fn data(&self) -> &SessionData {
        &self.data
    }

    /// Load the session data from the store.
    ///
    /// Does nothing if already fetched. A session without an id, or whose id
    /// is unknown to the store, starts out with only [`CREATED_AT`] set.
    pub async fn fetch(&mut self) -> Result<&SessionData> {
        if self.fetched {
            return Ok(&self.data);
        }

        let stored = if self.id.is_empty() {
            None
        } else {
            self.store.get(&self.id).await?
        };

        self.data = match stored {
            Some(bytes) if !bytes.is_empty() => {
                trace!(session_id = %self.id, "Session loaded from store");
                serde_json::from_slice(&bytes).map_err(Error::Deserialization)?
            }
            _ => fresh_data(),
        };
        self.fetched = true;
        Ok(&self.data)
    }

    /// Look up a value. Returns `None` before the session is fetched.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if !self.fetched {
            return None;
        }
        self.data.get(key)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).is_some_and(Value::to_bool)
    }

    pub fn get_string(&self, key: &str) -> String {
        self.get(key).map(Value::to_string).unwrap_or_default()
    }

    pub fn get_int(&self, key: &str) -> i64 {
        self.get(key).map_or(0, Value::to_int)
    }

    pub fn get_float(&self, key: &str) -> f64 {
        self.get(key).map_or(0.0, Value::to_float)
    }

    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        self.get(key).map(Value::to_string_list).unwrap_or_default()
    }

    /// Creation time as stored, or an empty string before fetch.
    pub fn created_at(&self) -> String {
        self.get_string(CREATED_AT)
    }

    /// Last modification time as stored, or an empty string if never modified.
    pub fn updated_at(&self) -> String {
        self.get_string(UPDATED_AT)
    }

    /// Store `value` under `key`. An empty key is ignored.
    pub async fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.write(key, Some(value.into())).await
    }

    /// Delete `key`. The session counts as modified even if the key was absent.
    pub async fn remove(&mut self, key: &str) -> Result<()> {
        self.write(key, None).await
    }

    async fn write(&mut self, key: &str, value: Option<Value>) -> Result<()> {
        self.ensure_writable()?;
        if key.is_empty() {
            return Ok(());
        }
        self.fetch().await?;

        apply(&mut self.data, key.to_string(), value);
        self.touch();
        Ok(())
    }

    /// Apply several writes at once; `None` values delete their key.
    ///
    /// Passing `None` for the whole patch is a no-op, while an empty patch
    /// still marks the session as modified.
    pub async fn set_map(&mut self, patch: impl Into<Option<Patch>>) -> Result<()> {
        self.ensure_writable()?;
        let Some(patch) = patch.into() else {
            return Ok(());
        };
        self.fetch().await?;

        for (key, value) in patch {
            apply(&mut self.data, key, value);
        }
        self.touch();
        Ok(())
    }

    /// Mark the session as modified without changing its content, so the
    /// next commit extends its lifetime in the store.
    pub async fn refresh(&mut self) -> Result<()> {
        self.ensure_writable()?;
        self.fetch().await?;
        self.touch();
        Ok(())
    }

    /// Write the session back to the store with the given TTL.
    ///
    /// Succeeds without writing if the session is unmodified or ignores
    /// modification. Fails with [`Error::DuplicateCommit`] on a second
    /// commit and with [`Error::MissingId`] if no id was assigned.
    pub async fn commit(&mut self, ttl: Duration) -> Result<()> {
        if !self.modified || self.ignore_modified {
            return Ok(());
        }
        if self.committed {
            return Err(Error::DuplicateCommit);
        }
        if self.id.is_empty() {
            return Err(Error::MissingId);
        }

        let bytes = serde_json::to_vec(&self.data).map_err(Error::Serialization)?;
        self.store.set(&self.id, &bytes, ttl).await?;
        self.committed = true;

        debug!(
            session_id = %self.id,
            bytes = bytes.len(),
            ttl_secs = ttl.as_secs(),
            "Session committed"
        );
        Ok(())
    }

    /// Delete the session from the store and start over with fresh data.
    ///
    /// Does nothing for a session without an id. The id is cleared so a new
    /// one is assigned if the session is written again.
    pub async fn destroy(&mut self) -> Result<()> {
        if self.id.is_empty() {
            return Ok(());
        }

        self.store.destroy(&self.id).await?;
        debug!(session_id = %self.id, "Session destroyed");

        self.data = fresh_data();
        self.id.clear();
        Ok(())
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.readonly {
            Err(Error::Readonly)
        } else {
            Ok(())
        }
    }

    fn touch(&mut self) {
        self.data.insert(UPDATED_AT.to_string(), Value::String(now()));
        self.modified = true;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .field("fetched", &self.fetched)
            .field("modified", &self.modified)
            .field("committed", &self.committed)
            .field("readonly", &self.readonly)
            .field("ignore_modified", &self.ignore_modified)
            .finish_non_exhaustive()
    }
}

fn apply(data: &mut SessionData, key: String, value: Option<Value>) {
    match value {
        Some(value) => {
            data.insert(key, value);
        }
        None => {
            data.remove(&key);
        }
    }
}

fn fresh_data() -> SessionData {
    let mut data = SessionData::new();
    data.insert(CREATED_AT.to_string(), Value::String(now()));
    data
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
