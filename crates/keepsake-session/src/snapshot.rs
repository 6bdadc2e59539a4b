//! On-disk snapshot format for [`MemoryStore`](crate::MemoryStore).
//!
//! A snapshot is a JSON object keyed by session id:
//!
//! ```json
//! { "3kTMd9Qx": { "expiresAt": 1760875200, "data": "eyJfY3JlYXRlZEF0Ijo..." } }
//! ```
//!
//! `expiresAt` is in epoch seconds and `data` is the raw payload in standard
//! base64. Unknown fields are ignored so older and newer writers can share a
//! file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Contents of a snapshot file, ordered by session id.
pub type Snapshot = BTreeMap<String, SnapshotEntry>;

/// One persisted session payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Expiry in seconds since the Unix epoch.
    #[serde(rename = "expiresAt", alias = "ExpiredAt")]
    pub expires_at: i64,

    /// Raw session payload.
    #[serde(alias = "Data", with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl SnapshotEntry {
    /// Build an entry from an absolute expiry and payload.
    pub fn new(expires_at: DateTime<Utc>, data: Vec<u8>) -> Self {
        Self {
            expires_at: expires_at.timestamp(),
            data,
        }
    }

    /// Expiry as a timestamp. Out-of-range values map to the epoch, which
    /// reads as expired.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.expires_at, 0).unwrap_or_default()
    }

    /// Whether the entry has expired as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() <= now
    }
}

/// Read and decode a snapshot file.
pub async fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let bytes = tokio::fs::read(path).await.map_err(|e| snapshot_err(path, e))?;
    serde_json::from_slice(&bytes).map_err(Error::Deserialization)
}

/// Encode and write a snapshot, replacing `path` atomically.
///
/// The payload goes to a sibling temp file first and is then renamed over the
/// target, so readers see either the old or the new snapshot in full.
pub async fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let bytes = serde_json::to_vec(snapshot).map_err(Error::Serialization)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| snapshot_err(parent, e))?;
    }

    let temp = temp_path(path);
    write_private(&temp, &bytes)
        .await
        .map_err(|e| snapshot_err(&temp, e))?;
    tokio::fs::rename(&temp, path)
        .await
        .map_err(|e| snapshot_err(path, e))?;
    Ok(())
}

#[cfg(unix)]
async fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

#[cfg(not(unix))]
async fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(path, bytes).await
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn snapshot_err(path: &Path, source: std::io::Error) -> Error {
    Error::Snapshot {
        path: path.to_path_buf(),
        source,
    }
}

mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use tempfile::TempDir;

    #[test]
    fn test_entry_wire_format() {
        let entry = SnapshotEntry {
            expires_at: 1_700_000_000,
            data: b"hello".to_vec(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["expiresAt"], 1_700_000_000);
        assert_eq!(json["data"], "aGVsbG8=");
    }

    #[test]
    fn test_legacy_field_names_and_unknown_fields() {
        let json = r#"{"abc": {"ExpiredAt": 42, "Data": "aGk=", "extra": true}}"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        let entry = &snapshot["abc"];
        assert_eq!(entry.expires_at, 42);
        assert_eq!(entry.data, b"hi");
    }

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        let live = SnapshotEntry::new(now + TimeDelta::seconds(30), vec![]);
        let dead = SnapshotEntry::new(now - TimeDelta::seconds(30), vec![]);
        assert!(!live.is_expired(now));
        assert!(dead.is_expired(now));
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("sessions.json");

        let mut snapshot = Snapshot::new();
        snapshot.insert(
            "a".to_string(),
            SnapshotEntry {
                expires_at: 100,
                data: vec![0, 1, 2, 255],
            },
        );
        write_snapshot(&path, &snapshot).await.unwrap();

        assert!(!temp_path(&path).exists());
        let restored = read_snapshot(&path).await.unwrap();
        assert_eq!(restored, snapshot);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = read_snapshot(&dir.path().join("nope.json")).await;
        assert!(matches!(result, Err(Error::Snapshot { .. })));
    }

    #[tokio::test]
    async fn test_read_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, b"{\"a\": {").unwrap();
        let result = read_snapshot(&path).await;
        assert!(matches!(result, Err(Error::Deserialization(_))));
    }
}
