//! Content-addressed snapshots.
//!
//! A snapshot is the payload a change points at. Snapshots are immutable,
//! deduplicated by the hash of their content, and never garbage-collected
//! by this engine. `content = None` is represented by one reserved
//! "no-content" snapshot shared by every delete marker.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Reserved ID of the single contentless snapshot used for deletions.
pub const NO_CONTENT_SNAPSHOT_ID: &str = "no-content";

/// Content hash identifying a snapshot.
///
/// Two snapshots with the same ID carry byte-identical canonical content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotId(pub String);

impl SnapshotId {
    /// Hash a content payload into its snapshot ID.
    ///
    /// serde_json maps are sorted by key, so the serialized form is
    /// canonical and the hash deterministic.
    pub fn of_content(content: &Value) -> Self {
        let canonical = content.to_string();
        let hash = Sha256::digest(canonical.as_bytes());
        Self(format!("{hash:x}"))
    }

    /// The reserved delete-marker snapshot ID.
    pub fn no_content() -> Self {
        Self(NO_CONTENT_SNAPSHOT_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_no_content(&self) -> bool {
        self.0 == NO_CONTENT_SNAPSHOT_ID
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable, content-addressed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

impl Snapshot {
    /// Build the snapshot for a content payload, ID derived from the hash.
    pub fn of_content(content: Value) -> Self {
        Self {
            id: SnapshotId::of_content(&content),
            content: Some(content),
        }
    }

    /// The shared contentless snapshot.
    pub fn no_content() -> Self {
        Self {
            id: SnapshotId::no_content(),
            content: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equal_content_hashes_to_equal_ids() {
        let a = Snapshot::of_content(json!({"text": "hello", "level": 1}));
        let b = Snapshot::of_content(json!({"level": 1, "text": "hello"}));
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn different_content_hashes_differently() {
        let a = Snapshot::of_content(json!({"text": "hello"}));
        let b = Snapshot::of_content(json!({"text": "world"}));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn no_content_uses_reserved_id() {
        let s = Snapshot::no_content();
        assert_eq!(s.id.as_str(), NO_CONTENT_SNAPSHOT_ID);
        assert!(s.id.is_no_content());
        assert!(s.content.is_none());
    }
}
