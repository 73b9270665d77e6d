//! The plugin output contract.
//!
//! Format plugins diff a file's before/after payloads and report entity
//! mutations as [`DetectedChange`] values. The pipeline in `strata-detect`
//! turns these into snapshots and change rows; this module only defines
//! the wire shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema the detected entity conforms to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRef {
    pub key: String,
    pub version: String,
}

impl SchemaRef {
    pub fn new(key: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version: version.into(),
        }
    }
}

/// One entity mutation reported by a format plugin.
///
/// `snapshot_content = None` reports a deletion of the entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedChange {
    pub schema: SchemaRef,
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_content: Option<Value>,
}

impl DetectedChange {
    pub fn is_deletion(&self) -> bool {
        self.snapshot_content.is_none()
    }
}
