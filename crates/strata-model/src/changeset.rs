//! Change sets: the changes "active" as of some point.
//!
//! Elements are unique per `(change_set_id, entity_id, schema_key,
//! file_id)` — only the latest change per entity survives in a given set.
//! Uniqueness is enforced where elements are inserted (`strata-store`);
//! these are the row shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChangeId, ChangeSetId};
use crate::key::EntityKey;

/// A named collection of change pointers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub id: ChangeSetId,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

impl ChangeSet {
    pub fn new() -> Self {
        Self {
            id: ChangeSetId::generate(),
            created_at: Utc::now(),
        }
    }
}

impl Default for ChangeSet {
    fn default() -> Self {
        Self::new()
    }
}

/// One change pointer inside a change set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSetElement {
    pub change_set_id: ChangeSetId,
    pub change_id: ChangeId,
    pub entity_id: String,
    pub schema_key: String,
    pub file_id: String,
}

impl ChangeSetElement {
    pub fn new(change_set_id: ChangeSetId, change_id: ChangeId, key: &EntityKey) -> Self {
        Self {
            change_set_id,
            change_id,
            entity_id: key.entity_id.clone(),
            schema_key: key.schema_key.clone(),
            file_id: key.file_id.clone(),
        }
    }

    /// The uniqueness key of this element within its set.
    pub fn entity_key(&self) -> EntityKey {
        EntityKey::new(
            self.entity_id.clone(),
            self.schema_key.clone(),
            self.file_id.clone(),
        )
    }
}
