//! Change records and the per-entity lineage graph.
//!
//! A change is one observed mutation of one logical entity inside one
//! file — not a whole-file diff. Changes are immutable once created.
//! `ChangeEdge` links a change to its predecessor for the same entity,
//! forming a lineage DAG used to answer "what was the previous state".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ChangeId;
use crate::key::EntityKey;
use crate::snapshot::SnapshotId;

/// One observed mutation of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub id: ChangeId,
    pub entity_id: String,
    pub schema_key: String,
    pub file_id: String,
    /// Key of the plugin that detected this change.
    pub plugin_key: String,
    pub snapshot_id: SnapshotId,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

impl Change {
    /// The canonical entity key this change belongs to.
    pub fn entity_key(&self) -> EntityKey {
        EntityKey::new(
            self.entity_id.clone(),
            self.schema_key.clone(),
            self.file_id.clone(),
        )
    }

    /// Whether this change records a deletion (points at the reserved
    /// contentless snapshot).
    pub fn is_deletion(&self) -> bool {
        self.snapshot_id.is_no_content()
    }
}

/// Directed lineage edge: `parent_id` is the prior state of the entity,
/// `child_id` the change that superseded it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChangeEdge {
    pub parent_id: ChangeId,
    pub child_id: ChangeId,
}

impl ChangeEdge {
    /// Link a child change to its parent. Self-loops are rejected.
    pub fn link(parent_id: ChangeId, child_id: ChangeId) -> Result<Self, ChangeGraphError> {
        if parent_id == child_id {
            return Err(ChangeGraphError::SelfReference(parent_id));
        }
        Ok(Self {
            parent_id,
            child_id,
        })
    }
}

/// Structural violations in the change lineage graph.
#[derive(Debug, thiserror::Error)]
pub enum ChangeGraphError {
    #[error("change edge may not reference itself: {0}")]
    SelfReference(ChangeId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotId;

    fn change(id: &str) -> Change {
        Change {
            id: ChangeId::new(id),
            entity_id: "e1".to_string(),
            schema_key: "paragraph".to_string(),
            file_id: "f1".to_string(),
            plugin_key: "plugin-md".to_string(),
            snapshot_id: SnapshotId("s1".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn entity_key_round_trips_the_triple() {
        let c = change("c1");
        let key = c.entity_key();
        assert_eq!(key, EntityKey::new("e1", "paragraph", "f1"));
    }

    #[test]
    fn self_referencing_edge_is_rejected() {
        let err = ChangeEdge::link(ChangeId::new("c1"), ChangeId::new("c1"))
            .expect_err("self-loop must be rejected");
        assert!(matches!(err, ChangeGraphError::SelfReference(id) if id.as_str() == "c1"));
    }

    #[test]
    fn distinct_edge_links() {
        let edge = ChangeEdge::link(ChangeId::new("c1"), ChangeId::new("c2"))
            .expect("distinct edge should link");
        assert_eq!(edge.parent_id.as_str(), "c1");
        assert_eq!(edge.child_id.as_str(), "c2");
    }
}
