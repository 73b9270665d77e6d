//! Commits: immutable, named points in history.
//!
//! A commit references the change set that is the authoritative state
//! contribution at that point. Commit edges form a DAG — normally one
//! parent, two after a merge. Acyclicity is enforced at creation time in
//! `strata-graph`; it is never self-healing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChangeSetId, CommitId};

/// An immutable point in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub id: CommitId,
    pub change_set_id: ChangeSetId,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

impl Commit {
    pub fn new(change_set_id: ChangeSetId) -> Self {
        Self {
            id: CommitId::generate(),
            change_set_id,
            created_at: Utc::now(),
        }
    }
}

/// Parent → child edge in the commit DAG.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommitEdge {
    pub parent_id: CommitId,
    pub child_id: CommitId,
}
