//! Versions: named, possibly branched timelines.
//!
//! A version with `inherits_from_version_id` set transparently sees its
//! parent's entity state for any entity it has not itself diverged on.
//! Which version a write lands in is an explicit context value
//! ([`ActiveVersion`]) passed through call sites — never ambient global
//! state — so a host process can keep several version contexts open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::VersionId;

/// A named timeline.
///
/// `created_at` orders a version against the change stream: cache replay
/// uses it to tell which child versions already existed when a deletion
/// ran copy-down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits_from_version_id: Option<VersionId>,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

impl Version {
    /// A root version with no inheritance parent.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: VersionId::generate(),
            name: name.into(),
            inherits_from_version_id: None,
            created_at: Utc::now(),
        }
    }

    /// A version branching off `parent`. Self-inheritance is rejected.
    pub fn inheriting(
        name: impl Into<String>,
        parent: VersionId,
    ) -> Result<Self, VersionError> {
        let id = VersionId::generate();
        if id == parent {
            return Err(VersionError::SelfInheritance(id));
        }
        Ok(Self {
            id,
            name: name.into(),
            inherits_from_version_id: Some(parent),
            created_at: Utc::now(),
        })
    }
}

/// The version all writes in the current call context land in.
///
/// Exactly one version is "current" per open context; callers thread this
/// value through the write path instead of consulting a process global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveVersion(pub VersionId);

impl ActiveVersion {
    pub fn new(id: VersionId) -> Self {
        Self(id)
    }

    pub fn id(&self) -> &VersionId {
        &self.0
    }
}

/// Violations of version-graph shape.
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("version may not inherit from itself: {0}")]
    SelfInheritance(VersionId),

    #[error("inheritance parent not found: {0}")]
    ParentNotFound(VersionId),
}
