//! Canonical in-memory relations.
//!
//! One `BTreeMap` per persisted table, keyed the way the relational layout
//! is keyed (§ persisted layout): the cache table by
//! `(version_id, entity_key)` with a tombstone flag, change-set elements by
//! `(change_set_id, entity_key)` so element uniqueness is structural.
//!
//! Row invariants (snapshot dedup, edge endpoint existence, element
//! uniqueness) are enforced here, at insert time. Derived-state logic is
//! not: the cache rows are mutated only by `strata-cache`, which owns
//! tombstone and copy-down semantics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use strata_model::{
    Change, ChangeEdge, ChangeId, ChangeSet, ChangeSetElement, ChangeSetId, Commit, CommitEdge,
    CommitId, EntityKey, Snapshot, SnapshotId, Version, VersionId,
};

use crate::engine::CommittedChange;

/// Errors raised by table-level invariant checks.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("change not found: {0}")]
    ChangeNotFound(ChangeId),

    #[error("change already exists: {0}")]
    DuplicateChange(ChangeId),

    #[error("snapshot not found: {0}")]
    SnapshotNotFound(SnapshotId),

    #[error("version not found: {0}")]
    VersionNotFound(VersionId),

    #[error("version already exists: {0}")]
    DuplicateVersion(VersionId),

    #[error("version {id} inherits from unknown version {parent}")]
    VersionParentNotFound { id: VersionId, parent: VersionId },

    #[error("version may not inherit from itself: {0}")]
    VersionSelfInheritance(VersionId),

    #[error("change set not found: {0}")]
    ChangeSetNotFound(ChangeSetId),

    #[error("commit not found: {0}")]
    CommitNotFound(CommitId),

    #[error("commit edge may not reference itself: {0}")]
    CommitSelfReference(CommitId),
}

/// One row of the materialized "current state per version" table.
///
/// Derived and rebuildable: the change graph is the source of truth, this
/// row exists purely to avoid O(history) lookups. A row with
/// `inheritance_delete_marker = true` and `snapshot_content = None` is a
/// tombstone: the version has explicitly deleted the entity, and readers
/// must not resolve it by inheritance from further up the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub entity_id: String,
    pub schema_key: String,
    pub file_id: String,
    pub version_id: VersionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_content: Option<Value>,
    pub change_id: ChangeId,
    pub commit_id: CommitId,
    /// Set when this row was frozen from a parent version's value during
    /// copy-down, rather than written by a change in this version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherited_from_version_id: Option<VersionId>,
    #[serde(default)]
    pub inheritance_delete_marker: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CacheEntry {
    /// The entity triple this row materializes.
    pub fn entity_key(&self) -> EntityKey {
        EntityKey::new(
            self.entity_id.clone(),
            self.schema_key.clone(),
            self.file_id.clone(),
        )
    }

    /// Whether this row is a tombstone.
    pub fn is_tombstone(&self) -> bool {
        self.inheritance_delete_marker
    }
}

/// Canonical in-memory state for every persisted relation.
#[derive(Debug, Clone, Default)]
pub struct TableStore {
    snapshots: BTreeMap<SnapshotId, Snapshot>,
    changes: BTreeMap<ChangeId, Change>,
    change_edges: BTreeMap<(ChangeId, ChangeId), ChangeEdge>,
    versions: BTreeMap<VersionId, Version>,
    change_sets: BTreeMap<ChangeSetId, ChangeSet>,
    change_set_elements: BTreeMap<(ChangeSetId, EntityKey), ChangeSetElement>,
    commits: BTreeMap<CommitId, Commit>,
    commit_edges: BTreeMap<(CommitId, CommitId), CommitEdge>,
    cache: BTreeMap<(VersionId, EntityKey), CacheEntry>,
    change_log: Vec<CommittedChange>,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Snapshots ──

    /// Insert a snapshot, deduplicated by content hash.
    ///
    /// Re-inserting an existing ID is a no-op; the stored row is returned
    /// by ID either way.
    pub fn insert_snapshot(&mut self, snapshot: Snapshot) -> SnapshotId {
        let id = snapshot.id.clone();
        self.snapshots.entry(id.clone()).or_insert(snapshot);
        id
    }

    pub fn snapshot(&self, id: &SnapshotId) -> Option<&Snapshot> {
        self.snapshots.get(id)
    }

    /// Content payload of a snapshot; `None` for the no-content snapshot
    /// or an unknown ID.
    pub fn snapshot_content(&self, id: &SnapshotId) -> Option<&Value> {
        self.snapshots.get(id).and_then(|s| s.content.as_ref())
    }

    // ── Changes & lineage edges ──

    pub fn insert_change(&mut self, change: Change) -> Result<(), StoreError> {
        if self.changes.contains_key(&change.id) {
            return Err(StoreError::DuplicateChange(change.id));
        }
        if !self.snapshots.contains_key(&change.snapshot_id) {
            return Err(StoreError::SnapshotNotFound(change.snapshot_id));
        }
        self.changes.insert(change.id.clone(), change);
        Ok(())
    }

    pub fn change(&self, id: &ChangeId) -> Option<&Change> {
        self.changes.get(id)
    }

    /// Insert a lineage edge. Both endpoints must exist; duplicate edges
    /// are a no-op.
    pub fn insert_change_edge(&mut self, edge: ChangeEdge) -> Result<(), StoreError> {
        if !self.changes.contains_key(&edge.parent_id) {
            return Err(StoreError::ChangeNotFound(edge.parent_id));
        }
        if !self.changes.contains_key(&edge.child_id) {
            return Err(StoreError::ChangeNotFound(edge.child_id));
        }
        self.change_edges
            .insert((edge.parent_id.clone(), edge.child_id.clone()), edge);
        Ok(())
    }

    /// Parent changes of `child` in the lineage graph.
    pub fn change_parents(&self, child: &ChangeId) -> Vec<&Change> {
        self.change_edges
            .values()
            .filter(|e| &e.child_id == child)
            .filter_map(|e| self.changes.get(&e.parent_id))
            .collect()
    }

    // ── Versions ──

    pub fn insert_version(&mut self, version: Version) -> Result<(), StoreError> {
        if self.versions.contains_key(&version.id) {
            return Err(StoreError::DuplicateVersion(version.id));
        }
        if let Some(parent) = &version.inherits_from_version_id {
            if parent == &version.id {
                return Err(StoreError::VersionSelfInheritance(version.id));
            }
            if !self.versions.contains_key(parent) {
                return Err(StoreError::VersionParentNotFound {
                    id: version.id,
                    parent: parent.clone(),
                });
            }
        }
        self.versions.insert(version.id.clone(), version);
        Ok(())
    }

    pub fn version(&self, id: &VersionId) -> Option<&Version> {
        self.versions.get(id)
    }

    /// Direct children of `parent`: versions that inherit from it.
    pub fn child_versions_of(&self, parent: &VersionId) -> Vec<&Version> {
        self.versions
            .values()
            .filter(|v| v.inherits_from_version_id.as_ref() == Some(parent))
            .collect()
    }

    // ── Change sets ──

    pub fn insert_change_set(&mut self, change_set: ChangeSet) {
        self.change_sets.insert(change_set.id.clone(), change_set);
    }

    pub fn change_set(&self, id: &ChangeSetId) -> Option<&ChangeSet> {
        self.change_sets.get(id)
    }

    /// Insert an element, unique per `(change_set_id, entity_key)` with
    /// last-write-wins: only the latest change per entity survives in a
    /// given set.
    pub fn insert_change_set_element(
        &mut self,
        element: ChangeSetElement,
    ) -> Result<(), StoreError> {
        if !self.change_sets.contains_key(&element.change_set_id) {
            return Err(StoreError::ChangeSetNotFound(element.change_set_id));
        }
        if !self.changes.contains_key(&element.change_id) {
            return Err(StoreError::ChangeNotFound(element.change_id));
        }
        let key = (element.change_set_id.clone(), element.entity_key());
        self.change_set_elements.insert(key, element);
        Ok(())
    }

    /// Elements of one change set, in entity-key order.
    pub fn elements_of_change_set(&self, id: &ChangeSetId) -> Vec<&ChangeSetElement> {
        self.change_set_elements
            .range((id.clone(), EntityKey::new("", "", ""))..)
            .take_while(|((set_id, _), _)| set_id == id)
            .map(|(_, element)| element)
            .collect()
    }

    // ── Commits ──

    pub fn insert_commit(&mut self, commit: Commit) -> Result<(), StoreError> {
        if !self.change_sets.contains_key(&commit.change_set_id) {
            return Err(StoreError::ChangeSetNotFound(commit.change_set_id));
        }
        self.commits.insert(commit.id.clone(), commit);
        Ok(())
    }

    pub fn commit(&self, id: &CommitId) -> Option<&Commit> {
        self.commits.get(id)
    }

    pub fn insert_commit_edge(&mut self, edge: CommitEdge) -> Result<(), StoreError> {
        if edge.parent_id == edge.child_id {
            return Err(StoreError::CommitSelfReference(edge.parent_id));
        }
        if !self.commits.contains_key(&edge.parent_id) {
            return Err(StoreError::CommitNotFound(edge.parent_id));
        }
        if !self.commits.contains_key(&edge.child_id) {
            return Err(StoreError::CommitNotFound(edge.child_id));
        }
        self.commit_edges
            .insert((edge.parent_id.clone(), edge.child_id.clone()), edge);
        Ok(())
    }

    /// Parent commits of `child`, in insertion-key order.
    pub fn commit_parents(&self, child: &CommitId) -> Vec<&Commit> {
        self.commit_edges
            .values()
            .filter(|e| &e.child_id == child)
            .filter_map(|e| self.commits.get(&e.parent_id))
            .collect()
    }

    // ── State cache rows ──
    //
    // Mutated only by the state cache engine.

    pub fn cache_entry(&self, version: &VersionId, key: &EntityKey) -> Option<&CacheEntry> {
        self.cache.get(&(version.clone(), key.clone()))
    }

    /// Write or overwrite one cache row (last-write-wins).
    pub fn upsert_cache_entry(&mut self, entry: CacheEntry) {
        let key = (entry.version_id.clone(), entry.entity_key());
        self.cache.insert(key, entry);
    }

    pub fn remove_cache_entry(
        &mut self,
        version: &VersionId,
        key: &EntityKey,
    ) -> Option<CacheEntry> {
        self.cache.remove(&(version.clone(), key.clone()))
    }

    /// All cache rows scoped to one version, in entity-key order.
    pub fn cache_entries_for_version(&self, version: &VersionId) -> Vec<&CacheEntry> {
        self.cache
            .range((version.clone(), EntityKey::new("", "", ""))..)
            .take_while(|((v, _), _)| v == version)
            .map(|(_, entry)| entry)
            .collect()
    }

    /// Drop every cache row. The cache is derived state; this loses
    /// nothing that replay cannot restore.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    // ── Committed change log ──

    /// Append committed changes to the replayable log. Called by the
    /// write boundary at commit time, not by components.
    pub(crate) fn append_change_log(&mut self, committed: &[CommittedChange]) {
        self.change_log.extend_from_slice(committed);
    }

    /// The committed change stream, in commit order.
    pub fn change_log(&self) -> &[CommittedChange] {
        &self.change_log
    }
}
