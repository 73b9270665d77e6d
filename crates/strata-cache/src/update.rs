//! Batched cache update.
//!
//! One call applies one committed batch of changes for one version. The
//! batch is partitioned: non-deletions are plain last-write-wins upserts;
//! deletions freeze the pre-deletion value into child versions that were
//! implicitly inheriting it (copy-down), then replace the parent's row
//! with a tombstone. The whole call is logically equivalent to applying
//! each change independently.

use chrono::Utc;

use strata_model::{Change, ChangeId, CommitId, SnapshotId, VersionId};
use strata_store::{CacheEntry, StoreError, TableStore};

use crate::resolve::{Resolution, resolve_effective_state};

/// Errors from cache maintenance.
///
/// These abort the enclosing transaction; none of them is user-visible
/// staleness (staleness is healed by rebuild, not surfaced).
#[derive(Debug, thiserror::Error)]
pub enum StateCacheError {
    #[error("version not found: {0}")]
    VersionNotFound(VersionId),

    #[error("change {change} references missing snapshot {snapshot}")]
    MissingSnapshot {
        change: ChangeId,
        snapshot: SnapshotId,
    },

    #[error("version inheritance chain revisits {0}; the version graph is corrupt")]
    CyclicInheritance(VersionId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Apply one committed batch of changes to the cache of `version_id`.
///
/// Idempotent for non-deletions: re-applying a change overwrites the row
/// with identical data. Deletions re-applied find the tombstone already
/// in place and rewrite it.
pub fn update_state_cache(
    store: &mut TableStore,
    changes: &[Change],
    commit_id: &CommitId,
    version_id: &VersionId,
) -> Result<(), StateCacheError> {
    if store.version(version_id).is_none() {
        return Err(StateCacheError::VersionNotFound(version_id.clone()));
    }

    let (deletions, upserts): (Vec<&Change>, Vec<&Change>) =
        changes.iter().partition(|c| c.is_deletion());

    for change in upserts {
        apply_upsert(store, change, commit_id, version_id)?;
    }
    for change in deletions {
        apply_deletion(store, change, commit_id, version_id)?;
    }
    Ok(())
}

fn apply_upsert(
    store: &mut TableStore,
    change: &Change,
    commit_id: &CommitId,
    version_id: &VersionId,
) -> Result<(), StateCacheError> {
    let content = store
        .snapshot_content(&change.snapshot_id)
        .cloned()
        .ok_or_else(|| StateCacheError::MissingSnapshot {
            change: change.id.clone(),
            snapshot: change.snapshot_id.clone(),
        })?;

    let key = change.entity_key();
    let now = Utc::now();
    let created_at = store
        .cache_entry(version_id, &key)
        .map(|existing| existing.created_at)
        .unwrap_or(now);

    store.upsert_cache_entry(CacheEntry {
        entity_id: change.entity_id.clone(),
        schema_key: change.schema_key.clone(),
        file_id: change.file_id.clone(),
        version_id: version_id.clone(),
        snapshot_content: Some(content),
        change_id: change.id.clone(),
        commit_id: commit_id.clone(),
        inherited_from_version_id: None,
        inheritance_delete_marker: false,
        created_at,
        updated_at: now,
    });
    Ok(())
}

/// The deletion path.
///
/// Order matters: children must receive their frozen copy of the
/// pre-deletion value before the parent's row disappears, and the
/// tombstone must land last so no intermediate read resolves the entity
/// from further up the chain.
///
/// The pre-deletion value is the version's *effective* state: its own
/// live row, or the value it was itself inheriting from an ancestor.
/// Either way the children were reading that value through this version
/// and keep it frozen.
fn apply_deletion(
    store: &mut TableStore,
    change: &Change,
    commit_id: &CommitId,
    version_id: &VersionId,
) -> Result<(), StateCacheError> {
    let key = change.entity_key();
    let now = Utc::now();
    let prior = match resolve_effective_state(store, version_id, &key)? {
        Resolution::Found(entry) => Some(entry.clone()),
        Resolution::Deleted(_) | Resolution::Missing => None,
    };

    if let Some(prior) = &prior {
        let children: Vec<VersionId> = store
            .child_versions_of(version_id)
            .into_iter()
            // During replay the version table already holds versions that
            // were branched after this deletion; they never saw the value
            // and must not receive a frozen copy.
            .filter(|v| v.created_at <= change.created_at)
            .map(|v| v.id.clone())
            .collect();

        for child in children {
            // A child with any row of its own — live, tombstone, or a
            // previous freeze — no longer reads through this version.
            if store.cache_entry(&child, &key).is_some() {
                continue;
            }
            store.upsert_cache_entry(CacheEntry {
                entity_id: prior.entity_id.clone(),
                schema_key: prior.schema_key.clone(),
                file_id: prior.file_id.clone(),
                version_id: child,
                snapshot_content: prior.snapshot_content.clone(),
                change_id: prior.change_id.clone(),
                commit_id: prior.commit_id.clone(),
                inherited_from_version_id: Some(version_id.clone()),
                inheritance_delete_marker: false,
                created_at: now,
                updated_at: now,
            });
        }
    }

    store.remove_cache_entry(version_id, &key);
    store.upsert_cache_entry(CacheEntry {
        entity_id: change.entity_id.clone(),
        schema_key: change.schema_key.clone(),
        file_id: change.file_id.clone(),
        version_id: version_id.clone(),
        snapshot_content: None,
        change_id: change.id.clone(),
        commit_id: commit_id.clone(),
        inherited_from_version_id: None,
        inheritance_delete_marker: true,
        created_at: now,
        updated_at: now,
    });
    Ok(())
}
