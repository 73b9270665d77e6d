//! The write path: queued file write → entity-level change records.
//!
//! For each plugin whose glob matches the written path, detection runs
//! and every reported mutation becomes: a deduplicated snapshot, a new
//! change row, a lineage edge to the prior leaf (looked up via the cache
//! for the active version — never by walking history), and a cache
//! update. The whole entry is one batch inside the caller's write
//! transaction: either every detected change applies or none does.

use strata_cache::{Resolution, StateCacheError, resolve_effective_state, update_state_cache};
use strata_model::{
    ActiveVersion, Change, ChangeEdge, ChangeGraphError, ChangeId, CommitId, EntityKey, Snapshot,
};
use strata_store::{StoreError, WriteTransaction};

use crate::plugin::PluginRegistry;
use crate::queue::{MissingDataError, WriteQueue, WriteQueueEntry};

/// Errors from the detection pipeline.
///
/// All of these abort the enclosing transaction. Configuration errors
/// (a matching plugin that cannot detect) and precondition failures
/// (missing file data) are fatal and not retried.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("write queue entry {0} has no path on either side")]
    MissingPath(String),

    #[error(transparent)]
    MissingData(#[from] MissingDataError),

    #[error("plugin {plugin} matches {path} but does not implement change detection")]
    DetectionUnsupported { plugin: String, path: String },

    #[error("plugin {plugin} failed on {path}: {message}")]
    PluginFailed {
        plugin: String,
        path: String,
        message: String,
    },

    #[error(transparent)]
    ChangeGraph(#[from] ChangeGraphError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cache(#[from] StateCacheError),
}

/// Process one queued file write inside `txn`.
///
/// Returns the changes created for the entry. The entry is removed from
/// the queue last, after detection, change insertion, and the cache
/// update have all succeeded.
pub fn process_write_queue_entry(
    txn: &mut WriteTransaction,
    registry: &PluginRegistry,
    queue: &mut WriteQueue,
    entry: &WriteQueueEntry,
    active: &ActiveVersion,
    commit_id: &CommitId,
) -> Result<Vec<Change>, DetectError> {
    let path = entry
        .effective_path()
        .ok_or_else(|| DetectError::MissingPath(entry.id.clone()))?
        .to_string();

    let mut batch: Vec<Change> = Vec::new();
    for plugin in registry.matching(&path) {
        if !plugin.can_detect_changes() {
            tracing::error!(
                plugin = plugin.key(),
                path = %path,
                "plugin glob matched but change detection is not implemented"
            );
            return Err(DetectError::DetectionUnsupported {
                plugin: plugin.key().to_string(),
                path: path.clone(),
            });
        }

        let input = entry.detection_input()?;
        let detected = plugin
            .detect_changes(&input)
            .map_err(|e| DetectError::PluginFailed {
                plugin: plugin.key().to_string(),
                path: path.clone(),
                message: e.to_string(),
            })?;

        for report in detected {
            let snapshot = match report.snapshot_content {
                Some(content) => Snapshot::of_content(content),
                None => Snapshot::no_content(),
            };
            let snapshot_id = txn.store_mut().insert_snapshot(snapshot);

            let key = EntityKey::new(
                report.entity_id.clone(),
                report.schema.key.clone(),
                entry.file_id.clone(),
            );
            // Current leaf for this entity in the active version, resolved
            // through version inheritance so a branch's first edit links to
            // the parent version's leaf. Tombstones carry the deleting
            // change as the leaf, so a re-creation after deletion still
            // links its lineage.
            let prior_leaf = match resolve_effective_state(txn.store(), active.id(), &key)? {
                Resolution::Found(entry) | Resolution::Deleted(entry) => {
                    Some(entry.change_id.clone())
                }
                Resolution::Missing => None,
            };

            let change = Change {
                id: ChangeId::generate(),
                entity_id: report.entity_id,
                schema_key: report.schema.key,
                file_id: entry.file_id.clone(),
                plugin_key: plugin.key().to_string(),
                snapshot_id,
                created_at: chrono::Utc::now(),
            };
            txn.store_mut().insert_change(change.clone())?;
            if let Some(parent) = prior_leaf {
                let edge = ChangeEdge::link(parent, change.id.clone())?;
                txn.store_mut().insert_change_edge(edge)?;
            }
            batch.push(change);
        }
    }

    update_state_cache(txn.store_mut(), &batch, commit_id, active.id())?;
    for change in &batch {
        txn.record_committed(change.clone(), active.id().clone(), commit_id.clone());
    }
    queue.remove(&entry.id);
    Ok(batch)
}
