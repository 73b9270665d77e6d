//! Rebuild by replay.
//!
//! Cache corruption or staleness is non-fatal: every row is derivable
//! from the committed change log, so healing is "drop everything, replay
//! the stream through the same update function". Two entry points:
//! [`rebuild_state_cache`] replays the store's own log in place, and
//! [`replay_change_log`] hydrates from persisted JSONL records, restoring
//! snapshots and change rows a fresh process does not have yet.

use strata_model::Snapshot;
use strata_store::{ChangeLogRecord, CommittedChange, TableStore};

use crate::update::{StateCacheError, update_state_cache};

/// Drop every cache row and replay the store's committed change log.
pub fn rebuild_state_cache(store: &mut TableStore) -> Result<(), StateCacheError> {
    let log: Vec<CommittedChange> = store.change_log().to_vec();
    tracing::debug!(entries = log.len(), "rebuilding state cache by replay");

    store.clear_cache();
    for committed in &log {
        update_state_cache(
            store,
            std::slice::from_ref(&committed.change),
            &committed.commit_id,
            &committed.version_id,
        )?;
    }
    Ok(())
}

/// Replay persisted change-log records into `store`, hydrating snapshot
/// and change rows as needed, then applying each record to the cache.
///
/// Versions are source-of-truth state and must already be present; the
/// log carries no version topology.
pub fn replay_change_log(
    store: &mut TableStore,
    records: &[ChangeLogRecord],
) -> Result<(), StateCacheError> {
    tracing::debug!(records = records.len(), "replaying persisted change log");

    store.clear_cache();
    for record in records {
        let snapshot = match &record.snapshot_content {
            Some(content) => Snapshot::of_content(content.clone()),
            None => Snapshot::no_content(),
        };
        store.insert_snapshot(snapshot);
        if store.change(&record.change.id).is_none() {
            store.insert_change(record.change.clone())?;
        }
        update_state_cache(
            store,
            std::slice::from_ref(&record.change),
            &record.commit_id,
            &record.version_id,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{Resolution, resolve_effective_state};
    use chrono::Utc;
    use serde_json::json;
    use strata_model::{Change, ChangeId, CommitId, EntityKey, Version, VersionId};
    use strata_store::{CHANGE_LOG_SCHEMA, Engine};

    fn committed_change(
        engine: &mut Engine,
        id: &str,
        version: &VersionId,
        content: Option<serde_json::Value>,
    ) {
        engine
            .write::<_, StateCacheError>(|txn| {
                let store = txn.store_mut();
                let snapshot_id = match content.clone() {
                    Some(value) => store.insert_snapshot(Snapshot::of_content(value)),
                    None => store.insert_snapshot(Snapshot::no_content()),
                };
                let change = Change {
                    id: ChangeId::new(id),
                    entity_id: "e1".to_string(),
                    schema_key: "paragraph".to_string(),
                    file_id: "f1".to_string(),
                    plugin_key: "plugin-md".to_string(),
                    snapshot_id,
                    created_at: Utc::now(),
                };
                store.insert_change(change.clone())?;
                let commit_id = CommitId::new(format!("k-{id}"));
                update_state_cache(
                    txn.store_mut(),
                    std::slice::from_ref(&change),
                    &commit_id,
                    version,
                )?;
                txn.record_committed(change, version.clone(), commit_id);
                Ok(())
            })
            .expect("write should commit");
    }

    fn key() -> EntityKey {
        EntityKey::new("e1", "paragraph", "f1")
    }

    #[test]
    fn rebuild_reproduces_live_cache_state() {
        let mut engine = Engine::new();
        let version = Version::new("main");
        let version_id = version.id.clone();
        engine
            .write::<_, StateCacheError>(|txn| {
                txn.store_mut().insert_version(version.clone())?;
                Ok(())
            })
            .expect("version write");

        committed_change(&mut engine, "c1", &version_id, Some(json!({"text": "one"})));
        committed_change(&mut engine, "c2", &version_id, Some(json!({"text": "two"})));

        let mut rebuilt = engine.store().clone();
        rebuilt.clear_cache();
        rebuild_state_cache(&mut rebuilt).expect("rebuild should succeed");

        let live = resolve_effective_state(engine.store(), &version_id, &key())
            .expect("live resolve");
        let replayed =
            resolve_effective_state(&rebuilt, &version_id, &key()).expect("rebuilt resolve");
        assert_eq!(live.value(), replayed.value());
        assert_eq!(rebuilt.cache_len(), engine.store().cache_len());
    }

    #[test]
    fn replay_from_records_hydrates_a_fresh_store() {
        let version = Version::new("main");
        let version_id = version.id.clone();

        let records = vec![ChangeLogRecord {
            schema: CHANGE_LOG_SCHEMA.to_string(),
            change: Change {
                id: ChangeId::new("c1"),
                entity_id: "e1".to_string(),
                schema_key: "paragraph".to_string(),
                file_id: "f1".to_string(),
                plugin_key: "plugin-md".to_string(),
                snapshot_id: strata_model::SnapshotId::of_content(&json!({"text": "one"})),
                created_at: Utc::now(),
            },
            version_id: version_id.clone(),
            commit_id: CommitId::new("k1"),
            writer_key: None,
            snapshot_content: Some(json!({"text": "one"})),
        }];

        let mut fresh = TableStore::new();
        fresh
            .insert_version(version)
            .expect("version should insert");
        replay_change_log(&mut fresh, &records).expect("replay should succeed");

        let resolution =
            resolve_effective_state(&fresh, &version_id, &key()).expect("resolve should succeed");
        assert!(matches!(resolution, Resolution::Found(_)));
        assert_eq!(resolution.value(), Some(&json!({"text": "one"})));
    }
}
