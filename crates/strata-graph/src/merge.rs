//! Merge commits.
//!
//! `create_merge_commit(source, target)` unions the two change sets by
//! entity key and records the result as a new commit with two parents.
//! Where both sides carry a different change for the same key, the
//! source's element wins and the target's is dropped — a documented
//! placeholder pending real conflict modeling, kept in [`resolve_union`]
//! so it is trivial to replace.
//!
//! Callers must know: merge is associative only when the sides touch
//! disjoint keys. With conflicts, the result depends on which side is
//! passed as `source`.

use std::collections::BTreeMap;

use strata_model::{ChangeSetElement, Commit, CommitId, EntityKey};
use strata_store::TableStore;

use crate::commit::{CommitGraphError, create_change_set, link_commit_parent};

/// Result of a merge: the policy's decisions, reported — never thrown.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub source: CommitId,
    pub target: CommitId,
    /// Entity keys where both sides carried different changes and the
    /// source's element was kept.
    pub conflicts: Vec<EntityKey>,
}

/// Create a merge commit of `source` into `target`.
///
/// The merged commit references a fresh change set holding the resolved
/// union and carries two parent edges, `(target -> merged)` and
/// `(source -> merged)`, preserving full lineage for history queries.
pub fn create_merge_commit(
    store: &mut TableStore,
    source: &CommitId,
    target: &CommitId,
) -> Result<(Commit, MergeReport), CommitGraphError> {
    let source_set = store
        .commit(source)
        .ok_or_else(|| CommitGraphError::CommitNotFound(source.clone()))?
        .change_set_id
        .clone();
    let target_set = store
        .commit(target)
        .ok_or_else(|| CommitGraphError::CommitNotFound(target.clone()))?
        .change_set_id
        .clone();

    let source_elements = elements_by_key(store, &source_set);
    let target_elements = elements_by_key(store, &target_set);
    let (resolved, conflicts) = resolve_union(source_elements, target_elements);

    let merged_set = create_change_set(
        store,
        resolved
            .into_iter()
            .map(|(key, element)| (element.change_id, key)),
    )?;
    let merged = Commit::new(merged_set.id);
    store.insert_commit(merged.clone())?;
    link_commit_parent(store, target, &merged.id)?;
    link_commit_parent(store, source, &merged.id)?;

    Ok((
        merged,
        MergeReport {
            source: source.clone(),
            target: target.clone(),
            conflicts,
        },
    ))
}

/// The conflict policy: union keyed by entity, **source wins** on keys
/// where both sides carry a different change.
///
/// Replace this function to change the policy; nothing else encodes it.
fn resolve_union(
    source: BTreeMap<EntityKey, ChangeSetElement>,
    target: BTreeMap<EntityKey, ChangeSetElement>,
) -> (BTreeMap<EntityKey, ChangeSetElement>, Vec<EntityKey>) {
    let mut resolved = target;
    let mut conflicts = Vec::new();

    for (key, element) in source {
        if let Some(existing) = resolved.get(&key)
            && existing.change_id != element.change_id
        {
            conflicts.push(key.clone());
        }
        resolved.insert(key, element);
    }
    (resolved, conflicts)
}

fn elements_by_key(
    store: &TableStore,
    change_set_id: &strata_model::ChangeSetId,
) -> BTreeMap<EntityKey, ChangeSetElement> {
    store
        .elements_of_change_set(change_set_id)
        .into_iter()
        .map(|element| (element.entity_key(), element.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::create_commit;
    use chrono::Utc;
    use serde_json::json;
    use strata_model::{Change, ChangeId, Snapshot};

    fn seed_change(store: &mut TableStore, id: &str, entity_id: &str) -> (ChangeId, EntityKey) {
        let snapshot_id =
            store.insert_snapshot(Snapshot::of_content(json!({"text": format!("text {id}")})));
        let change = Change {
            id: ChangeId::new(id),
            entity_id: entity_id.to_string(),
            schema_key: "paragraph".to_string(),
            file_id: "f1".to_string(),
            plugin_key: "plugin-md".to_string(),
            snapshot_id,
            created_at: Utc::now(),
        };
        let key = change.entity_key();
        store
            .insert_change(change.clone())
            .expect("change should insert");
        (change.id, key)
    }

    fn seed_commit(
        store: &mut TableStore,
        elements: Vec<(ChangeId, EntityKey)>,
    ) -> CommitId {
        let set = create_change_set(store, elements).expect("set should create");
        create_commit(store, set.id, &[]).expect("commit should create").id
    }

    #[test]
    fn disjoint_merge_unions_both_sides() {
        let mut store = TableStore::new();
        let (c1, k1) = seed_change(&mut store, "c1", "e1");
        let (c2, k2) = seed_change(&mut store, "c2", "e2");
        let source = seed_commit(&mut store, vec![(c1, k1.clone())]);
        let target = seed_commit(&mut store, vec![(c2, k2.clone())]);

        let (merged, report) =
            create_merge_commit(&mut store, &source, &target).expect("merge should succeed");

        let elements = store.elements_of_change_set(&merged.change_set_id);
        let keys: Vec<EntityKey> = elements.iter().map(|e| e.entity_key()).collect();
        assert_eq!(keys, vec![k1, k2]);
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn merged_commit_has_exactly_two_parents() {
        let mut store = TableStore::new();
        let (c1, k1) = seed_change(&mut store, "c1", "e1");
        let (c2, k2) = seed_change(&mut store, "c2", "e2");
        let source = seed_commit(&mut store, vec![(c1, k1)]);
        let target = seed_commit(&mut store, vec![(c2, k2)]);

        let (merged, _) =
            create_merge_commit(&mut store, &source, &target).expect("merge should succeed");

        let parents = store.commit_parents(&merged.id);
        assert_eq!(parents.len(), 2);
        let parent_ids: Vec<&CommitId> = parents.iter().map(|p| &p.id).collect();
        assert!(parent_ids.contains(&&source));
        assert!(parent_ids.contains(&&target));
    }

    #[test]
    fn conflicting_key_resolves_to_source() {
        let mut store = TableStore::new();
        let (c1, key) = seed_change(&mut store, "c1", "e1");
        let (c2, _) = seed_change(&mut store, "c2", "e1");
        let source = seed_commit(&mut store, vec![(c1.clone(), key.clone())]);
        let target = seed_commit(&mut store, vec![(c2, key.clone())]);

        let (merged, report) =
            create_merge_commit(&mut store, &source, &target).expect("merge should succeed");

        let elements = store.elements_of_change_set(&merged.change_set_id);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].change_id, c1);
        assert_eq!(report.conflicts, vec![key]);
    }

    #[test]
    fn same_change_on_both_sides_is_not_a_conflict() {
        let mut store = TableStore::new();
        let (c1, key) = seed_change(&mut store, "c1", "e1");
        let source = seed_commit(&mut store, vec![(c1.clone(), key.clone())]);
        let target = seed_commit(&mut store, vec![(c1, key)]);

        let (_, report) =
            create_merge_commit(&mut store, &source, &target).expect("merge should succeed");
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn merge_direction_decides_conflicts() {
        let mut store = TableStore::new();
        let (c1, key) = seed_change(&mut store, "c1", "e1");
        let (c2, _) = seed_change(&mut store, "c2", "e1");
        let a = seed_commit(&mut store, vec![(c1.clone(), key.clone())]);
        let b = seed_commit(&mut store, vec![(c2.clone(), key.clone())]);

        let (merged_ab, _) =
            create_merge_commit(&mut store, &a, &b).expect("merge a->b should succeed");
        let (merged_ba, _) =
            create_merge_commit(&mut store, &b, &a).expect("merge b->a should succeed");

        let ab = store.elements_of_change_set(&merged_ab.change_set_id);
        let ba = store.elements_of_change_set(&merged_ba.change_set_id);
        assert_eq!(ab[0].change_id, c1);
        assert_eq!(ba[0].change_id, c2);
    }
}
