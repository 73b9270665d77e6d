//! Change-set and commit creation.
//!
//! A commit is created from a change set, optionally with parent commits.
//! Parent edges are validated here: endpoints must exist, a commit cannot
//! parent itself, and an edge that would close a cycle is rejected.

use strata_model::{
    ChangeId, ChangeSet, ChangeSetElement, ChangeSetId, Commit, CommitEdge, CommitId, EntityKey,
};
use strata_store::{StoreError, TableStore};

use crate::ancestry::commit_ancestors;

/// Violations of commit-graph shape.
#[derive(Debug, thiserror::Error)]
pub enum CommitGraphError {
    #[error("change set not found: {0}")]
    ChangeSetNotFound(ChangeSetId),

    #[error("commit not found: {0}")]
    CommitNotFound(CommitId),

    #[error("commit may not be its own parent: {0}")]
    SelfParent(CommitId),

    #[error("edge {parent} -> {child} would make the commit graph cyclic")]
    WouldCreateCycle { parent: CommitId, child: CommitId },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Create a change set from `(change, entity key)` pairs.
///
/// Elements are unique per entity key; when the input carries several
/// changes for one key, the latest pair wins.
pub fn create_change_set(
    store: &mut TableStore,
    elements: impl IntoIterator<Item = (ChangeId, EntityKey)>,
) -> Result<ChangeSet, CommitGraphError> {
    let change_set = ChangeSet::new();
    store.insert_change_set(change_set.clone());
    for (change_id, key) in elements {
        store.insert_change_set_element(ChangeSetElement::new(
            change_set.id.clone(),
            change_id,
            &key,
        ))?;
    }
    Ok(change_set)
}

/// Create a commit over `change_set_id`, linked to `parents`.
pub fn create_commit(
    store: &mut TableStore,
    change_set_id: ChangeSetId,
    parents: &[CommitId],
) -> Result<Commit, CommitGraphError> {
    if store.change_set(&change_set_id).is_none() {
        return Err(CommitGraphError::ChangeSetNotFound(change_set_id));
    }

    let commit = Commit::new(change_set_id);
    store.insert_commit(commit.clone())?;
    for parent in parents {
        link_commit_parent(store, parent, &commit.id)?;
    }
    Ok(commit)
}

/// Insert one parent edge into the commit DAG.
///
/// Rejects self-parenting and any edge that would close a cycle: the
/// edge `parent -> child` is cyclic exactly when `child` is already an
/// ancestor of `parent`.
pub fn link_commit_parent(
    store: &mut TableStore,
    parent: &CommitId,
    child: &CommitId,
) -> Result<(), CommitGraphError> {
    if parent == child {
        return Err(CommitGraphError::SelfParent(parent.clone()));
    }
    if store.commit(parent).is_none() {
        return Err(CommitGraphError::CommitNotFound(parent.clone()));
    }
    if store.commit(child).is_none() {
        return Err(CommitGraphError::CommitNotFound(child.clone()));
    }
    if commit_ancestors(store, parent)?.contains(child) {
        return Err(CommitGraphError::WouldCreateCycle {
            parent: parent.clone(),
            child: child.clone(),
        });
    }

    store.insert_commit_edge(CommitEdge {
        parent_id: parent.clone(),
        child_id: child.clone(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use strata_model::{Change, Snapshot};

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

    #[test]
    fn change_set_keeps_latest_change_per_entity() {
        let mut store = TableStore::new();
        let (c1, key) = seed_change(&mut store, "c1", "e1");
        let (c2, _) = seed_change(&mut store, "c2", "e1");

        let set = create_change_set(&mut store, vec![(c1, key.clone()), (c2, key)])
            .expect("set should create");
        let elements = store.elements_of_change_set(&set.id);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].change_id.as_str(), "c2");
    }

    #[test]
    fn commit_links_to_its_parents() {
        let mut store = TableStore::new();
        let (c1, k1) = seed_change(&mut store, "c1", "e1");
        let (c2, k2) = seed_change(&mut store, "c2", "e2");

        let base_set = create_change_set(&mut store, vec![(c1, k1)]).expect("base set");
        let base = create_commit(&mut store, base_set.id, &[]).expect("base commit");

        let next_set = create_change_set(&mut store, vec![(c2, k2)]).expect("next set");
        let next = create_commit(&mut store, next_set.id, std::slice::from_ref(&base.id))
            .expect("next commit");

        let parents = store.commit_parents(&next.id);
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].id, base.id);
    }

    #[test]
    fn cyclic_edge_is_rejected() {
        let mut store = TableStore::new();
        let (c1, k1) = seed_change(&mut store, "c1", "e1");
        let (c2, k2) = seed_change(&mut store, "c2", "e2");

        let set_a = create_change_set(&mut store, vec![(c1, k1)]).expect("set a");
        let a = create_commit(&mut store, set_a.id, &[]).expect("commit a");
        let set_b = create_change_set(&mut store, vec![(c2, k2)]).expect("set b");
        let b = create_commit(&mut store, set_b.id, std::slice::from_ref(&a.id))
            .expect("commit b");

        let err = link_commit_parent(&mut store, &b.id, &a.id)
            .expect_err("back edge must be rejected");
        assert!(matches!(err, CommitGraphError::WouldCreateCycle { .. }));
    }

    #[test]
    fn self_parent_is_rejected() {
        let mut store = TableStore::new();
        let (c1, k1) = seed_change(&mut store, "c1", "e1");
        let set = create_change_set(&mut store, vec![(c1, k1)]).expect("set");
        let commit = create_commit(&mut store, set.id, &[]).expect("commit");

        let err = link_commit_parent(&mut store, &commit.id, &commit.id)
            .expect_err("self parent must be rejected");
        assert!(matches!(err, CommitGraphError::SelfParent(_)));
    }

    #[test]
    fn commit_requires_existing_change_set() {
        let mut store = TableStore::new();
        let err = create_commit(&mut store, ChangeSetId::new("cs-missing"), &[])
            .expect_err("unknown change set must be rejected");
        assert!(matches!(err, CommitGraphError::ChangeSetNotFound(_)));
    }
}
