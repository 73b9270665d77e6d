//! Ancestry queries over the commit DAG.
//!
//! History/blame consumers walk parent edges. The walk is breadth-first
//! with a visited set: merge commits make the parent graph a DAG, so the
//! same ancestor is reachable along several paths and must be reported
//! once.

use std::collections::VecDeque;

use strata_model::CommitId;
use strata_store::TableStore;

use crate::commit::CommitGraphError;

/// All ancestors of `commit`, in breadth-first discovery order,
/// excluding the commit itself.
pub fn commit_ancestors(
    store: &TableStore,
    commit: &CommitId,
) -> Result<Vec<CommitId>, CommitGraphError> {
    if store.commit(commit).is_none() {
        return Err(CommitGraphError::CommitNotFound(commit.clone()));
    }

    let mut ancestors = Vec::new();
    let mut queue: VecDeque<CommitId> = VecDeque::from([commit.clone()]);
    let mut visited = vec![commit.clone()];

    while let Some(current) = queue.pop_front() {
        for parent in store.commit_parents(&current) {
            if visited.contains(&parent.id) {
                continue;
            }
            visited.push(parent.id.clone());
            ancestors.push(parent.id.clone());
            queue.push_back(parent.id.clone());
        }
    }
    Ok(ancestors)
}
