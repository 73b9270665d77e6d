//! The single-writer atomic write boundary.
//!
//! Every mutation (change insertion, cache update, commit/merge creation)
//! runs inside one transaction: the mutator gets a working copy of the
//! tables plus a transaction-scoped record of committed changes. On `Ok`
//! the copy replaces the live tables and hooks fire exactly once with the
//! flattened committed set; on `Err` the copy is dropped and nothing is
//! observable — all-or-nothing per batch.
//!
//! Reads go straight at the live tables and never fire hooks.

use serde::{Deserialize, Serialize};

use strata_model::{Change, CommitId, VersionId};

use crate::hooks::{CommitHookBridge, HookSubscription};
use crate::tables::TableStore;

/// One change as committed by a write transaction, annotated with the
/// version and commit it landed in and the writer's identity tag if one
/// was set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedChange {
    pub change: Change,
    pub version_id: VersionId,
    pub commit_id: CommitId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writer_key: Option<String>,
}

/// Working state of one in-flight write transaction.
///
/// Components mutate `store_mut()` freely; anything that inserts change
/// rows also records them via `record_committed` so the hook bridge can
/// deliver the flattened set after commit.
pub struct WriteTransaction {
    store: TableStore,
    committed: Vec<CommittedChange>,
    writer_key: Option<String>,
}

impl WriteTransaction {
    fn new(store: TableStore, writer_key: Option<String>) -> Self {
        Self {
            store,
            committed: Vec::new(),
            writer_key,
        }
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TableStore {
        &mut self.store
    }

    /// Record a change for post-commit hook delivery, stamped with the
    /// transaction's writer tag.
    pub fn record_committed(&mut self, change: Change, version_id: VersionId, commit_id: CommitId) {
        self.committed.push(CommittedChange {
            change,
            version_id,
            commit_id,
            writer_key: self.writer_key.clone(),
        });
    }
}

/// The engine: live tables plus the commit-hook bridge.
#[derive(Default)]
pub struct Engine {
    store: TableStore,
    hooks: CommitHookBridge,
    writer_key: Option<String>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: TableStore) -> Self {
        Self {
            store,
            hooks: CommitHookBridge::default(),
            writer_key: None,
        }
    }

    /// Tag subsequent write transactions with a writer identity.
    pub fn set_writer_key(&mut self, key: impl Into<String>) {
        self.writer_key = Some(key.into());
    }

    pub fn clear_writer_key(&mut self) {
        self.writer_key = None;
    }

    /// Read-only access to the live tables.
    pub fn store(&self) -> &TableStore {
        &self.store
    }

    /// Subscribe to post-commit notifications. See [`CommitHookBridge`].
    pub fn on_state_commit(
        &self,
        handler: impl Fn(&[CommittedChange]) + Send + Sync + 'static,
    ) -> HookSubscription {
        self.hooks.on_state_commit(handler)
    }

    /// Run one top-level write transaction.
    ///
    /// Hooks fire once per committed transaction that wrote state,
    /// regardless of how many rows it touched. Transactions that wrote no
    /// change rows (version creation, cache rebuild) commit silently.
    pub fn write<T, E>(
        &mut self,
        f: impl FnOnce(&mut WriteTransaction) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut txn = WriteTransaction::new(self.store.clone(), self.writer_key.clone());
        let value = f(&mut txn)?;

        let WriteTransaction {
            mut store,
            committed,
            ..
        } = txn;
        store.append_change_log(&committed);
        self.store = store;

        if !committed.is_empty() {
            self.hooks.dispatch(&committed);
        }
        Ok(value)
    }
}
