//! The commit hook bridge.
//!
//! Subscribers are notified exactly once per committed top-level write
//! transaction, with the flattened set of changes that transaction
//! committed. Handlers are independent of one another, must never fire
//! after unsubscription (including for in-flight batches), and a
//! panicking handler is isolated and logged — it never aborts or rolls
//! back the underlying commit.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::engine::CommittedChange;

type Handler = Arc<dyn Fn(&[CommittedChange]) + Send + Sync>;
type Registry = BTreeMap<u64, Handler>;

/// Registry of commit-hook handlers.
#[derive(Default)]
pub struct CommitHookBridge {
    handlers: Arc<Mutex<Registry>>,
    next_id: AtomicU64,
}

impl CommitHookBridge {
    /// Register a handler; drop or consume the returned subscription to
    /// stop receiving notifications.
    pub fn on_state_commit(
        &self,
        handler: impl Fn(&[CommittedChange]) + Send + Sync + 'static,
    ) -> HookSubscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        lock_registry(&self.handlers).insert(id, Arc::new(handler));
        HookSubscription {
            registry: Arc::clone(&self.handlers),
            id,
        }
    }

    /// Deliver one committed batch to every still-subscribed handler.
    ///
    /// Handlers run outside the registry lock (they are untrusted and may
    /// be slow), and membership is re-checked per handler so an
    /// unsubscribe that lands mid-dispatch is honored.
    pub(crate) fn dispatch(&self, committed: &[CommittedChange]) {
        let ids: Vec<u64> = lock_registry(&self.handlers).keys().copied().collect();
        for id in ids {
            let handler = match lock_registry(&self.handlers).get(&id) {
                Some(handler) => Arc::clone(handler),
                None => continue,
            };
            if catch_unwind(AssertUnwindSafe(|| handler(committed))).is_err() {
                tracing::error!(hook_id = id, "commit hook handler panicked; commit unaffected");
            }
        }
    }
}

fn lock_registry(handlers: &Arc<Mutex<Registry>>) -> MutexGuard<'_, Registry> {
    match handlers.lock() {
        Ok(guard) => guard,
        // A handler panic cannot poison this lock (handlers run outside
        // it), but recover rather than propagate if it ever happens.
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Handle for one registered hook handler.
pub struct HookSubscription {
    registry: Arc<Mutex<Registry>>,
    id: u64,
}

impl HookSubscription {
    /// Remove the handler. Effective immediately: it will not fire again,
    /// even for a batch whose dispatch is already underway.
    pub fn unsubscribe(self) {
        lock_registry(&self.registry).remove(&self.id);
    }
}
