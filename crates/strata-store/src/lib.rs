//! # strata-store
//!
//! Storage substrate for the Strata engine.
//!
//! This crate stands in for the embedded relational engine the design
//! assumes: it owns the persisted relations as in-memory tables, provides
//! a single-writer atomic write boundary, and notifies commit-hook
//! subscribers exactly once per committed write transaction.
//!
//! ```text
//! JSONL change log (on disk, one committed change per line)
//!     ↕  append / replay
//! TableStore (canonical in-memory relations)
//!     ↑  atomic clone-commit writes
//! Engine + CommitHookBridge
//! ```
//!
//! It intentionally does not contain detection, cache, or merge logic.
//! Those live in `strata-detect`, `strata-cache`, and `strata-graph`.

pub mod changelog;
pub mod engine;
pub mod hooks;
pub mod tables;

pub use changelog::{
    CHANGE_LOG_SCHEMA, ChangeLogError, ChangeLogRecord, append_change_log_to_path,
    read_change_log, read_change_log_from_path, write_change_log, write_change_log_to_path,
};
pub use engine::{CommittedChange, Engine, WriteTransaction};
pub use hooks::{CommitHookBridge, HookSubscription};
pub use tables::{CacheEntry, StoreError, TableStore};
