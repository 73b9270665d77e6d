//! # strata-cache
//!
//! The state cache engine: keeps the "current state per version" index
//! consistent with the change stream so that no read ever re-derives
//! entity state from the full change graph.
//!
//! - [`update_state_cache`] applies one committed batch: last-write-wins
//!   upserts for non-deletions, and for deletions the copy-down /
//!   tombstone dance that keeps version inheritance correct.
//! - [`resolve_effective_state`] is the read contract: own live row, else
//!   own tombstone (explicitly absent, stop), else walk to the parent
//!   version — bounded iteration, never recursion.
//! - [`rebuild_state_cache`] drops every cache row and replays the
//!   committed change log. Staleness is non-fatal and self-healing: the
//!   cache carries no information not derivable from the log.

pub mod rebuild;
pub mod resolve;
pub mod update;

pub use rebuild::{rebuild_state_cache, replay_change_log};
pub use resolve::{Resolution, resolve_effective_state};
pub use update::{StateCacheError, update_state_cache};
