//! # strata-detect
//!
//! The change detection pipeline.
//!
//! A queued file write flows through registered format plugins (matched
//! by glob pattern, dispatched in registration order), which report
//! entity-level mutations. The pipeline turns each report into a
//! deduplicated snapshot, an immutable change row linked to its prior
//! leaf, and a cache update — all inside the caller's write transaction,
//! so a multi-change file write applies atomically or not at all.
//!
//! Plugins are untrusted callbacks: they run against borrowed input,
//! outside any internal lock. A caller who needs a timeout wraps a
//! plugin in a decorating [`plugin::FormatPlugin`] that enforces it and
//! reports overruns as plugin failures.

pub mod glob;
pub mod pipeline;
pub mod plugin;
pub mod queue;

pub use glob::{GlobError, GlobPattern};
pub use pipeline::{DetectError, process_write_queue_entry};
pub use plugin::{DetectionInput, FileRecord, FormatPlugin, PluginError, PluginRegistry};
pub use queue::{WriteQueue, WriteQueueEntry};
