//! # strata-model
//!
//! Shared data model for the Strata change-control engine.
//!
//! Strata tracks fine-grained entity-level edits (not whole-file diffs),
//! organizes them into an immutable change graph, and materializes fast
//! "current state" views per version. This crate holds the types every
//! other layer speaks:
//!
//! ```text
//! Snapshot              ← content-addressed payload, deduplicated by hash
//!     │
//! Change + ChangeEdge   ← one entity mutation, linked into a lineage DAG
//!     │
//! ChangeSet             ← the active changes (one per entity) at a point
//!     │
//! Commit + CommitEdge   ← immutable history points forming a DAG
//!     │
//! Version               ← a named timeline, optionally inheriting a parent
//! ```
//!
//! Storage lives in `strata-store`, detection in `strata-detect`, the
//! materialized view in `strata-cache`, and merge in `strata-graph`.

pub mod change;
pub mod changeset;
pub mod commit;
pub mod detect;
pub mod ids;
pub mod key;
pub mod snapshot;
pub mod version;

pub use change::{Change, ChangeEdge, ChangeGraphError};
pub use changeset::{ChangeSet, ChangeSetElement};
pub use commit::{Commit, CommitEdge};
pub use detect::{DetectedChange, SchemaRef};
pub use ids::{ChangeId, ChangeSetId, CommitId, VersionId};
pub use key::EntityKey;
pub use snapshot::{NO_CONTENT_SNAPSHOT_ID, Snapshot, SnapshotId};
pub use version::{ActiveVersion, Version, VersionError};
