//! # strata-graph
//!
//! The commit graph and merge engine.
//!
//! Commits group change sets into an immutable DAG: normally one parent,
//! two after a merge. This crate creates those structures and enforces
//! their shape at creation time — the graph is never self-healing.
//!
//! Merging uses an explicit, deliberately simple conflict policy: when
//! both sides carry an element for the same entity key, the **source**
//! side wins and the conflict is reported in the returned
//! [`MergeReport`], never thrown. The policy lives in one function
//! ([`merge::resolve_union`]) so a real multi-way resolution scheme can
//! replace it without touching commit plumbing.

pub mod ancestry;
pub mod commit;
pub mod merge;

pub use ancestry::commit_ancestors;
pub use commit::{CommitGraphError, create_change_set, create_commit, link_commit_parent};
pub use merge::{MergeReport, create_merge_commit};
