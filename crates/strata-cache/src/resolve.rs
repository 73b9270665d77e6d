//! The effective-state read contract.
//!
//! "Effective state of entity E in version V" is: V's own live row if
//! present; else V's own tombstone (explicitly absent — stop, do not look
//! further); else, if V inherits, the parent version's effective state.
//!
//! Because deletions copy values down before removing them, the walk is
//! only ever needed for entities a version has never touched; for any
//! entity touched anywhere in the ancestor chain the first probe hits.
//! The walk is bounded iteration with a visited set — the data model
//! forbids inheritance cycles, but a corrupt graph must not loop forever.

use serde_json::Value;

use strata_model::{EntityKey, VersionId};
use strata_store::{CacheEntry, TableStore};

use crate::update::StateCacheError;

/// Outcome of one effective-state lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    /// The entity has a value in this version (possibly via inheritance).
    Found(&'a CacheEntry),
    /// A tombstone stopped the walk: the entity is explicitly deleted.
    Deleted(&'a CacheEntry),
    /// No version in the chain has ever touched the entity.
    Missing,
}

impl<'a> Resolution<'a> {
    /// The effective payload, if the entity is present.
    pub fn value(&self) -> Option<&'a Value> {
        match self {
            Resolution::Found(entry) => entry.snapshot_content.as_ref(),
            Resolution::Deleted(_) | Resolution::Missing => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

/// Resolve the effective state of `key` in `version`.
pub fn resolve_effective_state<'a>(
    store: &'a TableStore,
    version: &VersionId,
    key: &EntityKey,
) -> Result<Resolution<'a>, StateCacheError> {
    let mut visited: Vec<VersionId> = Vec::new();
    let mut current = version.clone();

    loop {
        if visited.contains(&current) {
            return Err(StateCacheError::CyclicInheritance(current));
        }

        let row = store
            .version(&current)
            .ok_or_else(|| StateCacheError::VersionNotFound(current.clone()))?;

        if let Some(entry) = store.cache_entry(&current, key) {
            return Ok(if entry.is_tombstone() {
                Resolution::Deleted(entry)
            } else {
                Resolution::Found(entry)
            });
        }

        match &row.inherits_from_version_id {
            Some(parent) => {
                visited.push(current);
                current = parent.clone();
            }
            None => return Ok(Resolution::Missing),
        }
    }
}
