//! The file write queue.
//!
//! Raw file writes land here before detection. One entry describes one
//! observed write: before/after path, data, and metadata, any side of
//! which may be absent (creation has no before, deletion no after).
//! Entries are removed only after their changes commit.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

use crate::plugin::{DetectionInput, FileRecord};

/// One queued file-write event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteQueueEntry {
    pub id: String,
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_before: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_after: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_before: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_after: Option<Value>,
}

impl WriteQueueEntry {
    /// The path plugins are matched against: the post-write path, or the
    /// pre-write path for deletions.
    pub fn effective_path(&self) -> Option<&str> {
        self.path_after
            .as_deref()
            .or(self.path_before.as_deref())
    }

    /// Build the plugin input, validating that every present side is
    /// complete: a side with a path must carry data.
    pub fn detection_input(&self) -> Result<DetectionInput, MissingDataError> {
        let before = self
            .side(&self.path_before, &self.data_before, &self.metadata_before, "before")?;
        let after = self
            .side(&self.path_after, &self.data_after, &self.metadata_after, "after")?;
        if before.is_none() && after.is_none() {
            return Err(MissingDataError {
                entry_id: self.id.clone(),
                file_id: self.file_id.clone(),
                side: "before and after".to_string(),
            });
        }
        Ok(DetectionInput { before, after })
    }

    fn side(
        &self,
        path: &Option<String>,
        data: &Option<Vec<u8>>,
        metadata: &Option<Value>,
        side: &str,
    ) -> Result<Option<FileRecord>, MissingDataError> {
        match (path, data) {
            (Some(path), Some(data)) => Ok(Some(FileRecord {
                id: self.file_id.clone(),
                path: path.clone(),
                data: data.clone(),
                metadata: metadata.clone(),
            })),
            (Some(_), None) => Err(MissingDataError {
                entry_id: self.id.clone(),
                file_id: self.file_id.clone(),
                side: side.to_string(),
            }),
            (None, _) => Ok(None),
        }
    }
}

/// Fatal precondition failure: an entry announced a side it has no data
/// for.
#[derive(Debug, thiserror::Error)]
#[error("write queue entry {entry_id} for file {file_id} is missing {side} data")]
pub struct MissingDataError {
    pub entry_id: String,
    pub file_id: String,
    pub side: String,
}

/// FIFO queue of pending file writes.
#[derive(Debug, Clone, Default)]
pub struct WriteQueue {
    entries: VecDeque<WriteQueueEntry>,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: WriteQueueEntry) {
        self.entries.push_back(entry);
    }

    /// The oldest pending entry, if any.
    pub fn front(&self) -> Option<&WriteQueueEntry> {
        self.entries.front()
    }

    /// Remove one entry by ID after its changes commit.
    pub fn remove(&mut self, entry_id: &str) -> Option<WriteQueueEntry> {
        let index = self.entries.iter().position(|e| e.id == entry_id)?;
        self.entries.remove(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
