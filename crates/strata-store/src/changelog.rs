//! JSONL persistence of the committed change log.
//!
//! `strata.change.v1` is the portable interchange format: one committed
//! change per line, annotated with version, commit, writer tag, and the
//! snapshot content so a fresh process can rebuild derived state without
//! the original snapshot table.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use strata_model::{Change, CommitId, VersionId};

use crate::engine::CommittedChange;
use crate::tables::TableStore;

pub const CHANGE_LOG_SCHEMA: &str = "strata.change.v1";

fn default_change_log_schema() -> String {
    CHANGE_LOG_SCHEMA.to_string()
}

/// One line of the persisted change log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogRecord {
    #[serde(default = "default_change_log_schema")]
    pub schema: String,
    pub change: Change,
    pub version_id: VersionId,
    pub commit_id: CommitId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writer_key: Option<String>,
    /// Snapshot payload at the time of the change; `None` for deletions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_content: Option<Value>,
}

impl ChangeLogRecord {
    /// Build the persisted record for one committed change, resolving the
    /// snapshot payload from the live tables.
    pub fn from_committed(committed: &CommittedChange, store: &TableStore) -> Self {
        Self {
            schema: CHANGE_LOG_SCHEMA.to_string(),
            snapshot_content: store
                .snapshot_content(&committed.change.snapshot_id)
                .cloned(),
            change: committed.change.clone(),
            version_id: committed.version_id.clone(),
            commit_id: committed.commit_id.clone(),
            writer_key: committed.writer_key.clone(),
        }
    }
}

/// Read change-log records from a JSONL reader.
pub fn read_change_log(reader: impl BufRead) -> Result<Vec<ChangeLogRecord>, ChangeLogError> {
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| ChangeLogError::Io(line_no + 1, e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record: ChangeLogRecord = serde_json::from_str(trimmed)
            .map_err(|e| ChangeLogError::Parse(line_no + 1, e.to_string()))?;
        if record.schema != CHANGE_LOG_SCHEMA {
            return Err(ChangeLogError::UnsupportedSchema(record.schema));
        }
        records.push(record);
    }
    Ok(records)
}

/// Write change-log records to a JSONL writer.
pub fn write_change_log(
    writer: &mut impl Write,
    records: &[ChangeLogRecord],
) -> Result<(), ChangeLogError> {
    for record in records {
        let line =
            serde_json::to_string(record).map_err(|e| ChangeLogError::Serialize(e.to_string()))?;
        writeln!(writer, "{line}").map_err(|e| ChangeLogError::Io(0, e.to_string()))?;
    }
    Ok(())
}

/// Read a change log from a JSONL file path.
pub fn read_change_log_from_path(
    path: impl AsRef<Path>,
) -> Result<Vec<ChangeLogRecord>, ChangeLogError> {
    let path = path.as_ref();
    let bytes =
        fs::read(path).map_err(|e| ChangeLogError::Io(0, format!("{}: {e}", path.display())))?;
    validate_substrate_bytes(path, &bytes)?;
    read_change_log(BufReader::new(bytes.as_slice()))
}

/// Replace a change-log file atomically (tmp file + rename).
pub fn write_change_log_to_path(
    path: impl AsRef<Path>,
    records: &[ChangeLogRecord],
) -> Result<(), ChangeLogError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| ChangeLogError::Io(0, format!("{parent:?}: {e}")))?;
    }

    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> Result<(), ChangeLogError> {
        let file = File::create(&tmp_path)
            .map_err(|e| ChangeLogError::Io(0, format!("{}: {e}", tmp_path.display())))?;
        let mut writer = BufWriter::new(file);
        write_change_log(&mut writer, records)?;
        writer
            .flush()
            .map_err(|e| ChangeLogError::Io(0, format!("{}: {e}", tmp_path.display())))?;
        let file = writer
            .into_inner()
            .map_err(|e| ChangeLogError::Io(0, format!("{}: {e}", tmp_path.display())))?;
        file.sync_all()
            .map_err(|e| ChangeLogError::Io(0, format!("{}: {e}", tmp_path.display())))?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        ChangeLogError::Io(
            0,
            format!("{} -> {}: {e}", tmp_path.display(), path.display()),
        )
    })?;
    Ok(())
}

/// Append records to an existing change-log file (created if missing).
///
/// The log is append-only; incremental writers use this instead of
/// rewriting the whole file per transaction.
pub fn append_change_log_to_path(
    path: impl AsRef<Path>,
    records: &[ChangeLogRecord],
) -> Result<(), ChangeLogError> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ChangeLogError::Io(0, format!("{}: {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    write_change_log(&mut writer, records)?;
    writer
        .flush()
        .map_err(|e| ChangeLogError::Io(0, format!("{}: {e}", path.display())))
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

fn validate_substrate_bytes(path: &Path, bytes: &[u8]) -> Result<(), ChangeLogError> {
    if bytes.contains(&0) {
        return Err(ChangeLogError::Corrupt(format!(
            "{}: contains NUL byte(s)",
            path.display()
        )));
    }
    if std::str::from_utf8(bytes).is_err() {
        return Err(ChangeLogError::Corrupt(format!(
            "{}: contains non-UTF-8 byte sequence(s)",
            path.display()
        )));
    }
    Ok(())
}

/// Errors from change-log persistence.
#[derive(Debug, thiserror::Error)]
pub enum ChangeLogError {
    #[error("line {0}: I/O error: {1}")]
    Io(usize, String),

    #[error("line {0}: parse error: {1}")]
    Parse(usize, String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("unsupported change-log schema: {0}")]
    UnsupportedSchema(String),

    #[error("corrupted substrate: {0}")]
    Corrupt(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use strata_model::{ChangeId, Snapshot, SnapshotId};

    fn temp_path(prefix: &str) -> PathBuf {
        let unique = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "strata-changelog-{prefix}-{}-{unique}.jsonl",
            std::process::id()
        ))
    }

    fn record(id: &str, content: Option<Value>) -> ChangeLogRecord {
        let snapshot_id = match &content {
            Some(value) => SnapshotId::of_content(value),
            None => SnapshotId::no_content(),
        };
        ChangeLogRecord {
            schema: CHANGE_LOG_SCHEMA.to_string(),
            change: Change {
                id: ChangeId::new(id),
                entity_id: "e1".to_string(),
                schema_key: "paragraph".to_string(),
                file_id: "f1".to_string(),
                plugin_key: "plugin-md".to_string(),
                snapshot_id,
                created_at: Utc::now(),
            },
            version_id: VersionId::new("v-main"),
            commit_id: CommitId::new("commit-1"),
            writer_key: None,
            snapshot_content: content,
        }
    }

    #[test]
    fn read_write_roundtrip_preserves_records() {
        let records = vec![
            record("c1", Some(json!({"text": "hello"}))),
            record("c2", None),
        ];

        let mut bytes = Vec::new();
        write_change_log(&mut bytes, &records).expect("log write should succeed");
        let parsed =
            read_change_log(std::io::Cursor::new(bytes)).expect("log read should succeed");
        assert_eq!(records, parsed);
    }

    #[test]
    fn unknown_schema_is_rejected() {
        let mut bad = record("c1", None);
        bad.schema = "strata.change.v999".to_string();
        let line = serde_json::to_string(&bad).expect("record serializes");

        let err = read_change_log(std::io::Cursor::new(line.into_bytes()))
            .expect_err("unknown schema must be rejected");
        assert!(matches!(err, ChangeLogError::UnsupportedSchema(s) if s == "strata.change.v999"));
    }

    #[test]
    fn read_from_path_rejects_nul_payload() {
        let path = temp_path("nul");
        fs::write(&path, b"{\"schema\":\"strata.change.v1\"}\n\0garbage")
            .expect("fixture should write");

        match read_change_log_from_path(&path) {
            Err(ChangeLogError::Corrupt(message)) => assert!(message.contains("contains NUL")),
            other => panic!("expected corrupt substrate error, got {other:?}"),
        }
        let _ = fs::remove_file(path);
    }

    #[test]
    fn append_accumulates_lines() {
        let path = temp_path("append");
        append_change_log_to_path(&path, &[record("c1", None)]).expect("first append");
        append_change_log_to_path(&path, &[record("c2", None)]).expect("second append");

        let records = read_change_log_from_path(&path).expect("log should read back");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].change.id.as_str(), "c2");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn from_committed_resolves_snapshot_content() {
        let mut store = TableStore::new();
        let content = json!({"text": "hello"});
        let snapshot_id = store.insert_snapshot(Snapshot::of_content(content.clone()));

        let committed = CommittedChange {
            change: Change {
                id: ChangeId::new("c1"),
                entity_id: "e1".to_string(),
                schema_key: "paragraph".to_string(),
                file_id: "f1".to_string(),
                plugin_key: "plugin-md".to_string(),
                snapshot_id,
                created_at: Utc::now(),
            },
            version_id: VersionId::new("v-main"),
            commit_id: CommitId::new("commit-1"),
            writer_key: Some("editor-1".to_string()),
        };

        let record = ChangeLogRecord::from_committed(&committed, &store);
        assert_eq!(record.snapshot_content, Some(content));
        assert_eq!(record.writer_key.as_deref(), Some("editor-1"));
    }
}
