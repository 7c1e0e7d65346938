//!
//! Audit records emitted by the history ledger.
//!
//! The ledger always logs through `tracing`. A host that wants a durable or
//! displayable trail installs an [`AuditSink`]; the ledger then hands it one
//! [`AuditRecord`] per operation, built from the command's `describe()`.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::types::{LedgerId, SequenceNo};

/// The ledger operation a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Execute,
    Record,
    Undo,
    Redo,
    Evict,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum AuditOutcome {
    Succeeded,
    Failed(String),
    /// The failure left the ledger corrupted.
    Corrupted(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub ledger: LedgerId,
    /// Sequence number of the affected entry. `None` for a failed execute or a reset.
    pub seq: Option<SequenceNo>,
    pub action: AuditAction,
    pub description: String,
    pub outcome: AuditOutcome,
}

impl AuditRecord {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Receiver of audit records. Must not call back into the ledger.
pub trait AuditSink: Send {
    fn record(&mut self, record: AuditRecord);
}

/// Sink that keeps every record in memory behind a shared handle.
///
/// Cloning the sink shares the buffer, so a host can install one clone in the
/// ledger and read the trail through another.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records collected so far. Empty if the buffer was poisoned.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl AuditSink for RecordingSink {
    fn record(&mut self, record: AuditRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_with_snake_case_tags() {
        let rec = AuditRecord {
            ledger: LedgerId(uuid::Uuid::nil()),
            seq: Some(3),
            action: AuditAction::Undo,
            description: "set 10".into(),
            outcome: AuditOutcome::Failed("boom".into()),
        };
        let json = rec.to_json().unwrap();
        assert!(json.contains("\"action\":\"undo\""));
        assert!(json.contains("\"status\":\"failed\""));
        assert!(json.contains("\"ledger\":\"00000000-0000-0000-0000-000000000000\""));
        let back: AuditRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn recording_sink_clones_share_buffer() {
        let sink = RecordingSink::new();
        let mut writer = sink.clone();
        writer.record(AuditRecord {
            ledger: LedgerId::new(),
            seq: None,
            action: AuditAction::Reset,
            description: String::new(),
            outcome: AuditOutcome::Succeeded,
        });
        assert_eq!(sink.records().len(), 1);
    }
}
