//! Shared value types used across the ledger, runtime and audit modules.

use serde::{Deserialize, Serialize};

/// Monotonic position of an entry in one ledger's history.
/// Starts at 1 and is never reused, not even after eviction or `reset`.
pub type SequenceNo = u64;

/// Identity of a single `HistoryLedger` instance, used in logs and audit records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerId(pub uuid::Uuid);

impl LedgerId {
    pub fn new() -> Self {
        LedgerId(uuid::Uuid::new_v4())
    }
}

impl Default for LedgerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LedgerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a command that tracks its own application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandPhase {
    /// Constructed, never applied.
    Pending,
    /// The most recent successful call was `apply`.
    Applied,
    /// The most recent successful call was `revert`.
    Reverted,
}

impl CommandPhase {
    pub fn is_applied(self) -> bool {
        matches!(self, CommandPhase::Applied)
    }
}

/// Result of a successful `undo` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UndoOutcome {
    /// The entry at `seq` was reverted.
    Undone { seq: SequenceNo, description: String },
    /// The cursor is at the start of history.
    NothingToUndo,
}

/// Result of a successful `redo` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedoOutcome {
    /// The entry at `seq` was applied again.
    Redone { seq: SequenceNo, description: String },
    /// The cursor is at the end of history.
    NothingToRedo,
}

impl UndoOutcome {
    pub fn is_undone(&self) -> bool {
        matches!(self, UndoOutcome::Undone { .. })
    }
}

impl RedoOutcome {
    pub fn is_redone(&self) -> bool {
        matches!(self, RedoOutcome::Redone { .. })
    }
}

/// Read-only projection of one history entry, for rendering history lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryView {
    pub seq: SequenceNo,
    pub description: String,
    /// `true` for entries left of the cursor, `false` for the redo branch.
    pub undoable: bool,
}
