//!
//! Bounded, linear undo/redo history.
//!
//! Entries live in a flat deque; an integer cursor splits them into an undoable
//! prefix `[0, cursor)` and a redoable suffix `[cursor, len)`. New work truncates
//! the suffix, and the prefix is capped at `max_depth` by evicting from the front.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use crate::command_traits::{BoxedCommand, Command};
use crate::config::LedgerConfig;
use crate::error::{CommandError, LedgerError, RevertContext, TransactionError};
use crate::events::{AuditAction, AuditOutcome, AuditRecord, AuditSink};
use crate::types::{EntryView, LedgerId, RedoOutcome, SequenceNo, UndoOutcome};

/// One applied (or reverted but retained) command together with its sequence number.
pub struct HistoryEntry<Ctx> {
    pub seq: SequenceNo,
    command: BoxedCommand<Ctx>,
}

impl<Ctx> HistoryEntry<Ctx> {
    pub fn describe(&self) -> String {
        self.command.describe()
    }
}

/// Undo/redo history over commands mutating a receiver of type `Ctx`.
///
/// The receiver is not owned by the ledger; every operation borrows it mutably
/// for the duration of one `apply`/`revert` call. A ledger is single-threaded;
/// wrap it in [`crate::kernel::SharedLedger`] to serialize access from several
/// threads.
pub struct HistoryLedger<Ctx> {
    id: LedgerId,
    label: Option<String>,
    entries: VecDeque<HistoryEntry<Ctx>>,
    cursor: usize,
    max_depth: NonZeroUsize,
    next_seq: SequenceNo,
    corrupted: bool,
    sink: Option<Box<dyn AuditSink>>,
}

impl<Ctx: 'static> HistoryLedger<Ctx> {
    pub fn new(max_depth: NonZeroUsize) -> Self {
        HistoryLedger {
            id: LedgerId::new(),
            label: None,
            entries: VecDeque::new(),
            cursor: 0,
            max_depth,
            next_seq: 1,
            corrupted: false,
            sink: None,
        }
    }

    pub fn with_config(config: &LedgerConfig) -> Self {
        let mut ledger = Self::new(config.max_depth);
        ledger.label = config.label.clone();
        ledger
    }

    /// Installs a sink that receives one [`AuditRecord`] per operation.
    pub fn with_audit_sink(mut self, sink: impl AuditSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn id(&self) -> LedgerId {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth.get()
    }

    /// Total retained entries, undoable and redoable.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn can_undo(&self) -> bool {
        !self.corrupted && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.corrupted && self.cursor < self.entries.len()
    }

    pub fn is_corrupted(&self) -> bool {
        self.corrupted
    }

    /// Label of the command the next `undo` would revert.
    pub fn undo_description(&self) -> Option<String> {
        self.cursor.checked_sub(1).and_then(|i| self.entries.get(i)).map(HistoryEntry::describe)
    }

    /// Label of the command the next `redo` would apply.
    pub fn redo_description(&self) -> Option<String> {
        self.entries.get(self.cursor).map(HistoryEntry::describe)
    }

    /// Every retained entry, oldest first.
    pub fn entries(&self) -> Vec<EntryView> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| EntryView { seq: e.seq, description: e.describe(), undoable: i < self.cursor })
            .collect()
    }

    /// Applies `command` and records it as the newest undoable entry.
    ///
    /// On failure the history is untouched. A failure that left the receiver in
    /// an unknown state (a composite whose rollback failed) corrupts the ledger.
    pub fn execute(
        &mut self,
        command: impl Command<Ctx> + 'static,
        ctx: &mut Ctx,
    ) -> Result<SequenceNo, LedgerError> {
        self.ensure_healthy()?;
        let mut command: BoxedCommand<Ctx> = Box::new(command);
        let description = command.describe();

        if let Err(err) = command.apply(ctx) {
            return Err(self.fail(AuditAction::Execute, None, description, err));
        }
        tracing::debug!(ledger = %self.id, command = %description, "command applied");
        Ok(self.push_entry(AuditAction::Execute, command, description))
    }

    /// Records a command that the caller has already applied, e.g. the composite
    /// returned by [`crate::kernel::TransactionRunner::run`].
    pub fn record_applied(&mut self, command: impl Command<Ctx> + 'static) -> Result<SequenceNo, LedgerError> {
        self.ensure_healthy()?;
        let command: BoxedCommand<Ctx> = Box::new(command);
        let description = command.describe();
        Ok(self.push_entry(AuditAction::Record, command, description))
    }

    pub fn undo(&mut self, ctx: &mut Ctx) -> Result<UndoOutcome, LedgerError> {
        self.ensure_healthy()?;
        if self.cursor == 0 {
            return Ok(UndoOutcome::NothingToUndo);
        }
        let index = self.cursor - 1;
        let entry = &mut self.entries[index];
        let (seq, description) = (entry.seq, entry.describe());

        if let Err(err) = entry.command.revert(ctx) {
            let irr = err.into_irrecoverable(RevertContext::Undo);
            return Err(self.fail(AuditAction::Undo, Some(seq), description, CommandError::Irrecoverable(irr)));
        }
        self.cursor = index;
        tracing::debug!(ledger = %self.id, seq, command = %description, "command undone");
        self.audit(AuditAction::Undo, Some(seq), description.clone(), AuditOutcome::Succeeded);
        Ok(UndoOutcome::Undone { seq, description })
    }

    pub fn redo(&mut self, ctx: &mut Ctx) -> Result<RedoOutcome, LedgerError> {
        self.ensure_healthy()?;
        if self.cursor == self.entries.len() {
            return Ok(RedoOutcome::NothingToRedo);
        }
        let entry = &mut self.entries[self.cursor];
        let (seq, description) = (entry.seq, entry.describe());

        if let Err(err) = entry.command.apply(ctx) {
            return Err(self.fail(AuditAction::Redo, Some(seq), description, err));
        }
        self.cursor += 1;
        tracing::debug!(ledger = %self.id, seq, command = %description, "command redone");
        self.audit(AuditAction::Redo, Some(seq), description.clone(), AuditOutcome::Succeeded);
        Ok(RedoOutcome::Redone { seq, description })
    }

    /// Drops all history and clears the corrupted marker.
    ///
    /// Call this after restoring the receiver from a known-good snapshot.
    /// Sequence numbers keep counting from where they were.
    pub fn reset(&mut self) {
        let was_corrupted = self.corrupted;
        self.entries.clear();
        self.cursor = 0;
        self.corrupted = false;
        tracing::info!(ledger = %self.id, was_corrupted, "ledger reset");
        self.audit(AuditAction::Reset, None, String::new(), AuditOutcome::Succeeded);
    }

    /// Drops all history of a healthy ledger without touching the receiver.
    pub fn clear(&mut self) -> Result<(), LedgerError> {
        self.ensure_healthy()?;
        self.entries.clear();
        self.cursor = 0;
        Ok(())
    }

    pub(crate) fn ensure_healthy(&self) -> Result<(), LedgerError> {
        if self.corrupted {
            return Err(LedgerError::Corrupted { ledger: self.id });
        }
        Ok(())
    }

    fn push_entry(&mut self, action: AuditAction, command: BoxedCommand<Ctx>, description: String) -> SequenceNo {
        let seq = self.next_seq;
        self.next_seq += 1;

        // New work invalidates the redo branch.
        self.entries.truncate(self.cursor);
        self.entries.push_back(HistoryEntry { seq, command });
        self.cursor = self.entries.len();
        self.audit(action, Some(seq), description, AuditOutcome::Succeeded);

        while self.cursor > self.max_depth.get() {
            if let Some(evicted) = self.entries.pop_front() {
                self.cursor -= 1;
                let evicted_description = evicted.describe();
                tracing::trace!(ledger = %self.id, seq = evicted.seq, command = %evicted_description, "entry evicted");
                self.audit(AuditAction::Evict, Some(evicted.seq), evicted_description, AuditOutcome::Succeeded);
            }
        }
        seq
    }

    /// Logs and audits a transaction that never reached the history.
    ///
    /// A batch whose rollback failed left the receiver partially applied, so it
    /// corrupts the ledger just like an irrecoverable `execute`.
    pub(crate) fn fail_transaction(&mut self, description: String, err: TransactionError) -> LedgerError {
        let outcome = if let TransactionError::RollbackFailed(irr) = &err {
            self.corrupted = true;
            tracing::error!(ledger = %self.id, command = %description, error = %irr, "ledger corrupted by transaction");
            AuditOutcome::Corrupted(err.to_string())
        } else {
            tracing::warn!(ledger = %self.id, command = %description, error = %err, "transaction not recorded");
            AuditOutcome::Failed(err.to_string())
        };
        self.audit(AuditAction::Record, None, description, outcome);
        LedgerError::Transaction(err)
    }

    /// Logs and audits a failed operation, corrupting the ledger when the failure is irrecoverable.
    fn fail(
        &mut self,
        action: AuditAction,
        seq: Option<SequenceNo>,
        description: String,
        err: CommandError,
    ) -> LedgerError {
        let outcome = if err.is_irrecoverable() {
            self.corrupted = true;
            tracing::error!(ledger = %self.id, ?action, ?seq, command = %description, error = %err, "ledger corrupted");
            AuditOutcome::Corrupted(err.to_string())
        } else {
            tracing::warn!(ledger = %self.id, ?action, ?seq, command = %description, error = %err, "command failed");
            AuditOutcome::Failed(err.to_string())
        };
        self.audit(action, seq, description, outcome);
        LedgerError::from(err)
    }

    fn audit(&mut self, action: AuditAction, seq: Option<SequenceNo>, description: String, outcome: AuditOutcome) {
        if let Some(sink) = self.sink.as_mut() {
            sink.record(AuditRecord { ledger: self.id, seq, action, description, outcome });
        }
    }
}

impl<Ctx> std::fmt::Debug for HistoryLedger<Ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryLedger")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("len", &self.entries.len())
            .field("cursor", &self.cursor)
            .field("max_depth", &self.max_depth)
            .field("next_seq", &self.next_seq)
            .field("corrupted", &self.corrupted)
            .finish()
    }
}
