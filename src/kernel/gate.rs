//! Mutual-exclusion gate pairing one ledger with its receiver.
//!
//! Every operation takes the gate for its whole duration, so `execute`, `undo`,
//! `redo` and `run` calls against the same receiver never interleave. Distinct
//! `SharedLedger`s share nothing.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::command_traits::{BoxedCommand, Command};
use crate::error::LedgerError;
use crate::kernel::core::HistoryLedger;
use crate::kernel::runtime::TransactionRunner;
use crate::types::{RedoOutcome, SequenceNo, UndoOutcome};

struct Session<Ctx> {
    ledger: HistoryLedger<Ctx>,
    receiver: Ctx,
}

/// Cloneable, thread-safe handle to a ledger and the receiver it mutates.
pub struct SharedLedger<Ctx> {
    inner: Arc<Mutex<Session<Ctx>>>,
}

impl<Ctx> Clone for SharedLedger<Ctx> {
    fn clone(&self) -> Self {
        SharedLedger { inner: Arc::clone(&self.inner) }
    }
}

impl<Ctx: 'static> SharedLedger<Ctx> {
    pub fn new(ledger: HistoryLedger<Ctx>, receiver: Ctx) -> Self {
        SharedLedger { inner: Arc::new(Mutex::new(Session { ledger, receiver })) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Session<Ctx>>, LedgerError> {
        self.inner.lock().map_err(|_| LedgerError::Poisoned)
    }

    pub fn execute(&self, command: impl Command<Ctx> + 'static) -> Result<SequenceNo, LedgerError> {
        let mut guard = self.lock()?;
        let Session { ledger, receiver } = &mut *guard;
        ledger.execute(command, receiver)
    }

    pub fn undo(&self) -> Result<UndoOutcome, LedgerError> {
        let mut guard = self.lock()?;
        let Session { ledger, receiver } = &mut *guard;
        ledger.undo(receiver)
    }

    pub fn redo(&self) -> Result<RedoOutcome, LedgerError> {
        let mut guard = self.lock()?;
        let Session { ledger, receiver } = &mut *guard;
        ledger.redo(receiver)
    }

    /// Runs a transaction and records it as one undoable entry.
    pub fn run(&self, runner: &TransactionRunner, commands: Vec<BoxedCommand<Ctx>>) -> Result<SequenceNo, LedgerError> {
        let mut guard = self.lock()?;
        let Session { ledger, receiver } = &mut *guard;
        runner.run_into(ledger, commands, receiver)
    }

    pub fn can_undo(&self) -> Result<bool, LedgerError> {
        Ok(self.lock()?.ledger.can_undo())
    }

    pub fn can_redo(&self) -> Result<bool, LedgerError> {
        Ok(self.lock()?.ledger.can_redo())
    }

    /// Reads the receiver while holding the gate.
    pub fn with_receiver<R>(&self, f: impl FnOnce(&Ctx) -> R) -> Result<R, LedgerError> {
        Ok(f(&self.lock()?.receiver))
    }

    /// Replaces the receiver with a known-good state and resets the ledger.
    pub fn restore(&self, receiver: Ctx) -> Result<(), LedgerError> {
        let mut guard = self.lock()?;
        guard.receiver = receiver;
        guard.ledger.reset();
        Ok(())
    }

    /// Runs `f` against the ledger while holding the gate.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&HistoryLedger<Ctx>) -> R) -> Result<R, LedgerError> {
        Ok(f(&self.lock()?.ledger))
    }
}
