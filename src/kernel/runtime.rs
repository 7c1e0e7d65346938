//! Transaction runtime.
//!
//! A `TransactionRunner` executes an ordered batch of commands against a
//! receiver as one all-or-nothing unit. It keeps no state between calls, so one
//! runner can serve any number of receivers, including from several threads.

use crate::command_traits::BoxedCommand;
use crate::domain::CompositeCommand;
use crate::error::{LedgerError, TransactionError};
use crate::kernel::core::HistoryLedger;
use crate::types::SequenceNo;

/// Label given to composites when the runner has none of its own.
pub const DEFAULT_TRANSACTION_LABEL: &str = "transaction";

#[derive(Debug, Clone)]
pub struct TransactionRunner {
    label: String,
}

impl Default for TransactionRunner {
    fn default() -> Self {
        TransactionRunner { label: DEFAULT_TRANSACTION_LABEL.to_string() }
    }
}

impl TransactionRunner {
    /// Runner whose composites are described as `label`.
    pub fn new(label: impl Into<String>) -> Self {
        TransactionRunner { label: label.into() }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Applies `commands` in order.
    ///
    /// On success returns the applied composite, ready to be recorded with
    /// [`HistoryLedger::record_applied`] so the whole batch undoes as one step.
    /// On failure every command applied before the failing one has already been
    /// reverted, newest first.
    pub fn run<Ctx: 'static>(
        &self,
        commands: Vec<BoxedCommand<Ctx>>,
        ctx: &mut Ctx,
    ) -> Result<CompositeCommand<Ctx>, TransactionError> {
        if commands.is_empty() {
            return Err(TransactionError::Empty);
        }
        let steps = commands.len();
        let mut composite = CompositeCommand::from_commands(self.label.clone(), commands);
        let span = tracing::debug_span!("transaction", label = %self.label, steps);
        let _guard = span.enter();

        match composite.try_apply(ctx) {
            Ok(()) => {
                tracing::debug!("transaction committed");
                Ok(composite)
            }
            Err(err) => {
                tracing::warn!(failed = ?err.failed_command(), rolled_back = err.rolled_back(), "transaction aborted");
                Err(err)
            }
        }
    }

    /// Runs `commands` and records the resulting composite on `ledger` as a single entry.
    ///
    /// A corrupted ledger is refused before any command is applied. A batch
    /// whose rollback fails corrupts `ledger`.
    pub fn run_into<Ctx: 'static>(
        &self,
        ledger: &mut HistoryLedger<Ctx>,
        commands: Vec<BoxedCommand<Ctx>>,
        ctx: &mut Ctx,
    ) -> Result<SequenceNo, LedgerError> {
        ledger.ensure_healthy()?;
        match self.run(commands, ctx) {
            Ok(composite) => ledger.record_applied(composite),
            Err(err) => Err(ledger.fail_transaction(self.label.clone(), err)),
        }
    }
}
