//!
//! Defines error types for commands, transactions and the history ledger.

use crate::types::LedgerId;

/// Misuse of a command's apply/revert protocol. Always a programming error in the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IllegalStateError {
    /// `revert` was called without a preceding successful `apply`.
    #[error("`{0}` reverted without a prior apply")]
    RevertBeforeApply(String),
    /// `apply` was called twice without an intervening `revert`.
    #[error("`{0}` applied twice without an intervening revert")]
    AlreadyApplied(String),
}

/// Where a failing revert happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RevertContext {
    /// A ledger `undo`.
    Undo,
    /// Rolling back the applied prefix of a composite whose apply failed.
    Rollback,
    /// Reverting the children of an applied composite.
    CompositeRevert,
}

impl std::fmt::Display for RevertContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RevertContext::Undo => write!(f, "undo"),
            RevertContext::Rollback => write!(f, "rollback"),
            RevertContext::CompositeRevert => write!(f, "composite revert"),
        }
    }
}

/// A `revert` itself failed; the receiver's true state is no longer known.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("irrecoverable state: revert of `{command}` failed during {during}: {cause}")]
pub struct IrrecoverableStateError {
    /// `describe()` of the command whose revert failed.
    pub command: String,
    pub during: RevertContext,
    pub cause: String,
}

/// Error returned by a command's `apply` or `revert`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The command could not perform its work; the receiver is unchanged.
    #[error("command `{command}` failed: {cause}")]
    Failed { command: String, cause: String },
    #[error(transparent)]
    IllegalState(#[from] IllegalStateError),
    #[error(transparent)]
    Irrecoverable(#[from] IrrecoverableStateError),
}

impl CommandError {
    /// Convenience constructor for a clean failure.
    pub fn failed(command: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        CommandError::Failed { command: command.into(), cause: cause.to_string() }
    }

    /// `describe()` of the command the error originated from.
    pub fn command(&self) -> &str {
        match self {
            CommandError::Failed { command, .. } => command,
            CommandError::IllegalState(IllegalStateError::RevertBeforeApply(c))
            | CommandError::IllegalState(IllegalStateError::AlreadyApplied(c)) => c,
            CommandError::Irrecoverable(e) => &e.command,
        }
    }

    pub fn is_irrecoverable(&self) -> bool {
        matches!(self, CommandError::Irrecoverable(_))
    }

    /// Promote this error to an irrecoverable one, keeping an existing irrecoverable error as is.
    pub(crate) fn into_irrecoverable(self, during: RevertContext) -> IrrecoverableStateError {
        match self {
            CommandError::Irrecoverable(e) => e,
            other => IrrecoverableStateError {
                command: other.command().to_string(),
                during,
                cause: other.to_string(),
            },
        }
    }
}

/// Failure of an all-or-nothing batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    /// A command failed to apply and every earlier sibling was reverted.
    #[error("transaction aborted at step {index} (`{command}`), {reverted} prior step(s) rolled back: {source}")]
    Aborted {
        index: usize,
        command: String,
        reverted: usize,
        source: CommandError,
    },
    /// A command failed and rolling back an earlier sibling failed too.
    #[error("transaction rollback failed: {0}")]
    RollbackFailed(IrrecoverableStateError),
    #[error("transaction contains no commands")]
    Empty,
}

impl TransactionError {
    /// `describe()` of the command that made the transaction fail, if any.
    pub fn failed_command(&self) -> Option<&str> {
        match self {
            TransactionError::Aborted { command, .. } => Some(command),
            TransactionError::RollbackFailed(e) => Some(&e.command),
            TransactionError::Empty => None,
        }
    }

    /// `true` when every applied sibling was reverted.
    pub fn rolled_back(&self) -> bool {
        !matches!(self, TransactionError::RollbackFailed(_))
    }
}

/// Errors surfaced by `HistoryLedger` and `SharedLedger` operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// A command failed cleanly; ledger state is unchanged.
    #[error(transparent)]
    Command(CommandError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    /// Fatal. The ledger is now corrupted and must be reset by the host.
    #[error(transparent)]
    Irrecoverable(#[from] IrrecoverableStateError),
    /// The ledger was corrupted by an earlier failure and refuses further work.
    #[error("ledger {ledger} is corrupted and must be reset")]
    Corrupted { ledger: LedgerId },
    /// A thread panicked while holding the ledger gate.
    #[error("ledger gate poisoned by a panicked holder")]
    Poisoned,
}

impl LedgerError {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LedgerError::Irrecoverable(_)
                | LedgerError::Corrupted { .. }
                | LedgerError::Poisoned
                | LedgerError::Transaction(TransactionError::RollbackFailed(_))
        )
    }
}

impl From<CommandError> for LedgerError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Irrecoverable(e) => LedgerError::Irrecoverable(e),
            other => LedgerError::Command(other),
        }
    }
}

/// Errors raised while loading a `LedgerConfig`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
