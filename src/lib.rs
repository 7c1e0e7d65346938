#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(deprecated)]

//!
//! Command-Ledger is a generic command-execution engine with undo/redo history
//! and transactional (macro) rollback.
//!
//! Callers build reversible [`Command`]s bound to a receiver, submit them one at
//! a time to a bounded [`HistoryLedger`], or batch them through a
//! [`TransactionRunner`] that commits all-or-nothing and can record the batch on
//! a ledger as a single undoable step.

// Shared value types (sequence numbers, ledger ids, undo/redo outcomes).
pub mod types;

// The reversible command contract.
pub mod command_traits;

// Command variants: SimpleCommand and CompositeCommand.
pub mod domain;

// Error types for commands, transactions, the ledger and configuration.
pub mod error;

// Audit records and sinks.
pub mod events;

// Ledger configuration loaded from JSON.
pub mod config;

// History ledger, transaction runtime and the shared gate.
pub mod kernel;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use command_traits::{BoxedCommand, Command};
pub use config::LedgerConfig;
pub use domain::{CompositeCommand, SimpleCommand};
pub use error::{
    CommandError, ConfigError, IllegalStateError, IrrecoverableStateError, LedgerError, RevertContext,
    TransactionError,
};
pub use kernel::{HistoryLedger, SharedLedger, TransactionRunner};
pub use types::{CommandPhase, EntryView, LedgerId, RedoOutcome, SequenceNo, UndoOutcome};
