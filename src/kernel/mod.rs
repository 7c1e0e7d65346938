pub mod core;
pub mod gate;
pub mod runtime;

#[cfg(test)]
mod tests;

// Re-export the primary types so `crate::kernel::*` paths stay short.
pub use self::core::{HistoryEntry, HistoryLedger};
pub use gate::SharedLedger;
pub use runtime::{TransactionRunner, DEFAULT_TRANSACTION_LABEL};
