#![cfg(test)]

use std::num::NonZeroUsize;

use crate::config::LedgerConfig;
use crate::domain::CompositeCommand;
use crate::error::{CommandError, LedgerError, RevertContext, TransactionError};
use crate::events::{AuditAction, AuditOutcome, RecordingSink};
use crate::kernel::core::HistoryLedger;
use crate::kernel::runtime::TransactionRunner;
use crate::testing::{boxed, init_tracing, Account, Deposit, FaultyRevert, Register, SetValue, Withdraw};
use crate::types::{RedoOutcome, UndoOutcome};

// --- Test Utilities ---

fn ledger<Ctx: 'static>(depth: usize) -> HistoryLedger<Ctx> {
    HistoryLedger::new(NonZeroUsize::new(depth).unwrap())
}

// --- Test Cases ---

#[test]
fn test_ledger_new() {
    let l: HistoryLedger<Register> = ledger(5);
    assert_eq!(l.len(), 0);
    assert_eq!(l.cursor(), 0);
    assert_eq!(l.max_depth(), 5);
    assert!(!l.can_undo());
    assert!(!l.can_redo());
    assert!(!l.is_corrupted());
}

#[test]
fn test_set_value_undo_redo_scenario() {
    init_tracing();
    let mut l = ledger(5);
    let mut reg = Register::new(0);

    l.execute(SetValue::new(10), &mut reg).unwrap();
    assert_eq!(reg.value, 10);

    assert!(l.undo(&mut reg).unwrap().is_undone());
    assert_eq!(reg.value, 0);
    assert!(l.can_redo());

    assert!(l.redo(&mut reg).unwrap().is_redone());
    assert_eq!(reg.value, 10);

    l.execute(SetValue::new(20), &mut reg).unwrap();
    assert_eq!(reg.value, 20);
    assert!(!l.can_redo());
}

#[test]
fn test_new_execute_discards_redo_branch() {
    let mut l = ledger(10);
    let mut reg = Register::new(0);
    l.execute(SetValue::new(1), &mut reg).unwrap(); // a
    l.execute(SetValue::new(2), &mut reg).unwrap(); // b
    l.undo(&mut reg).unwrap();
    l.execute(SetValue::new(3), &mut reg).unwrap(); // c

    assert_eq!(l.redo(&mut reg).unwrap(), RedoOutcome::NothingToRedo);
    assert_eq!(l.len(), 2);
    let labels: Vec<String> = l.entries().into_iter().map(|e| e.description).collect();
    assert_eq!(labels, vec!["set 1", "set 3"]);
}

#[test]
fn test_bounded_depth_evicts_oldest() {
    let mut l = ledger(2);
    let mut reg = Register::new(0);
    for v in 1..=3 {
        l.execute(SetValue::new(v), &mut reg).unwrap();
    }
    assert_eq!(l.len(), 2);
    assert!(l.undo(&mut reg).unwrap().is_undone());
    assert!(l.undo(&mut reg).unwrap().is_undone());
    assert_eq!(l.undo(&mut reg).unwrap(), UndoOutcome::NothingToUndo);
    // the evicted first write can no longer be undone
    assert_eq!(reg.value, 1);
}

#[test]
fn test_sequence_numbers_are_monotonic_across_eviction() {
    let mut l = ledger(1);
    let mut reg = Register::new(0);
    let s1 = l.execute(SetValue::new(1), &mut reg).unwrap();
    let s2 = l.execute(SetValue::new(2), &mut reg).unwrap();
    l.undo(&mut reg).unwrap();
    let s3 = l.execute(SetValue::new(3), &mut reg).unwrap();
    assert_eq!((s1, s2, s3), (1, 2, 3));
    assert_eq!(l.entries()[0].seq, 3);
}

#[test]
fn test_failed_execute_leaves_history_unchanged() {
    let mut l = ledger(4);
    let mut acct = Account::with_balance(50);
    l.execute(Deposit::new(10), &mut acct).unwrap();
    l.undo(&mut acct).unwrap();

    let err = l.execute(Withdraw::new(500), &mut acct).unwrap_err();
    assert!(matches!(err, LedgerError::Command(CommandError::Failed { .. })));
    assert!(!err.is_fatal());
    assert_eq!(acct.balance, 50);
    // redo branch survives a failed submission
    assert!(l.can_redo());
    assert_eq!(l.redo_description().as_deref(), Some("deposit 10"));
}

#[test]
fn test_failed_undo_corrupts_ledger() {
    init_tracing();
    let mut l = ledger(4);
    let mut acct = Account::with_balance(0);
    l.execute(Deposit::new(1), &mut acct).unwrap();
    l.execute(FaultyRevert::new(Deposit::new(2)), &mut acct).unwrap();

    match l.undo(&mut acct) {
        Err(LedgerError::Irrecoverable(irr)) => {
            assert_eq!(irr.command, "faulty deposit 2");
            assert_eq!(irr.during, RevertContext::Undo);
        }
        other => panic!("expected irrecoverable, got {:?}", other),
    }
    assert!(l.is_corrupted());
    assert_eq!(l.cursor(), 2);
    assert!(!l.can_undo());

    let id = l.id();
    assert_eq!(l.undo(&mut acct), Err(LedgerError::Corrupted { ledger: id }));
    assert_eq!(l.redo(&mut acct), Err(LedgerError::Corrupted { ledger: id }));
    assert!(matches!(l.execute(Deposit::new(3), &mut acct), Err(LedgerError::Corrupted { .. })));
    assert_eq!(acct.balance, 3);

    // host reloads a known-good receiver and resets
    acct = Account::with_balance(0);
    l.reset();
    assert!(!l.is_corrupted());
    assert!(l.is_empty());
    l.execute(Deposit::new(4), &mut acct).unwrap();
    assert_eq!(acct.balance, 4);
}

#[test]
fn test_queries_do_not_mutate() {
    let mut l = ledger(3);
    let mut reg = Register::new(0);
    l.execute(SetValue::new(1), &mut reg).unwrap();
    l.execute(SetValue::new(2), &mut reg).unwrap();
    l.undo(&mut reg).unwrap();
    for _ in 0..10 {
        assert!(l.can_undo());
        assert!(l.can_redo());
    }
    assert_eq!(l.cursor(), 1);
    assert_eq!(l.len(), 2);
    assert_eq!(l.undo_description().as_deref(), Some("set 1"));
    assert_eq!(l.redo_description().as_deref(), Some("set 2"));
}

#[test]
fn test_with_config_applies_depth_and_label() {
    let cfg = LedgerConfig::from_json_str(r#"{"max_depth": 3, "label": "doc"}"#).unwrap();
    let l: HistoryLedger<Register> = HistoryLedger::with_config(&cfg);
    assert_eq!(l.max_depth(), 3);
    assert_eq!(l.label(), Some("doc"));
}

#[test]
fn test_clear_drops_history() {
    let mut l = ledger(3);
    let mut reg = Register::new(0);
    l.execute(SetValue::new(1), &mut reg).unwrap();
    l.clear().unwrap();
    assert!(l.is_empty());
    assert_eq!(reg.value, 1);
    assert_eq!(l.undo(&mut reg).unwrap(), UndoOutcome::NothingToUndo);
}

#[test]
fn test_audit_sink_sees_every_operation() {
    let sink = RecordingSink::new();
    let mut l = ledger(1).with_audit_sink(sink.clone());
    let mut acct = Account::with_balance(0);
    l.execute(Deposit::new(1), &mut acct).unwrap();
    l.execute(Deposit::new(2), &mut acct).unwrap();
    l.undo(&mut acct).unwrap();
    l.redo(&mut acct).unwrap();
    let _ = l.execute(Withdraw::new(100), &mut acct);

    let actions: Vec<AuditAction> = sink.records().iter().map(|r| r.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::Execute,
            AuditAction::Execute,
            AuditAction::Evict,
            AuditAction::Undo,
            AuditAction::Redo,
            AuditAction::Execute,
        ]
    );
    let last = sink.records().pop().unwrap();
    assert_eq!(last.seq, None);
    assert_eq!(last.description, "withdraw 100");
    assert!(matches!(last.outcome, AuditOutcome::Failed(_)));
}

#[test]
fn test_transaction_rolls_back_deposit() {
    let runner = TransactionRunner::default();
    let mut acct = Account::with_balance(200);
    let err = runner
        .run(vec![boxed(Deposit::new(100)), boxed(Withdraw::new(500))], &mut acct)
        .unwrap_err();
    assert_eq!(acct.balance, 200);
    assert_eq!(err.failed_command(), Some("withdraw 500"));
    assert!(err.rolled_back());
    assert!(matches!(err, TransactionError::Aborted { index: 1, reverted: 1, .. }));
}

#[test]
fn test_empty_transaction_is_rejected() {
    let runner = TransactionRunner::default();
    let mut acct = Account::default();
    assert_eq!(runner.run(Vec::new(), &mut acct).unwrap_err(), TransactionError::Empty);
}

#[test]
fn test_committed_transaction_undoes_as_one_step() {
    let runner = TransactionRunner::new("payday");
    let mut l = ledger(5);
    let mut acct = Account::with_balance(0);
    let seq = runner
        .run_into(&mut l, vec![boxed(Deposit::new(100)), boxed(Withdraw::new(30))], &mut acct)
        .unwrap();
    assert_eq!(seq, 1);
    assert_eq!(acct.balance, 70);
    assert_eq!(l.undo_description().as_deref(), Some("payday"));

    l.undo(&mut acct).unwrap();
    assert_eq!(acct.balance, 0);
    l.redo(&mut acct).unwrap();
    assert_eq!(acct.balance, 70);
}

#[test]
fn test_transaction_rollback_failure_reports_irrecoverable() {
    let runner = TransactionRunner::default();
    let mut acct = Account::with_balance(0);
    let err = runner
        .run(
            vec![boxed(FaultyRevert::new(Deposit::new(1))), boxed(Withdraw::new(10))],
            &mut acct,
        )
        .unwrap_err();
    assert!(!err.rolled_back());
    assert!(matches!(err, TransactionError::RollbackFailed(_)));
}

#[test]
fn test_run_into_refuses_corrupted_ledger() {
    let runner = TransactionRunner::default();
    let mut l = ledger(5);
    let mut acct = Account::with_balance(0);
    l.execute(FaultyRevert::new(Deposit::new(1)), &mut acct).unwrap();
    assert!(l.undo(&mut acct).is_err());

    let result = runner.run_into(&mut l, vec![boxed(Deposit::new(5))], &mut acct);
    assert!(matches!(result, Err(LedgerError::Corrupted { .. })));
    assert_eq!(acct.balance, 1, "no command may run against a corrupted ledger");
}

#[test]
fn test_undo_of_composite_with_failing_child_corrupts() {
    let mut l = ledger(5);
    let mut acct = Account::with_balance(10);
    let composite = CompositeCommand::new("spend")
        .with(FaultyRevert::new(Deposit::new(0)))
        .with(Withdraw::new(10));
    l.execute(composite, &mut acct).unwrap();
    assert_eq!(acct.balance, 0);

    // Undo reverts Withdraw, then the faulty child refuses: ledger corrupted.
    assert!(matches!(l.undo(&mut acct), Err(LedgerError::Irrecoverable(_))));
    assert!(l.is_corrupted());
}

#[test]
fn test_run_into_rollback_failure_corrupts_ledger() {
    init_tracing();
    let sink = RecordingSink::new();
    let runner = TransactionRunner::new("payout");
    let mut l = ledger(5).with_audit_sink(sink.clone());
    let mut acct = Account::with_balance(0);

    // a clean abort leaves the ledger usable
    let err = runner
        .run_into(&mut l, vec![boxed(Deposit::new(2)), boxed(Withdraw::new(100))], &mut acct)
        .unwrap_err();
    assert!(!err.is_fatal());
    assert!(!l.is_corrupted());
    assert_eq!(acct.balance, 0);

    let err = runner
        .run_into(&mut l, vec![boxed(FaultyRevert::new(Deposit::new(7))), boxed(Withdraw::new(100))], &mut acct)
        .unwrap_err();
    assert!(matches!(err, LedgerError::Transaction(TransactionError::RollbackFailed(_))));
    assert!(err.is_fatal());
    assert!(l.is_corrupted());
    assert!(l.is_empty());
    assert_eq!(acct.balance, 7);

    let id = l.id();
    assert_eq!(l.execute(Deposit::new(1), &mut acct), Err(LedgerError::Corrupted { ledger: id }));
    assert_eq!(acct.balance, 7);

    let outcomes: Vec<AuditOutcome> = sink.records().into_iter().map(|r| r.outcome).collect();
    assert!(matches!(outcomes.as_slice(), [AuditOutcome::Failed(_), AuditOutcome::Corrupted(_)]));
}

#[test]
fn test_failed_redo_keeps_entry_redoable() {
    let mut l = ledger(4);
    let mut acct = Account::with_balance(10);
    l.execute(Withdraw::new(10), &mut acct).unwrap();
    l.undo(&mut acct).unwrap();
    assert_eq!(acct.balance, 10);

    // the receiver changes behind the ledger's back
    acct.balance = 5;
    let err = l.redo(&mut acct).unwrap_err();
    assert!(matches!(err, LedgerError::Command(CommandError::Failed { .. })));
    assert!(!err.is_fatal());
    assert_eq!(l.cursor(), 0);
    assert!(l.can_redo());
    assert!(!l.is_corrupted());
    assert_eq!(acct.balance, 5);

    acct.balance = 10;
    assert!(l.redo(&mut acct).unwrap().is_redone());
    assert_eq!(acct.balance, 0);
    assert_eq!(l.cursor(), 1);
}

#[test]
fn test_redo_of_composite_with_failing_rollback_corrupts() {
    let mut l = ledger(4);
    let mut acct = Account::with_balance(10);
    let composite = CompositeCommand::new("spend")
        .with(FaultyRevert::after(Deposit::new(0), 1))
        .with(Withdraw::new(10));
    l.execute(composite, &mut acct).unwrap();
    assert!(l.undo(&mut acct).unwrap().is_undone());
    assert_eq!(acct.balance, 10);

    acct.balance = 5;
    match l.redo(&mut acct) {
        Err(LedgerError::Irrecoverable(irr)) => {
            assert_eq!(irr.command, "faulty deposit 0");
            assert_eq!(irr.during, RevertContext::Rollback);
        }
        other => panic!("expected irrecoverable, got {:?}", other),
    }
    assert!(l.is_corrupted());
    assert_eq!(l.cursor(), 0);
    assert!(!l.can_redo());
}

#[test]
fn test_execute_of_composite_with_failing_rollback_corrupts() {
    let mut l = ledger(4);
    let mut acct = Account::with_balance(0);
    let composite = CompositeCommand::new("doomed")
        .with(FaultyRevert::new(Deposit::new(1)))
        .with(Withdraw::new(100));

    let err = l.execute(composite, &mut acct).unwrap_err();
    assert!(matches!(err, LedgerError::Irrecoverable(_)));
    assert!(err.is_fatal());
    assert!(l.is_corrupted());
    assert_eq!(l.len(), 0);
    assert_eq!(acct.balance, 1);
}

#[test]
fn test_nested_rollback_failure_aborts_transaction_as_fatal() {
    let runner = TransactionRunner::default();
    let mut l = ledger(4);
    let mut acct = Account::with_balance(0);
    let inner = CompositeCommand::new("inner")
        .with(FaultyRevert::new(Deposit::new(3)))
        .with(Withdraw::new(100));

    let err = runner
        .run_into(&mut l, vec![boxed(Deposit::new(1)), boxed(inner)], &mut acct)
        .unwrap_err();
    assert!(matches!(err, LedgerError::Transaction(TransactionError::RollbackFailed(_))));
    assert!(err.is_fatal());
    assert!(l.is_corrupted());
    assert_eq!(acct.balance, 3);
}
