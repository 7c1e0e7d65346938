#![no_main]

use libfuzzer_sys::fuzz_target;
use command_ledger::testing::{boxed, Account, Deposit, Withdraw};
use command_ledger::{BoxedCommand, TransactionRunner};

#[derive(Debug, Clone, arbitrary::Arbitrary)]
struct FuzzInput {
    balance: u32,
    steps: Vec<(bool, u16)>,
}

fuzz_target!(|data: FuzzInput| {
    let start = data.balance as u64;
    let mut account = Account::with_balance(start);
    let batch: Vec<BoxedCommand<Account>> = data
        .steps
        .iter()
        .map(|&(deposit, n)| if deposit { boxed(Deposit::new(n as u64)) } else { boxed(Withdraw::new(n as u64)) })
        .collect();

    // A failed transaction must leave the balance exactly where it started.
    if TransactionRunner::default().run(batch, &mut account).is_err() {
        assert_eq!(account.balance, start);
    }
});
