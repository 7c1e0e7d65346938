//! Receivers and commands shared by unit tests, integration tests, benches and fuzz targets.
//!
//! Compiled for `cfg(test)` and behind the `test-utils` feature.

use crate::command_traits::{BoxedCommand, Command};
use crate::error::{CommandError, IllegalStateError};

/// Integer register that also records the order of writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Register {
    pub value: i64,
    pub writes: Vec<i64>,
}

impl Register {
    pub fn new(value: i64) -> Self {
        Register { value, writes: Vec::new() }
    }
}

/// Overwrites `Register::value`, remembering the prior value.
#[derive(Debug, Clone)]
pub struct SetValue {
    value: i64,
    prior: Option<i64>,
}

impl SetValue {
    pub fn new(value: i64) -> Self {
        SetValue { value, prior: None }
    }
}

impl Command<Register> for SetValue {
    fn apply(&mut self, ctx: &mut Register) -> Result<(), CommandError> {
        if self.prior.is_some() {
            return Err(IllegalStateError::AlreadyApplied(self.describe()).into());
        }
        self.prior = Some(ctx.value);
        ctx.value = self.value;
        ctx.writes.push(self.value);
        Ok(())
    }

    fn revert(&mut self, ctx: &mut Register) -> Result<(), CommandError> {
        let prior = self
            .prior
            .take()
            .ok_or_else(|| IllegalStateError::RevertBeforeApply(self.describe()))?;
        ctx.value = prior;
        ctx.writes.pop();
        Ok(())
    }

    fn describe(&self) -> String {
        format!("set {}", self.value)
    }
}

/// Bank account with a non-negative balance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub balance: u64,
}

impl Account {
    pub fn with_balance(balance: u64) -> Self {
        Account { balance }
    }
}

#[derive(Debug, Clone)]
pub struct Deposit {
    amount: u64,
    applied: bool,
}

impl Deposit {
    pub fn new(amount: u64) -> Self {
        Deposit { amount, applied: false }
    }
}

impl Command<Account> for Deposit {
    fn apply(&mut self, ctx: &mut Account) -> Result<(), CommandError> {
        if self.applied {
            return Err(IllegalStateError::AlreadyApplied(self.describe()).into());
        }
        ctx.balance = ctx
            .balance
            .checked_add(self.amount)
            .ok_or_else(|| CommandError::failed(self.describe(), "balance overflow"))?;
        self.applied = true;
        Ok(())
    }

    fn revert(&mut self, ctx: &mut Account) -> Result<(), CommandError> {
        if !self.applied {
            return Err(IllegalStateError::RevertBeforeApply(self.describe()).into());
        }
        ctx.balance -= self.amount;
        self.applied = false;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("deposit {}", self.amount)
    }
}

/// Fails with "insufficient funds" when the balance is lower than the amount.
#[derive(Debug, Clone)]
pub struct Withdraw {
    amount: u64,
    applied: bool,
}

impl Withdraw {
    pub fn new(amount: u64) -> Self {
        Withdraw { amount, applied: false }
    }
}

impl Command<Account> for Withdraw {
    fn apply(&mut self, ctx: &mut Account) -> Result<(), CommandError> {
        if self.applied {
            return Err(IllegalStateError::AlreadyApplied(self.describe()).into());
        }
        if ctx.balance < self.amount {
            return Err(CommandError::failed(self.describe(), "insufficient funds"));
        }
        ctx.balance -= self.amount;
        self.applied = true;
        Ok(())
    }

    fn revert(&mut self, ctx: &mut Account) -> Result<(), CommandError> {
        if !self.applied {
            return Err(IllegalStateError::RevertBeforeApply(self.describe()).into());
        }
        ctx.balance += self.amount;
        self.applied = false;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("withdraw {}", self.amount)
    }
}

/// Wraps a command whose revert fails once its allowance of clean reverts is spent.
#[derive(Debug, Clone)]
pub struct FaultyRevert<C> {
    inner: C,
    clean_reverts: usize,
}

impl<C> FaultyRevert<C> {
    /// Every revert fails.
    pub fn new(inner: C) -> Self {
        FaultyRevert { inner, clean_reverts: 0 }
    }

    /// The first `clean_reverts` reverts go through to `inner`; later ones fail.
    pub fn after(inner: C, clean_reverts: usize) -> Self {
        FaultyRevert { inner, clean_reverts }
    }
}

impl<Ctx, C: Command<Ctx>> Command<Ctx> for FaultyRevert<C> {
    fn apply(&mut self, ctx: &mut Ctx) -> Result<(), CommandError> {
        self.inner.apply(ctx)
    }

    fn revert(&mut self, ctx: &mut Ctx) -> Result<(), CommandError> {
        if self.clean_reverts == 0 {
            return Err(CommandError::failed(self.describe(), "revert refused"));
        }
        self.clean_reverts -= 1;
        self.inner.revert(ctx)
    }

    fn describe(&self) -> String {
        format!("faulty {}", self.inner.describe())
    }
}

/// Installs a test-writer `tracing` subscriber once. Later calls are no-ops.
#[cfg(feature = "tracing-subscriber")]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

#[cfg(not(feature = "tracing-subscriber"))]
pub fn init_tracing() {}

/// Boxes a command for a batch handed to `TransactionRunner`.
pub fn boxed<Ctx, C: Command<Ctx> + 'static>(command: C) -> BoxedCommand<Ctx> {
    Box::new(command)
}
