use crate::command_traits::{BoxedCommand, Command};
use crate::error::{CommandError, IllegalStateError, RevertContext, TransactionError};
use crate::types::CommandPhase;

/// Ordered group of commands applied and reverted as one atomic unit (a macro).
///
/// Children apply in insertion order and revert in reverse order. A child that
/// fails to apply causes the already-applied prefix to be reverted before the
/// error is returned, so no partial composite state survives.
pub struct CompositeCommand<Ctx> {
    label: String,
    children: Vec<BoxedCommand<Ctx>>,
    phase: CommandPhase,
}

impl<Ctx: 'static> CompositeCommand<Ctx> {
    pub fn new(label: impl Into<String>) -> Self {
        CompositeCommand { label: label.into(), children: Vec::new(), phase: CommandPhase::Pending }
    }

    pub fn from_commands(label: impl Into<String>, children: Vec<BoxedCommand<Ctx>>) -> Self {
        CompositeCommand { label: label.into(), children, phase: CommandPhase::Pending }
    }

    /// Appends a child. Children may only be added before the first apply.
    pub fn push(&mut self, command: impl Command<Ctx> + 'static) -> Result<(), IllegalStateError> {
        if self.phase != CommandPhase::Pending {
            return Err(IllegalStateError::AlreadyApplied(self.label.clone()));
        }
        self.children.push(Box::new(command));
        Ok(())
    }

    /// Builder form of [`push`](Self::push).
    ///
    /// Only meaningful before the first apply: on a composite that has already
    /// been applied the child is dropped and a warning is logged. Use `push` to
    /// get the rejection as an error.
    pub fn with(mut self, command: impl Command<Ctx> + 'static) -> Self {
        if let Err(e) = self.push(command) {
            tracing::warn!(composite = %self.label, error = %e, "child added after apply was dropped");
        }
        self
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn phase(&self) -> CommandPhase {
        self.phase
    }

    /// `describe()` of every child, in application order.
    pub fn descriptions(&self) -> Vec<String> {
        self.children.iter().map(|c| c.describe()).collect()
    }

    /// Applies every child in order, rolling back on the first failure.
    ///
    /// Unlike [`Command::apply`] this reports where the batch stopped and how
    /// much was rolled back, which is what [`crate::kernel::TransactionRunner`]
    /// hands to its callers.
    pub fn try_apply(&mut self, ctx: &mut Ctx) -> Result<(), TransactionError> {
        if self.phase.is_applied() {
            return Err(TransactionError::Aborted {
                index: 0,
                command: self.label.clone(),
                reverted: 0,
                source: IllegalStateError::AlreadyApplied(self.label.clone()).into(),
            });
        }

        for index in 0..self.children.len() {
            let source = match self.children[index].apply(ctx) {
                Ok(()) => continue,
                Err(e) => e,
            };
            let command = self.children[index].describe();
            tracing::warn!(composite = %self.label, step = index, command = %command, error = %source, "composite step failed, rolling back");

            // Revert the applied prefix, newest first.
            let mut rollback = Ok(());
            for applied in self.children[..index].iter_mut().rev() {
                if let Err(revert_err) = applied.revert(ctx) {
                    rollback = Err(revert_err.into_irrecoverable(RevertContext::Rollback));
                    break;
                }
            }

            // A child that failed irrecoverably (a nested composite whose own
            // rollback failed) leaves partial effects behind even if the prefix
            // was reverted cleanly.
            return Err(match (source, rollback) {
                (CommandError::Irrecoverable(irr), _) | (_, Err(irr)) => {
                    tracing::error!(composite = %self.label, error = %irr, "composite rollback failed");
                    TransactionError::RollbackFailed(irr)
                }
                (source, Ok(())) => TransactionError::Aborted { index, command, reverted: index, source },
            });
        }

        self.phase = CommandPhase::Applied;
        Ok(())
    }
}

impl<Ctx: 'static> Command<Ctx> for CompositeCommand<Ctx> {
    fn apply(&mut self, ctx: &mut Ctx) -> Result<(), CommandError> {
        self.try_apply(ctx).map_err(|e| match e {
            TransactionError::Aborted { source, .. } => source,
            TransactionError::RollbackFailed(irr) => CommandError::Irrecoverable(irr),
            // try_apply never reports an empty batch
            TransactionError::Empty => CommandError::failed(self.label.clone(), TransactionError::Empty),
        })
    }

    fn revert(&mut self, ctx: &mut Ctx) -> Result<(), CommandError> {
        if !self.phase.is_applied() {
            return Err(IllegalStateError::RevertBeforeApply(self.label.clone()).into());
        }
        for child in self.children.iter_mut().rev() {
            if let Err(e) = child.revert(ctx) {
                let irr = e.into_irrecoverable(RevertContext::CompositeRevert);
                tracing::error!(composite = %self.label, error = %irr, "composite revert failed");
                return Err(irr.into());
            }
        }
        self.phase = CommandPhase::Reverted;
        Ok(())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

impl<Ctx> std::fmt::Debug for CompositeCommand<Ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeCommand")
            .field("label", &self.label)
            .field("children", &self.children.len())
            .field("phase", &self.phase)
            .finish()
    }
}
