//! Defines the reversible command contract the ledger and runtime are generic over.

use crate::error::CommandError;

/// A single unit of reversible work against a receiver of type `Ctx`.
///
/// Implementors hold whatever they need to undo themselves exactly (prior value,
/// delta, memento). The contract:
///
/// * `revert` after a successful `apply` restores every receiver-observable
///   value to what it was immediately before that `apply`.
/// * `apply` is never called twice without an intervening `revert`.
/// * A failing `apply` leaves the receiver unchanged.
/// * `revert` without a prior successful `apply` is a programming error and
///   should return [`crate::error::IllegalStateError::RevertBeforeApply`].
pub trait Command<Ctx: ?Sized>: Send {
    /// Performs the mutation.
    fn apply(&mut self, ctx: &mut Ctx) -> Result<(), CommandError>;

    /// Undoes exactly the effect of the most recent `apply`.
    fn revert(&mut self, ctx: &mut Ctx) -> Result<(), CommandError>;

    /// Human-readable label for logs and audit records. Has no effect on behaviour.
    fn describe(&self) -> String;
}

/// Owned, dynamically dispatched command, the form stored in history.
pub type BoxedCommand<Ctx> = Box<dyn Command<Ctx>>;

impl<Ctx: ?Sized, C: Command<Ctx> + ?Sized> Command<Ctx> for Box<C> {
    fn apply(&mut self, ctx: &mut Ctx) -> Result<(), CommandError> {
        (**self).apply(ctx)
    }

    fn revert(&mut self, ctx: &mut Ctx) -> Result<(), CommandError> {
        (**self).revert(ctx)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
