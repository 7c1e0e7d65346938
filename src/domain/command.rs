use crate::command_traits::Command;
use crate::error::{CommandError, IllegalStateError};
use crate::types::CommandPhase;

type Forward<Ctx, M> = Box<dyn FnMut(&mut Ctx) -> Result<M, CommandError> + Send>;
type Backward<Ctx, M> = Box<dyn FnMut(&mut Ctx, &M) -> Result<(), CommandError> + Send>;

/// Memento-style command assembled from two closures.
///
/// `forward` mutates the receiver and returns a memento capturing whatever it
/// needs to be undone; `backward` restores the receiver from that memento. The
/// memento is dropped only after a successful revert, so a failed revert can be
/// retried by the host.
pub struct SimpleCommand<Ctx, M> {
    label: String,
    forward: Forward<Ctx, M>,
    backward: Backward<Ctx, M>,
    memento: Option<M>,
    phase: CommandPhase,
}

impl<Ctx, M: Send> SimpleCommand<Ctx, M> {
    pub fn new<F, B>(label: impl Into<String>, forward: F, backward: B) -> Self
    where
        F: FnMut(&mut Ctx) -> Result<M, CommandError> + Send + 'static,
        B: FnMut(&mut Ctx, &M) -> Result<(), CommandError> + Send + 'static,
    {
        SimpleCommand {
            label: label.into(),
            forward: Box::new(forward),
            backward: Box::new(backward),
            memento: None,
            phase: CommandPhase::Pending,
        }
    }

    pub fn phase(&self) -> CommandPhase {
        self.phase
    }

    /// Memento captured by the last successful `apply`, if still held.
    pub fn memento(&self) -> Option<&M> {
        self.memento.as_ref()
    }
}

impl<Ctx, M: Send> Command<Ctx> for SimpleCommand<Ctx, M> {
    fn apply(&mut self, ctx: &mut Ctx) -> Result<(), CommandError> {
        if self.phase.is_applied() {
            return Err(IllegalStateError::AlreadyApplied(self.label.clone()).into());
        }
        let memento = (self.forward)(ctx)?;
        self.memento = Some(memento);
        self.phase = CommandPhase::Applied;
        Ok(())
    }

    fn revert(&mut self, ctx: &mut Ctx) -> Result<(), CommandError> {
        let memento = match (&self.memento, self.phase) {
            (Some(m), CommandPhase::Applied) => m,
            _ => return Err(IllegalStateError::RevertBeforeApply(self.label.clone()).into()),
        };
        (self.backward)(ctx, memento)?;
        self.memento = None;
        self.phase = CommandPhase::Reverted;
        Ok(())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

impl<Ctx, M> std::fmt::Debug for SimpleCommand<Ctx, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleCommand")
            .field("label", &self.label)
            .field("phase", &self.phase)
            .field("has_memento", &self.memento.is_some())
            .finish()
    }
}
