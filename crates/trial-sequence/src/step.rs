//! The [`Step`] enum and the closure types it carries.

use std::fmt;
use std::sync::Arc;

use trial_core::{Failure, World};

use crate::context::TestContext;

/// A test body: invoked once per attempt, when the scenario becomes
/// Running. Shared across retries, hence `Fn` behind an `Arc`.
pub type Body<W> = Arc<dyn Fn(&mut TestContext<'_, W>) -> Result<(), Failure> + Send + Sync>;

/// A deferred unit of work. `Err` fails the scenario.
pub type Action<W> = Box<dyn FnMut(&mut TestContext<'_, W>) -> Result<(), Failure> + Send>;

/// A polled condition. `Ok` means the condition holds; `Err` means "not
/// yet" and carries the reason, reported if the step gives up.
pub type Predicate<W> = Box<dyn FnMut(&mut TestContext<'_, W>) -> Result<(), Failure> + Send>;

/// Callback for simulation events. `Err` fails the scenario.
pub type EventHandler<W> = Box<
    dyn FnMut(&<W as World>::Event, &mut TestContext<'_, W>) -> Result<(), Failure> + Send,
>;

/// One entry of a scenario's step queue.
pub enum Step<W: World> {
    /// Run the action in the tick the step reaches the head of the queue.
    Immediate(Action<W>),
    /// Run the action (if any) once `ticks` ticks have elapsed since the
    /// step reached the head of the queue. With no action this is an idle.
    DelayedBy {
        /// Ticks to wait.
        ticks: u64,
        /// Action to run when the delay has elapsed.
        action: Option<Action<W>>,
    },
    /// After `after` ticks, poll `predicate` every tick until it holds.
    ///
    /// With a `limit`, the predicate is evaluated at most `limit + 1` times
    /// (once per tick); if the last evaluation still fails the scenario
    /// fails with [`FailureKind::ConditionNeverMet`](trial_core::FailureKind).
    /// Without one, only the scenario's `max_ticks` bounds the wait.
    RepeatUntil {
        /// Condition to wait for.
        predicate: Predicate<W>,
        /// Ticks to wait before the first evaluation.
        after: u64,
        /// Step-local bound on the number of ticks spent polling.
        limit: Option<u64>,
    },
    /// Resolve the scenario as succeeded.
    Succeed,
    /// Resolve the scenario as failed with the given reason.
    Fail(String),
}

impl<W: World> Step<W> {
    /// Short name of the step kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Immediate(_) => "immediate",
            Self::DelayedBy { .. } => "delayed",
            Self::RepeatUntil { .. } => "repeat_until",
            Self::Succeed => "succeed",
            Self::Fail(_) => "fail",
        }
    }
}

impl<W: World> fmt::Debug for Step<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(_) => f.write_str("Immediate"),
            Self::DelayedBy { ticks, action } => f
                .debug_struct("DelayedBy")
                .field("ticks", ticks)
                .field("has_action", &action.is_some())
                .finish(),
            Self::RepeatUntil { after, limit, .. } => f
                .debug_struct("RepeatUntil")
                .field("after", after)
                .field("limit", limit)
                .finish(),
            Self::Succeed => f.write_str("Succeed"),
            Self::Fail(reason) => f.debug_tuple("Fail").field(reason).finish(),
        }
    }
}
