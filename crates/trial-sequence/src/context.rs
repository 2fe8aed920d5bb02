//! The handle a test body uses to talk to the engine.
//!
//! A [`TestContext`] borrows the world and the scenario's region for the
//! duration of one callback. Everything a callback schedules (steps,
//! watches, timed actions, subscriptions) is staged on the context and
//! merged into the owning [`Sequencer`](crate::Sequencer) once the callback
//! returns, so callbacks may freely schedule more work.

use std::fmt;

use trial_core::{BlockPos, EntityProbe, Failure, Tick, World};
use trial_space::RegionHandle;

use crate::step::{Action, EventHandler, Predicate, Step};

/// Identifies an event subscription within one scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

// ── Staging ─────────────────────────────────────────────────────

pub(crate) struct Watch<W: World> {
    pub(crate) index: usize,
    pub(crate) predicate: Predicate<W>,
}

pub(crate) struct TimedAction<W: World> {
    /// Scenario-relative tick at which the action fires.
    pub(crate) due: u64,
    pub(crate) action: Action<W>,
}

/// Work scheduled during a single callback.
pub(crate) struct Staged<W: World> {
    pub(crate) steps: Vec<Step<W>>,
    pub(crate) watches: Vec<Predicate<W>>,
    pub(crate) timers: Vec<TimedAction<W>>,
    pub(crate) subscribed: Vec<(SubscriptionId, EventHandler<W>)>,
    pub(crate) unsubscribed: Vec<SubscriptionId>,
    pub(crate) succeed: bool,
    pub(crate) next_subscription: u64,
}

impl<W: World> Staged<W> {
    pub(crate) fn new(next_subscription: u64) -> Self {
        Self {
            steps: Vec::new(),
            watches: Vec::new(),
            timers: Vec::new(),
            subscribed: Vec::new(),
            unsubscribed: Vec::new(),
            succeed: false,
            next_subscription,
        }
    }
}

// ── TestContext ─────────────────────────────────────────────────

/// Per-callback view of a running scenario.
///
/// Positions handed to tests are region-relative; use
/// [`absolute`](Self::absolute) to translate them into world coordinates
/// (rotation included).
pub struct TestContext<'a, W: World> {
    world: &'a mut W,
    region: &'a RegionHandle,
    now: Tick,
    started: Tick,
    staged: &'a mut Staged<W>,
}

impl<'a, W: World> TestContext<'a, W> {
    pub(crate) fn new(
        world: &'a mut W,
        region: &'a RegionHandle,
        now: Tick,
        started: Tick,
        staged: &'a mut Staged<W>,
    ) -> Self {
        Self {
            world,
            region,
            now,
            started,
            staged,
        }
    }

    /// The simulation.
    pub fn world(&self) -> &W {
        self.world
    }

    /// The simulation, mutably.
    pub fn world_mut(&mut self) -> &mut W {
        self.world
    }

    /// The region this scenario owns.
    pub fn region(&self) -> &RegionHandle {
        self.region
    }

    /// World position of a region-relative position.
    pub fn absolute(&self, rel: BlockPos) -> BlockPos {
        self.region.absolute(rel)
    }

    /// Current global tick.
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Ticks elapsed since the scenario started.
    pub fn tick(&self) -> u64 {
        self.now.since(self.started)
    }

    /// Resolve the scenario as succeeded once the current callback returns
    /// `Ok`.
    pub fn succeed(&mut self) {
        self.staged.succeed = true;
    }

    /// Begin a step chain. Steps are appended to the scenario's queue in
    /// the order they are chained.
    pub fn start_sequence(&mut self) -> Sequence<'_, W> {
        Sequence {
            staged: &mut *self.staged,
        }
    }

    /// Append a raw step to the queue.
    pub fn push_step(&mut self, step: Step<W>) {
        self.staged.steps.push(step);
    }

    /// Succeed as soon as `predicate` holds, polling once per tick.
    ///
    /// The last `Err` is kept for diagnostics if the scenario times out.
    pub fn succeed_when<P>(&mut self, predicate: P)
    where
        P: FnMut(&mut TestContext<'_, W>) -> Result<(), Failure> + Send + 'static,
    {
        self.staged.steps.push(Step::RepeatUntil {
            predicate: Box::new(predicate),
            after: 0,
            limit: None,
        });
        self.staged.steps.push(Step::Succeed);
    }

    /// Fail the scenario on the first tick `predicate` holds.
    ///
    /// Watches are evaluated every tick, before the step queue, for as long
    /// as the scenario runs.
    pub fn fail_if<P>(&mut self, predicate: P)
    where
        P: FnMut(&mut TestContext<'_, W>) -> Result<(), Failure> + Send + 'static,
    {
        self.staged.watches.push(Box::new(predicate));
    }

    /// Run `action` when the scenario-relative tick reaches `tick`.
    ///
    /// A tick already in the past fires on the next evaluation.
    pub fn run_at_tick<F>(&mut self, tick: u64, action: F)
    where
        F: FnMut(&mut TestContext<'_, W>) -> Result<(), Failure> + Send + 'static,
    {
        self.staged.timers.push(TimedAction {
            due: tick,
            action: Box::new(action),
        });
    }

    /// Succeed when the scenario-relative tick reaches `tick`.
    pub fn succeed_on_tick(&mut self, tick: u64) {
        self.run_at_tick(tick, |ctx| {
            ctx.succeed();
            Ok(())
        });
    }

    /// Call `handler` for every simulation event until the scenario ends or
    /// the subscription is removed.
    pub fn subscribe<H>(&mut self, handler: H) -> SubscriptionId
    where
        H: FnMut(&W::Event, &mut TestContext<'_, W>) -> Result<(), Failure> + Send + 'static,
    {
        let id = SubscriptionId(self.staged.next_subscription);
        self.staged.next_subscription += 1;
        self.staged.subscribed.push((id, Box::new(handler)));
        id
    }

    /// Remove a subscription. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.staged.unsubscribed.push(id);
    }
}

impl<W: World + EntityProbe> TestContext<'_, W> {
    /// Succeed once an entity of `kind` is (or, with `expected == false`,
    /// is no longer) present at the region-relative position `rel`.
    pub fn succeed_when_entity_present(
        &mut self,
        kind: impl Into<String>,
        rel: BlockPos,
        expected: bool,
    ) {
        let kind = kind.into();
        let pos = self.absolute(rel);
        self.succeed_when(move |ctx| {
            let count = ctx.world().entity_count(&kind, pos);
            match (expected, count) {
                (true, 0) => Err(Failure::new(format!("no {kind} at {pos}"))),
                (false, n) if n > 0 => Err(Failure::new(format!("{n} {kind} still at {pos}"))),
                _ => Ok(()),
            }
        });
    }
}

// ── Sequence builder ────────────────────────────────────────────

/// Chainable step builder returned by [`TestContext::start_sequence`].
///
/// ```ignore
/// ctx.start_sequence()
///     .then_idle(5)
///     .then_execute(|ctx| ctx.world_mut().toggle_lever(lever))
///     .then_wait(|ctx| lamp_is_lit(ctx))
///     .then_succeed();
/// ```
pub struct Sequence<'s, W: World> {
    staged: &'s mut Staged<W>,
}

impl<W: World> Sequence<'_, W> {
    fn push(self, step: Step<W>) -> Self {
        self.staged.steps.push(step);
        self
    }

    /// Run `action` as soon as the previous step completes.
    pub fn then_execute<F>(self, action: F) -> Self
    where
        F: FnMut(&mut TestContext<'_, W>) -> Result<(), Failure> + Send + 'static,
    {
        self.push(Step::Immediate(Box::new(action)))
    }

    /// Run `action` `ticks` ticks after the previous step completes.
    pub fn then_execute_after<F>(self, ticks: u64, action: F) -> Self
    where
        F: FnMut(&mut TestContext<'_, W>) -> Result<(), Failure> + Send + 'static,
    {
        self.push(Step::DelayedBy {
            ticks,
            action: Some(Box::new(action)),
        })
    }

    /// Do nothing for `ticks` ticks.
    pub fn then_idle(self, ticks: u64) -> Self {
        self.push(Step::DelayedBy {
            ticks,
            action: None,
        })
    }

    /// Poll `predicate` every tick until it holds.
    pub fn then_wait<P>(self, predicate: P) -> Self
    where
        P: FnMut(&mut TestContext<'_, W>) -> Result<(), Failure> + Send + 'static,
    {
        self.push(Step::RepeatUntil {
            predicate: Box::new(predicate),
            after: 0,
            limit: None,
        })
    }

    /// Wait `ticks` ticks, then poll `predicate` every tick until it holds.
    pub fn then_wait_after<P>(self, ticks: u64, predicate: P) -> Self
    where
        P: FnMut(&mut TestContext<'_, W>) -> Result<(), Failure> + Send + 'static,
    {
        self.push(Step::RepeatUntil {
            predicate: Box::new(predicate),
            after: ticks,
            limit: None,
        })
    }

    /// Poll `predicate` for at most `limit` ticks; fail with
    /// `ConditionNeverMet` if it never holds.
    ///
    /// The first poll is on the tick the step becomes head. The last is
    /// `limit` ticks later, so the predicate gets `limit + 1` chances and
    /// the step fails on the tick where `limit` ticks have elapsed. The
    /// scenario's `max_ticks` still applies and can end the wait first.
    pub fn then_wait_within<P>(self, limit: u64, predicate: P) -> Self
    where
        P: FnMut(&mut TestContext<'_, W>) -> Result<(), Failure> + Send + 'static,
    {
        self.push(Step::RepeatUntil {
            predicate: Box::new(predicate),
            after: 0,
            limit: Some(limit),
        })
    }

    /// Succeed once every earlier step has completed.
    pub fn then_succeed(self) {
        self.staged.steps.push(Step::Succeed);
    }

    /// Fail with `reason` once every earlier step has completed.
    pub fn then_fail(self, reason: impl Into<String>) {
        self.staged.steps.push(Step::Fail(reason.into()));
    }
}
