//! Per-scenario step queue and its tick-driven execution loop.

use std::collections::VecDeque;
use std::mem;

use indexmap::IndexMap;
use smallvec::SmallVec;

use trial_core::{Failure, FailureKind, Tick, World};
use trial_space::RegionHandle;

use crate::context::{Staged, SubscriptionId, TestContext, TimedAction, Watch};
use crate::step::{Body, EventHandler, Step};

/// What a sequencer evaluation decided about its scenario.
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    /// Nothing terminal happened; evaluate again next tick.
    Pending,
    /// A `Succeed` step, `ctx.succeed()` or a success timer resolved the
    /// scenario.
    Succeeded,
    /// A callback returned `Err`, a watch triggered, a step limit expired
    /// or a `Fail` step was reached.
    Failed(Failure),
}

impl Verdict {
    /// True for [`Succeeded`](Self::Succeeded) and [`Failed`](Self::Failed).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// The borrowed state a callback runs against.
struct Frame<'f, W: World> {
    world: &'f mut W,
    region: &'f RegionHandle,
    now: Tick,
    started: Tick,
}

/// Owns one scenario's steps, watches, timed actions and subscriptions.
///
/// The sequencer is created fresh for each attempt, so nothing scheduled by
/// a failed attempt leaks into its retry.
pub struct Sequencer<W: World> {
    queue: VecDeque<Step<W>>,
    /// Tick at which the current head step became head.
    head_since: Option<Tick>,
    watches: Vec<Watch<W>>,
    watches_armed: usize,
    timers: Vec<TimedAction<W>>,
    subscriptions: IndexMap<SubscriptionId, EventHandler<W>>,
    unsubscribed: SmallVec<[SubscriptionId; 2]>,
    next_subscription: u64,
    last_rejection: Option<Failure>,
    steps_completed: u64,
}

impl<W: World> Default for Sequencer<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: World> Sequencer<W> {
    /// An empty sequencer.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            head_since: None,
            watches: Vec::new(),
            watches_armed: 0,
            timers: Vec::new(),
            subscriptions: IndexMap::new(),
            unsubscribed: SmallVec::new(),
            next_subscription: 0,
            last_rejection: None,
            steps_completed: 0,
        }
    }

    /// Append a step to the tail of the queue.
    pub fn push(&mut self, step: Step<W>) {
        self.queue.push_back(step);
    }

    /// Number of queued steps, including the head.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// True when no step is queued. Watches and timers may still be armed.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Steps completed so far.
    pub fn steps_completed(&self) -> u64 {
        self.steps_completed
    }

    /// Number of active event subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// The most recent "not yet" reason from a polled condition, if the
    /// head step is still waiting.
    pub fn last_rejection(&self) -> Option<&Failure> {
        self.last_rejection.as_ref()
    }

    /// Invoke the test body, then evaluate the scenario for the same tick.
    pub fn activate(
        &mut self,
        body: &Body<W>,
        world: &mut W,
        region: &RegionHandle,
        now: Tick,
        started: Tick,
    ) -> Verdict {
        let mut frame = Frame {
            world,
            region,
            now,
            started,
        };
        let (result, staged) = self.call(&mut frame, |ctx| body(ctx));
        let succeed = self.absorb(staged);
        match result {
            Err(failure) => return Verdict::Failed(failure),
            Ok(()) if succeed => return Verdict::Succeeded,
            Ok(()) => {}
        }
        self.evaluate(&mut frame)
    }

    /// Evaluate one tick: watches, then due timed actions, then the step
    /// queue.
    pub fn on_tick(
        &mut self,
        world: &mut W,
        region: &RegionHandle,
        now: Tick,
        started: Tick,
    ) -> Verdict {
        let mut frame = Frame {
            world,
            region,
            now,
            started,
        };
        self.evaluate(&mut frame)
    }

    /// Deliver one simulation event to every subscription, in subscription
    /// order.
    pub fn on_event(
        &mut self,
        event: &W::Event,
        world: &mut W,
        region: &RegionHandle,
        now: Tick,
        started: Tick,
    ) -> Verdict {
        if self.subscriptions.is_empty() {
            return Verdict::Pending;
        }
        let mut frame = Frame {
            world,
            region,
            now,
            started,
        };
        let mut handlers = mem::take(&mut self.subscriptions);
        let mut verdict = Verdict::Pending;
        for (id, handler) in handlers.iter_mut() {
            if self.unsubscribed.contains(id) {
                continue;
            }
            let (result, staged) = self.call(&mut frame, |ctx| handler(event, ctx));
            let succeed = self.absorb(staged);
            match result {
                Err(failure) => {
                    verdict = Verdict::Failed(failure);
                    break;
                }
                Ok(()) if succeed => {
                    verdict = Verdict::Succeeded;
                    break;
                }
                Ok(()) => {}
            }
        }
        handlers.extend(self.subscriptions.drain(..));
        self.subscriptions = handlers;
        self.settle_subscriptions();
        verdict
    }

    fn evaluate(&mut self, frame: &mut Frame<'_, W>) -> Verdict {
        let verdict = self.check_watches(frame);
        if verdict.is_terminal() {
            return verdict;
        }
        let verdict = self.fire_timers(frame);
        if verdict.is_terminal() {
            return verdict;
        }
        let verdict = self.drive_queue(frame);
        self.settle_subscriptions();
        verdict
    }

    fn check_watches(&mut self, frame: &mut Frame<'_, W>) -> Verdict {
        if self.watches.is_empty() {
            return Verdict::Pending;
        }
        let mut watches = mem::take(&mut self.watches);
        let mut verdict = Verdict::Pending;
        for watch in watches.iter_mut() {
            let (result, staged) = self.call(frame, |ctx| (watch.predicate)(ctx));
            self.absorb(staged);
            if result.is_ok() {
                let at = frame.now.since(frame.started);
                verdict = Verdict::Failed(Failure::with_kind(
                    FailureKind::WatchTriggered,
                    format!("fail_if condition #{} held at tick {at}", watch.index),
                ));
                break;
            }
        }
        watches.append(&mut self.watches);
        self.watches = watches;
        verdict
    }

    fn fire_timers(&mut self, frame: &mut Frame<'_, W>) -> Verdict {
        let elapsed = frame.now.since(frame.started);
        if self.timers.iter().all(|t| t.due > elapsed) {
            return Verdict::Pending;
        }
        let timers = mem::take(&mut self.timers);
        let mut kept = Vec::with_capacity(timers.len());
        let mut verdict = Verdict::Pending;
        for mut timer in timers {
            if verdict.is_terminal() || timer.due > elapsed {
                kept.push(timer);
                continue;
            }
            let (result, staged) = self.call(frame, |ctx| (timer.action)(ctx));
            let succeed = self.absorb(staged);
            verdict = match result {
                Err(failure) => Verdict::Failed(failure),
                Ok(()) if succeed => Verdict::Succeeded,
                Ok(()) => Verdict::Pending,
            };
        }
        kept.append(&mut self.timers);
        self.timers = kept;
        verdict
    }

    /// Run queued steps until one has to wait or the scenario resolves.
    fn drive_queue(&mut self, frame: &mut Frame<'_, W>) -> Verdict {
        while let Some(mut step) = self.queue.pop_front() {
            let since = *self.head_since.get_or_insert(frame.now);
            let elapsed = frame.now.since(since);
            let (outcome, completed) = match &mut step {
                Step::Immediate(action) => {
                    let (result, staged) = self.call(frame, |ctx| action(ctx));
                    (self.resolve(result, staged), true)
                }
                Step::DelayedBy { ticks, action } => {
                    if elapsed < *ticks {
                        (Verdict::Pending, false)
                    } else if let Some(action) = action {
                        let (result, staged) = self.call(frame, |ctx| action(ctx));
                        (self.resolve(result, staged), true)
                    } else {
                        (Verdict::Pending, true)
                    }
                }
                Step::RepeatUntil {
                    predicate,
                    after,
                    limit,
                } => {
                    if elapsed < *after {
                        (Verdict::Pending, false)
                    } else {
                        let (result, staged) = self.call(frame, |ctx| predicate(ctx));
                        let succeed = self.absorb(staged);
                        match result {
                            Ok(()) => {
                                self.last_rejection = None;
                                let outcome = if succeed {
                                    Verdict::Succeeded
                                } else {
                                    Verdict::Pending
                                };
                                (outcome, true)
                            }
                            Err(reason) => {
                                let polled = elapsed - *after;
                                match *limit {
                                    Some(limit) if polled >= limit => (
                                        Verdict::Failed(Failure::condition_never_met(
                                            limit,
                                            Some(&reason),
                                        )),
                                        true,
                                    ),
                                    _ => {
                                        self.last_rejection = Some(reason);
                                        (Verdict::Pending, false)
                                    }
                                }
                            }
                        }
                    }
                }
                Step::Succeed => (Verdict::Succeeded, true),
                Step::Fail(reason) => (Verdict::Failed(Failure::new(reason.clone())), true),
            };

            if !completed {
                self.queue.push_front(step);
                return outcome;
            }
            self.steps_completed += 1;
            self.head_since = None;
            if outcome.is_terminal() {
                self.queue.clear();
                return outcome;
            }
        }
        Verdict::Pending
    }

    fn resolve(&mut self, result: Result<(), Failure>, staged: Staged<W>) -> Verdict {
        let succeed = self.absorb(staged);
        match result {
            Err(failure) => Verdict::Failed(failure),
            Ok(()) if succeed => Verdict::Succeeded,
            Ok(()) => Verdict::Pending,
        }
    }

    /// Build a context over `frame`, run `f`, and hand back what it staged.
    fn call<R>(
        &self,
        frame: &mut Frame<'_, W>,
        f: impl FnOnce(&mut TestContext<'_, W>) -> R,
    ) -> (R, Staged<W>) {
        let mut staged = Staged::new(self.next_subscription);
        let result = {
            let mut ctx = TestContext::new(
                &mut *frame.world,
                frame.region,
                frame.now,
                frame.started,
                &mut staged,
            );
            f(&mut ctx)
        };
        (result, staged)
    }

    /// Merge staged work into the sequencer. Returns the staged succeed
    /// flag.
    fn absorb(&mut self, staged: Staged<W>) -> bool {
        let Staged {
            steps,
            watches,
            timers,
            subscribed,
            unsubscribed,
            succeed,
            next_subscription,
        } = staged;
        self.queue.extend(steps);
        for predicate in watches {
            self.watches.push(Watch {
                index: self.watches_armed,
                predicate,
            });
            self.watches_armed += 1;
        }
        self.timers.extend(timers);
        self.subscriptions.extend(subscribed);
        self.unsubscribed.extend(unsubscribed);
        self.next_subscription = next_subscription;
        succeed
    }

    fn settle_subscriptions(&mut self) {
        if self.unsubscribed.is_empty() {
            return;
        }
        let gone = mem::take(&mut self.unsubscribed);
        self.subscriptions.retain(|id, _| !gone.contains(id));
    }
}
