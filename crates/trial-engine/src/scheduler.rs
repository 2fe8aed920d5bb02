//! The tick loop.
//!
//! [`Scheduler`] owns the world, the clock, the allocator, the batch
//! coordinator, every live [`Scenario`] and the [`Reporter`]. It is a plain
//! callable struct: nothing runs unless [`tick`](Scheduler::tick) (or one of
//! the run helpers) is called.
//!
//! # Admission
//!
//! Work arrives as *tickets* (a definition plus an attempt number). A
//! ticket whose batch key is busy waits in the [`BatchCoordinator`]; a
//! ticket that cannot get space waits in a strict FIFO space queue, retried
//! whenever a region is released. A ticket that could never fit, even in an
//! empty world, is rejected outright with [`AdmitError::RegionTooLarge`].

use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use trial_core::{Failure, Outcome, ScenarioId, TestId, Tick, World};
use trial_report::{Disposition, Reporter, RunReport};
use trial_space::{AllocError, RegionAllocator};

use crate::batch::BatchCoordinator;
use crate::cancel::{CancelHandle, CancelRequest};
use crate::clock::Clock;
use crate::config::{ConfigError, EngineConfig};
use crate::metrics::TickMetrics;
use crate::registry::{Selection, TestDefinition};
use crate::scenario::{Scenario, ScenarioState};

// ── Admission types ───────────────────────────────────────────────

/// Where an admitted definition ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// A scenario was created and owns a region.
    Started(ScenarioId),
    /// Another test with the same batch key is live.
    QueuedForBatch,
    /// No space right now; admitted in FIFO order as regions free up.
    QueuedForSpace,
}

/// Errors from [`Scheduler::admit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdmitError {
    /// The padded test area can never fit the world.
    RegionTooLarge {
        /// The test's qualified name.
        name: String,
        /// The allocator's rejection.
        source: AllocError,
    },
}

impl fmt::Display for AdmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegionTooLarge { name, source } => {
                write!(f, "test {name} can never be placed: {source}")
            }
        }
    }
}

impl Error for AdmitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::RegionTooLarge { source, .. } => Some(source),
        }
    }
}

/// A definition waiting to become a scenario.
struct Ticket<W: World> {
    definition: Arc<TestDefinition<W>>,
    attempt: u32,
}

impl<W: World> Ticket<W> {
    fn id(&self) -> TestId {
        self.definition.id()
    }
}

/// Why `Scheduler::try_start` did not produce a scenario.
enum Stall<W: World> {
    /// No space right now; the ticket is handed back.
    NoSpace(Ticket<W>),
    /// The ticket can never be placed. Its final outcome is recorded.
    Rejected(AdmitError),
}

// ── Scheduler ─────────────────────────────────────────────────────

/// Drives scenarios against a world, one tick at a time.
pub struct Scheduler<W: World> {
    config: EngineConfig,
    clock: Clock,
    world: W,
    allocator: RegionAllocator,
    batches: BatchCoordinator<Ticket<W>>,
    space_queue: VecDeque<Ticket<W>>,
    live: IndexMap<ScenarioId, Scenario<W>>,
    next_scenario: u64,
    reporter: Reporter,
    cancel_tx: Sender<CancelRequest>,
    cancel_rx: Receiver<CancelRequest>,
    metrics: TickMetrics,
    /// Set between the clock advance and the drive phase of a tick.
    /// Scenarios admitted meanwhile are first driven in the drive phase.
    before_drive: bool,
}

impl<W: World> Scheduler<W> {
    /// A scheduler over `world`.
    ///
    /// # Errors
    ///
    /// Returns the first invariant `config` violates.
    pub fn new(config: EngineConfig, world: W) -> Result<Self, ConfigError> {
        config.validate()?;
        let allocator = RegionAllocator::new(config.world_bounds(), config.max_search_candidates);
        let (cancel_tx, cancel_rx) = unbounded();
        Ok(Self {
            config,
            clock: Clock::new(),
            world,
            allocator,
            batches: BatchCoordinator::new(),
            space_queue: VecDeque::new(),
            live: IndexMap::new(),
            next_scenario: 0,
            reporter: Reporter::new(),
            cancel_tx,
            cancel_rx,
            metrics: TickMetrics::default(),
            before_drive: false,
        })
    }

    // ── Accessors ─────────────────────────────────────────────────

    /// The configuration the scheduler was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The current tick.
    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    /// The simulation.
    pub fn world(&self) -> &W {
        &self.world
    }

    /// The simulation, mutably (for building structures before a run).
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    /// Consume the scheduler, returning the world.
    pub fn into_world(self) -> W {
        self.world
    }

    /// The region allocator.
    pub fn allocator(&self) -> &RegionAllocator {
        &self.allocator
    }

    /// The outcome reporter.
    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Live scenarios in admission order.
    pub fn live(&self) -> impl Iterator<Item = &Scenario<W>> {
        self.live.values()
    }

    /// A live scenario.
    pub fn scenario(&self, id: ScenarioId) -> Option<&Scenario<W>> {
        self.live.get(&id)
    }

    /// Number of live scenarios.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Definitions waiting for a batch slot or for space.
    pub fn queued_count(&self) -> usize {
        self.batches.queued() + self.space_queue.len()
    }

    /// True when nothing is live or queued.
    pub fn is_idle(&self) -> bool {
        self.live.is_empty() && self.queued_count() == 0
    }

    /// Metrics of the most recent tick.
    pub fn last_metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    /// A handle for cancelling tests from any thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::new(self.cancel_tx.clone())
    }

    /// The run report so far.
    pub fn report(&self) -> RunReport {
        self.reporter.report(self.clock.now())
    }

    // ── Admission ─────────────────────────────────────────────────

    /// Admit the first attempt of `definition` at the current tick.
    ///
    /// With no setup grace the body runs immediately.
    ///
    /// # Errors
    ///
    /// [`AdmitError::RegionTooLarge`] if the test can never be placed.
    pub fn admit(&mut self, definition: Arc<TestDefinition<W>>) -> Result<Admission, AdmitError> {
        let admission = self.enqueue(Ticket {
            definition,
            attempt: 1,
        })?;
        self.settle();
        Ok(admission)
    }

    /// Record `selection.skipped` as skipped and admit `selection.run`.
    ///
    /// Definitions that can never be placed are recorded as failed and
    /// their errors returned; the rest of the selection is still admitted.
    pub fn schedule(&mut self, selection: Selection<W>) -> Vec<AdmitError> {
        for meta in &selection.skipped {
            debug!(test = %meta.qualified_name(), "skipped");
            self.reporter.skip(meta);
        }
        let mut rejected = Vec::new();
        for definition in selection.run {
            let meta = definition.meta.clone();
            if let Err(e) = self.admit(definition) {
                warn!(test = %meta.qualified_name(), error = %e, "test rejected");
                self.reporter
                    .record_final(&meta, &Outcome::Failed(Failure::new(e.to_string())), 1);
                rejected.push(e);
            }
        }
        rejected
    }

    /// Reject tickets that could never be placed, even in an empty world.
    fn check(&self, ticket: &Ticket<W>) -> Result<(), AdmitError> {
        let def = &ticket.definition;
        self.allocator
            .check(def.extent, def.padding, def.rotation_for(ticket.attempt))
            .map(|_| ())
            .map_err(|source| AdmitError::RegionTooLarge {
                name: def.meta.qualified_name(),
                source,
            })
    }

    fn enqueue(&mut self, ticket: Ticket<W>) -> Result<Admission, AdmitError> {
        self.check(&ticket)?;
        let def = &ticket.definition;
        if let Some(key) = def.batch() {
            if !self.batches.try_claim(key) {
                debug!(
                    test = %def.meta.qualified_name(),
                    batch = key,
                    attempt = ticket.attempt,
                    "queued for batch"
                );
                let key = key.to_string();
                self.batches.enqueue(&key, ticket);
                return Ok(Admission::QueuedForBatch);
            }
        }
        self.place(ticket)
    }

    /// Start `ticket` if space allows and nobody is waiting ahead of it;
    /// otherwise queue it for space. The ticket's batch slot, if any, is
    /// already held.
    fn place(&mut self, ticket: Ticket<W>) -> Result<Admission, AdmitError> {
        if !self.space_queue.is_empty() {
            self.space_queue.push_back(ticket);
            self.metrics.total_space_stalls += 1;
            return Ok(Admission::QueuedForSpace);
        }
        match self.try_start(ticket) {
            Ok(id) => Ok(Admission::Started(id)),
            Err(Stall::Rejected(e)) => Err(e),
            Err(Stall::NoSpace(ticket)) => {
                debug!(
                    test = %ticket.definition.meta.qualified_name(),
                    live = self.live.len(),
                    "queued for space"
                );
                self.space_queue.push_back(ticket);
                self.metrics.total_space_stalls += 1;
                Ok(Admission::QueuedForSpace)
            }
        }
    }

    /// Reserve a region and create the scenario. Hands the ticket back if
    /// there is no space.
    ///
    /// Outside a tick, and after the drive phase of one, the new scenario is
    /// driven for the current tick at once. Before the drive phase it is
    /// left for the drive phase, so it never runs ahead of `World::step`.
    fn try_start(&mut self, ticket: Ticket<W>) -> Result<ScenarioId, Stall<W>> {
        let def = &ticket.definition;
        let rotation = def.rotation_for(ticket.attempt);
        let region = match self.allocator.reserve(def.extent, def.padding, rotation) {
            Ok(region) => region,
            Err(e) if e.is_transient() => return Err(Stall::NoSpace(ticket)),
            Err(source) => {
                // Not expected after `check()`.
                let error = AdmitError::RegionTooLarge {
                    name: def.meta.qualified_name(),
                    source,
                };
                warn!(error = %error, "reservation rejected");
                self.abandon(ticket, Outcome::Failed(Failure::new(error.to_string())));
                return Err(Stall::Rejected(error));
            }
        };

        let now = self.clock.now();
        let id = self.open_scenario_id();
        debug!(
            scenario = %id,
            test = %def.meta.qualified_name(),
            attempt = ticket.attempt,
            region = %region.footprint(),
            rotation = %rotation,
            tick = now.0,
            "scenario admitted"
        );
        let mut scenario = Scenario::new(id, ticket.definition, region, now, ticket.attempt);
        if !self.before_drive {
            scenario.on_tick(&mut self.world, now);
        }
        self.live.insert(id, scenario);
        self.metrics.total_admissions += 1;
        Ok(id)
    }

    fn open_scenario_id(&mut self) -> ScenarioId {
        let id = ScenarioId(self.next_scenario);
        self.next_scenario += 1;
        id
    }

    /// Admit space-queued tickets in order until one does not fit.
    fn pump_space_queue(&mut self) {
        while let Some(ticket) = self.space_queue.pop_front() {
            match self.try_start(ticket) {
                Ok(_) | Err(Stall::Rejected(_)) => {}
                Err(Stall::NoSpace(ticket)) => {
                    self.space_queue.push_front(ticket);
                    break;
                }
            }
        }
    }

    // ── Tick ──────────────────────────────────────────────────────

    /// Run one frame and return its metrics.
    pub fn tick(&mut self) -> TickMetrics {
        let frame_start = Instant::now();
        let now = self.clock.advance();
        let mut finished = 0;
        self.before_drive = true;

        // 1. Cancellations issued since the last frame.
        let requests: Vec<CancelRequest> = self.cancel_rx.try_iter().collect();
        for request in requests {
            finished += match request {
                CancelRequest::Test { id, reason } => self.cancel(id, &reason),
                CancelRequest::All { reason } => self.cancel_all(&reason),
            };
        }

        // 2. Step the world.
        let step_start = Instant::now();
        self.world.step(now);
        let world_step_us = step_start.elapsed().as_micros() as u64;

        // 3. Events to subscriptions.
        let events = self.world.drain_events();
        for event in &events {
            for scenario in self.live.values_mut() {
                scenario.on_event(event, &mut self.world, now);
            }
        }

        // 4. Activate, drive and time out, in admission order.
        self.before_drive = false;
        for scenario in self.live.values_mut() {
            let was_terminal = scenario.is_terminal();
            if scenario.on_tick(&mut self.world, now)
                && !was_terminal
                && scenario.state() == ScenarioState::TimedOut
            {
                warn!(
                    scenario = %scenario.id(),
                    test = %scenario.definition().meta.qualified_name(),
                    max_ticks = scenario.definition().max_ticks,
                    last_rejection = ?scenario.last_rejection().map(|f| f.message.as_str()),
                    "scenario timed out"
                );
                self.metrics.total_timeouts += 1;
            }
        }

        // 5. Finalize and admit.
        finished += self.settle();

        self.metrics.tick = now.0;
        self.metrics.world_step_us = world_step_us;
        self.metrics.events_dispatched = events.len() as u32;
        self.metrics.finished = finished;
        self.refresh_gauges();
        self.metrics.total_us = frame_start.elapsed().as_micros() as u64;
        self.metrics.clone()
    }

    /// Tick exactly `ticks` times.
    pub fn run_for(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Tick until nothing is live or queued, or until `budget` ticks have
    /// run. Work still outstanding when the budget runs out is cancelled.
    /// Returns the run report.
    pub fn run_until_idle(&mut self, budget: u64) -> RunReport {
        let mut ran = 0;
        while !self.is_idle() && ran < budget {
            self.tick();
            ran += 1;
        }
        if !self.is_idle() {
            warn!(
                budget,
                live = self.live.len(),
                queued = self.queued_count(),
                "tick budget exhausted; cancelling outstanding work"
            );
            self.cancel_all("tick budget exhausted");
        }
        self.report()
    }

    // ── Cancellation ──────────────────────────────────────────────

    /// Cancel every live or queued attempt of `test`, at once.
    ///
    /// Returns the number of attempts cancelled; cancelling an unknown or
    /// finished test is a no-op.
    pub fn cancel(&mut self, test: TestId, reason: &str) -> u32 {
        self.cancel_where(reason, |id| id == test)
    }

    /// Cancel everything live or queued, at once.
    pub fn cancel_all(&mut self, reason: &str) -> u32 {
        self.cancel_where(reason, |_| true)
    }

    fn cancel_where(&mut self, reason: &str, matches: impl Fn(TestId) -> bool) -> u32 {
        let mut cancelled = 0;
        for scenario in self.live.values_mut() {
            if matches(scenario.definition().id())
                && scenario.resolve(Outcome::Failed(Failure::cancelled(reason)))
            {
                warn!(
                    scenario = %scenario.id(),
                    test = %scenario.definition().meta.qualified_name(),
                    reason,
                    "scenario cancelled"
                );
                cancelled += 1;
            }
        }

        // Batch-queued tickets first, so freed slots are never handed to a
        // ticket that is itself being cancelled.
        let waiting = self.batches.drain_matching(|t| matches(t.id()));
        let (keep, holding): (VecDeque<_>, VecDeque<_>) = self
            .space_queue
            .drain(..)
            .partition(|t: &Ticket<W>| !matches(t.id()));
        self.space_queue = keep;
        for ticket in waiting {
            warn!(test = %ticket.definition.meta.qualified_name(), reason, "queued test cancelled");
            self.finish_ticket(ticket, Outcome::Failed(Failure::cancelled(reason)));
            cancelled += 1;
        }
        for ticket in holding {
            warn!(test = %ticket.definition.meta.qualified_name(), reason, "queued test cancelled");
            self.abandon(ticket, Outcome::Failed(Failure::cancelled(reason)));
            cancelled += 1;
        }

        self.metrics.total_cancellations += u64::from(cancelled);
        self.settle();
        cancelled
    }

    // ── Finalization ──────────────────────────────────────────────

    /// Finalize every terminal scenario, admitting follow-up work, until
    /// none is left. Returns the number finalized.
    fn settle(&mut self) -> u32 {
        let mut finalized = 0;
        loop {
            let terminal: Vec<ScenarioId> = self
                .live
                .values()
                .filter(|s| s.is_terminal())
                .map(Scenario::id)
                .collect();
            if terminal.is_empty() {
                break;
            }
            for id in terminal {
                self.finalize(id);
                finalized += 1;
            }
        }
        finalized
    }

    fn finalize(&mut self, id: ScenarioId) {
        let Some(scenario) = self.live.shift_remove(&id) else {
            return;
        };
        let definition = Arc::clone(scenario.definition());
        let attempt = scenario.attempt();
        let (region, outcome) = scenario.into_parts();

        // Region back to the pool, wiped for the next tenant.
        match self.allocator.release(region.id()) {
            Ok(released) => self.world.clear_region(&released.footprint()),
            Err(e) => warn!(scenario = %id, error = %e, "region release rejected"),
        }
        let outcome = outcome.unwrap_or_else(|| {
            Outcome::Failed(Failure::new("scenario finalized without an outcome"))
        });
        info!(
            scenario = %id,
            test = %definition.meta.qualified_name(),
            attempt,
            outcome = %outcome,
            tick = self.clock.now().0,
            "scenario finished"
        );

        let retry = match self.reporter.record(&definition.meta, &outcome, attempt) {
            Disposition::Retry { next_attempt } => {
                let ticket = Ticket {
                    definition: Arc::clone(&definition),
                    attempt: next_attempt,
                };
                match self.check(&ticket) {
                    Ok(()) => {
                        self.metrics.total_retries += 1;
                        Some(ticket)
                    }
                    Err(e) => {
                        warn!(
                            test = %definition.meta.qualified_name(),
                            error = %e,
                            "retry rejected"
                        );
                        self.reporter.record_final(&definition.meta, &outcome, attempt);
                        None
                    }
                }
            }
            Disposition::Final => None,
        };

        match (definition.batch(), retry) {
            (Some(key), Some(retry)) => {
                // The retry runs before anything else waiting on the key.
                let key = key.to_string();
                self.batches.enqueue_front(&key, retry);
                self.release_batch(&key);
            }
            (Some(key), None) => {
                let key = key.to_string();
                self.release_batch(&key);
            }
            (None, Some(retry)) => {
                // A rejection is recorded by `try_start`.
                let _ = self.place(retry);
            }
            (None, None) => {}
        }

        self.pump_space_queue();
    }

    /// Free the slot of `key` and place the next member waiting on it.
    fn release_batch(&mut self, key: &str) {
        if let Some(next) = self.batches.release(key) {
            debug!(
                test = %next.definition.meta.qualified_name(),
                batch = key,
                "batch slot handed on"
            );
            // A rejection is recorded by `try_start`.
            let _ = self.place(next);
        }
    }

    /// Record a final outcome for a ticket that never became a scenario.
    fn finish_ticket(&mut self, ticket: Ticket<W>, outcome: Outcome) {
        self.reporter
            .record_final(&ticket.definition.meta, &outcome, ticket.attempt);
    }

    /// Like [`finish_ticket`](Self::finish_ticket), for a ticket that holds
    /// its batch slot: the slot is handed on.
    fn abandon(&mut self, ticket: Ticket<W>, outcome: Outcome) {
        let key = ticket.definition.batch().map(str::to_string);
        self.finish_ticket(ticket, outcome);
        if let Some(key) = key {
            self.release_batch(&key);
        }
    }

    fn refresh_gauges(&mut self) {
        let m = &mut self.metrics;
        m.live = self.live.len() as u32;
        m.pending = self
            .live
            .values()
            .filter(|s| s.state() == ScenarioState::Pending)
            .count() as u32;
        m.running = self
            .live
            .values()
            .filter(|s| s.state() == ScenarioState::Running)
            .count() as u32;
        m.queued_for_batch = self.batches.queued() as u32;
        m.queued_for_space = self.space_queue.len() as u32;
    }
}

impl<W: World> fmt::Debug for Scheduler<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.clock.now())
            .field("live", &self.live.len())
            .field("queued", &self.queued_count())
            .field("allocator", &self.allocator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use trial_core::Extent;
    use trial_report::Status;
    use trial_test_utils::{fixtures, MockEvent, MockWorld};

    fn small_config(width: u32, depth: u32) -> EngineConfig {
        let mut cfg = EngineConfig {
            width,
            depth,
            height: 16,
            ..EngineConfig::default()
        };
        cfg.defaults.extent = Extent::cube(3);
        cfg
    }

    #[test]
    fn immediate_success_is_finalized_at_admission() {
        let mut reg = Registry::default();
        let id = reg
            .register_body("unit", "instant", fixtures::succeed_immediately())
            .submit()
            .unwrap();
        let mut sched = Scheduler::new(EngineConfig::default(), MockWorld::new()).unwrap();
        let def = Arc::clone(reg.get(id).unwrap());
        assert!(matches!(sched.admit(def), Ok(Admission::Started(_))));
        assert!(sched.is_idle());
        assert_eq!(sched.reporter().status(id), Some(Status::Succeeded));
        assert_eq!(sched.world().cleared().len(), 1);
        assert_eq!(sched.allocator().live_count(), 0);
    }

    #[test]
    fn too_large_is_rejected_up_front() {
        let mut reg = Registry::default();
        let id = reg
            .register_body("unit", "huge", fixtures::never_finishes())
            .size(Extent::new(100, 1, 1))
            .submit()
            .unwrap();
        let mut sched = Scheduler::new(small_config(16, 16), MockWorld::new()).unwrap();
        match sched.admit(Arc::clone(reg.get(id).unwrap())) {
            Err(AdmitError::RegionTooLarge { source, .. }) => {
                assert!(matches!(source, AllocError::TooLarge { .. }));
            }
            other => panic!("expected RegionTooLarge, got {other:?}"),
        }
        assert!(sched.is_idle());
    }

    #[test]
    fn overflowing_padding_is_rejected_and_recorded() {
        let mut reg = Registry::default();
        let huge = reg
            .register_body("unit", "padded", fixtures::succeed_immediately())
            .padding(u32::MAX / 2 + 1)
            .batch("night")
            .submit()
            .unwrap();
        let next = reg
            .register_body("unit", "next", fixtures::succeed_immediately())
            .batch("night")
            .submit()
            .unwrap();
        let mut sched = Scheduler::new(small_config(16, 16), MockWorld::new()).unwrap();
        let rejected = sched.schedule(crate::registry::RunPlan::all().select(&reg));
        assert_eq!(rejected.len(), 1);
        match &rejected[0] {
            AdmitError::RegionTooLarge { source, .. } => {
                assert!(matches!(source, AllocError::TooLarge { .. }));
            }
        }
        assert_eq!(sched.reporter().status(huge), Some(Status::Failed));
        // The rejected test never held the batch slot.
        assert_eq!(sched.reporter().status(next), Some(Status::Succeeded));
        assert!(sched.is_idle());
        assert_eq!(sched.allocator().live_count(), 0);
    }

    #[test]
    fn space_queue_is_strict_fifo() {
        // Room for exactly one 3x3 (padded 5x5) test.
        let mut reg = Registry::default();
        let ids: Vec<_> = (0..3)
            .map(|i| {
                reg.register_body("unit", format!("t{i}"), fixtures::succeed_after(2))
                    .submit()
                    .unwrap()
            })
            .collect();
        let mut sched = Scheduler::new(small_config(5, 5), MockWorld::new()).unwrap();
        let mut admissions = Vec::new();
        for id in &ids {
            admissions.push(sched.admit(Arc::clone(reg.get(*id).unwrap())).unwrap());
        }
        assert!(matches!(admissions[0], Admission::Started(_)));
        assert_eq!(admissions[1], Admission::QueuedForSpace);
        assert_eq!(admissions[2], Admission::QueuedForSpace);

        let report = sched.run_until_idle(100);
        assert!(report.passed);
        let order: Vec<_> = report.tests.iter().map(|r| r.id).collect();
        assert_eq!(order, ids);
        assert_eq!(sched.last_metrics().total_space_stalls, 2);
    }

    #[test]
    fn events_reach_running_subscribers() {
        let mut reg: Registry<MockWorld> = Registry::default();
        let id = reg
            .register("unit", "listens", |ctx| {
                ctx.subscribe(|event, ctx| {
                    if matches!(event, MockEvent::Signal(s) if s == "go") {
                        ctx.succeed();
                    }
                    Ok(())
                });
                Ok(())
            })
            .submit()
            .unwrap();
        let mut sched = Scheduler::new(EngineConfig::default(), MockWorld::new()).unwrap();
        sched.admit(Arc::clone(reg.get(id).unwrap())).unwrap();
        sched.tick();
        assert_eq!(sched.live_count(), 1);
        sched.world_mut().emit(MockEvent::Signal("go".into()));
        let metrics = sched.tick();
        assert_eq!(metrics.events_dispatched, 1);
        assert_eq!(metrics.finished, 1);
        assert_eq!(sched.reporter().status(id), Some(Status::Succeeded));
    }

    #[test]
    fn world_is_stepped_once_per_tick() {
        let mut sched = Scheduler::new(EngineConfig::default(), MockWorld::new()).unwrap();
        sched.run_for(7);
        assert_eq!(sched.world().steps(), 7);
        assert_eq!(sched.world().last_tick(), Some(Tick(7)));
        assert_eq!(sched.now(), Tick(7));
    }

    #[test]
    fn budget_exhaustion_cancels_outstanding_work() {
        let mut reg = Registry::default();
        let id = reg
            .register_body("unit", "slow", fixtures::never_finishes())
            .max_ticks(1_000)
            .submit()
            .unwrap();
        let mut sched = Scheduler::new(EngineConfig::default(), MockWorld::new()).unwrap();
        sched.admit(Arc::clone(reg.get(id).unwrap())).unwrap();
        let report = sched.run_until_idle(10);
        assert_eq!(report.ticks, 10);
        assert!(!report.passed);
        let rec = &report.tests[0];
        assert_eq!(rec.status, Status::Failed);
        assert_eq!(rec.failure_kind, Some(trial_core::FailureKind::Cancelled));
        assert!(sched.is_idle());
    }
}
