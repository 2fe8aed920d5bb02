//! One attempt at running a definition.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use trial_core::{Failure, Outcome, ScenarioId, Tick, World};
use trial_sequence::{Sequencer, Verdict};
use trial_space::RegionHandle;

use crate::registry::TestDefinition;

/// Lifecycle state of a [`Scenario`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScenarioState {
    /// Admitted; waiting out the setup grace. Nothing is evaluated.
    Pending,
    /// The body has run; the sequencer is driven every tick.
    Running,
    /// Resolved as succeeded.
    Succeeded,
    /// Resolved as failed (assertion, watch, limit or cancellation).
    Failed,
    /// Reached `max_ticks` without resolving.
    TimedOut,
}

impl ScenarioState {
    /// Whether the scenario has resolved.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::TimedOut)
    }
}

/// Mutable run state of one attempt.
///
/// The region is owned for the scenario's whole life and handed back to the
/// scheduler when the scenario is finalized.
pub struct Scenario<W: World> {
    id: ScenarioId,
    definition: Arc<TestDefinition<W>>,
    region: RegionHandle,
    started: Tick,
    attempt: u32,
    state: ScenarioState,
    sequencer: Sequencer<W>,
    outcome: Option<Outcome>,
}

impl<W: World> Scenario<W> {
    /// A pending scenario admitted at `started`.
    pub fn new(
        id: ScenarioId,
        definition: Arc<TestDefinition<W>>,
        region: RegionHandle,
        started: Tick,
        attempt: u32,
    ) -> Self {
        Self {
            id,
            definition,
            region,
            started,
            attempt,
            state: ScenarioState::Pending,
            sequencer: Sequencer::new(),
            outcome: None,
        }
    }

    /// Scheduler-assigned id.
    pub fn id(&self) -> ScenarioId {
        self.id
    }

    /// The definition being run.
    pub fn definition(&self) -> &Arc<TestDefinition<W>> {
        &self.definition
    }

    /// The owned region.
    pub fn region(&self) -> &RegionHandle {
        &self.region
    }

    /// Tick of admission.
    pub fn started(&self) -> Tick {
        self.started
    }

    /// Attempt number (1-based).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Current state.
    pub fn state(&self) -> ScenarioState {
        self.state
    }

    /// Whether the scenario has resolved.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// The resolved outcome, once terminal.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Ticks since admission.
    pub fn elapsed(&self, now: Tick) -> u64 {
        now.since(self.started)
    }

    /// The sequencer's latest "not yet" reason, for timeout diagnostics.
    pub fn last_rejection(&self) -> Option<&Failure> {
        self.sequencer.last_rejection()
    }

    /// Steps completed by the sequencer.
    pub fn steps_completed(&self) -> u64 {
        self.sequencer.steps_completed()
    }

    /// Drive the scenario for tick `now`.
    ///
    /// Activates the body once the setup grace has elapsed, runs the
    /// sequencer while running, then enforces `max_ticks`. Returns whether
    /// the scenario is terminal afterwards.
    pub fn on_tick(&mut self, world: &mut W, now: Tick) -> bool {
        if self.is_terminal() {
            return true;
        }
        let elapsed = self.elapsed(now);
        let verdict = match self.state {
            ScenarioState::Pending if elapsed >= self.definition.setup_ticks => {
                self.state = ScenarioState::Running;
                debug!(
                    scenario = %self.id,
                    test = %self.definition.meta.qualified_name(),
                    tick = now.0,
                    "scenario activated"
                );
                self.sequencer.activate(
                    &self.definition.body,
                    world,
                    &self.region,
                    now,
                    self.started,
                )
            }
            ScenarioState::Pending => Verdict::Pending,
            _ => self
                .sequencer
                .on_tick(world, &self.region, now, self.started),
        };
        self.apply(verdict);
        if !self.is_terminal() && elapsed >= self.definition.max_ticks {
            self.resolve(Outcome::TimedOut);
        }
        self.is_terminal()
    }

    /// Deliver a simulation event to the scenario's subscriptions.
    ///
    /// Pending and terminal scenarios ignore events.
    pub fn on_event(&mut self, event: &W::Event, world: &mut W, now: Tick) -> bool {
        if self.state != ScenarioState::Running {
            return self.is_terminal();
        }
        let verdict = self
            .sequencer
            .on_event(event, world, &self.region, now, self.started);
        self.apply(verdict);
        self.is_terminal()
    }

    /// Resolve the scenario. The first outcome wins; later calls are
    /// ignored and return false.
    pub fn resolve(&mut self, outcome: Outcome) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        self.state = match &outcome {
            Outcome::Succeeded => ScenarioState::Succeeded,
            Outcome::Failed(_) => ScenarioState::Failed,
            Outcome::TimedOut => ScenarioState::TimedOut,
        };
        self.outcome = Some(outcome);
        true
    }

    /// Tear down: drop every step, watch and subscription, and hand back
    /// the region and outcome.
    pub(crate) fn into_parts(self) -> (RegionHandle, Option<Outcome>) {
        (self.region, self.outcome)
    }

    fn apply(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Pending => {}
            Verdict::Succeeded => {
                self.resolve(Outcome::Succeeded);
            }
            Verdict::Failed(failure) => {
                self.resolve(Outcome::Failed(failure));
            }
        }
    }
}

impl<W: World> fmt::Debug for Scenario<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("id", &self.id)
            .field("test", &self.definition.meta.qualified_name())
            .field("region", &self.region.id())
            .field("started", &self.started)
            .field("attempt", &self.attempt)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use trial_core::{BlockPos, Bounds, Extent, FailureKind, Rotation};
    use trial_space::RegionAllocator;
    use trial_test_utils::{fixtures, MockWorld};

    fn scenario(def: Arc<TestDefinition<MockWorld>>) -> Scenario<MockWorld> {
        let mut alloc = RegionAllocator::new(
            Bounds::new(BlockPos::ORIGIN, Extent::new(32, 16, 32)),
            64,
        );
        let region = alloc.reserve(def.extent, def.padding, Rotation::None).unwrap();
        Scenario::new(ScenarioId(0), def, region, Tick(0), 1)
    }

    #[test]
    fn setup_grace_defers_the_body() {
        let mut reg = Registry::default();
        let id = reg
            .register_body("unit", "late", fixtures::succeed_immediately())
            .setup_ticks(3)
            .submit()
            .unwrap();
        let mut sc = scenario(Arc::clone(reg.get(id).unwrap()));
        let mut world = MockWorld::new();
        for t in 0..3 {
            assert!(!sc.on_tick(&mut world, Tick(t)));
            assert_eq!(sc.state(), ScenarioState::Pending);
        }
        assert!(sc.on_tick(&mut world, Tick(3)));
        assert_eq!(sc.outcome(), Some(&Outcome::Succeeded));
    }

    #[test]
    fn times_out_exactly_at_max_ticks() {
        let mut reg = Registry::default();
        let id = reg
            .register_body("unit", "stuck", fixtures::never_finishes())
            .max_ticks(10)
            .submit()
            .unwrap();
        let mut sc = scenario(Arc::clone(reg.get(id).unwrap()));
        let mut world = MockWorld::new();
        for t in 0..10 {
            assert!(!sc.on_tick(&mut world, Tick(t)), "terminal early at {t}");
        }
        assert!(sc.on_tick(&mut world, Tick(10)));
        assert_eq!(sc.state(), ScenarioState::TimedOut);
    }

    #[test]
    fn first_outcome_wins() {
        let mut reg = Registry::default();
        let id = reg
            .register_body("unit", "x", fixtures::never_finishes())
            .submit()
            .unwrap();
        let mut sc = scenario(Arc::clone(reg.get(id).unwrap()));
        assert!(sc.resolve(Outcome::Failed(Failure::cancelled("stop"))));
        assert!(!sc.resolve(Outcome::Succeeded));
        match sc.outcome() {
            Some(Outcome::Failed(f)) => assert_eq!(f.kind, FailureKind::Cancelled),
            other => panic!("expected cancellation, got {other:?}"),
        }
        let mut world = MockWorld::new();
        assert!(sc.on_tick(&mut world, Tick(1)));
    }
}
