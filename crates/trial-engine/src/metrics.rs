//! Per-tick scheduler metrics.

/// Counters collected during a single [`Scheduler::tick`](crate::Scheduler::tick).
///
/// Gauges describe the state at the end of the tick; fields prefixed
/// `total_` are cumulative over the scheduler's lifetime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickMetrics {
    /// The tick these metrics describe.
    pub tick: u64,
    /// Wall-clock time for the entire tick, in microseconds.
    pub total_us: u64,
    /// Time spent in `World::step`, in microseconds.
    pub world_step_us: u64,
    /// Simulation events dispatched to subscriptions this tick.
    pub events_dispatched: u32,
    /// Live scenarios (pending or running).
    pub live: u32,
    /// Scenarios still in their setup grace.
    pub pending: u32,
    /// Scenarios whose sequencer is being driven.
    pub running: u32,
    /// Definitions waiting for their batch slot.
    pub queued_for_batch: u32,
    /// Definitions waiting for world space.
    pub queued_for_space: u32,
    /// Scenarios finalized this tick.
    pub finished: u32,
    /// Cumulative scenarios started.
    pub total_admissions: u64,
    /// Cumulative retries scheduled.
    pub total_retries: u64,
    /// Cumulative timeouts.
    pub total_timeouts: u64,
    /// Cumulative cancellations (live or queued).
    pub total_cancellations: u64,
    /// Cumulative admissions that had to wait for space.
    pub total_space_stalls: u64,
}
