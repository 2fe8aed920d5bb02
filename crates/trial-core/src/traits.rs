//! Traits through which the engine drives an external simulation.

use std::fmt;

use crate::geometry::{BlockPos, Bounds};
use crate::id::Tick;

/// A tick-stepped simulation the engine runs tests against.
///
/// The engine never interprets world state. It steps the world once per
/// frame, forwards the events it emits to scenario subscriptions, and asks
/// it to wipe a region once the scenario that owned it has finished.
///
/// # Contract
///
/// - `step()` is called exactly once per scheduler tick, before any
///   scenario of that tick runs.
/// - `drain_events()` is called right after `step()`; returned events are
///   delivered to every live scenario's subscriptions.
/// - `clear_region()` is called with the padded bounds of every region the
///   engine releases.
pub trait World: Send + 'static {
    /// Event type emitted by the simulation.
    type Event: Clone + fmt::Debug + Send + 'static;

    /// Advance the simulation to `tick`.
    fn step(&mut self, tick: Tick);

    /// Take every event emitted since the previous call.
    ///
    /// Default: the world emits no events.
    fn drain_events(&mut self) -> Vec<Self::Event> {
        Vec::new()
    }

    /// Reset everything inside `bounds` to an empty state.
    ///
    /// Default: no-op.
    fn clear_region(&mut self, bounds: &Bounds) {
        let _ = bounds;
    }
}

/// Entity lookup used by `succeed_when_entity_present`.
pub trait EntityProbe {
    /// Number of entities of `kind` occupying the block at `pos`.
    fn entity_count(&self, kind: &str, pos: BlockPos) -> usize;
}
