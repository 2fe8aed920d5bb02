//! Mock worlds and reusable test bodies for trial development.
//!
//! [`MockWorld`] implements [`World`] and [`EntityProbe`] over plain maps
//! and records everything the engine asks of it, so tests can assert on
//! step counts, cleared regions and the order in which callbacks ran.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::HashMap;

use trial_core::{BlockPos, Bounds, EntityProbe, Tick, World};

/// Events emitted by [`MockWorld`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockEvent {
    /// Emitted on every step when tick events are enabled.
    Stepped(Tick),
    /// Emitted by [`MockWorld::emit`].
    Signal(String),
}

/// In-memory world with a block map, an entity list and a call log.
#[derive(Debug, Default)]
pub struct MockWorld {
    steps: u64,
    last_tick: Option<Tick>,
    tick_events: bool,
    blocks: HashMap<BlockPos, String>,
    entities: Vec<(String, BlockPos)>,
    pending: Vec<MockEvent>,
    cleared: Vec<Bounds>,
    records: Vec<(Tick, String)>,
}

impl MockWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit [`MockEvent::Stepped`] on every step.
    pub fn with_tick_events(mut self) -> Self {
        self.tick_events = true;
        self
    }

    /// Number of `step()` calls so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Tick passed to the most recent `step()`.
    pub fn last_tick(&self) -> Option<Tick> {
        self.last_tick
    }

    pub fn set_block(&mut self, pos: BlockPos, block: impl Into<String>) {
        self.blocks.insert(pos, block.into());
    }

    pub fn block(&self, pos: BlockPos) -> Option<&str> {
        self.blocks.get(&pos).map(String::as_str)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn spawn(&mut self, kind: impl Into<String>, pos: BlockPos) {
        self.entities.push((kind.into(), pos));
    }

    /// Queue an event for the next drain.
    pub fn emit(&mut self, event: MockEvent) {
        self.pending.push(event);
    }

    /// Every bounds passed to `clear_region()`, in call order.
    pub fn cleared(&self) -> &[Bounds] {
        &self.cleared
    }

    /// Append a labelled entry to the call log.
    pub fn record(&mut self, tick: Tick, label: impl Into<String>) {
        self.records.push((tick, label.into()));
    }

    pub fn records(&self) -> &[(Tick, String)] {
        &self.records
    }

    /// Tick of the first record with `label`.
    pub fn tick_of(&self, label: &str) -> Option<Tick> {
        self.records
            .iter()
            .find(|(_, l)| l == label)
            .map(|(t, _)| *t)
    }

    /// Number of records with `label`.
    pub fn count_of(&self, label: &str) -> usize {
        self.records.iter().filter(|(_, l)| l == label).count()
    }
}

impl World for MockWorld {
    type Event = MockEvent;

    fn step(&mut self, tick: Tick) {
        self.steps += 1;
        self.last_tick = Some(tick);
        if self.tick_events {
            self.pending.push(MockEvent::Stepped(tick));
        }
    }

    fn drain_events(&mut self) -> Vec<MockEvent> {
        std::mem::take(&mut self.pending)
    }

    fn clear_region(&mut self, bounds: &Bounds) {
        self.blocks.retain(|pos, _| !bounds.contains(*pos));
        self.entities.retain(|(_, pos)| !bounds.contains(*pos));
        self.cleared.push(*bounds);
    }
}

impl EntityProbe for MockWorld {
    fn entity_count(&self, kind: &str, pos: BlockPos) -> usize {
        self.entities
            .iter()
            .filter(|(k, p)| k == kind && *p == pos)
            .count()
    }
}
