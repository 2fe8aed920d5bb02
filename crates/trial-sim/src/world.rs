//! The [`BlockWorld`] simulation.

use indexmap::IndexMap;
use tracing::{debug, trace};

use trial_core::{BlockPos, Bounds, EntityProbe, Tick, World};

use crate::block::{Block, EntityId, WorldEvent};

/// Power level of a thrown lever, and the ceiling for pulses.
pub const MAX_POWER: u8 = 15;

#[derive(Clone, Debug)]
struct Scheduled {
    due: Tick,
    pos: BlockPos,
    block: Option<Block>,
}

#[derive(Clone, Debug)]
struct Entity {
    kind: String,
    pos: BlockPos,
    resting: bool,
}

/// Sparse block world with scheduled edits, decaying power and gravity.
///
/// Iteration order everywhere is insertion order, so two worlds fed the
/// same calls emit the same events.
#[derive(Debug)]
pub struct BlockWorld {
    now: Tick,
    floor: i32,
    blocks: IndexMap<BlockPos, Block>,
    power: IndexMap<BlockPos, u8>,
    scheduled: Vec<Scheduled>,
    entities: IndexMap<EntityId, Entity>,
    next_entity: u32,
    events: Vec<WorldEvent>,
}

impl Default for BlockWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockWorld {
    /// An empty world whose floor is `y = 0`.
    pub fn new() -> Self {
        Self::with_floor(0)
    }

    /// An empty world. Nothing falls below `floor`.
    pub fn with_floor(floor: i32) -> Self {
        Self {
            now: Tick::ZERO,
            floor,
            blocks: IndexMap::new(),
            power: IndexMap::new(),
            scheduled: Vec::new(),
            entities: IndexMap::new(),
            next_entity: 0,
            events: Vec::new(),
        }
    }

    /// The tick of the most recent step.
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Lowest position an entity can occupy.
    pub fn floor(&self) -> i32 {
        self.floor
    }

    // ── Blocks ────────────────────────────────────────────────────

    /// The block at `pos`, or `None` for air.
    pub fn block(&self, pos: BlockPos) -> Option<&Block> {
        self.blocks.get(&pos)
    }

    /// Number of non-air positions.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Place `block` at `pos`, returning what was there.
    pub fn set_block(&mut self, pos: BlockPos, block: Block) -> Option<Block> {
        self.write(pos, Some(block))
    }

    /// Turn `pos` into air, returning what was there.
    pub fn remove_block(&mut self, pos: BlockPos) -> Option<Block> {
        self.write(pos, None)
    }

    /// Apply `block` at `pos` once `ticks` more steps have run (at least
    /// one). Edits due on the same tick apply in the order scheduled.
    pub fn schedule(&mut self, ticks: u64, pos: BlockPos, block: Option<Block>) {
        let due = self.now.offset(ticks.max(1));
        trace!(%pos, due = due.0, "block change scheduled");
        self.scheduled.push(Scheduled { due, pos, block });
    }

    /// Number of scheduled edits not yet applied.
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.len()
    }

    fn write(&mut self, pos: BlockPos, block: Option<Block>) -> Option<Block> {
        let previous = match &block {
            Some(b) => self.blocks.insert(pos, b.clone()),
            None => self.blocks.shift_remove(&pos),
        };
        if previous != block {
            self.events.push(WorldEvent::BlockChanged {
                pos,
                from: previous.clone(),
                to: block,
            });
        }
        previous
    }

    // ── Power ─────────────────────────────────────────────────────

    /// Power level at `pos`.
    pub fn power(&self, pos: BlockPos) -> u8 {
        self.power.get(&pos).copied().unwrap_or(0)
    }

    /// Raise the power at `pos` to `level` (capped at [`MAX_POWER`]). The
    /// level then drops by one each step.
    pub fn pulse(&mut self, pos: BlockPos, level: u8) {
        let level = level.min(MAX_POWER);
        if level > self.power(pos) {
            self.set_power(pos, level);
        }
    }

    /// Flip the lever at `pos`. Returns the new state, or `None` if there
    /// is no lever there. A thrown lever holds its position at
    /// [`MAX_POWER`].
    pub fn toggle_lever(&mut self, pos: BlockPos) -> Option<bool> {
        let on = match self.blocks.get(&pos) {
            Some(Block::Lever { on }) => !*on,
            _ => return None,
        };
        self.write(pos, Some(Block::Lever { on }));
        if on {
            self.set_power(pos, MAX_POWER);
        }
        Some(on)
    }

    /// Whether a lamp sits at `pos` and is powered.
    pub fn is_lit(&self, pos: BlockPos) -> bool {
        matches!(self.blocks.get(&pos), Some(Block::Lamp)) && self.power(pos) > 0
    }

    fn set_power(&mut self, pos: BlockPos, level: u8) {
        if level == 0 {
            self.power.shift_remove(&pos);
        } else {
            self.power.insert(pos, level);
        }
        self.events.push(WorldEvent::PowerChanged { pos, level });
    }

    fn decay_power(&mut self) {
        let powered: Vec<(BlockPos, u8)> = self.power.iter().map(|(p, l)| (*p, *l)).collect();
        for (pos, level) in powered {
            if matches!(self.blocks.get(&pos), Some(Block::Lever { on: true })) {
                continue;
            }
            self.set_power(pos, level - 1);
        }
    }

    // ── Entities ──────────────────────────────────────────────────

    /// Add an entity of `kind` at `pos`. It falls until supported.
    pub fn spawn(&mut self, kind: impl Into<String>, pos: BlockPos) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        let kind = kind.into();
        self.events.push(WorldEvent::EntitySpawned {
            id,
            kind: kind.clone(),
            pos,
        });
        self.entities.insert(
            id,
            Entity {
                kind,
                pos,
                resting: false,
            },
        );
        id
    }

    /// Current position of an entity.
    pub fn entity_pos(&self, id: EntityId) -> Option<BlockPos> {
        self.entities.get(&id).map(|e| e.pos)
    }

    /// Whether the entity exists and is at rest.
    pub fn is_resting(&self, id: EntityId) -> bool {
        self.entities.get(&id).is_some_and(|e| e.resting)
    }

    /// Number of live entities.
    pub fn entity_count_total(&self) -> usize {
        self.entities.len()
    }

    fn supported(&self, pos: BlockPos) -> bool {
        pos.y <= self.floor || self.blocks.contains_key(&pos.below())
    }

    fn apply_gravity(&mut self) {
        // Sand, lowest first so columns fall together.
        let mut sand: Vec<BlockPos> = self
            .blocks
            .iter()
            .filter(|(_, b)| matches!(b, Block::Sand))
            .map(|(p, _)| *p)
            .collect();
        sand.sort_by_key(|p| p.y);
        for pos in sand {
            if !self.supported(pos) {
                self.write(pos, None);
                self.write(pos.below(), Some(Block::Sand));
            }
        }

        let ids: Vec<EntityId> = self.entities.keys().copied().collect();
        for id in ids {
            let Some(pos) = self.entities.get(&id).map(|e| e.pos) else {
                continue;
            };
            let supported = self.supported(pos);
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            if !supported {
                entity.pos = pos.below();
                entity.resting = false;
            } else if !entity.resting {
                entity.resting = true;
                self.events.push(WorldEvent::EntityLanded {
                    id,
                    pos,
                    tick: self.now,
                });
            }
        }
    }

    fn apply_scheduled(&mut self) {
        let now = self.now;
        let (due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.scheduled)
            .into_iter()
            .partition(|s| s.due <= now);
        self.scheduled = later;
        for change in due {
            trace!(pos = %change.pos, tick = now.0, "scheduled change applied");
            self.write(change.pos, change.block);
        }
    }
}

impl World for BlockWorld {
    type Event = WorldEvent;

    fn step(&mut self, tick: Tick) {
        self.now = tick;
        self.apply_scheduled();
        self.decay_power();
        self.apply_gravity();
    }

    fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    fn clear_region(&mut self, bounds: &Bounds) {
        let blocks = self.blocks.len();
        let entities = self.entities.len();
        self.blocks.retain(|pos, _| !bounds.contains(*pos));
        self.power.retain(|pos, _| !bounds.contains(*pos));
        self.scheduled.retain(|s| !bounds.contains(s.pos));
        self.entities.retain(|_, e| !bounds.contains(e.pos));
        debug!(
            %bounds,
            blocks = blocks - self.blocks.len(),
            entities = entities - self.entities.len(),
            "region cleared"
        );
        self.events.push(WorldEvent::RegionCleared(*bounds));
    }
}

impl EntityProbe for BlockWorld {
    fn entity_count(&self, kind: &str, pos: BlockPos) -> usize {
        self.entities
            .values()
            .filter(|e| e.kind == kind && e.pos == pos)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trial_core::Extent;

    fn at(x: i32, y: i32, z: i32) -> BlockPos {
        BlockPos::new(x, y, z)
    }

    #[test]
    fn scheduled_changes_apply_on_their_tick() {
        let mut world = BlockWorld::new();
        world.schedule(3, at(0, 0, 0), Some(Block::Stone));
        world.step(Tick(1));
        world.step(Tick(2));
        assert_eq!(world.block(at(0, 0, 0)), None);
        world.step(Tick(3));
        assert_eq!(world.block(at(0, 0, 0)), Some(&Block::Stone));
        assert_eq!(world.scheduled_count(), 0);
        let events = world.drain_events();
        assert!(events.contains(&WorldEvent::BlockChanged {
            pos: at(0, 0, 0),
            from: None,
            to: Some(Block::Stone),
        }));
    }

    #[test]
    fn pulse_lights_a_lamp_until_it_decays() {
        let mut world = BlockWorld::new();
        let lamp = at(2, 0, 2);
        world.set_block(lamp, Block::Lamp);
        world.pulse(lamp, 2);
        assert!(world.is_lit(lamp));
        world.step(Tick(1));
        assert!(world.is_lit(lamp));
        world.step(Tick(2));
        assert!(!world.is_lit(lamp));
        assert_eq!(world.power(lamp), 0);
    }

    #[test]
    fn thrown_lever_holds_power() {
        let mut world = BlockWorld::new();
        let lever = at(0, 0, 0);
        world.set_block(lever, Block::Lever { on: false });
        assert_eq!(world.toggle_lever(lever), Some(true));
        for t in 1..=20 {
            world.step(Tick(t));
        }
        assert_eq!(world.power(lever), MAX_POWER);
        assert_eq!(world.toggle_lever(lever), Some(false));
        world.step(Tick(21));
        assert_eq!(world.power(lever), MAX_POWER - 1);
        assert_eq!(world.toggle_lever(at(9, 9, 9)), None);
    }

    #[test]
    fn entities_fall_and_land_once() {
        let mut world = BlockWorld::new();
        world.set_block(at(0, 0, 0), Block::Stone);
        let id = world.spawn("item", at(0, 3, 0));
        world.drain_events();
        world.step(Tick(1));
        world.step(Tick(2));
        assert_eq!(world.entity_pos(id), Some(at(0, 1, 0)));
        assert!(!world.is_resting(id));
        world.step(Tick(3));
        world.step(Tick(4));
        assert!(world.is_resting(id));
        assert_eq!(world.entity_count("item", at(0, 1, 0)), 1);
        let landed: Vec<_> = world
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, WorldEvent::EntityLanded { .. }))
            .collect();
        assert_eq!(
            landed,
            vec![WorldEvent::EntityLanded {
                id,
                pos: at(0, 1, 0),
                tick: Tick(3),
            }]
        );
    }

    #[test]
    fn sand_columns_fall_together() {
        let mut world = BlockWorld::new();
        world.set_block(at(0, 2, 0), Block::Sand);
        world.set_block(at(0, 3, 0), Block::Sand);
        world.step(Tick(1));
        world.step(Tick(2));
        assert_eq!(world.block(at(0, 0, 0)), Some(&Block::Sand));
        assert_eq!(world.block(at(0, 1, 0)), Some(&Block::Sand));
        assert_eq!(world.block_count(), 2);
    }

    #[test]
    fn clear_region_wipes_only_inside() {
        let mut world = BlockWorld::new();
        world.set_block(at(1, 0, 1), Block::Stone);
        world.set_block(at(9, 0, 9), Block::Stone);
        world.pulse(at(1, 0, 1), 5);
        world.schedule(4, at(2, 0, 2), Some(Block::Lamp));
        world.spawn("item", at(2, 0, 2));
        world.clear_region(&Bounds::new(BlockPos::ORIGIN, Extent::cube(4)));
        assert_eq!(world.block_count(), 1);
        assert_eq!(world.power(at(1, 0, 1)), 0);
        assert_eq!(world.scheduled_count(), 0);
        assert_eq!(world.entity_count_total(), 0);
        assert!(matches!(
            world.drain_events().last(),
            Some(WorldEvent::RegionCleared(_))
        ));
    }
}
