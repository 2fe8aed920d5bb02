//! Block kinds and simulation events.

use std::fmt;

use trial_core::{BlockPos, Bounds, Tick};

/// A block occupying one position. Absent positions are air; every block
/// supports whatever is above it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Block {
    /// Inert solid block.
    Stone,
    /// Solid block that falls like an entity when unsupported.
    Sand,
    /// Lit while its position is powered.
    Lamp,
    /// Solid block that powers itself while on.
    Lever {
        /// Whether the lever is thrown.
        on: bool,
    },
    /// Any other named block.
    Named(String),
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stone => f.write_str("stone"),
            Self::Sand => f.write_str("sand"),
            Self::Lamp => f.write_str("lamp"),
            Self::Lever { on: true } => f.write_str("lever[on]"),
            Self::Lever { on: false } => f.write_str("lever[off]"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Identifies an entity for its whole life.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something observable happened in a [`BlockWorld`](crate::BlockWorld).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorldEvent {
    /// A block was placed, replaced or removed.
    BlockChanged {
        /// Where.
        pos: BlockPos,
        /// Previous block (`None` for air).
        from: Option<Block>,
        /// New block (`None` for air).
        to: Option<Block>,
    },
    /// The power level at a position changed.
    PowerChanged {
        /// Where.
        pos: BlockPos,
        /// New level; zero means unpowered.
        level: u8,
    },
    /// An entity entered the world.
    EntitySpawned {
        /// The new entity.
        id: EntityId,
        /// Its kind.
        kind: String,
        /// Where it appeared.
        pos: BlockPos,
    },
    /// A falling entity came to rest.
    EntityLanded {
        /// The entity.
        id: EntityId,
        /// Its resting position.
        pos: BlockPos,
        /// Tick of landing.
        tick: Tick,
    },
    /// Everything inside the bounds was wiped.
    RegionCleared(Bounds),
}
