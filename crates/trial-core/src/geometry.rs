//! World geometry: block positions, extents, axis-aligned bounds and
//! quarter-turn rotations about the vertical axis.
//!
//! Tests are laid out on the horizontal (x/z) plane. `y` is carried through
//! unchanged by rotation and packing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An integer block position in world (or region-relative) space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    /// East-west axis.
    pub x: i32,
    /// Vertical axis.
    pub y: i32,
    /// North-south axis.
    pub z: i32,
}

impl BlockPos {
    /// The origin `(0, 0, 0)`.
    pub const ORIGIN: BlockPos = BlockPos { x: 0, y: 0, z: 0 };

    /// Construct a position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Component-wise offset.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// The position directly below.
    pub const fn below(self) -> Self {
        self.offset(0, -1, 0)
    }

    /// The position directly above.
    pub const fn above(self) -> Self {
        self.offset(0, 1, 0)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Size of a box in blocks along each axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    /// Size along x.
    pub x: u32,
    /// Size along y.
    pub y: u32,
    /// Size along z.
    pub z: u32,
}

impl Extent {
    /// Construct an extent.
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// A cube of side `n`.
    pub const fn cube(n: u32) -> Self {
        Self { x: n, y: n, z: n }
    }

    /// True if any axis has zero length.
    pub const fn is_empty(&self) -> bool {
        self.x == 0 || self.y == 0 || self.z == 0
    }

    /// Grow the horizontal axes by `padding` on every side.
    ///
    /// The vertical axis is left alone: regions never stack. Axes saturate
    /// at `u32::MAX`; use [`checked_padded`](Self::checked_padded) to detect
    /// that.
    pub const fn padded(self, padding: u32) -> Self {
        let grow = padding.saturating_mul(2);
        Self {
            x: self.x.saturating_add(grow),
            y: self.y,
            z: self.z.saturating_add(grow),
        }
    }

    /// Like [`padded`](Self::padded), or `None` if an axis would overflow.
    pub fn checked_padded(self, padding: u32) -> Option<Self> {
        let grow = padding.checked_mul(2)?;
        Some(Self {
            x: self.x.checked_add(grow)?,
            y: self.y,
            z: self.z.checked_add(grow)?,
        })
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.x, self.y, self.z)
    }
}

/// An axis-aligned box: `min` inclusive, `min + extent` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Bounds {
    /// Minimum corner (inclusive).
    pub min: BlockPos,
    /// Size of the box.
    pub extent: Extent,
}

impl Bounds {
    /// Construct bounds from a minimum corner and an extent.
    pub const fn new(min: BlockPos, extent: Extent) -> Self {
        Self { min, extent }
    }

    /// Maximum corner (exclusive).
    pub fn max_exclusive(&self) -> BlockPos {
        BlockPos {
            x: self.min.x + self.extent.x as i32,
            y: self.min.y + self.extent.y as i32,
            z: self.min.z + self.extent.z as i32,
        }
    }

    /// Whether `pos` lies inside the box.
    pub fn contains(&self, pos: BlockPos) -> bool {
        let max = self.max_exclusive();
        pos.x >= self.min.x
            && pos.x < max.x
            && pos.y >= self.min.y
            && pos.y < max.y
            && pos.z >= self.min.z
            && pos.z < max.z
    }

    /// Whether the horizontal footprints of two boxes share any column.
    ///
    /// Empty boxes intersect nothing.
    pub fn intersects_xz(&self, other: &Bounds) -> bool {
        if self.extent.is_empty() || other.extent.is_empty() {
            return false;
        }
        let a = self.max_exclusive();
        let b = other.max_exclusive();
        self.min.x < b.x && other.min.x < a.x && self.min.z < b.z && other.min.z < a.z
    }

    /// Whether `other` lies entirely inside `self` on the horizontal plane.
    pub fn contains_xz(&self, other: &Bounds) -> bool {
        let a = self.max_exclusive();
        let b = other.max_exclusive();
        other.min.x >= self.min.x && other.min.z >= self.min.z && b.x <= a.x && b.z <= a.z
    }

    /// Shrink the horizontal axes by `padding` on every side.
    ///
    /// Inverse of [`Extent::padded`] applied around the same centre.
    pub fn inset(&self, padding: u32) -> Bounds {
        let p = padding as i32;
        Bounds {
            min: self.min.offset(p, 0, p),
            extent: Extent {
                x: self.extent.x.saturating_sub(padding.saturating_mul(2)),
                y: self.extent.y,
                z: self.extent.z.saturating_sub(padding.saturating_mul(2)),
            },
        }
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.min, self.extent)
    }
}

/// Clockwise quarter-turn rotation about the vertical axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    /// No rotation.
    #[default]
    None,
    /// 90° clockwise.
    Clockwise90,
    /// 180°.
    Clockwise180,
    /// 270° clockwise (90° counter-clockwise).
    Clockwise270,
}

impl Rotation {
    /// All rotations in quarter-turn order.
    pub const ALL: [Rotation; 4] = [
        Rotation::None,
        Rotation::Clockwise90,
        Rotation::Clockwise180,
        Rotation::Clockwise270,
    ];

    /// Rotation by `turns` quarter turns (taken modulo 4).
    pub fn from_quarter_turns(turns: u64) -> Self {
        Self::ALL[(turns % 4) as usize]
    }

    /// Number of clockwise quarter turns.
    pub fn quarter_turns(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Clockwise90 => 1,
            Self::Clockwise180 => 2,
            Self::Clockwise270 => 3,
        }
    }

    /// Extent of a box of size `extent` after rotation.
    pub fn rotate_extent(self, extent: Extent) -> Extent {
        match self {
            Self::None | Self::Clockwise180 => extent,
            Self::Clockwise90 | Self::Clockwise270 => Extent {
                x: extent.z,
                y: extent.y,
                z: extent.x,
            },
        }
    }

    /// Map a position relative to an unrotated box of size `extent` to the
    /// corresponding position inside the rotated box.
    ///
    /// Positions outside the box are mapped by the same affine transform.
    pub fn apply(self, rel: BlockPos, extent: Extent) -> BlockPos {
        let sx = extent.x as i32;
        let sz = extent.z as i32;
        match self {
            Self::None => rel,
            Self::Clockwise90 => BlockPos::new(sz - 1 - rel.z, rel.y, rel.x),
            Self::Clockwise180 => BlockPos::new(sx - 1 - rel.x, rel.y, sz - 1 - rel.z),
            Self::Clockwise270 => BlockPos::new(rel.z, rel.y, sx - 1 - rel.x),
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.quarter_turns() * 90)
    }
}
