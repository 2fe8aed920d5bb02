//! Region handles.

use trial_core::{BlockPos, Bounds, Extent, RegionId, Rotation};

/// A live reservation in the shared world.
///
/// The footprint is the full reserved box including padding; the interior
/// is where the test's structure lives. Coordinates given to a test body
/// are relative to the interior's minimum corner and are passed through
/// the region's rotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionHandle {
    id: RegionId,
    footprint: Bounds,
    interior: Bounds,
    extent: Extent,
    padding: u32,
    rotation: Rotation,
}

impl RegionHandle {
    pub(crate) fn new(
        id: RegionId,
        footprint: Bounds,
        extent: Extent,
        padding: u32,
        rotation: Rotation,
    ) -> Self {
        Self {
            id,
            footprint,
            interior: footprint.inset(padding),
            extent,
            padding,
            rotation,
        }
    }

    /// Allocator-assigned id.
    pub fn id(&self) -> RegionId {
        self.id
    }

    /// Reserved box, padding included.
    pub fn footprint(&self) -> Bounds {
        self.footprint
    }

    /// Box occupied by the test itself (rotated extent, no padding).
    pub fn interior(&self) -> Bounds {
        self.interior
    }

    /// Unrotated extent the test was declared with.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Padding on each horizontal side.
    pub fn padding(&self) -> u32 {
        self.padding
    }

    /// Rotation applied to the test.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Map a test-relative position to world coordinates.
    pub fn absolute(&self, rel: BlockPos) -> BlockPos {
        let r = self.rotation.apply(rel, self.extent);
        let min = self.interior.min;
        BlockPos::new(min.x + r.x, min.y + r.y, min.z + r.z)
    }

    /// Whether a world position lies inside the reserved footprint.
    pub fn contains(&self, pos: BlockPos) -> bool {
        self.footprint.contains(pos)
    }
}
