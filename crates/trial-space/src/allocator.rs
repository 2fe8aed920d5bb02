//! Deterministic first-fit region allocator.
//!
//! [`RegionAllocator`] packs padded, rotated boxes onto the horizontal plane
//! of a fixed world. Placement is bottom-left first-fit over a candidate set
//! derived from the live footprints:
//!
//! - x candidates: the world's west edge plus the east edge of every live
//!   footprint,
//! - z candidates: the world's north edge plus the south edge of every live
//!   footprint,
//!
//! examined in `(z, x)` order. Any feasible placement can be slid north and
//! west until it touches a world edge or a live footprint, so the candidate
//! set never misses space that exists. The search is capped at
//! `max_candidates` examined origins.
//!
//! The live set is an [`IndexMap`] keyed by [`RegionId`]: releasing an id
//! that is not live is reported and leaves the pool untouched.

use indexmap::IndexMap;
use tracing::trace;

use trial_core::{BlockPos, Bounds, Extent, RegionId, Rotation};

use crate::error::AllocError;
use crate::region::RegionHandle;

/// Cumulative allocator counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Successful reservations.
    pub reserved: u64,
    /// Successful releases.
    pub released: u64,
    /// Reservations rejected with [`AllocError::NoSpace`].
    pub no_space: u64,
    /// Releases rejected with [`AllocError::NotLive`].
    pub invalid_releases: u64,
    /// Highest number of simultaneously live regions.
    pub peak_live: usize,
}

/// Hands out non-overlapping regions of a fixed world.
#[derive(Debug)]
pub struct RegionAllocator {
    world: Bounds,
    max_candidates: usize,
    live: IndexMap<RegionId, RegionHandle>,
    next_id: u64,
    stats: AllocatorStats,
}

impl RegionAllocator {
    /// Create an allocator over `world`.
    ///
    /// `max_candidates` bounds the number of candidate origins examined per
    /// reservation; it is clamped to at least 1.
    pub fn new(world: Bounds, max_candidates: usize) -> Self {
        Self {
            world,
            max_candidates: max_candidates.max(1),
            live: IndexMap::new(),
            next_id: 0,
            stats: AllocatorStats::default(),
        }
    }

    /// The world being packed.
    pub fn world(&self) -> Bounds {
        self.world
    }

    /// Reserve a region for a test of size `extent`.
    ///
    /// The footprint is `extent` rotated by `rotation`, then grown by
    /// `padding` on every horizontal side.
    ///
    /// # Errors
    ///
    /// - [`AllocError::EmptyExtent`] if `extent` has a zero-length axis.
    /// - [`AllocError::TooLarge`] if the padded footprint exceeds the world.
    /// - [`AllocError::NoSpace`] if no free origin was found within the
    ///   bounded search. Retrying after a release may succeed.
    pub fn reserve(
        &mut self,
        extent: Extent,
        padding: u32,
        rotation: Rotation,
    ) -> Result<RegionHandle, AllocError> {
        let padded = self.check(extent, padding, rotation)?;
        let (origin, checked) = self.find_origin(padded);
        let Some(origin) = origin else {
            self.stats.no_space += 1;
            return Err(AllocError::NoSpace {
                requested: padded,
                live: self.live.len(),
                candidates_checked: checked,
            });
        };

        let id = RegionId(self.next_id);
        self.next_id += 1;
        let handle = RegionHandle::new(id, Bounds::new(origin, padded), extent, padding, rotation);
        trace!(
            region = %id,
            footprint = %handle.footprint(),
            rotation = %rotation,
            candidates = checked,
            "region reserved"
        );
        self.live.insert(id, handle.clone());
        self.stats.reserved += 1;
        self.stats.peak_live = self.stats.peak_live.max(self.live.len());
        Ok(handle)
    }

    /// Whether a request could ever be satisfied by an empty world.
    ///
    /// Returns the padded, rotated footprint size on success.
    ///
    /// # Errors
    ///
    /// [`AllocError::EmptyExtent`] or [`AllocError::TooLarge`], exactly as
    /// [`reserve`](Self::reserve) would report them.
    pub fn check(
        &self,
        extent: Extent,
        padding: u32,
        rotation: Rotation,
    ) -> Result<Extent, AllocError> {
        if extent.is_empty() {
            return Err(AllocError::EmptyExtent { requested: extent });
        }
        let rotated = rotation.rotate_extent(extent);
        let Some(padded) = rotated.checked_padded(padding) else {
            return Err(AllocError::TooLarge {
                requested: rotated.padded(padding),
                world: self.world.extent,
            });
        };
        if padded.x > self.world.extent.x
            || padded.z > self.world.extent.z
            || padded.y > self.world.extent.y
        {
            return Err(AllocError::TooLarge {
                requested: padded,
                world: self.world.extent,
            });
        }
        Ok(padded)
    }

    /// Return a region to the pool.
    ///
    /// Returns the released handle.
    ///
    /// # Errors
    ///
    /// [`AllocError::NotLive`] if `id` was never reserved or has already
    /// been released. The pool is left unchanged.
    pub fn release(&mut self, id: RegionId) -> Result<RegionHandle, AllocError> {
        match self.live.shift_remove(&id) {
            Some(handle) => {
                self.stats.released += 1;
                trace!(region = %id, "region released");
                Ok(handle)
            }
            None => {
                self.stats.invalid_releases += 1;
                Err(AllocError::NotLive { id })
            }
        }
    }

    /// Whether `id` is currently reserved.
    pub fn is_live(&self, id: RegionId) -> bool {
        self.live.contains_key(&id)
    }

    /// Number of live regions.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Live regions in reservation order.
    pub fn live(&self) -> impl Iterator<Item = &RegionHandle> {
        self.live.values()
    }

    /// Horizontal area (in columns) not covered by any live footprint.
    pub fn free_area(&self) -> u64 {
        let total = self.world.extent.x as u64 * self.world.extent.z as u64;
        let used: u64 = self
            .live
            .values()
            .map(|h| h.footprint().extent.x as u64 * h.footprint().extent.z as u64)
            .sum();
        total.saturating_sub(used)
    }

    /// Cumulative counters.
    pub fn stats(&self) -> &AllocatorStats {
        &self.stats
    }

    /// Release every live region at once.
    pub fn clear(&mut self) {
        self.stats.released += self.live.len() as u64;
        self.live.clear();
    }

    /// First free origin for a footprint of size `padded`, and the number
    /// of candidates examined.
    fn find_origin(&self, padded: Extent) -> (Option<BlockPos>, usize) {
        let mut xs: Vec<i32> = Vec::with_capacity(self.live.len() + 1);
        let mut zs: Vec<i32> = Vec::with_capacity(self.live.len() + 1);
        xs.push(self.world.min.x);
        zs.push(self.world.min.z);
        for handle in self.live.values() {
            let max = handle.footprint().max_exclusive();
            xs.push(max.x);
            zs.push(max.z);
        }
        xs.sort_unstable();
        xs.dedup();
        zs.sort_unstable();
        zs.dedup();

        let mut checked = 0;
        for &z in &zs {
            for &x in &xs {
                if checked == self.max_candidates {
                    return (None, checked);
                }
                checked += 1;
                let candidate = Bounds::new(BlockPos::new(x, self.world.min.y, z), padded);
                if !self.world.contains_xz(&candidate) {
                    continue;
                }
                if self
                    .live
                    .values()
                    .all(|h| !h.footprint().intersects_xz(&candidate))
                {
                    return (Some(candidate.min), checked);
                }
            }
        }
        (None, checked)
    }
}
