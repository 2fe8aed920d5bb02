//! Allocator error types.

use std::error::Error;
use std::fmt;

use trial_core::{Extent, RegionId};

/// Errors returned by [`RegionAllocator`](crate::RegionAllocator).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// The requested extent has a zero-length axis.
    EmptyExtent {
        /// The requested extent.
        requested: Extent,
    },
    /// The padded request is larger than the whole world; it can never fit.
    TooLarge {
        /// Padded, rotated size that was requested.
        requested: Extent,
        /// Size of the world.
        world: Extent,
    },
    /// No free space was found within the bounded search. Space may free up
    /// once a live region is released.
    NoSpace {
        /// Padded, rotated size that was requested.
        requested: Extent,
        /// Number of live regions at the time of the request.
        live: usize,
        /// Number of candidate origins examined.
        candidates_checked: usize,
    },
    /// The region is not live (never reserved, or already released).
    NotLive {
        /// The offending id.
        id: RegionId,
    },
}

impl AllocError {
    /// Whether retrying after a release could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NoSpace { .. })
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyExtent { requested } => {
                write!(f, "requested extent {requested} has a zero-length axis")
            }
            Self::TooLarge { requested, world } => {
                write!(f, "region {requested} does not fit in world {world}")
            }
            Self::NoSpace {
                requested,
                live,
                candidates_checked,
            } => write!(
                f,
                "no space for region {requested} ({live} live regions, \
                 {candidates_checked} candidates checked)"
            ),
            Self::NotLive { id } => write!(f, "region {id} is not live"),
        }
    }
}

impl Error for AllocError {}
