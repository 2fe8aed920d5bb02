//! Region allocation for spatially isolated test scenarios.
//!
//! Every live scenario owns a box of the shared simulated world. The
//! [`RegionAllocator`] hands those boxes out, guarantees that no two live
//! reservations overlap (padding included), and places them in a
//! deterministic order so that a given sequence of reservations always
//! produces the same layout.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod allocator;
pub mod error;
pub mod region;

pub use allocator::{AllocatorStats, RegionAllocator};
pub use error::AllocError;
pub use region::RegionHandle;
