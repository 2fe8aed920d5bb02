//! A minimal block simulation for trial scenarios.
//!
//! [`BlockWorld`] is the reference [`World`](trial_core::World): a sparse
//! block map plus three tick-driven mechanics that give tests something to
//! wait on.
//!
//! - **Scheduled changes**: a block edit queued for a future tick.
//! - **Power pulses**: a position powered at some level, losing one level
//!   per tick. A lamp is lit while its position is powered.
//! - **Falling entities**: entities drop one block per tick until they rest
//!   on a block or on the floor.
//!
//! Every observable change is reported as a [`WorldEvent`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod block;
pub mod world;

pub use block::{Block, EntityId, WorldEvent};
pub use world::BlockWorld;
