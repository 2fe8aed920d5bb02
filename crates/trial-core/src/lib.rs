//! Core types and traits for the trial test-orchestration engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other crate in the workspace: tick and
//! identifier newtypes, world geometry, test failures and outcomes, the
//! simulation-independent test metadata, and the [`World`] trait through
//! which the engine drives an external simulation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod failure;
pub mod geometry;
pub mod id;
pub mod meta;
pub mod outcome;
pub mod traits;

pub use failure::{ensure, Failure, FailureKind};
pub use geometry::{BlockPos, Bounds, Extent, Rotation};
pub use id::{RegionId, ScenarioId, TestId, Tick};
pub use meta::{TestMeta, Tags};
pub use outcome::Outcome;
pub use traits::{EntityProbe, World};
