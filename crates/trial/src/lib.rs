//! Trial: tick-driven orchestration of spatially isolated tests against a
//! block simulation.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all trial sub-crates. For most users, adding `trial` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use trial::prelude::*;
//! use trial::sim::{Block, BlockWorld};
//!
//! let mut registry: Registry<BlockWorld> = Registry::default();
//! registry
//!     .register("redstone", "lamp_lights", |ctx| {
//!         let lamp = ctx.absolute(BlockPos::new(1, 0, 1));
//!         ctx.world_mut().set_block(lamp, Block::Lamp);
//!         ctx.world_mut().pulse(lamp, 3);
//!         ctx.succeed_when(move |ctx| ensure(ctx.world().is_lit(lamp), "lamp is dark"));
//!         Ok(())
//!     })
//!     .tag("redstone")
//!     .submit()?;
//!
//! let mut scheduler = Scheduler::new(EngineConfig::default(), BlockWorld::new())?;
//! scheduler.schedule(RunPlan::all().select(&registry));
//! let report = scheduler.run_until_idle(1_000);
//! assert!(report.passed);
//! assert_eq!(report.exit_code(), 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `trial-core` | ids, geometry, failures, outcomes, the `World` trait |
//! | [`space`] | `trial-space` | region allocation |
//! | [`sequence`] | `trial-sequence` | steps, the sequencer, `TestContext` |
//! | [`engine`] | `trial-engine` | registry, scheduler, batches, configuration |
//! | [`report`] | `trial-report` | outcome records and the run report |
//! | [`sim`] | `trial-sim` | the reference block simulation |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and traits (`trial-core`).
///
/// Implement [`types::World`] to run tests against your own simulation.
pub use trial_core as types;

/// Region allocation (`trial-space`).
pub use trial_space as space;

/// Test steps and their evaluation (`trial-sequence`).
///
/// Bodies receive a [`sequence::TestContext`] and build their steps
/// through it.
pub use trial_sequence as sequence;

/// The tick loop (`trial-engine`).
///
/// [`engine::Registry`] holds definitions, [`engine::Scheduler`] runs them.
pub use trial_engine as engine;

/// Outcome recording and reports (`trial-report`).
pub use trial_report as report;

/// Reference block simulation (`trial-sim`).
pub use trial_sim as sim;

/// Common imports for writing and running tests.
///
/// ```rust
/// use trial::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use trial_core::{
        ensure, BlockPos, Bounds, EntityProbe, Extent, Failure, FailureKind, Outcome, Rotation,
        TestId, Tick, World,
    };

    // Writing tests
    pub use trial_sequence::{Body, Sequence, Step, SubscriptionId, TestContext};

    // Running tests
    pub use trial_engine::{
        Admission, CancelHandle, EngineConfig, Registry, RunPlan, Scheduler, TickMetrics,
    };

    // Results
    pub use trial_report::{RunReport, Status};
}
