//! Tick-driven orchestration of trial scenarios.
//!
//! The [`Scheduler`] owns the clock, the world, the region allocator and
//! every live scenario. Each call to [`Scheduler::tick`] runs one frame:
//!
//! 1. advance the [`Clock`],
//! 2. apply pending cancellations,
//! 3. step the world once and dispatch its events to subscriptions,
//! 4. activate scenarios whose setup grace elapsed and drive every running
//!    scenario's sequencer,
//! 5. time out scenarios that reached `max_ticks`,
//! 6. finalize terminal scenarios (release the region, hand the batch slot
//!    on, report, schedule retries) and admit queued work.
//!
//! Definitions come from a [`Registry`]; a [`RunPlan`] selects which of them
//! take part in a run.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod batch;
pub mod cancel;
pub mod clock;
pub mod config;
pub mod metrics;
pub mod registry;
pub mod scenario;
pub mod scheduler;

pub use batch::BatchCoordinator;
pub use cancel::{CancelHandle, CancelRequest};
pub use clock::Clock;
pub use config::{ConfigError, DefinitionDefaults, EngineConfig};
pub use metrics::TickMetrics;
pub use registry::{DefinitionBuilder, Registry, RegistryError, RunPlan, Selection, TestDefinition};
pub use scenario::{Scenario, ScenarioState};
pub use scheduler::{AdmitError, Admission, Scheduler};
