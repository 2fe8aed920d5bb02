//! Step sequencing for trial scenarios.
//!
//! A test body receives a [`TestContext`] and describes what should happen
//! over the following ticks: steps that run immediately, after a delay, or
//! repeatedly until a condition holds. The [`Sequencer`] owns those steps
//! and drives them one tick at a time on behalf of its scenario.
//!
//! # Tick semantics
//!
//! - Steps never consume ticks unless they explicitly wait: any number of
//!   immediate steps run back to back within one tick.
//! - Step *n + 1* never starts before step *n* completed.
//! - The first `Err` returned by any step body fails the scenario; queued
//!   steps are discarded.
//! - `fail_if` watches, timed actions and event subscriptions run alongside
//!   the queue rather than inside it.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod sequencer;
pub mod step;

pub use context::{Sequence, SubscriptionId, TestContext};
pub use sequencer::{Sequencer, Verdict};
pub use step::{Action, Body, EventHandler, Predicate, Step};
