//! Reusable test bodies.
//!
//! - [`succeed_immediately`] resolves in the activation tick.
//! - [`succeed_after`] resolves `n` ticks after activation.
//! - [`fail_with`] fails in the activation tick.
//! - [`never_finishes`] does nothing, so only a timeout ends it.
//! - [`Flaky`] fails a fixed number of attempts, then succeeds.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use trial_core::{Failure, World};
use trial_sequence::{Body, TestContext};

/// Succeeds in the activation tick, before any step runs.
pub fn succeed_immediately<W: World>() -> Body<W> {
    Arc::new(|ctx: &mut TestContext<'_, W>| {
        ctx.succeed();
        Ok(())
    })
}

/// Succeeds when the scenario-relative tick reaches `ticks`.
pub fn succeed_after<W: World>(ticks: u64) -> Body<W> {
    Arc::new(move |ctx: &mut TestContext<'_, W>| {
        ctx.succeed_on_tick(ticks);
        Ok(())
    })
}

/// Fails in the activation tick with `message`.
pub fn fail_with<W: World>(message: &'static str) -> Body<W> {
    Arc::new(move |_: &mut TestContext<'_, W>| Err(Failure::new(message)))
}

/// Returns without queueing anything; only a timeout or a cancellation
/// ends the scenario.
pub fn never_finishes<W: World>() -> Body<W> {
    Arc::new(|_: &mut TestContext<'_, W>| Ok(()))
}

/// Fails the first `failures` attempts, then succeeds.
///
/// Uses an `AtomicUsize` attempt counter so the body stays `Fn + Sync`.
pub struct Flaky {
    failures: usize,
    attempts: Arc<AtomicUsize>,
}

impl Flaky {
    /// A body that fails its first `failures` invocations.
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many times the body has been invoked.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    /// The body to register. Every body built from one `Flaky` shares its
    /// attempt counter.
    pub fn body<W: World>(&self) -> Body<W> {
        let failures = self.failures;
        let attempts = Arc::clone(&self.attempts);
        Arc::new(move |ctx: &mut TestContext<'_, W>| {
            let n = attempts.fetch_add(1, Ordering::Relaxed);
            if n < failures {
                return Err(Failure::new(format!("deliberate failure on attempt {}", n + 1)));
            }
            ctx.succeed();
            Ok(())
        })
    }
}
