//! Benchmark workloads for the trial engine.
//!
//! Provides seeded, reproducible suites against [`BlockWorld`]:
//!
//! - [`reference_profile`]: 200 mixed tests in the default 256x256 world
//! - [`crowded_profile`]: 400 tests in a 48x48 world, so most of them wait
//!   for space
//! - [`populate`]: the generator behind both, for custom [`WorkloadSpec`]s

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use trial_core::{ensure, BlockPos, Extent, Failure, TestId};
use trial_engine::{EngineConfig, Registry, RegistryError};
use trial_sim::{Block, BlockWorld};

/// Shape of a generated suite.
#[derive(Clone, Debug)]
pub struct WorkloadSpec {
    /// Number of tests.
    pub tests: usize,
    /// Largest footprint side (x and z), before padding.
    pub max_side: u32,
    /// Longest time until a test's condition holds.
    pub max_duration: u64,
    /// Number of distinct batch keys.
    pub batch_keys: usize,
    /// Probability that a test joins a batch.
    pub batch_share: f64,
    /// Probability that a test fails its first attempt.
    pub flaky_share: f64,
}

impl Default for WorkloadSpec {
    fn default() -> Self {
        Self {
            tests: 200,
            max_side: 8,
            max_duration: 20,
            batch_keys: 4,
            batch_share: 0.1,
            flaky_share: 0.05,
        }
    }
}

/// Register `spec.tests` generated tests in `registry`.
///
/// Each test schedules a block `duration` ticks ahead and succeeds once it
/// appears. The same seed always yields the same suite.
pub fn populate(
    registry: &mut Registry<BlockWorld>,
    spec: &WorkloadSpec,
    seed: u64,
) -> Result<Vec<TestId>, RegistryError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut ids = Vec::with_capacity(spec.tests);
    for i in 0..spec.tests {
        let x = rng.random_range(1..=spec.max_side);
        let z = rng.random_range(1..=spec.max_side);
        let duration = rng.random_range(1..=spec.max_duration);
        let flaky = rng.random_bool(spec.flaky_share);
        let batch = (spec.batch_keys > 0 && rng.random_bool(spec.batch_share))
            .then(|| format!("batch-{}", rng.random_range(0..spec.batch_keys)));

        let failures_left = Arc::new(AtomicU32::new(u32::from(flaky)));
        let mut builder = registry
            .register("bench", format!("t{i:04}"), move |ctx| {
                if failures_left
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
                    .is_ok()
                {
                    return Err(Failure::new("first attempt fails"));
                }
                let pos = ctx.absolute(BlockPos::ORIGIN);
                ctx.world_mut().schedule(duration, pos, Some(Block::Stone));
                ctx.succeed_when(move |ctx| ensure(ctx.world().block(pos).is_some(), "not yet"));
                Ok(())
            })
            .size(Extent::new(x, 2, z))
            .max_ticks(spec.max_duration * 2 + 1)
            .max_attempts(if flaky { 2 } else { 1 })
            .rotate(x != z);
        if let Some(key) = batch {
            builder = builder.batch(key);
        }
        ids.push(builder.submit()?);
    }
    Ok(ids)
}

/// A configured suite: engine configuration plus registered tests.
pub type Profile = (EngineConfig, Registry<BlockWorld>);

/// Default world, 200 mixed tests.
pub fn reference_profile(seed: u64) -> Result<Profile, RegistryError> {
    let config = EngineConfig::default();
    let mut registry = Registry::new(config.defaults.clone());
    populate(&mut registry, &WorkloadSpec::default(), seed)?;
    Ok((config, registry))
}

/// A 48x48 world and 400 tests; space is the bottleneck.
pub fn crowded_profile(seed: u64) -> Result<Profile, RegistryError> {
    let config = EngineConfig {
        width: 48,
        depth: 48,
        ..EngineConfig::default()
    };
    let spec = WorkloadSpec {
        tests: 400,
        ..WorkloadSpec::default()
    };
    let mut registry = Registry::new(config.defaults.clone());
    populate(&mut registry, &spec, seed)?;
    Ok((config, registry))
}
