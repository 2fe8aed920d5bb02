//! Criterion benchmarks for whole runs and single ticks of the scheduler.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use trial_bench::{crowded_profile, reference_profile};
use trial_engine::{RunPlan, Scheduler};
use trial_sim::BlockWorld;

/// Benchmark: run the 200-test reference suite to completion.
fn bench_reference_run(c: &mut Criterion) {
    let (config, registry) = reference_profile(42).unwrap();

    c.bench_function("run_reference_200", |b| {
        b.iter_batched(
            || Scheduler::new(config.clone(), BlockWorld::new()).unwrap(),
            |mut scheduler| {
                scheduler.schedule(RunPlan::all().select(&registry));
                black_box(scheduler.run_until_idle(10_000))
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark: run the crowded suite, where most admissions wait for space.
fn bench_crowded_run(c: &mut Criterion) {
    let (config, registry) = crowded_profile(42).unwrap();

    c.bench_function("run_crowded_400", |b| {
        b.iter_batched(
            || Scheduler::new(config.clone(), BlockWorld::new()).unwrap(),
            |mut scheduler| {
                scheduler.schedule(RunPlan::all().select(&registry));
                black_box(scheduler.run_until_idle(100_000))
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark: one tick with the whole reference suite live.
fn bench_single_tick(c: &mut Criterion) {
    let (config, registry) = reference_profile(7).unwrap();
    let mut scheduler = Scheduler::new(config, BlockWorld::new()).unwrap();
    scheduler.schedule(RunPlan::all().select(&registry));

    c.bench_function("tick_reference_live", |b| {
        b.iter(|| {
            // Refill once the suite drains so every sample has live work.
            if scheduler.is_idle() {
                scheduler.schedule(RunPlan::all().select(&registry));
            }
            black_box(scheduler.tick())
        });
    });
}

criterion_group!(
    benches,
    bench_reference_run,
    bench_crowded_run,
    bench_single_tick
);
criterion_main!(benches);
