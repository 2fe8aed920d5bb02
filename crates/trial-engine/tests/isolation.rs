//! Property test: whatever mix of sizes and durations is admitted, live
//! scenarios never share world space and every test eventually runs.

use std::sync::Arc;

use proptest::prelude::*;
use trial_core::Extent;
use trial_engine::{EngineConfig, Registry, Scheduler};
use trial_test_utils::{fixtures, MockWorld};

fn assert_isolated(sched: &Scheduler<MockWorld>) {
    let live: Vec<_> = sched.live().collect();
    let world = sched.config().world_bounds();
    for (i, a) in live.iter().enumerate() {
        let fa = a.region().footprint();
        assert!(world.contains_xz(&fa), "{fa} escapes {world}");
        for b in &live[i + 1..] {
            let fb = b.region().footprint();
            assert!(
                !fa.intersects_xz(&fb),
                "scenarios {} and {} overlap: {fa} vs {fb}",
                a.id(),
                b.id()
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn live_regions_never_overlap(
        tests in prop::collection::vec((1u32..7, 1u32..7, 0u32..3, 1u64..12, any::<bool>()), 1..24)
    ) {
        let cfg = EngineConfig {
            width: 24,
            depth: 24,
            height: 16,
            ..EngineConfig::default()
        };
        let mut reg = Registry::default();
        let mut sched = Scheduler::new(cfg, MockWorld::new()).unwrap();
        for (i, (x, z, padding, ticks, rotate)) in tests.iter().copied().enumerate() {
            let id = reg
                .register_body("prop", format!("t{i}"), fixtures::succeed_after(ticks))
                .size(Extent::new(x, 2, z))
                .padding(padding)
                .rotate(rotate)
                .submit()
                .unwrap();
            sched.admit(Arc::clone(reg.get(id).unwrap())).unwrap();
            assert_isolated(&sched);
        }

        let mut budget = 2_000;
        while !sched.is_idle() && budget > 0 {
            sched.tick();
            assert_isolated(&sched);
            budget -= 1;
        }
        prop_assert!(sched.is_idle());
        let report = sched.report();
        prop_assert!(report.passed, "{}", report.render_table());
        prop_assert_eq!(report.totals.succeeded as usize, tests.len());
        prop_assert_eq!(sched.allocator().live_count(), 0);
    }
}
