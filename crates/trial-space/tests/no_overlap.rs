//! Property tests: live regions never overlap and always stay inside the
//! world, under any interleaving of reservations and releases.

use proptest::prelude::*;
use trial_core::{BlockPos, Bounds, Extent, Rotation};
use trial_space::{AllocError, RegionAllocator};

#[derive(Clone, Debug)]
enum Op {
    Reserve { x: u32, z: u32, padding: u32, turns: u64 },
    Release { pick: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (1u32..9, 1u32..9, 0u32..3, 0u64..4)
            .prop_map(|(x, z, padding, turns)| Op::Reserve { x, z, padding, turns }),
        1 => (0usize..64).prop_map(|pick| Op::Release { pick }),
    ]
}

fn assert_disjoint(alloc: &RegionAllocator) {
    let live: Vec<_> = alloc.live().cloned().collect();
    for (i, a) in live.iter().enumerate() {
        assert!(
            alloc.world().contains_xz(&a.footprint()),
            "region {} escapes the world",
            a.id()
        );
        for b in &live[i + 1..] {
            assert!(
                !a.footprint().intersects_xz(&b.footprint()),
                "regions {} and {} overlap: {} vs {}",
                a.id(),
                b.id(),
                a.footprint(),
                b.footprint()
            );
        }
    }
}

proptest! {
    #[test]
    fn live_regions_never_overlap(ops in prop::collection::vec(arb_op(), 1..120)) {
        let world = Bounds::new(BlockPos::new(-16, 0, -16), Extent::new(40, 16, 40));
        let mut alloc = RegionAllocator::new(world, 4096);
        let mut ids = Vec::new();

        for op in ops {
            match op {
                Op::Reserve { x, z, padding, turns } => {
                    let rotation = Rotation::from_quarter_turns(turns);
                    match alloc.reserve(Extent::new(x, 4, z), padding, rotation) {
                        Ok(handle) => ids.push(handle.id()),
                        Err(AllocError::NoSpace { .. }) => {}
                        Err(other) => prop_assert!(false, "unexpected error {other:?}"),
                    }
                }
                Op::Release { pick } => {
                    if !ids.is_empty() {
                        let id = ids.remove(pick % ids.len());
                        prop_assert!(alloc.release(id).is_ok());
                        prop_assert!(alloc.release(id).is_err());
                    }
                }
            }
            assert_disjoint(&alloc);
            prop_assert_eq!(alloc.live_count(), ids.len());
        }
    }

    #[test]
    fn placement_is_reproducible(sizes in prop::collection::vec((1u32..7, 1u32..7), 1..30)) {
        let world = Bounds::new(BlockPos::ORIGIN, Extent::new(48, 8, 48));
        let run = || {
            let mut alloc = RegionAllocator::new(world, 4096);
            sizes
                .iter()
                .map(|&(x, z)| {
                    alloc
                        .reserve(Extent::new(x, 2, z), 1, Rotation::None)
                        .ok()
                        .map(|h| h.footprint())
                })
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(run(), run());
    }
}

#[test]
fn a_released_world_accepts_a_world_sized_region() {
    let world = Bounds::new(BlockPos::ORIGIN, Extent::new(16, 8, 16));
    let mut alloc = RegionAllocator::new(world, 4096);
    let handles: Vec<_> = (0..4)
        .map(|_| alloc.reserve(Extent::new(8, 2, 8), 0, Rotation::None).unwrap())
        .collect();
    assert!(alloc.reserve(Extent::new(16, 2, 16), 0, Rotation::None).is_err());
    for h in &handles {
        alloc.release(h.id()).unwrap();
    }
    let big = alloc
        .reserve(Extent::new(16, 2, 16), 0, Rotation::None)
        .unwrap();
    assert_eq!(big.footprint().min, BlockPos::ORIGIN);
}
