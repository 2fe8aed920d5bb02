//! Scenarios against the reference block simulation, through the facade.

use trial::prelude::*;
use trial::sim::{Block, BlockWorld, WorldEvent};

fn run(registry: &Registry<BlockWorld>) -> (Scheduler<BlockWorld>, RunReport) {
    let mut scheduler = Scheduler::new(EngineConfig::default(), BlockWorld::new()).unwrap();
    let rejected = scheduler.schedule(RunPlan::all().select(registry));
    assert!(rejected.is_empty());
    let report = scheduler.run_until_idle(500);
    (scheduler, report)
}

#[test]
fn lever_sequence_lights_the_lamp() {
    let mut registry = Registry::<BlockWorld>::default();
    let id = registry
        .register("redstone", "lever_lamp", |ctx| {
            let lever = ctx.absolute(BlockPos::new(0, 0, 0));
            let lamp = ctx.absolute(BlockPos::new(0, 1, 0));
            ctx.world_mut().set_block(lever, Block::Lever { on: false });
            ctx.world_mut().set_block(lamp, Block::Lamp);
            ctx.start_sequence()
                .then_idle(3)
                .then_execute(move |ctx| {
                    ctx.world_mut().toggle_lever(lever);
                    // The lamp shares the lever's power through a pulse.
                    let level = ctx.world().power(lever);
                    ctx.world_mut().pulse(lamp, level);
                    Ok(())
                })
                .then_wait_within(5, move |ctx| {
                    ensure(ctx.world().is_lit(lamp), "lamp is dark")
                })
                .then_succeed();
            Ok(())
        })
        .submit()
        .unwrap();
    let (scheduler, report) = run(&registry);
    assert!(report.passed, "{}", report.render_table());
    assert_eq!(scheduler.reporter().status(id), Some(Status::Succeeded));
}

#[test]
fn falling_item_lands_on_the_plate() {
    let mut registry = Registry::<BlockWorld>::default();
    registry
        .register("physics", "item_falls", |ctx| {
            let plate = ctx.absolute(BlockPos::new(2, 0, 2));
            ctx.world_mut().set_block(plate, Block::Named("pressure_plate".into()));
            let spawn = ctx.absolute(BlockPos::new(2, 3, 2));
            ctx.world_mut().spawn("item", spawn);
            ctx.succeed_when_entity_present("item", BlockPos::new(2, 1, 2), true);
            Ok(())
        })
        .max_ticks(20)
        .submit()
        .unwrap();
    let (_, report) = run(&registry);
    assert!(report.passed, "{}", report.render_table());
}

#[test]
fn subscription_sees_scheduled_change() {
    let mut registry = Registry::<BlockWorld>::default();
    registry
        .register("events", "scheduled_sand", |ctx| {
            let target = ctx.absolute(BlockPos::new(1, 0, 1));
            ctx.world_mut().set_block(target.below(), Block::Stone);
            ctx.world_mut().schedule(4, target, Some(Block::Sand));
            ctx.subscribe(move |event, ctx| {
                if let WorldEvent::BlockChanged { pos, to: Some(Block::Sand), .. } = event {
                    if *pos == target {
                        ensure(ctx.tick() == 4, format!("sand arrived at tick {}", ctx.tick()))?;
                        ctx.succeed();
                    }
                }
                Ok(())
            });
            Ok(())
        })
        .submit()
        .unwrap();
    let (_, report) = run(&registry);
    assert!(report.passed, "{}", report.render_table());
}

#[test]
fn bounded_wait_fails_with_condition_never_met() {
    let mut registry = Registry::<BlockWorld>::default();
    let id = registry
        .register("redstone", "dark_lamp", |ctx| {
            let lamp = ctx.absolute(BlockPos::new(0, 0, 0));
            ctx.world_mut().set_block(lamp, Block::Lamp);
            ctx.start_sequence()
                .then_wait_within(10, move |ctx| ensure(ctx.world().is_lit(lamp), "lamp is dark"))
                .then_succeed();
            Ok(())
        })
        .submit()
        .unwrap();
    let (scheduler, report) = run(&registry);
    assert!(!report.passed);
    assert_eq!(report.exit_code(), 1);
    let record = scheduler.reporter().get(id).unwrap();
    assert_eq!(record.failure_kind, Some(FailureKind::ConditionNeverMet));
    assert!(record.message.as_deref().unwrap_or("").contains("lamp is dark"));
}

#[test]
fn finished_regions_are_wiped() {
    let mut registry = Registry::<BlockWorld>::default();
    registry
        .register("cleanup", "leaves_blocks", |ctx| {
            for x in 0..3 {
                let pos = ctx.absolute(BlockPos::new(x, 0, 0));
                ctx.world_mut().set_block(pos, Block::Stone);
            }
            let drop_at = ctx.absolute(BlockPos::new(1, 1, 0));
            ctx.world_mut().spawn("item", drop_at);
            ctx.succeed_on_tick(2);
            Ok(())
        })
        .submit()
        .unwrap();
    let (scheduler, report) = run(&registry);
    assert!(report.passed);
    let world = scheduler.world();
    assert_eq!(world.block_count(), 0);
    assert_eq!(world.entity_count_total(), 0);
}
