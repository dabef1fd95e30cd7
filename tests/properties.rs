//! Behavioral guarantees of the simulation core, exercised through the public API

use glam::{DVec3, IVec3};

use ballistic_core::ballistics::{BallisticSolver, Launch, SolverParams};
use ballistic_core::kinematics::{
    DragCoefficients, EmptyWorld, FlatGround, ForceOrder, KinematicModel, Kinematics, ModelParams,
    MotionInput, VoxelWorld,
};
use ballistic_core::rotation::{
    OwnerId, Priority, Rotation, RotationRequest, RotationScheduler, SchedulerConfig,
};
use ballistic_core::simulation::{SimulationCache, SimulationError};

fn obstacle_course() -> VoxelWorld {
    let mut world = VoxelWorld::new().with_floor(-1, 12);
    for z in -2..=2 {
        world.set_solid(IVec3::new(4, 0, z));
    }
    world.set_solid(IVec3::new(6, 1, 0));
    world
}

fn flat_projectile(gravity: f64, drag: f64) -> ModelParams {
    ModelParams {
        gravity,
        drag: DragCoefficients::uniform(drag, 0.8),
        force_order: ForceOrder::DragThenGravity,
        ..ModelParams::thrown_projectile()
    }
}

#[test]
fn test_stepping_is_deterministic() {
    let world = obstacle_course();
    let model = KinematicModel::new(ModelParams::player(), &world);
    let inputs: Vec<MotionInput> = (0..80)
        .map(|i| {
            MotionInput::walking(1.0, if i % 7 < 3 { 1.0 } else { 0.0 }, -90.0 + i as f32)
                .with_jump(i % 11 == 0)
                .with_sprint(i % 2 == 0)
        })
        .collect();

    let run = || {
        let mut state = model.params().spawn(DVec3::new(0.5, 0.0, 0.5), DVec3::ZERO).grounded(true);
        for input in &inputs {
            state = model.step(&state, input);
        }
        state
    };

    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert!(first.position.x.is_finite());
}

#[test]
fn test_memoized_snapshot_equals_fresh_simulation() {
    let world = obstacle_course();
    let model = KinematicModel::new(ModelParams::player(), &world);
    let start = model.params().spawn(DVec3::new(0.5, 0.0, 0.5), DVec3::ZERO).grounded(true);
    let input = MotionInput::walking(1.0, 0.0, -90.0).with_jump(true);

    let mut warm = SimulationCache::new(&model, start, input);
    warm.snapshot_at(5).unwrap();
    let memoized = warm.snapshot_at(3).unwrap();

    let mut fresh = SimulationCache::new(&model, start, input);
    assert_eq!(memoized, fresh.snapshot_at(3).unwrap());
}

#[test]
fn test_horizon_is_enforced() {
    let model = KinematicModel::new(ModelParams::thrown_projectile(), EmptyWorld);
    let mut cache = SimulationCache::new(
        &model,
        model.params().spawn(DVec3::ZERO, DVec3::new(1.5, 0.0, 0.0)),
        MotionInput::idle(),
    );
    let horizon = model.horizon();

    match cache.snapshot_at(horizon + 1) {
        Err(SimulationError::BeyondHorizon { requested, horizon: limit }) => {
            assert_eq!(requested, horizon + 1);
            assert_eq!(limit, horizon);
        }
        other => panic!("expected horizon error, got {other:?}"),
    }
    // Nothing was simulated for the rejected request
    assert_eq!(cache.simulated_ticks(), 0);
}

#[test]
fn test_rotation_resolution_is_deterministic() {
    let config = SchedulerConfig {
        max_turn_rate: 180.0,
        ..SchedulerConfig::default()
    };
    let (low, high) = (OwnerId::new(), OwnerId::new());

    let mut scheduler = RotationScheduler::new(config, Rotation::ZERO);
    scheduler.submit(RotationRequest::yaw_only(10.0, Priority(1), low));
    scheduler.submit(RotationRequest::yaw_only(20.0, Priority(5), high));
    let resolved = scheduler.end_tick();
    assert_eq!(resolved.target.map(|t| t.rotation.yaw), Some(20.0));

    let (first, second) = (OwnerId::new(), OwnerId::new());
    let mut scheduler = RotationScheduler::new(config, Rotation::ZERO);
    scheduler.submit(RotationRequest::yaw_only(20.0, Priority(5), first));
    scheduler.submit(RotationRequest::yaw_only(10.0, Priority(5), second));
    let resolved = scheduler.end_tick();
    assert_eq!(resolved.target.map(|t| t.owner), Some(first));
    assert_eq!(resolved.current.yaw, 20.0);
}

#[test]
fn test_turn_rate_bounds_every_tick() {
    for rate in [2.0f32, 10.0, 35.0] {
        let config = SchedulerConfig {
            max_turn_rate: rate,
            ..SchedulerConfig::default()
        };
        let mut scheduler = RotationScheduler::new(config, Rotation::new(-30.0, 20.0));
        let owner = OwnerId::new();

        for tick in 0..60 {
            let target = if tick < 30 {
                Rotation::new(150.0, -60.0)
            } else {
                Rotation::new(-120.0, 45.0)
            };
            let before = scheduler.current_rotation();
            scheduler.submit(RotationRequest::new(target, Priority::NORMAL, owner));
            let after = scheduler.end_tick().current;

            assert!((after.yaw - before.yaw).abs() <= rate + 1e-3, "rate {rate}, tick {tick}");
            assert!((after.pitch - before.pitch).abs() <= rate + 1e-3, "rate {rate}, tick {tick}");
        }
    }
}

#[test]
fn test_solution_resimulates_onto_target() {
    let model = KinematicModel::new(flat_projectile(0.08, 0.99), FlatGround::at(-10.0));
    let solver = BallisticSolver::new(&model, SolverParams::default());
    let launch = Launch::new(DVec3::ZERO, 1.5);

    for target in [
        DVec3::new(10.0, -2.0, 0.0),
        DVec3::new(-6.0, 1.0, 8.0),
        DVec3::new(3.0, -5.0, -12.0),
        DVec3::new(0.0, 0.0, 15.0),
    ] {
        let solution = solver
            .solve_static(&launch, target)
            .unwrap_or_else(|| panic!("no solution for {target}"));
        let flight = solver.flight(&launch, &solution.rotation);
        let miss = flight.closest_approach(target).distance;
        assert!(miss <= 0.1, "missed {target} by {miss}");
    }
}

#[test]
fn test_unreachable_target_has_no_solution() {
    let model = KinematicModel::new(flat_projectile(0.08, 0.99), EmptyWorld);
    let solver = BallisticSolver::new(&model, SolverParams::default());
    let launch = Launch::new(DVec3::ZERO, 1.5);

    assert!(solver.solve_static(&launch, DVec3::new(300.0, 0.0, 0.0)).is_none());
    assert!(solver.solve_static(&launch, DVec3::new(0.0, 200.0, 0.0)).is_none());
}
