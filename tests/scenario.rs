use glam::DVec3;

use ballistic_core::ballistics::{
    simulate_flight, BallisticSolver, Launch, LinearExtrapolation, SolveMethod, SolverParams,
};
use ballistic_core::kinematics::{
    DragCoefficients, EmptyWorld, ForceOrder, KinematicModel, ModelParams,
};

fn pearl_model() -> KinematicModel<EmptyWorld> {
    let params = ModelParams {
        gravity: 0.08,
        drag: DragCoefficients::uniform(0.99, 0.8),
        force_order: ForceOrder::DragThenGravity,
        launch_speed: 1.5,
        ..ModelParams::thrown_projectile()
    };
    KinematicModel::new(params, EmptyWorld)
}

#[test]
fn test_reference_throw_lands_on_target() {
    let model = pearl_model();
    let solver = BallisticSolver::new(&model, SolverParams::default());
    let launch = Launch::new(DVec3::ZERO, 1.5);
    let target = DVec3::new(10.0, -2.0, 0.0);

    let solution = solver.solve_static(&launch, target).expect("target in range");
    assert!(
        solution.rotation.pitch > 0.0 && solution.rotation.pitch < 45.0,
        "pitch {}",
        solution.rotation.pitch
    );
    assert!((solution.rotation.yaw + 90.0).abs() < 0.5, "yaw {}", solution.rotation.yaw);

    // Independent re-simulation of the returned rotation
    let flight = simulate_flight(&model, &launch, &solution.rotation, 240);
    let approach = flight.closest_approach(target);
    assert!(approach.distance <= 0.1, "missed by {}", approach.distance);
    assert!(approach.tick > 0.0);
}

#[test]
fn test_analytic_and_iterative_agree_on_reference_throw() {
    let model = pearl_model();
    let launch = Launch::new(DVec3::ZERO, 1.5);
    let target = DVec3::new(10.0, -2.0, 0.0);

    let analytic = BallisticSolver::new(&model, SolverParams::default())
        .solve_static(&launch, target)
        .expect("analytic solution");
    let iterative = BallisticSolver::new(
        &model,
        SolverParams {
            use_analytic: false,
            ..SolverParams::default()
        },
    )
    .solve_static(&launch, target)
    .expect("iterative solution");

    assert_eq!(analytic.method, SolveMethod::Analytic);
    assert_eq!(iterative.method, SolveMethod::Iterative);
    assert!((analytic.rotation.pitch - iterative.rotation.pitch).abs() < 0.5);
}

#[test]
fn test_moving_target_is_met_at_arrival() {
    let model = pearl_model();
    let solver = BallisticSolver::new(&model, SolverParams::default());
    let launch = Launch::new(DVec3::ZERO, 1.5);
    let target = LinearExtrapolation::new(DVec3::new(12.0, 0.0, 4.0), DVec3::new(0.0, 0.0, -0.15));

    let solution = solver.solve(&launch, &target).expect("moving target in range");
    let flight = solver.flight(&launch, &solution.rotation);

    assert!(solution.miss_distance <= 0.1);
    assert!(flight.closest_approach(solution.target).distance <= 0.1);

    // The aim point is where the target is around the time the projectile
    // gets there, not where it stands now
    let actual = target.position + target.velocity * solution.arrival_tick;
    assert!(solution.target.distance(actual) < 1.0, "aimed {} vs {}", solution.target, actual);
    assert!(solution.target.distance(target.position) > 0.5);
}
