//! Inverse ballistics: which way to face so a projectile reaches a target

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::kinematics::Kinematics;
use crate::rotation::Rotation;

use super::analytic::{self, AnalyticEstimate};
use super::flight::{simulate_flight, Flight, Launch};
use super::target::{ConstantPosition, PositionExtrapolation};

/// Horizontal distance below which the target counts as straight up or down
const VERTICAL_SHOT_DISTANCE: f64 = 1.0e-6;

/// Arrival-tick change (in ticks) at which the moving-target search stops
const ARRIVAL_CONVERGENCE: f64 = 0.1;

/// Smallest pitch interval the bisection keeps splitting
const PITCH_RESOLUTION: f32 = 1.0e-4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    /// Largest accepted distance between the flight and the target
    pub tolerance: f64,
    /// Longest flight simulated, in ticks
    pub horizon: u32,
    /// Pitch bisection steps per search
    pub max_iterations: u32,
    /// Arrival-tick refinements for moving targets
    pub arrival_iterations: u32,
    /// Coarse scan step, in degrees, used to bracket the low arc
    pub pitch_scan_step: f32,
    pub min_pitch: f32,
    pub max_pitch: f32,
    /// Try the closed form before searching
    pub use_analytic: bool,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            tolerance: 0.1,
            horizon: 240,
            max_iterations: 60,
            arrival_iterations: 8,
            pitch_scan_step: 5.0,
            min_pitch: -89.9,
            max_pitch: 89.9,
            use_analytic: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveMethod {
    /// Closed-form estimate confirmed by simulation
    Analytic,
    /// Pitch search over simulated flights
    Iterative,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallisticSolution {
    pub rotation: Rotation,
    /// Fractional tick at which the flight passes closest to the target
    pub arrival_tick: f64,
    /// Flight position at that tick
    pub impact: DVec3,
    /// Target position at that tick
    pub target: DVec3,
    pub miss_distance: f64,
    pub method: SolveMethod,
}

/// Finds launch rotations by simulating flights with the same model that
/// predicts them.
#[derive(Debug, Clone)]
pub struct BallisticSolver<M> {
    model: M,
    params: SolverParams,
}

impl<M: Kinematics> BallisticSolver<M> {
    pub fn new(model: M, params: SolverParams) -> Self {
        Self { model, params }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    fn horizon(&self) -> u32 {
        self.params.horizon.min(self.model.horizon())
    }

    /// Simulated flight for a candidate rotation
    pub fn flight(&self, launch: &Launch, rotation: &Rotation) -> Flight {
        simulate_flight(&self.model, launch, rotation, self.horizon())
    }

    /// Closed-form aim, ignoring collision
    pub fn estimate<T: PositionExtrapolation + ?Sized>(&self, launch: &Launch, target: &T) -> Option<AnalyticEstimate> {
        let params = self.model.params();
        let estimate = analytic::estimate(
            launch.origin,
            launch.inherited,
            launch.speed,
            params.drag.air.x,
            params.effective_gravity(),
            target,
        )?;

        // The closed form has no notion of roll; take it back out of the aim
        let rotation = Rotation::new(estimate.rotation.yaw, estimate.rotation.pitch - launch.roll);
        Some(AnalyticEstimate { rotation, ..estimate })
    }

    pub fn solve_static(&self, launch: &Launch, point: DVec3) -> Option<BallisticSolution> {
        self.solve(launch, &ConstantPosition(point))
    }

    /// Launch rotation whose flight reaches `target` within tolerance, or
    /// `None` when the target is out of reach
    pub fn solve<T: PositionExtrapolation + ?Sized>(&self, launch: &Launch, target: &T) -> Option<BallisticSolution> {
        if self.params.use_analytic {
            if let Some(solution) = self.confirm_estimate(launch, target) {
                return Some(solution);
            }
            debug!("Closed-form aim missed, searching by simulation");
        }

        let iterations = if target.is_static() {
            1
        } else {
            self.params.arrival_iterations.max(1)
        };

        let mut arrival = 0.0;
        let mut goal = target.position_at(arrival);
        let mut found = None;

        for iteration in 0..iterations {
            let (rotation, flight) = self.search_pitch(launch, goal)?;
            let approach = flight.closest_approach(goal);
            let converged = target.is_static() || (approach.tick - arrival).abs() < ARRIVAL_CONVERGENCE;
            trace!(iteration, arrival = approach.tick, converged, "Arrival tick refinement");

            found = Some((rotation, flight, converged));
            if converged {
                break;
            }
            arrival = approach.tick;
            goal = target.position_at(arrival);
        }

        let (rotation, flight, converged) = found?;
        if !converged {
            debug!(arrival, "Arrival tick never settled");
            return None;
        }

        let solution = self.meet(rotation, &flight, target, SolveMethod::Iterative);
        if solution.miss_distance > self.params.tolerance {
            debug!(
                miss = solution.miss_distance,
                tolerance = self.params.tolerance,
                "Target unreachable"
            );
            return None;
        }
        Some(solution)
    }

    /// Accepts the closed-form aim only if a simulated flight actually hits
    fn confirm_estimate<T: PositionExtrapolation + ?Sized>(&self, launch: &Launch, target: &T) -> Option<BallisticSolution> {
        let estimate = self.estimate(launch, target)?;
        if !(self.params.min_pitch..=self.params.max_pitch).contains(&estimate.rotation.pitch) {
            return None;
        }

        let flight = self.flight(launch, &estimate.rotation);
        let solution = self.meet(estimate.rotation, &flight, target, SolveMethod::Analytic);
        if solution.miss_distance > self.params.tolerance {
            trace!(miss = solution.miss_distance, "Closed-form flight missed");
            return None;
        }
        Some(solution)
    }

    /// Where the flight and the target are at the tick they come closest
    fn meet<T: PositionExtrapolation + ?Sized>(
        &self,
        rotation: Rotation,
        flight: &Flight,
        target: &T,
        method: SolveMethod,
    ) -> BallisticSolution {
        let meeting = flight.meeting(target);
        BallisticSolution {
            rotation,
            arrival_tick: meeting.tick,
            impact: meeting.position,
            target: target.position_at(meeting.tick),
            miss_distance: meeting.distance,
            method,
        }
    }

    /// Height of the flight where it reaches the target's horizontal distance.
    /// Flights that end short count as infinitely low unless they ended on
    /// the target itself.
    fn height_at_goal(&self, launch: &Launch, goal: DVec3, distance: f64, rotation: &Rotation) -> (f64, Flight) {
        let flight = self.flight(launch, rotation);
        let height = match flight.crossing(launch.origin, distance) {
            Some(crossing) => crossing.position.y,
            None if flight.terminal().distance(goal) <= self.params.tolerance => goal.y,
            None => f64::NEG_INFINITY,
        };
        (height, flight)
    }

    /// Low-arc pitch toward a fixed point. Yaw is the horizontal bearing.
    fn search_pitch(&self, launch: &Launch, goal: DVec3) -> Option<(Rotation, Flight)> {
        let p = &self.params;
        let delta = goal - launch.origin;
        let distance = delta.x.hypot(delta.z);

        if distance < VERTICAL_SHOT_DISTANCE {
            let pitch = if delta.y > 0.0 { p.min_pitch } else { p.max_pitch };
            let rotation = Rotation::new(0.0, pitch - launch.roll);
            let flight = self.flight(launch, &rotation);
            return Some((rotation, flight));
        }

        let yaw = Rotation::from_direction(delta).yaw;
        let height = |pitch: f32| {
            let rotation = Rotation::new(yaw, pitch);
            self.height_at_goal(launch, goal, distance, &rotation)
        };

        // Bracket: the highest-reaching pitch, then the low arc lies between
        // it and the steepest downward pitch
        let step = p.pitch_scan_step.max(0.1);
        let mut best_pitch = p.min_pitch;
        let mut best_height = f64::NEG_INFINITY;
        let mut pitch = p.min_pitch;
        while pitch <= p.max_pitch {
            let (h, _) = height(pitch);
            if h > best_height {
                best_height = h;
                best_pitch = pitch;
            }
            pitch += step;
        }

        if best_height < goal.y - p.tolerance {
            debug!(
                best_height,
                goal_height = goal.y,
                distance,
                "No pitch reaches target height"
            );
            return None;
        }
        if best_height < goal.y {
            let (_, flight) = height(best_pitch);
            return Some((Rotation::new(yaw, best_pitch), flight));
        }

        let (mut lo, mut hi) = (best_pitch, p.max_pitch);
        let (hi_height, hi_flight) = height(hi);
        if hi_height >= goal.y {
            return Some((Rotation::new(yaw, hi), hi_flight));
        }

        let mut pitch = 0.5 * (lo + hi);
        let mut flight = hi_flight;
        for iteration in 0..p.max_iterations.max(1) {
            pitch = 0.5 * (lo + hi);
            let (h, candidate) = height(pitch);
            trace!(iteration, pitch, height = h, "Pitch bisection");
            flight = candidate;

            if (h - goal.y).abs() < p.tolerance * 1.0e-2 || hi - lo < PITCH_RESOLUTION {
                break;
            }
            if h >= goal.y {
                lo = pitch;
            } else {
                hi = pitch;
            }
        }

        Some((Rotation::new(yaw, pitch), flight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballistics::target::LinearExtrapolation;
    use crate::kinematics::{
        DragCoefficients, EmptyWorld, FlatGround, ForceOrder, KinematicModel, ModelParams,
    };

    fn scenario_params() -> ModelParams {
        ModelParams {
            gravity: 0.08,
            drag: DragCoefficients::uniform(0.99, 0.8),
            force_order: ForceOrder::DragThenGravity,
            ..ModelParams::thrown_projectile()
        }
    }

    fn iterative_only() -> SolverParams {
        SolverParams {
            use_analytic: false,
            ..SolverParams::default()
        }
    }

    #[test]
    fn test_scenario_shot_lands_on_target() {
        let solver = BallisticSolver::new(
            KinematicModel::new(scenario_params(), EmptyWorld),
            SolverParams::default(),
        );
        let launch = Launch::new(DVec3::ZERO, 1.5);
        let target = DVec3::new(10.0, -2.0, 0.0);

        let solution = solver.solve_static(&launch, target).unwrap();
        assert!(solution.rotation.pitch > 0.0 && solution.rotation.pitch < 45.0);

        let flight = solver.flight(&launch, &solution.rotation);
        assert!(flight.closest_approach(target).distance <= 0.1);
    }

    #[test]
    fn test_iterative_search_agrees_with_closed_form() {
        let model = KinematicModel::new(scenario_params(), EmptyWorld);
        let launch = Launch::new(DVec3::ZERO, 1.5);
        let target = DVec3::new(10.0, -2.0, 0.0);

        let searched = BallisticSolver::new(&model, iterative_only())
            .solve_static(&launch, target)
            .unwrap();
        assert_eq!(searched.method, SolveMethod::Iterative);
        assert!((searched.rotation.yaw + 90.0).abs() < 1e-3);

        let estimate = BallisticSolver::new(&model, SolverParams::default())
            .estimate(&launch, &ConstantPosition(target))
            .unwrap();
        assert!((searched.rotation.pitch - estimate.rotation.pitch).abs() < 0.5);
    }

    #[test]
    fn test_out_of_range_has_no_solution() {
        let solver = BallisticSolver::new(
            KinematicModel::new(scenario_params(), EmptyWorld),
            SolverParams::default(),
        );
        let launch = Launch::new(DVec3::ZERO, 1.5);
        assert!(solver.solve_static(&launch, DVec3::new(300.0, 0.0, 0.0)).is_none());
        assert!(solver.solve_static(&launch, DVec3::new(5.0, 200.0, 0.0)).is_none());
    }

    #[test]
    fn test_target_on_floor_is_hit_despite_collision() {
        let model = KinematicModel::new(ModelParams::thrown_projectile(), FlatGround::at(0.0));
        let solver = BallisticSolver::new(model, iterative_only());
        let launch = Launch::new(DVec3::new(0.0, 1.5, 0.0), 1.5);
        let target = DVec3::new(0.0, 0.0, 20.0);

        let solution = solver.solve_static(&launch, target).unwrap();
        let flight = solver.flight(&launch, &solution.rotation);
        assert!(flight.closest_approach(target).distance <= 0.1);
        assert!(solution.rotation.yaw.abs() < 1e-3);
    }

    #[test]
    fn test_moving_target_is_led() {
        let model = KinematicModel::new(ModelParams::thrown_projectile(), EmptyWorld);
        let solver = BallisticSolver::new(&model, iterative_only());
        let launch = Launch::new(DVec3::ZERO, 1.5);
        let target = LinearExtrapolation::new(DVec3::new(15.0, 0.0, 0.0), DVec3::new(0.0, 0.0, 0.2));

        let solution = solver.solve(&launch, &target).unwrap();
        let expected = target.position_at(solution.arrival_tick);
        assert!(solution.target.distance(expected) < 0.2);
        // Aimed ahead of the target's current position
        assert!(solution.rotation.yaw > -90.0);

        let flight = solver.flight(&launch, &solution.rotation);
        assert!(flight.closest_approach(solution.target).distance <= 0.1);
    }

    #[test]
    fn test_unsettled_arrival_is_rejected() {
        let model = KinematicModel::new(ModelParams::thrown_projectile(), EmptyWorld);
        let solver = BallisticSolver::new(
            &model,
            SolverParams {
                arrival_iterations: 1,
                ..iterative_only()
            },
        );
        let launch = Launch::new(DVec3::ZERO, 1.5);
        let target = LinearExtrapolation::new(DVec3::new(12.0, 0.0, 0.0), DVec3::new(0.0, 0.0, 0.4));

        // One refinement aims at where the target is now, not where it will be
        assert!(solver.solve(&launch, &target).is_none());
    }

    #[test]
    fn test_miss_is_measured_where_the_flight_arrives() {
        let model = KinematicModel::new(ModelParams::thrown_projectile(), EmptyWorld);
        let launch = Launch::new(DVec3::ZERO, 1.5);
        let weaving = |t: f64| DVec3::new(12.0, 0.0, 6.0 * (1.3 * t).sin());

        for params in [SolverParams::default(), iterative_only()] {
            let solver = BallisticSolver::new(&model, params);
            let Some(solution) = solver.solve(&launch, &weaving) else {
                continue;
            };
            let flight = solver.flight(&launch, &solution.rotation);
            let arrival = solution.arrival_tick;
            let true_miss = flight.position_at(arrival).distance(weaving(arrival));
            assert!((true_miss - solution.miss_distance).abs() < 1e-9);
            assert!(true_miss <= params.tolerance);
            assert_eq!(solution.target, weaving(arrival));
        }
    }

    #[test]
    fn test_straight_down() {
        let model = KinematicModel::new(ModelParams::thrown_projectile(), EmptyWorld);
        let solver = BallisticSolver::new(model, iterative_only());
        let launch = Launch::new(DVec3::new(0.0, 10.0, 0.0), 1.5);
        let solution = solver.solve_static(&launch, DVec3::ZERO).unwrap();
        assert!(solution.rotation.pitch > 89.0);
    }
}
