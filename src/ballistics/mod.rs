//! Projectile flight and launch-angle solving

pub mod analytic;
pub mod flight;
pub mod solver;
pub mod target;

pub use analytic::AnalyticEstimate;
pub use flight::{simulate_flight, Approach, Flight, Launch};
pub use solver::{BallisticSolution, BallisticSolver, SolveMethod, SolverParams};
pub use target::{ConstantPosition, LinearExtrapolation, PositionExtrapolation, SampledPath};
