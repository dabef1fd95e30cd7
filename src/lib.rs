//! Tick-stepped physics simulation, ballistic aiming and rotation arbitration
//!
//! - [`kinematics`]: one-tick motion of players and projectiles
//! - [`simulation`]: memoized lookahead per tracked subject
//! - [`ballistics`]: launch rotations that reach a (moving) target
//! - [`rotation`]: priority-arbitrated, rate-limited look direction
//! - [`game`]: headless driver used by the `ballistic-sim` binary

pub mod ballistics;
pub mod config;
pub mod game;
pub mod kinematics;
pub mod rotation;
pub mod simulation;
pub mod util;
