//! Tick-stepped body kinematics shared by the player and projectile simulators

pub mod collision;
pub mod model;
pub mod state;
pub mod world;

pub use collision::{Aabb, Axis, AxisOrder, CollisionFn, CollisionWorld, Medium};
pub use model::{
    CollisionResponse, DragCoefficients, ForceOrder, KinematicModel, Kinematics, ModelParams,
};
pub use state::{CollisionFlags, KinematicState, MotionInput};
pub use world::{EmptyWorld, FlatGround, VoxelWorld};

use glam::DVec3;

/// Converts key input relative to `yaw` into a world-space velocity change.
///
/// Diagonal input is normalized so strafing is not faster than walking.
/// The movement layer also uses this to re-derive velocity when rotation
/// arbitration asks for movement correction.
pub fn movement_input_to_velocity(forward: f32, sideways: f32, speed: f64, yaw: f32) -> DVec3 {
    let input = DVec3::new(f64::from(sideways), 0.0, f64::from(forward));
    let length_sq = input.length_squared();
    if length_sq < 1.0e-7 {
        return DVec3::ZERO;
    }

    let input = if length_sq > 1.0 { input.normalize() } else { input };
    let input = input * speed;
    let (sin, cos) = f64::from(yaw).to_radians().sin_cos();

    DVec3::new(
        input.x * cos - input.z * sin,
        input.y,
        input.z * cos + input.x * sin,
    )
}
