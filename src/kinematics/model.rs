//! One-tick motion rules: input acceleration, collision, gravity and drag

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::collision::{self, AxisOrder, CollisionWorld, Medium};
use super::movement_input_to_velocity;
use super::state::{CollisionFlags, KinematicState, MotionInput};

/// Distance below the feet probed to decide whether a body is supported
const GROUND_PROBE: f64 = 1.0e-3;

/// Step used to pull a sneaking body back from a ledge
const LEDGE_STEP: f64 = 0.05;

/// Per-axis velocity multipliers for each medium
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragCoefficients {
    pub air: DVec3,
    pub ground: DVec3,
    pub fluid: DVec3,
}

impl DragCoefficients {
    /// Same factor on every axis in air and on ground
    pub fn uniform(air: f64, fluid: f64) -> Self {
        Self {
            air: DVec3::splat(air),
            ground: DVec3::splat(air),
            fluid: DVec3::splat(fluid),
        }
    }
}

/// Whether gravity is subtracted before or after drag scales the velocity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceOrder {
    /// Living bodies: `vy -= g; v *= drag`
    GravityThenDrag,
    /// Thrown projectiles: `v *= drag; vy -= g`
    DragThenGravity,
}

/// What happens when the swept box meets geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionResponse {
    /// Axis-separated: each blocked axis is truncated, the others keep moving
    Slide,
    /// Straight sweep: the body stops at first contact and its flight ends
    Stop,
}

/// Constants describing one kind of body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Downward acceleration per tick squared
    pub gravity: f64,
    /// Gravity while submerged
    pub fluid_gravity: f64,
    /// Body rises instead of sinking while submerged
    pub floats_in_fluid: bool,
    /// Upward acceleration for floating bodies
    pub buoyancy: f64,
    pub drag: DragCoefficients,
    pub force_order: ForceOrder,
    pub collision_response: CollisionResponse,
    pub axis_order: AxisOrder,
    /// Longest lookahead (in ticks) a simulation of this body may run
    pub horizon: u32,
    /// Input acceleration while on ground
    pub ground_acceleration: f64,
    /// Input acceleration while airborne
    pub air_acceleration: f64,
    pub sprint_multiplier: f64,
    pub sneak_multiplier: f64,
    pub jump_velocity: f64,
    /// Horizontal boost along yaw when jumping while sprinting
    pub sprint_jump_boost: f64,
    /// Drop below the feet a sneaking body refuses to walk off
    pub ledge_probe: f64,
    pub half_width: f64,
    pub height: f64,
    /// Initial speed when launched (projectiles only)
    pub launch_speed: f64,
}

impl ModelParams {
    /// Walking player
    pub fn player() -> Self {
        Self {
            gravity: 0.08,
            fluid_gravity: 0.02,
            floats_in_fluid: false,
            buoyancy: 0.0,
            drag: DragCoefficients {
                air: DVec3::new(0.91, 0.98, 0.91),
                ground: DVec3::new(0.546, 0.98, 0.546),
                fluid: DVec3::new(0.8, 0.8, 0.8),
            },
            force_order: ForceOrder::GravityThenDrag,
            collision_response: CollisionResponse::Slide,
            axis_order: AxisOrder::Xyz,
            horizon: 100,
            ground_acceleration: 0.1,
            air_acceleration: 0.02,
            sprint_multiplier: 1.3,
            sneak_multiplier: 0.3,
            jump_velocity: 0.42,
            sprint_jump_boost: 0.2,
            ledge_probe: 0.6,
            half_width: 0.3,
            height: 1.8,
            launch_speed: 0.0,
        }
    }

    /// Thrown pearl or snowball
    pub fn thrown_projectile() -> Self {
        Self {
            gravity: 0.03,
            fluid_gravity: 0.03,
            floats_in_fluid: false,
            buoyancy: 0.0,
            drag: DragCoefficients::uniform(0.99, 0.8),
            force_order: ForceOrder::DragThenGravity,
            collision_response: CollisionResponse::Stop,
            axis_order: AxisOrder::Xyz,
            horizon: 240,
            ground_acceleration: 0.0,
            air_acceleration: 0.0,
            sprint_multiplier: 1.0,
            sneak_multiplier: 1.0,
            jump_velocity: 0.0,
            sprint_jump_boost: 0.0,
            ledge_probe: 0.0,
            half_width: 0.125,
            height: 0.25,
            launch_speed: 1.5,
        }
    }

    /// Fully drawn bow arrow
    pub fn arrow() -> Self {
        Self {
            gravity: 0.05,
            fluid_gravity: 0.05,
            drag: DragCoefficients::uniform(0.99, 0.6),
            half_width: 0.25,
            height: 0.5,
            launch_speed: 3.0,
            ..Self::thrown_projectile()
        }
    }

    /// Drag multipliers for a body in `medium`
    pub fn drag_for(&self, medium: Medium, on_ground: bool) -> DVec3 {
        match medium {
            Medium::Fluid => self.drag.fluid,
            Medium::Air if on_ground => self.drag.ground,
            Medium::Air => self.drag.air,
        }
    }

    /// Per-tick gravity as if it were applied after drag
    pub fn effective_gravity(&self) -> f64 {
        match self.force_order {
            ForceOrder::DragThenGravity => self.gravity,
            ForceOrder::GravityThenDrag => self.gravity * self.drag.air.y,
        }
    }

    /// Spawn a body of this kind
    pub fn spawn(&self, position: DVec3, velocity: DVec3) -> KinematicState {
        KinematicState::new(position, velocity, self.half_width, self.height)
    }
}

/// Anything that can advance a body by one tick.
///
/// Simulators are generic over this so player lookahead and projectile
/// flight share the same stepping and caching code.
pub trait Kinematics {
    fn step(&self, state: &KinematicState, input: &MotionInput) -> KinematicState;

    fn params(&self) -> &ModelParams;

    fn horizon(&self) -> u32 {
        self.params().horizon
    }
}

impl<K: Kinematics + ?Sized> Kinematics for &K {
    fn step(&self, state: &KinematicState, input: &MotionInput) -> KinematicState {
        (**self).step(state, input)
    }

    fn params(&self) -> &ModelParams {
        (**self).params()
    }
}

impl<K: Kinematics + ?Sized> Kinematics for std::sync::Arc<K> {
    fn step(&self, state: &KinematicState, input: &MotionInput) -> KinematicState {
        (**self).step(state, input)
    }

    fn params(&self) -> &ModelParams {
        (**self).params()
    }
}

/// Body constants bound to the world they collide with
#[derive(Debug, Clone)]
pub struct KinematicModel<W> {
    params: ModelParams,
    world: W,
}

impl<W: CollisionWorld> KinematicModel<W> {
    pub fn new(params: ModelParams, world: W) -> Self {
        Self { params, world }
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    /// Shortens horizontal motion so a sneaking body stays supported
    fn guard_edges(&self, state: &KinematicState, mut motion: DVec3) -> DVec3 {
        let bb = state.bounding_box();
        let drop = -self.params.ledge_probe;
        let unsupported = |dx: f64, dz: f64| self.world.is_space_empty(&bb.offset(DVec3::new(dx, drop, dz)));
        let shrink = |v: f64| {
            if v.abs() <= LEDGE_STEP {
                0.0
            } else {
                v - LEDGE_STEP * v.signum()
            }
        };

        while motion.x != 0.0 && unsupported(motion.x, 0.0) {
            motion.x = shrink(motion.x);
        }
        while motion.z != 0.0 && unsupported(0.0, motion.z) {
            motion.z = shrink(motion.z);
        }
        while motion.x != 0.0 && motion.z != 0.0 && unsupported(motion.x, motion.z) {
            motion.x = shrink(motion.x);
            motion.z = shrink(motion.z);
        }
        motion
    }

    fn apply_forces(&self, mut velocity: DVec3, medium: Medium, on_ground: bool) -> DVec3 {
        let p = &self.params;

        // Supported bodies with no upward motion are exempt from gravity
        let resting = on_ground && velocity.y <= 0.0;
        if resting {
            velocity.y = 0.0;
        }

        let vertical = match medium {
            Medium::Fluid if p.floats_in_fluid => p.buoyancy,
            Medium::Fluid => -p.fluid_gravity,
            Medium::Air => -p.gravity,
        };
        let vertical = if resting { 0.0 } else { vertical };
        let drag = p.drag_for(medium, on_ground);

        match p.force_order {
            ForceOrder::GravityThenDrag => {
                velocity.y += vertical;
                velocity * drag
            }
            ForceOrder::DragThenGravity => {
                let mut v = velocity * drag;
                v.y += vertical;
                v
            }
        }
    }
}

impl<W: CollisionWorld> Kinematics for KinematicModel<W> {
    fn step(&self, state: &KinematicState, input: &MotionInput) -> KinematicState {
        let p = &self.params;
        let mut velocity = state.velocity + input.impulse;
        let start_medium = self.world.medium_at(&state.bounding_box());

        if input.jump && state.on_ground && start_medium == Medium::Air {
            velocity.y = velocity.y.max(p.jump_velocity);
            if input.sprint {
                let yaw = f64::from(input.yaw).to_radians();
                velocity.x -= yaw.sin() * p.sprint_jump_boost;
                velocity.z += yaw.cos() * p.sprint_jump_boost;
            }
        }

        if input.has_movement() {
            let mut speed = if state.on_ground {
                p.ground_acceleration
            } else {
                p.air_acceleration
            };
            if input.sprint {
                speed *= p.sprint_multiplier;
            }
            let scale = if input.sneak { p.sneak_multiplier as f32 } else { 1.0 };
            velocity += movement_input_to_velocity(
                input.forward * scale,
                input.sideways * scale,
                speed,
                input.yaw,
            );
        }

        let bb = state.bounding_box();
        let (applied, collisions, clip_ledged) = match p.collision_response {
            CollisionResponse::Slide => {
                let mut motion = velocity;
                let mut clip_ledged = false;
                if input.sneak && state.on_ground && motion.y <= 0.0 {
                    let guarded = self.guard_edges(state, motion);
                    clip_ledged = guarded != motion;
                    motion = guarded;
                }

                let outcome = collision::slide(&self.world, &bb, motion, p.axis_order);
                if outcome.flags.x || motion.x != velocity.x {
                    velocity.x = 0.0;
                }
                if outcome.flags.y {
                    velocity.y = 0.0;
                }
                if outcome.flags.z || motion.z != velocity.z {
                    velocity.z = 0.0;
                }
                (outcome.applied, outcome.flags, clip_ledged)
            }
            CollisionResponse::Stop => {
                let fraction = collision::sweep_fraction(&self.world, &bb, velocity);
                let applied = velocity * fraction;
                let flags = if fraction < 1.0 {
                    collision::blocked_axes(&self.world, &bb.offset(applied), velocity, GROUND_PROBE)
                } else {
                    CollisionFlags::NONE
                };
                if flags.any() {
                    velocity = DVec3::ZERO;
                }
                (applied, flags, false)
            }
        };

        let position = state.position + applied;
        let moved = bb.offset(applied);
        let landed = collisions.y && applied.y <= 0.0 && velocity.y <= 0.0;
        let supported = velocity.y <= 0.0
            && !self
                .world
                .is_space_empty(&moved.offset(DVec3::new(0.0, -GROUND_PROBE, 0.0)));
        let on_ground = landed || supported;

        let fall_distance = if on_ground {
            0.0
        } else if applied.y < 0.0 {
            state.fall_distance - applied.y
        } else {
            state.fall_distance
        };

        let medium = self.world.medium_at(&moved);
        let velocity = if p.collision_response == CollisionResponse::Stop && collisions.any() {
            velocity
        } else {
            self.apply_forces(velocity, medium, on_ground)
        };

        KinematicState {
            position,
            velocity,
            on_ground,
            half_width: state.half_width,
            height: state.height,
            fall_distance,
            collisions,
            clip_ledged,
        }
    }

    fn params(&self) -> &ModelParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::world::{EmptyWorld, FlatGround, VoxelWorld};
    use glam::IVec3;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_projectile_step_drag_then_gravity() {
        let model = KinematicModel::new(ModelParams::thrown_projectile(), EmptyWorld);
        let state = model.params().spawn(DVec3::ZERO, DVec3::new(1.0, 0.0, 0.0));
        let next = model.step(&state, &MotionInput::idle());
        assert_eq!(next.position, DVec3::new(1.0, 0.0, 0.0));
        assert!(close(next.velocity.x, 0.99));
        assert!(close(next.velocity.y, -0.03));
    }

    #[test]
    fn test_player_falls_gravity_then_drag() {
        let model = KinematicModel::new(ModelParams::player(), EmptyWorld);
        let state = model.params().spawn(DVec3::new(0.0, 10.0, 0.0), DVec3::ZERO);
        let next = model.step(&state, &MotionInput::idle());
        assert!(close(next.velocity.y, -0.08 * 0.98));
        assert!(!next.on_ground);
    }

    #[test]
    fn test_player_lands_and_rests() {
        let model = KinematicModel::new(ModelParams::player(), FlatGround::at(0.0));
        let mut state = model.params().spawn(DVec3::new(0.0, 1.0, 0.0), DVec3::ZERO);
        for _ in 0..40 {
            state = model.step(&state, &MotionInput::idle());
        }
        assert!(state.on_ground);
        assert!(state.position.y.abs() < 1e-6);
        assert_eq!(state.velocity.y, 0.0);
        assert_eq!(state.fall_distance, 0.0);

        // Resting is stable: no gravity creep while supported
        let rested = model.step(&state, &MotionInput::idle());
        assert_eq!(rested.position.y, state.position.y);
        assert!(rested.on_ground);
    }

    #[test]
    fn test_jump_only_from_ground() {
        let model = KinematicModel::new(ModelParams::player(), FlatGround::at(0.0));
        let grounded = model.params().spawn(DVec3::ZERO, DVec3::ZERO).grounded(true);
        let airborne = model.params().spawn(DVec3::new(0.0, 3.0, 0.0), DVec3::ZERO);
        let jump = MotionInput::idle().with_jump(true);

        let up = model.step(&grounded, &jump);
        assert!(close(up.position.y, 0.42));
        assert!(!up.on_ground);

        let still_falling = model.step(&airborne, &jump);
        assert!(still_falling.position.y <= 3.0);
    }

    #[test]
    fn test_walk_forward_uses_yaw() {
        let model = KinematicModel::new(ModelParams::player(), FlatGround::at(0.0));
        let state = model.params().spawn(DVec3::ZERO, DVec3::ZERO).grounded(true);
        // yaw -90 faces +X
        let next = model.step(&state, &MotionInput::walking(1.0, 0.0, -90.0));
        assert!(close(next.position.x, 0.1));
        assert!(next.position.z.abs() < 1e-9);
        assert!(next.on_ground);
    }

    #[test]
    fn test_axis_order_changes_corner_outcome() {
        let mut world = VoxelWorld::new();
        world.set_solid(IVec3::new(1, 0, 0));
        let mut params = ModelParams::player();
        params.height = 1.0;
        let state = KinematicState::new(DVec3::new(0.5, 1.5, 0.5), DVec3::new(1.0, -1.0, 0.0), 0.3, 1.0);

        params.axis_order = AxisOrder::Xyz;
        let xyz = KinematicModel::new(params, &world).step(&state, &MotionInput::idle());
        params.axis_order = AxisOrder::Yxz;
        let yxz = KinematicModel::new(params, &world).step(&state, &MotionInput::idle());

        assert!((xyz.position.x - 1.5).abs() < 1e-6 && (xyz.position.y - 1.0).abs() < 1e-6);
        assert!(xyz.collisions.y && !xyz.collisions.x);
        assert!((yxz.position.x - 0.7).abs() < 1e-6 && (yxz.position.y - 0.5).abs() < 1e-6);
        assert!(yxz.collisions.x && !yxz.collisions.y);
    }

    #[test]
    fn test_stop_response_ends_at_contact() {
        let model = KinematicModel::new(ModelParams::thrown_projectile(), FlatGround::at(0.0));
        let state = model.params().spawn(DVec3::new(0.0, 1.0, 0.0), DVec3::new(1.0, -2.0, 0.0));
        let next = model.step(&state, &MotionInput::idle());
        assert!(next.collisions.y);
        assert!((next.position.x - 0.5).abs() < 1e-6);
        assert!(next.position.y.abs() < 1e-6);
        assert_eq!(next.velocity, DVec3::ZERO);
    }

    #[test]
    fn test_sneaking_clips_at_ledge() {
        // Single block platform under x in [0, 1)
        let mut world = VoxelWorld::new();
        world.set_solid(IVec3::new(0, -1, 0));
        let model = KinematicModel::new(ModelParams::player(), &world);
        let mut state = model.params().spawn(DVec3::new(0.5, 0.0, 0.5), DVec3::ZERO).grounded(true);
        let input = MotionInput::walking(1.0, 0.0, -90.0).with_sneak(true);

        for _ in 0..60 {
            state = model.step(&state, &input);
        }
        // Box half width 0.3: the feet may overhang up to the far box edge
        assert!(state.on_ground);
        assert!(state.position.x < 1.3, "walked off at x = {}", state.position.x);
    }

    #[test]
    fn test_floating_body_rises_in_fluid() {
        let mut world = VoxelWorld::new();
        for y in -5..5 {
            world.set_fluid(IVec3::new(0, y, 0));
        }
        let mut params = ModelParams::thrown_projectile();
        params.collision_response = CollisionResponse::Slide;
        params.floats_in_fluid = true;
        params.buoyancy = 0.04;
        let model = KinematicModel::new(params, &world);
        let state = model.params().spawn(DVec3::new(0.5, 0.0, 0.5), DVec3::ZERO);
        let next = model.step(&state, &MotionInput::idle());
        assert!(next.velocity.y > 0.0);
    }
}
