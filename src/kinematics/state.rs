//! Body state and per-tick motion input

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::collision::Aabb;

/// Which axes were blocked during the last step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionFlags {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl CollisionFlags {
    pub const NONE: Self = Self {
        x: false,
        y: false,
        z: false,
    };

    pub fn any(self) -> bool {
        self.x || self.y || self.z
    }

    pub fn horizontal(self) -> bool {
        self.x || self.z
    }
}

/// Kinematic state of one body at one tick.
///
/// `position` is the bottom-center of the bounding box, the same anchor the
/// game uses for entities. States are plain values: stepping produces a new
/// state and never touches the old one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KinematicState {
    pub position: DVec3,
    pub velocity: DVec3,
    pub on_ground: bool,
    /// Half of the box width (x and z)
    pub half_width: f64,
    /// Full box height
    pub height: f64,
    /// Distance fallen since last touching the ground
    pub fall_distance: f64,
    /// Axes blocked during the step that produced this state
    pub collisions: CollisionFlags,
    /// Horizontal motion was shortened to keep a sneaking body on a ledge
    pub clip_ledged: bool,
}

impl KinematicState {
    pub fn new(position: DVec3, velocity: DVec3, half_width: f64, height: f64) -> Self {
        Self {
            position,
            velocity,
            on_ground: false,
            half_width,
            height,
            fall_distance: 0.0,
            collisions: CollisionFlags::NONE,
            clip_ledged: false,
        }
    }

    pub fn grounded(mut self, on_ground: bool) -> Self {
        self.on_ground = on_ground;
        self
    }

    /// World-space bounding box at the current position
    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_bottom_center(self.position, self.half_width, self.height)
    }

    /// Center of the bounding box
    pub fn center(&self) -> DVec3 {
        self.position + DVec3::new(0.0, self.height * 0.5, 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.fall_distance.is_finite()
    }
}

/// Externally applied input for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionInput {
    /// Forward key axis (-1.0 = back, 1.0 = forward)
    pub forward: f32,
    /// Strafe key axis (-1.0 = right, 1.0 = left)
    pub sideways: f32,
    pub jump: bool,
    pub sprint: bool,
    pub sneak: bool,
    /// Yaw in degrees the key input is relative to
    pub yaw: f32,
    /// Velocity added before moving (knockback, launch)
    pub impulse: DVec3,
}

impl MotionInput {
    /// No keys pressed, no impulse
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn walking(forward: f32, sideways: f32, yaw: f32) -> Self {
        Self {
            forward,
            sideways,
            yaw,
            ..Self::default()
        }
    }

    pub fn with_jump(mut self, jump: bool) -> Self {
        self.jump = jump;
        self
    }

    pub fn with_sprint(mut self, sprint: bool) -> Self {
        self.sprint = sprint;
        self
    }

    pub fn with_sneak(mut self, sneak: bool) -> Self {
        self.sneak = sneak;
        self
    }

    pub fn with_impulse(mut self, impulse: DVec3) -> Self {
        self.impulse = impulse;
        self
    }

    pub fn has_movement(&self) -> bool {
        self.forward != 0.0 || self.sideways != 0.0
    }
}
