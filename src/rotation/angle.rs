//! Yaw/pitch rotations in engine convention.
//!
//! Yaw 0 faces +Z and yaw -90 faces +X. Positive pitch looks down.
//! Angles are degrees in `f32`, matching what the network layer sends.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Wraps an angle into `[-180, 180)`
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Shortest signed turn from `from` to `to`
pub fn angle_difference(to: f32, from: f32) -> f32 {
    wrap_degrees(to - from)
}

/// Smallest angle step the client can produce for a mouse sensitivity in `[0, 1]`
pub fn mouse_gcd(sensitivity: f32) -> f32 {
    let f = sensitivity * 0.6 + 0.2;
    f * f * f * 8.0 * 0.15
}

/// Difference between two rotations, already wrapped
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RotationDelta {
    pub yaw: f32,
    pub pitch: f32,
}

impl RotationDelta {
    pub fn length(&self) -> f32 {
        self.yaw.hypot(self.pitch)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub yaw: f32,
    pub pitch: f32,
}

impl Rotation {
    pub const ZERO: Self = Self { yaw: 0.0, pitch: 0.0 };

    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self { yaw, pitch }
    }

    /// Rotation facing along `direction`
    pub fn from_direction(direction: DVec3) -> Self {
        let horizontal = direction.x.hypot(direction.z);
        let yaw = direction.z.atan2(direction.x).to_degrees() as f32 - 90.0;
        let pitch = -(direction.y.atan2(horizontal).to_degrees() as f32);
        Self {
            yaw: wrap_degrees(yaw),
            pitch: wrap_degrees(pitch),
        }
    }

    /// Rotation an eye at `from` needs to look at `point`
    pub fn looking_at(point: DVec3, from: DVec3) -> Self {
        Self::from_direction(point - from)
    }

    /// Unit look vector
    pub fn direction(&self) -> DVec3 {
        let yaw = f64::from(self.yaw).to_radians();
        let pitch = f64::from(self.pitch).to_radians();
        let flat = pitch.cos();
        DVec3::new(-yaw.sin() * flat, -pitch.sin(), yaw.cos() * flat)
    }

    pub fn is_finite(&self) -> bool {
        self.yaw.is_finite() && self.pitch.is_finite()
    }

    /// Angles that would have to be added to arrive at `other`
    pub fn delta_to(&self, other: &Rotation) -> RotationDelta {
        RotationDelta {
            yaw: angle_difference(other.yaw, self.yaw),
            pitch: angle_difference(other.pitch, self.pitch),
        }
    }

    /// Angular distance to `other`, at most 180 degrees
    pub fn angle_to(&self, other: &Rotation) -> f32 {
        self.delta_to(other).length().min(180.0)
    }

    pub fn approximately_equals(&self, other: &Rotation, tolerance: f32) -> bool {
        self.angle_to(other) <= tolerance
    }

    /// Moves toward `other` along a straight line in angle space.
    ///
    /// Each component advances at most its share of the total delta times the
    /// matching factor, so with equal factors the step length never exceeds
    /// the factor.
    pub fn towards_linear(&self, other: &Rotation, horizontal: f32, vertical: f32) -> Rotation {
        let delta = self.delta_to(other);
        let distance = delta.length();
        if distance <= f32::EPSILON {
            return *self;
        }

        let max_yaw = (delta.yaw / distance).abs() * horizontal;
        let max_pitch = (delta.pitch / distance).abs() * vertical;

        Rotation {
            yaw: self.yaw + delta.yaw.clamp(-max_yaw, max_yaw),
            pitch: self.pitch + delta.pitch.clamp(-max_pitch, max_pitch),
        }
    }

    /// Snaps the turn from `current` to a whole number of `gcd` steps and
    /// keeps pitch within the look range
    pub fn normalize_with_gcd(&self, current: &Rotation, gcd: f32) -> Rotation {
        if gcd <= 0.0 {
            return Rotation {
                yaw: self.yaw,
                pitch: self.pitch.clamp(-90.0, 90.0),
            };
        }

        let delta = current.delta_to(self);
        let yaw_steps = (delta.yaw / gcd).round();
        let pitch_steps = (delta.pitch / gcd).round();

        Rotation {
            yaw: current.yaw + yaw_steps * gcd,
            pitch: (current.pitch + pitch_steps * gcd).clamp(-90.0, 90.0),
        }
    }

    /// Render-frame interpolation between two published rotations
    pub fn lerp(&self, other: &Rotation, t: f32) -> Rotation {
        let delta = self.delta_to(other);
        Rotation {
            yaw: self.yaw + delta.yaw * t,
            pitch: self.pitch + delta.pitch * t,
        }
    }
}
