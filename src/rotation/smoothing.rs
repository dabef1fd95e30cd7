//! Per-tick turn shaping applied before the turn-rate cap

use serde::{Deserialize, Serialize};

use super::angle::Rotation;

/// Bias on the Bézier ease toward the target
const BEZIER_START: f32 = 0.05;

/// How far the avatar turns toward its target in one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AngleSmooth {
    /// Fixed step, in degrees per tick, for each axis
    Linear { horizontal: f32, vertical: f32 },
    /// Distance-dependent speed: a Bézier ease while far from the target,
    /// a sigmoid once the remaining distance drops below `midpoint`
    Interpolation {
        /// Fraction of the remaining yaw turned per tick, `[0, 1]`
        horizontal_speed: f32,
        /// Fraction of the remaining pitch turned per tick, `[0, 1]`
        vertical_speed: f32,
        /// Remaining distance (as a fraction of 180 degrees) where the curves switch
        midpoint: f32,
        /// Extra speed near the target when the target itself just moved, `[0, 1]`
        direction_change_factor: f32,
    },
}

impl Default for AngleSmooth {
    fn default() -> Self {
        AngleSmooth::Linear {
            horizontal: 180.0,
            vertical: 180.0,
        }
    }
}

impl AngleSmooth {
    pub fn interpolation() -> Self {
        AngleSmooth::Interpolation {
            horizontal_speed: 0.8,
            vertical_speed: 0.2,
            midpoint: 0.35,
            direction_change_factor: 0.95,
        }
    }

    /// Next rotation on the way from `current` to `target`.
    ///
    /// `previous_target` is last tick's target, if any; a target that jumps
    /// between ticks speeds up the final approach.
    pub fn step(&self, current: &Rotation, target: &Rotation, previous_target: Option<&Rotation>) -> Rotation {
        match *self {
            AngleSmooth::Linear { horizontal, vertical } => {
                current.towards_linear(target, horizontal, vertical)
            }
            AngleSmooth::Interpolation {
                horizontal_speed,
                vertical_speed,
                midpoint,
                direction_change_factor,
            } => {
                let delta = current.delta_to(target);
                let direction_change = previous_target
                    .map(|previous| previous.angle_to(target).clamp(0.0, 1.0) * direction_change_factor)
                    .unwrap_or(0.0);

                let yaw_factor = interpolation_factor(delta.yaw.abs(), horizontal_speed, midpoint, direction_change);
                let pitch_factor = interpolation_factor(delta.pitch.abs(), vertical_speed, midpoint, direction_change);

                current.towards_linear(
                    target,
                    yaw_factor * delta.yaw.abs(),
                    pitch_factor * delta.pitch.abs(),
                )
            }
        }
    }
}

fn sigmoid(t: f32) -> f32 {
    1.0 / (1.0 + (-0.5 * (t - 0.3)).exp())
}

fn bezier(start: f32, end: f32, t: f32) -> f32 {
    (1.0 - t) * (1.0 - t) * start + 2.0 * (1.0 - t) * t + t * t * end
}

fn interpolation_factor(difference: f32, speed: f32, midpoint: f32, direction_change: f32) -> f32 {
    let t = (difference / 180.0).clamp(0.0, 1.0);
    let speed = speed.clamp(0.0, 1.0);

    if t > midpoint {
        bezier(BEZIER_START, 1.0, 1.0 - t) * speed
    } else {
        sigmoid(t) * (speed + direction_change).clamp(0.0, 1.0)
    }
}
