//! Closed-form launch direction for drag-scaled ballistic flight.
//!
//! With per-tick drag `r` applied before gravity `g`, the displacement after
//! `t` ticks from initial velocity `v0` is
//!
//! ```text
//! p(t) = v0 * k(t) - (0, g / (1 - r) * (t - k(t)), 0)
//! k(t) = (r^t - 1) / (r - 1)
//! ```
//!
//! Solving for a unit direction that reaches a displacement at time `t` is
//! then linear; the flight time is the `t` whose direction has unit length.
//! This ignores collision entirely and only seeds the simulation search.

use glam::DVec3;
use tracing::trace;

use crate::rotation::Rotation;

use super::target::PositionExtrapolation;

/// Residual in direction length above which no estimate is returned
const MAX_RESIDUAL: f64 = 0.1;

/// Longest flight considered, relative to a straight line at launch speed.
/// Keeps the search on the low arc.
const MAX_TRAVEL_FACTOR: f64 = 1.75;

const MIN_TRAVEL_TICKS: f64 = 1.0e-3;

const BISECT_ITERATIONS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyticEstimate {
    pub rotation: Rotation,
    /// Direction the closed form asks for; length is within the residual of 1
    pub direction: DVec3,
    /// Flight time in (fractional) ticks
    pub ticks: f64,
    pub residual: f64,
}

/// Drag-free-equivalent distance factor after `t` ticks
fn travel_factor(drag: f64, t: f64) -> f64 {
    if (drag - 1.0).abs() < 1.0e-9 {
        t
    } else {
        (drag.powf(t) - 1.0) / (drag - 1.0)
    }
}

/// Total drop caused by gravity after `t` ticks
fn gravity_drop(drag: f64, gravity: f64, t: f64) -> f64 {
    if (drag - 1.0).abs() < 1.0e-9 {
        gravity * t * (t - 1.0) * 0.5
    } else {
        gravity / (1.0 - drag) * (t - travel_factor(drag, t))
    }
}

/// Launch direction (scaled so that a unit vector means "reachable") that
/// covers `displacement` in exactly `t` ticks
pub fn direction_for_time(displacement: DVec3, speed: f64, drag: f64, gravity: f64, t: f64) -> DVec3 {
    let scale = travel_factor(drag, t) * speed;
    let lifted = DVec3::new(
        displacement.x,
        displacement.y + gravity_drop(drag, gravity, t),
        displacement.z,
    );
    lifted / scale
}

/// Minimum of a unimodal function on `[lo, hi]` by bisecting on its slope.
/// Returns the argument and the value there.
pub fn find_minimum_by_bisect(mut lo: f64, mut hi: f64, f: impl Fn(f64) -> f64) -> (f64, f64) {
    for _ in 0..BISECT_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        let probe = (hi - lo) * 1.0e-3;
        if f(mid - probe) < f(mid + probe) {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    let x = 0.5 * (lo + hi);
    (x, f(x))
}

/// Closed-form aim at a target that may be moving.
///
/// `inherited` is the shooter velocity the projectile starts with on top of
/// its launch speed.
pub fn estimate<T: PositionExtrapolation + ?Sized>(
    origin: DVec3,
    inherited: DVec3,
    speed: f64,
    drag: f64,
    gravity: f64,
    target: &T,
) -> Option<AnalyticEstimate> {
    if speed <= 0.0 {
        return None;
    }

    let displacement_at = |t: f64| target.position_at(t) - origin - inherited * travel_factor(drag, t);

    let distance = (target.position_at(0.0) - origin).length();
    let max_ticks = distance / speed * MAX_TRAVEL_FACTOR;
    if max_ticks <= MIN_TRAVEL_TICKS {
        return None;
    }

    let (ticks, residual) = find_minimum_by_bisect(MIN_TRAVEL_TICKS, max_ticks, |t| {
        (direction_for_time(displacement_at(t), speed, drag, gravity, t).length() - 1.0).abs()
    });

    trace!(ticks, residual, "Closed-form flight time");
    if !residual.is_finite() || residual > MAX_RESIDUAL {
        return None;
    }

    let direction = direction_for_time(displacement_at(ticks), speed, drag, gravity, ticks);
    Some(AnalyticEstimate {
        rotation: Rotation::from_direction(direction),
        direction,
        ticks,
        residual,
    })
}
