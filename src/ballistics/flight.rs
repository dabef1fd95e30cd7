//! Simulated projectile flights

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::kinematics::{Kinematics, MotionInput};
use crate::rotation::Rotation;

use super::target::PositionExtrapolation;

/// How a projectile leaves the shooter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Launch {
    /// Spawn position of the projectile (bottom-center of its box)
    pub origin: DVec3,
    /// Launch speed in blocks per tick
    pub speed: f64,
    /// Added to the pitch at release (splash potions are thrown 20 degrees high)
    pub roll: f32,
    /// Shooter velocity carried over to the projectile
    pub inherited: DVec3,
}

impl Launch {
    pub fn new(origin: DVec3, speed: f64) -> Self {
        Self {
            origin,
            speed,
            roll: 0.0,
            inherited: DVec3::ZERO,
        }
    }

    pub fn with_roll(mut self, roll: f32) -> Self {
        self.roll = roll;
        self
    }

    /// Carries the shooter's motion over. A grounded shooter contributes no
    /// vertical velocity.
    pub fn with_shooter_velocity(mut self, velocity: DVec3, on_ground: bool) -> Self {
        self.inherited = if on_ground {
            DVec3::new(velocity.x, 0.0, velocity.z)
        } else {
            velocity
        };
        self
    }

    /// Initial velocity when released facing `rotation`
    pub fn velocity_for(&self, rotation: &Rotation) -> DVec3 {
        let aimed = Rotation::new(rotation.yaw, rotation.pitch + self.roll);
        aimed.direction() * self.speed + self.inherited
    }
}

/// Nearest point of a flight to some position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Approach {
    /// Fractional tick along the flight
    pub tick: f64,
    pub position: DVec3,
    pub distance: f64,
}

/// Projectile positions tick by tick, ending at the first collision or the
/// tick limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    /// Position at every tick, starting with the launch origin
    pub points: Vec<DVec3>,
    /// Flight ended against geometry rather than at the tick limit
    pub collided: bool,
}

impl Flight {
    pub fn ticks(&self) -> u32 {
        self.points.len().saturating_sub(1) as u32
    }

    pub fn terminal(&self) -> DVec3 {
        self.points.last().copied().unwrap_or(DVec3::ZERO)
    }

    /// Position at a fractional tick, held at the terminal point past the end
    pub fn position_at(&self, tick: f64) -> DVec3 {
        let last = self.points.len().saturating_sub(1);
        let tick = tick.max(0.0);
        let i = (tick.floor() as usize).min(last);
        match (self.points.get(i), self.points.get(i + 1)) {
            (Some(&a), Some(&b)) => a.lerp(b, tick - i as f64),
            (Some(&a), None) => a,
            _ => DVec3::ZERO,
        }
    }

    /// Closest approach to a moving target, with the flight and the target
    /// compared at the same tick. Both move linearly between ticks.
    pub fn meeting<T: PositionExtrapolation + ?Sized>(&self, target: &T) -> Approach {
        let first = self.points.first().copied().unwrap_or(DVec3::ZERO);
        let mut best = Approach {
            tick: 0.0,
            position: first,
            distance: first.distance(target.position_at(0.0)),
        };

        let mut offset = first - target.position_at(0.0);
        for (i, segment) in self.points.windows(2).enumerate() {
            let next = segment[1] - target.position_at((i + 1) as f64);
            let change = next - offset;
            let length_sq = change.length_squared();
            let s = if length_sq > 0.0 {
                (-offset.dot(change) / length_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };

            let distance = (offset + change * s).length();
            if distance < best.distance {
                let tick = i as f64 + s;
                best = Approach {
                    tick,
                    position: self.position_at(tick),
                    distance,
                };
            }
            offset = next;
        }
        best
    }

    /// Closest point of the polyline to `point`
    pub fn closest_approach(&self, point: DVec3) -> Approach {
        let first = self.points.first().copied().unwrap_or(DVec3::ZERO);
        let mut best = Approach {
            tick: 0.0,
            position: first,
            distance: first.distance(point),
        };

        for (i, segment) in self.points.windows(2).enumerate() {
            let (a, b) = (segment[0], segment[1]);
            let ab = b - a;
            let length_sq = ab.length_squared();
            let s = if length_sq > 0.0 {
                ((point - a).dot(ab) / length_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };

            let position = a + ab * s;
            let distance = position.distance(point);
            if distance < best.distance {
                best = Approach {
                    tick: i as f64 + s,
                    position,
                    distance,
                };
            }
        }
        best
    }

    /// Where the flight first gets `distance` away from `origin` horizontally,
    /// interpolated between ticks
    pub fn crossing(&self, origin: DVec3, distance: f64) -> Option<Approach> {
        let horizontal = |p: DVec3| (p.x - origin.x).hypot(p.z - origin.z);

        for (i, segment) in self.points.windows(2).enumerate() {
            let (a, b) = (segment[0], segment[1]);
            let (da, db) = (horizontal(a), horizontal(b));
            if da < distance && db >= distance {
                let s = (distance - da) / (db - da);
                let position = a.lerp(b, s);
                return Some(Approach {
                    tick: i as f64 + s,
                    position,
                    distance,
                });
            }
        }
        None
    }
}

/// Flies a projectile launched facing `rotation` for at most `max_ticks`
pub fn simulate_flight<M: Kinematics + ?Sized>(model: &M, launch: &Launch, rotation: &Rotation, max_ticks: u32) -> Flight {
    let input = MotionInput::idle();
    let mut state = model.params().spawn(launch.origin, launch.velocity_for(rotation));
    let mut points = Vec::with_capacity(max_ticks as usize + 1);
    points.push(state.position);

    for _ in 0..max_ticks {
        state = model.step(&state, &input);
        if !state.is_finite() {
            break;
        }
        points.push(state.position);
        if state.collisions.any() {
            return Flight {
                points,
                collided: true,
            };
        }
    }

    Flight {
        points,
        collided: false,
    }
}
