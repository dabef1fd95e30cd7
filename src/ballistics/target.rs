//! Where a target will be at a given forward tick

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Target position as a function of ticks from now.
///
/// Ticks are fractional so the solver can ask for the position at an
/// interpolated arrival time.
pub trait PositionExtrapolation {
    fn position_at(&self, ticks: f64) -> DVec3;

    /// Targets that never move let the solver skip the arrival-time search
    fn is_static(&self) -> bool {
        false
    }
}

impl<F: Fn(f64) -> DVec3> PositionExtrapolation for F {
    fn position_at(&self, ticks: f64) -> DVec3 {
        self(ticks)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantPosition(pub DVec3);

impl PositionExtrapolation for ConstantPosition {
    fn position_at(&self, _ticks: f64) -> DVec3 {
        self.0
    }

    fn is_static(&self) -> bool {
        true
    }
}

/// Straight-line motion at a fixed per-tick velocity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearExtrapolation {
    pub position: DVec3,
    pub velocity: DVec3,
}

impl LinearExtrapolation {
    pub fn new(position: DVec3, velocity: DVec3) -> Self {
        Self { position, velocity }
    }
}

impl PositionExtrapolation for LinearExtrapolation {
    fn position_at(&self, ticks: f64) -> DVec3 {
        self.position + self.velocity * ticks
    }

    fn is_static(&self) -> bool {
        self.velocity == DVec3::ZERO
    }
}

/// Per-tick predicted positions, interpolated between ticks and held at the
/// last sample beyond them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampledPath {
    points: Vec<DVec3>,
}

impl SampledPath {
    /// `points[0]` is the position now. Returns `None` for an empty path.
    pub fn new(points: Vec<DVec3>) -> Option<Self> {
        if points.is_empty() {
            None
        } else {
            Some(Self { points })
        }
    }

    /// Same path shifted by `offset` (e.g. feet to body center)
    pub fn offset(mut self, offset: DVec3) -> Self {
        for point in &mut self.points {
            *point += offset;
        }
        self
    }

    pub fn points(&self) -> &[DVec3] {
        &self.points
    }
}

impl PositionExtrapolation for SampledPath {
    fn position_at(&self, ticks: f64) -> DVec3 {
        let last = self.points.len() - 1;
        let ticks = ticks.max(0.0);
        let index = ticks.floor() as usize;
        if index >= last {
            return self.points[last];
        }
        self.points[index].lerp(self.points[index + 1], ticks - index as f64)
    }

    fn is_static(&self) -> bool {
        self.points.windows(2).all(|w| w[0] == w[1])
    }
}
