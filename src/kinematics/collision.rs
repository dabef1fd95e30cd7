//! Bounding boxes, the world collision query and swept movement

use std::sync::Arc;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::state::CollisionFlags;

/// Bisection steps used to locate a contact inside one blocked sub-step
const BISECT_ITERATIONS: u32 = 40;

/// Smallest sub-step used when sweeping very thin boxes
const MIN_SWEEP_STEP: f64 = 1.0e-3;

/// A shortfall smaller than this is not reported as a collision
const CONTACT_EPSILON: f64 = 1.0e-7;

/// Axis-aligned bounding box. Boxes that only touch do not intersect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Box standing on `position` (bottom-center anchor)
    pub fn from_bottom_center(position: DVec3, half_width: f64, height: f64) -> Self {
        Self {
            min: DVec3::new(position.x - half_width, position.y, position.z - half_width),
            max: DVec3::new(position.x + half_width, position.y + height, position.z + half_width),
        }
    }

    pub fn offset(&self, delta: DVec3) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    pub fn extent(&self, axis: Axis) -> f64 {
        axis.component(self.max - self.min)
    }

    pub fn min_extent(&self) -> f64 {
        (self.max - self.min).min_element()
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }
}

/// A world axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn unit(self) -> DVec3 {
        match self {
            Axis::X => DVec3::X,
            Axis::Y => DVec3::Y,
            Axis::Z => DVec3::Z,
        }
    }

    pub fn component(self, v: DVec3) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }

    pub fn with_component(self, mut v: DVec3, value: f64) -> DVec3 {
        match self {
            Axis::X => v.x = value,
            Axis::Y => v.y = value,
            Axis::Z => v.z = value,
        }
        v
    }
}

/// Order in which axis-separated collision resolves the three axes.
///
/// Corner hits resolve differently per order, so this has to match the
/// engine whose trajectories are being reproduced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisOrder {
    #[default]
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

impl AxisOrder {
    pub fn axes(self) -> [Axis; 3] {
        use Axis::*;
        match self {
            AxisOrder::Xyz => [X, Y, Z],
            AxisOrder::Xzy => [X, Z, Y],
            AxisOrder::Yxz => [Y, X, Z],
            AxisOrder::Yzx => [Y, Z, X],
            AxisOrder::Zxy => [Z, X, Y],
            AxisOrder::Zyx => [Z, Y, X],
        }
    }
}

/// Medium a body is moving through
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Medium {
    #[default]
    Air,
    Fluid,
}

/// Collision query supplied by the terrain layer
pub trait CollisionWorld {
    /// True when no solid geometry intersects `aabb`
    fn is_space_empty(&self, aabb: &Aabb) -> bool;

    /// Medium filling `aabb`; worlds without fluids keep the default
    fn medium_at(&self, _aabb: &Aabb) -> Medium {
        Medium::Air
    }
}

impl<W: CollisionWorld + ?Sized> CollisionWorld for &W {
    fn is_space_empty(&self, aabb: &Aabb) -> bool {
        (**self).is_space_empty(aabb)
    }

    fn medium_at(&self, aabb: &Aabb) -> Medium {
        (**self).medium_at(aabb)
    }
}

impl<W: CollisionWorld + ?Sized> CollisionWorld for Arc<W> {
    fn is_space_empty(&self, aabb: &Aabb) -> bool {
        (**self).is_space_empty(aabb)
    }

    fn medium_at(&self, aabb: &Aabb) -> Medium {
        (**self).medium_at(aabb)
    }
}

/// Adapts a bare `is_space_empty` closure into a [`CollisionWorld`]
#[derive(Clone)]
pub struct CollisionFn<F>(pub F);

impl<F: Fn(&Aabb) -> bool> CollisionWorld for CollisionFn<F> {
    fn is_space_empty(&self, aabb: &Aabb) -> bool {
        (self.0)(aabb)
    }
}

/// Result of an axis-separated move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideOutcome {
    /// Displacement actually applied
    pub applied: DVec3,
    pub flags: CollisionFlags,
}

/// Furthest signed distance along `axis` (up to `delta`) the box can travel
/// without entering solid space.
///
/// A box that already overlaps solid space is allowed its full motion so a
/// body stuck inside geometry can still move out of it.
pub fn max_travel<W: CollisionWorld + ?Sized>(world: &W, bbox: &Aabb, axis: Axis, delta: f64) -> f64 {
    if delta == 0.0 || !world.is_space_empty(bbox) {
        return delta;
    }

    let distance = delta.abs();
    let direction = axis.unit() * delta.signum();
    // Sub-steps no longer than the box itself so thin walls cannot be skipped
    let span = bbox.extent(axis).max(MIN_SWEEP_STEP);

    let mut reached = 0.0;
    while reached < distance {
        let next = (reached + span).min(distance);
        if world.is_space_empty(&bbox.offset(direction * next)) {
            reached = next;
            continue;
        }

        let (mut lo, mut hi) = (reached, next);
        for _ in 0..BISECT_ITERATIONS {
            let mid = 0.5 * (lo + hi);
            if world.is_space_empty(&bbox.offset(direction * mid)) {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        return lo * delta.signum();
    }

    delta
}

/// Moves the box one axis at a time in `order`. Each blocked axis is
/// truncated at the contact and flagged independently.
pub fn slide<W: CollisionWorld + ?Sized>(world: &W, bbox: &Aabb, delta: DVec3, order: AxisOrder) -> SlideOutcome {
    let mut moved = *bbox;
    let mut applied = DVec3::ZERO;
    let mut flags = CollisionFlags::NONE;

    for axis in order.axes() {
        let wanted = axis.component(delta);
        if wanted == 0.0 {
            continue;
        }

        let got = max_travel(world, &moved, axis, wanted);
        if (wanted - got).abs() > CONTACT_EPSILON {
            match axis {
                Axis::X => flags.x = true,
                Axis::Y => flags.y = true,
                Axis::Z => flags.z = true,
            }
        }

        moved = moved.offset(axis.unit() * got);
        applied = axis.with_component(applied, got);
    }

    SlideOutcome { applied, flags }
}

/// Fraction in `[0, 1]` of `delta` the box travels along the straight
/// segment before first contact. `1.0` means the path is clear.
pub fn sweep_fraction<W: CollisionWorld + ?Sized>(world: &W, bbox: &Aabb, delta: DVec3) -> f64 {
    let length = delta.length();
    if length == 0.0 || !world.is_space_empty(bbox) {
        return 1.0;
    }

    let span = bbox.min_extent().max(MIN_SWEEP_STEP);
    let steps = (length / span).ceil().max(1.0) as u32;

    let mut reached = 0.0;
    for i in 1..=steps {
        let next = f64::from(i) / f64::from(steps);
        if world.is_space_empty(&bbox.offset(delta * next)) {
            reached = next;
            continue;
        }

        let (mut lo, mut hi) = (reached, next);
        for _ in 0..BISECT_ITERATIONS {
            let mid = 0.5 * (lo + hi);
            if world.is_space_empty(&bbox.offset(delta * mid)) {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        return lo;
    }

    1.0
}

/// Axes along which a box resting at `bbox` is pressed against geometry
/// while trying to continue along `delta`.
pub fn blocked_axes<W: CollisionWorld + ?Sized>(world: &W, bbox: &Aabb, delta: DVec3, probe: f64) -> CollisionFlags {
    let blocked = |axis: Axis| {
        let d = axis.component(delta);
        d != 0.0 && !world.is_space_empty(&bbox.offset(axis.unit() * (probe * d.signum())))
    };

    CollisionFlags {
        x: blocked(Axis::X),
        y: blocked(Axis::Y),
        z: blocked(Axis::Z),
    }
}
