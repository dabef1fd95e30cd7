//! Reference collision worlds

use std::collections::HashSet;

use glam::IVec3;
use serde::{Deserialize, Serialize};

use super::collision::{Aabb, CollisionWorld, Medium};

/// Nothing solid anywhere
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyWorld;

impl CollisionWorld for EmptyWorld {
    fn is_space_empty(&self, _aabb: &Aabb) -> bool {
        true
    }
}

/// Infinite solid half-space below `height`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlatGround {
    pub height: f64,
}

impl FlatGround {
    pub fn at(height: f64) -> Self {
        Self { height }
    }
}

impl CollisionWorld for FlatGround {
    fn is_space_empty(&self, aabb: &Aabb) -> bool {
        aabb.min.y >= self.height
    }
}

/// Unit-cell world. Cell `(i, j, k)` spans `[i, i + 1)` on each axis.
#[derive(Debug, Clone, Default)]
pub struct VoxelWorld {
    solids: HashSet<IVec3>,
    fluids: HashSet<IVec3>,
}

impl VoxelWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_solid(&mut self, cell: IVec3) {
        self.fluids.remove(&cell);
        self.solids.insert(cell);
    }

    pub fn set_fluid(&mut self, cell: IVec3) {
        self.solids.remove(&cell);
        self.fluids.insert(cell);
    }

    /// Fill a square floor layer at `y` spanning `-radius..=radius` on x and z
    pub fn with_floor(mut self, y: i32, radius: i32) -> Self {
        for x in -radius..=radius {
            for z in -radius..=radius {
                self.set_solid(IVec3::new(x, y, z));
            }
        }
        self
    }

    fn any_cell(&self, aabb: &Aabb, cells: &HashSet<IVec3>) -> bool {
        if cells.is_empty() {
            return false;
        }

        // Cells strictly overlapping the box; touching faces do not count
        let lo = aabb.min.floor().as_ivec3();
        let hi = (aabb.max.ceil() - glam::DVec3::ONE).as_ivec3();

        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                for z in lo.z..=hi.z {
                    if cells.contains(&IVec3::new(x, y, z)) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

impl CollisionWorld for VoxelWorld {
    fn is_space_empty(&self, aabb: &Aabb) -> bool {
        !self.any_cell(aabb, &self.solids)
    }

    fn medium_at(&self, aabb: &Aabb) -> Medium {
        if self.any_cell(aabb, &self.fluids) {
            Medium::Fluid
        } else {
            Medium::Air
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    #[test]
    fn test_flat_ground_touching_is_empty() {
        let ground = FlatGround::at(0.0);
        let resting = Aabb::from_bottom_center(DVec3::ZERO, 0.3, 1.8);
        assert!(ground.is_space_empty(&resting));
        assert!(!ground.is_space_empty(&resting.offset(DVec3::new(0.0, -0.01, 0.0))));
    }

    #[test]
    fn test_voxel_overlap_is_strict() {
        let world = VoxelWorld::new().with_floor(-1, 2);
        let standing = Aabb::from_bottom_center(DVec3::new(0.5, 0.0, 0.5), 0.3, 1.8);
        assert!(world.is_space_empty(&standing));
        assert!(!world.is_space_empty(&standing.offset(DVec3::new(0.0, -0.001, 0.0))));
    }

    #[test]
    fn test_voxel_fluid_medium() {
        let mut world = VoxelWorld::new();
        world.set_fluid(IVec3::new(0, 0, 0));
        let inside = Aabb::from_bottom_center(DVec3::new(0.5, 0.2, 0.5), 0.3, 0.5);
        let outside = inside.offset(DVec3::new(3.0, 0.0, 0.0));
        assert_eq!(world.medium_at(&inside), Medium::Fluid);
        assert_eq!(world.medium_at(&outside), Medium::Air);
        assert!(world.is_space_empty(&inside));
    }
}
