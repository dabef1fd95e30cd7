//! Rotation requests submitted by features during a tick

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::angle::Rotation;

/// Arbitration weight. Higher wins; any `i32` is valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl Priority {
    pub const NOT_IMPORTANT: Self = Self(-20);
    pub const NORMAL: Self = Self(0);
    pub const IMPORTANT_FOR_USAGE_1: Self = Self(20);
    pub const IMPORTANT_FOR_USAGE_2: Self = Self(30);
    pub const IMPORTANT_FOR_USAGE_3: Self = Self(35);
    pub const IMPORTANT_FOR_PLAYER_LIFE: Self = Self(40);
    pub const IMPORTANT_FOR_USER_SAFETY: Self = Self(60);
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

/// How the movement layer should reconcile key input with a rotation it
/// did not choose. The scheduler only carries this through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementCorrection {
    /// Keys stay relative to the camera
    #[default]
    Off,
    /// Keys follow the rotation; the player notices
    Strict,
    /// Keys are remapped so the visible motion is unchanged
    Silent,
    /// The camera itself is turned to the rotation
    ChangeLook,
}

impl MovementCorrection {
    pub fn corrects_movement(self) -> bool {
        !matches!(self, MovementCorrection::Off)
    }
}

/// Identity of a requesting feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub Uuid);

impl OwnerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One feature's wish for where the avatar should look this tick.
///
/// A masked axis (`None`) keeps whatever the avatar is currently facing on
/// that axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationRequest {
    pub yaw: Option<f32>,
    pub pitch: Option<f32>,
    pub priority: Priority,
    pub owner: OwnerId,
    pub movement_correction: MovementCorrection,
    /// Skip turn-rate limiting and smoothing
    pub instant: bool,
}

impl RotationRequest {
    pub fn new(rotation: Rotation, priority: Priority, owner: OwnerId) -> Self {
        Self {
            yaw: Some(rotation.yaw),
            pitch: Some(rotation.pitch),
            priority,
            owner,
            movement_correction: MovementCorrection::Off,
            instant: false,
        }
    }

    pub fn yaw_only(yaw: f32, priority: Priority, owner: OwnerId) -> Self {
        Self {
            pitch: None,
            ..Self::new(Rotation::new(yaw, 0.0), priority, owner)
        }
    }

    pub fn pitch_only(pitch: f32, priority: Priority, owner: OwnerId) -> Self {
        Self {
            yaw: None,
            ..Self::new(Rotation::new(0.0, pitch), priority, owner)
        }
    }

    pub fn with_movement_correction(mut self, correction: MovementCorrection) -> Self {
        self.movement_correction = correction;
        self
    }

    pub fn instant(mut self) -> Self {
        self.instant = true;
        self
    }

    /// Every present axis is a finite number and at least one axis is present
    pub fn is_well_formed(&self) -> bool {
        let finite = |axis: Option<f32>| axis.map_or(true, f32::is_finite);
        (self.yaw.is_some() || self.pitch.is_some()) && finite(self.yaw) && finite(self.pitch)
    }

    /// Target rotation with masked axes taken from `current`
    pub fn merged_with(&self, current: &Rotation) -> Rotation {
        Rotation {
            yaw: self.yaw.unwrap_or(current.yaw),
            pitch: self.pitch.unwrap_or(current.pitch).clamp(-90.0, 90.0),
        }
    }
}
