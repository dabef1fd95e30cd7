//! Per-tick rotation arbitration

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::angle::{mouse_gcd, Rotation};
use super::request::{MovementCorrection, OwnerId, Priority, RotationRequest};
use super::smoothing::AngleSmooth;

/// Turn limits and shaping for the avatar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Largest turn, in degrees per axis, the current rotation may make in one tick
    pub max_turn_rate: f32,
    /// Per-tick limit for the server rotation following the current one;
    /// `None` follows instantly
    pub server_turn_rate: Option<f32>,
    /// Mouse sensitivity in `[0, 1]`; turns are snapped to its step size when set
    pub sensitivity: Option<f32>,
    pub smoothing: AngleSmooth,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_turn_rate: 40.0,
            server_turn_rate: None,
            sensitivity: None,
            smoothing: AngleSmooth::default(),
        }
    }
}

/// The request that won the last resolved tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveTarget {
    pub owner: OwnerId,
    pub priority: Priority,
    /// Target with masked axes already merged
    pub rotation: Rotation,
    pub movement_correction: MovementCorrection,
    pub instant: bool,
}

/// Everything published by one call to [`RotationScheduler::end_tick`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRotation {
    pub tick: u64,
    pub current: Rotation,
    pub previous: Rotation,
    pub server: Rotation,
    pub target: Option<ActiveTarget>,
}

/// Collects rotation requests during a tick and resolves them into one
/// rotation at the end of it.
///
/// Highest priority wins; among equal priorities the first submitted wins.
/// The current rotation turns toward the winner at most `max_turn_rate`
/// degrees per axis per tick unless the winner asked to be instant.
#[derive(Debug, Clone)]
pub struct RotationScheduler {
    config: SchedulerConfig,
    pending: Vec<RotationRequest>,
    initial: Rotation,
    current: Rotation,
    previous: Rotation,
    server: Rotation,
    active: Option<ActiveTarget>,
    tick: u64,
}

impl RotationScheduler {
    pub fn new(config: SchedulerConfig, initial: Rotation) -> Self {
        Self {
            config,
            pending: Vec::new(),
            initial,
            current: initial,
            previous: initial,
            server: initial,
            active: None,
            tick: 0,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Buffers a request for this tick. Malformed requests are dropped.
    pub fn submit(&mut self, request: RotationRequest) {
        if !request.is_well_formed() {
            debug!(
                owner = %request.owner,
                priority = request.priority.0,
                yaw = ?request.yaw,
                pitch = ?request.pitch,
                "Dropped malformed rotation request"
            );
            return;
        }
        self.pending.push(request);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// First submitted among the highest priority
    fn winner(&self) -> Option<&RotationRequest> {
        let mut best: Option<&RotationRequest> = None;
        for request in &self.pending {
            if best.map_or(true, |b| request.priority > b.priority) {
                best = Some(request);
            }
        }
        best
    }

    fn turn_toward(&self, target: &Rotation) -> Rotation {
        let previous_target = self.active.as_ref().map(|active| &active.rotation);
        let smoothed = self.config.smoothing.step(&self.current, target, previous_target);

        // Rounding to the sensitivity step may add half a step on each axis
        let gcd = self.config.sensitivity.map(mouse_gcd).filter(|gcd| *gcd > 0.0);
        let limit = match gcd {
            Some(gcd) => (self.config.max_turn_rate - gcd * 0.5).max(0.0),
            None => self.config.max_turn_rate,
        };

        let capped = self.current.towards_linear(&smoothed, limit, limit);
        match gcd {
            Some(gcd) => capped.normalize_with_gcd(&self.current, gcd),
            None => capped,
        }
    }

    /// Resolves this tick's requests and publishes the result.
    ///
    /// Pending requests are always cleared. A tick without requests leaves
    /// the current rotation where it is.
    pub fn end_tick(&mut self) -> ResolvedRotation {
        self.previous = self.current;

        let active = self.winner().map(|request| ActiveTarget {
            owner: request.owner,
            priority: request.priority,
            rotation: request.merged_with(&self.current),
            movement_correction: request.movement_correction,
            instant: request.instant,
        });

        if let Some(target) = &active {
            self.current = if target.instant {
                let delta = self.current.delta_to(&target.rotation);
                Rotation::new(self.current.yaw + delta.yaw, target.rotation.pitch)
            } else {
                self.turn_toward(&target.rotation)
            };

            trace!(
                owner = %target.owner,
                priority = target.priority.0,
                competing = self.pending.len(),
                yaw = self.current.yaw,
                pitch = self.current.pitch,
                "Resolved rotation"
            );
        }

        let instant = active.map_or(false, |target| target.instant);
        self.server = match self.config.server_turn_rate {
            Some(rate) if !instant => self.server.towards_linear(&self.current, rate, rate),
            _ => self.current,
        };

        self.active = active;
        self.pending.clear();
        self.tick += 1;

        self.resolved()
    }

    /// Last published state
    pub fn resolved(&self) -> ResolvedRotation {
        ResolvedRotation {
            tick: self.tick,
            current: self.current,
            previous: self.previous,
            server: self.server,
            target: self.active,
        }
    }

    pub fn current_rotation(&self) -> Rotation {
        self.current
    }

    pub fn previous_rotation(&self) -> Rotation {
        self.previous
    }

    pub fn server_rotation(&self) -> Rotation {
        self.server
    }

    /// Which request steered the last tick
    pub fn active_target(&self) -> Option<&ActiveTarget> {
        self.active.as_ref()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Rotation to draw `partial_tick` of the way between the last two ticks
    pub fn interpolated(&self, partial_tick: f32) -> Rotation {
        self.previous.lerp(&self.current, partial_tick.clamp(0.0, 1.0))
    }

    /// The network layer actually sent (or was told) this rotation
    pub fn acknowledge_server_rotation(&mut self, rotation: Rotation) {
        if rotation.is_finite() {
            self.server = rotation;
        }
    }

    /// Yaw the movement layer should steer by, when the active request
    /// asked for movement correction
    pub fn movement_yaw(&self) -> Option<f32> {
        self.active
            .filter(|target| target.movement_correction.corrects_movement())
            .map(|_| self.current.yaw)
    }

    /// Drops buffered requests and returns every published rotation to the
    /// initial one
    pub fn reset(&mut self) {
        if !self.pending.is_empty() {
            debug!(dropped = self.pending.len(), "Discarding pending rotation requests");
        }
        self.pending.clear();
        self.current = self.initial;
        self.previous = self.initial;
        self.server = self.initial;
        self.active = None;
        self.tick = 0;
    }
}
