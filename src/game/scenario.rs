//! Scripted scenario: a stationary shooter and a wandering target on flat ground

use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use crate::kinematics::{KinematicState, Kinematics, ModelParams, MotionInput};
use crate::rotation::{wrap_degrees, Rotation};

/// Eye height above the feet
pub const EYE_HEIGHT: f64 = 1.62;

/// Projectiles spawn slightly below the eye
const LAUNCH_DROP: f64 = 0.1;

/// Target turns back toward the shooter beyond this distance
const WANDER_RADIUS: f64 = 28.0;

/// Wandering target placed by a seeded RNG
pub struct Scenario {
    pub seed: u64,
    pub shooter: KinematicState,
    pub target_id: Uuid,
    pub target: KinematicState,
    pub target_input: MotionInput,
    rng: ChaCha8Rng,
    /// Ticks left before the target picks a new heading
    wander_ticks: u32,
}

impl Scenario {
    pub fn new(seed: u64, player: &ModelParams) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        let distance = rng.gen_range(10.0..20.0);
        let spawn = DVec3::new(angle.cos() * distance, 0.0, angle.sin() * distance);

        Self {
            seed,
            shooter: player.spawn(DVec3::ZERO, DVec3::ZERO).grounded(true),
            target_id: Uuid::new_v4(),
            target: player.spawn(spawn, DVec3::ZERO).grounded(true),
            target_input: MotionInput::idle(),
            rng,
            wander_ticks: 0,
        }
    }

    /// Where projectiles leave the shooter
    pub fn launch_origin(&self) -> DVec3 {
        self.shooter.position + DVec3::new(0.0, EYE_HEIGHT - LAUNCH_DROP, 0.0)
    }

    /// Picks a new heading when due. Strays too far and it heads home.
    fn wander(&mut self) {
        if self.wander_ticks > 0 {
            self.wander_ticks -= 1;
            return;
        }
        self.wander_ticks = self.rng.gen_range(10..40);

        let position = self.target.position;
        let yaw = if position.x.hypot(position.z) > WANDER_RADIUS {
            Rotation::looking_at(DVec3::ZERO, position).yaw
        } else {
            wrap_degrees(self.rng.gen_range(-180.0..180.0))
        };

        let forward = if self.rng.gen_bool(0.8) { 1.0 } else { 0.0 };
        self.target_input = MotionInput::walking(forward, 0.0, yaw)
            .with_sprint(self.rng.gen_bool(0.3))
            .with_jump(self.rng.gen_bool(0.15));
    }

    /// Moves both bodies one tick
    pub fn advance<K: Kinematics>(&mut self, player: &K, shooter_input: &MotionInput) {
        self.wander();
        self.target = player.step(&self.target, &self.target_input);
        self.shooter = player.step(&self.shooter, shooter_input);
    }
}
