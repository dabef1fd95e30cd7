//! Headless session and its tick loop

use std::future::Future;
use std::sync::Arc;

use glam::DVec3;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ballistics::{BallisticSolution, BallisticSolver, Launch, SampledPath};
use crate::config::SimulationParams;
use crate::kinematics::{FlatGround, KinematicModel, KinematicState, Kinematics, MotionInput};
use crate::rotation::{
    session as rotation_session, wrap_degrees, AimPhase, AimSequence, MovementCorrection, OwnerId,
    Priority, ResolvedRotation, RotationRequest,
};
use crate::simulation::{SimulationRegistry, SubjectHandle};
use crate::util::time::{tick_duration, Timer};

use super::scenario::Scenario;
use super::snapshot::{SessionSnapshot, SnapshotBuilder, TickView};

type Model = Arc<KinematicModel<FlatGround>>;

/// Server rotation within this many degrees of the aim counts as converged
const AIM_THRESHOLD: f32 = 1.0;

/// Ticks an aim may stay unconverged before it is dropped
const AIM_MAX_WAIT: u32 = 40;

/// Ticks between throws
const THROW_COOLDOWN: u64 = 20;

/// Degrees per tick the look-around feature sweeps
const LOOK_SPEED: f32 = 3.0;

/// Sub-samples per tick when checking a projectile against the target box
const HIT_SAMPLES: u32 = 4;

/// Predicted trail points written per snapshot
const TRAIL_LENGTH: usize = 40;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no rotation session is active")]
    NoRotationSession,
}

/// Outcome of one tick
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    pub resolved: ResolvedRotation,
    pub solution: Option<BallisticSolution>,
    pub thrown: bool,
    pub hit: bool,
    pub snapshot: Option<SessionSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub ticks: u64,
    pub throws: u32,
    pub hits: u32,
}

#[derive(Debug, Clone, Copy)]
struct Projectile {
    state: KinematicState,
    age: u32,
}

/// One shooter aiming thrown projectiles at a wandering target.
///
/// Two features compete for the shooter's rotation: the aim feature at
/// `IMPORTANT_FOR_USAGE_2` whenever a solution exists, and a look-around
/// sweep at `NORMAL` the rest of the time.
pub struct GameSession {
    id: Uuid,
    tick: u64,
    scenario: Scenario,
    player_model: Model,
    projectile_model: Model,
    predictions: SimulationRegistry<Model>,
    solver: BallisticSolver<Model>,
    aim_owner: OwnerId,
    look_owner: OwnerId,
    aim: Option<AimSequence>,
    look_yaw: f32,
    last_throw: Option<u64>,
    projectiles: Vec<Projectile>,
    throws: u32,
    hits: u32,
    snapshot_builder: SnapshotBuilder,
}

impl GameSession {
    pub fn new(seed: u64, params: &SimulationParams, snapshot_interval: u32) -> Self {
        let world = FlatGround::at(0.0);
        let player_model = Arc::new(KinematicModel::new(params.player, world));
        let projectile_model = Arc::new(KinematicModel::new(params.projectile, world));

        Self {
            id: Uuid::new_v4(),
            tick: 0,
            scenario: Scenario::new(seed, &params.player),
            predictions: SimulationRegistry::new(player_model.clone()),
            solver: BallisticSolver::new(projectile_model.clone(), params.solver),
            player_model,
            projectile_model,
            aim_owner: OwnerId::new(),
            look_owner: OwnerId::new(),
            aim: None,
            look_yaw: 0.0,
            last_throw: None,
            projectiles: Vec::new(),
            throws: 0,
            hits: 0,
            snapshot_builder: SnapshotBuilder::new(snapshot_interval, TRAIL_LENGTH),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            ticks: self.tick,
            throws: self.throws,
            hits: self.hits,
        }
    }

    /// Run the tick loop until `max_ticks`, `shutdown` resolves, or the
    /// snapshot receiver goes away
    pub async fn run(
        mut self,
        tick_rate: u32,
        max_ticks: Option<u64>,
        snapshot_tx: mpsc::Sender<SessionSnapshot>,
        shutdown: impl Future<Output = ()>,
    ) -> SessionSummary {
        info!(session_id = %self.id, seed = self.scenario.seed, tick_rate, "Session started");

        let mut tick_interval = interval(tick_duration(tick_rate));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);
        let mut timer = Timer::new();

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {}
                _ = &mut shutdown => {
                    info!(session_id = %self.id, "Shutdown requested");
                    break;
                }
            }

            timer.reset();
            let report = match self.run_tick() {
                Ok(report) => report,
                Err(err) => {
                    warn!(session_id = %self.id, error = %err, "Session stopped");
                    break;
                }
            };
            debug!(tick = report.tick, elapsed_us = timer.elapsed_micros(), "Tick complete");

            if let Some(snapshot) = report.snapshot {
                if snapshot_tx.send(snapshot).await.is_err() {
                    info!(session_id = %self.id, "Snapshot receiver closed, ending session");
                    break;
                }
            }

            if max_ticks.is_some_and(|max| self.tick >= max) {
                info!(session_id = %self.id, ticks = self.tick, "Tick budget reached");
                break;
            }
        }

        let summary = self.summary();
        info!(
            session_id = %self.id,
            ticks = summary.ticks,
            throws = summary.throws,
            hits = summary.hits,
            "Session ended"
        );
        summary
    }

    /// Advance the whole scenario by one tick
    pub fn run_tick(&mut self) -> Result<TickReport, SessionError> {
        self.tick += 1;
        self.scenario.advance(&self.player_model, &MotionInput::idle());

        self.predictions.begin_generation();
        let handle = self.predictions.observe(
            self.scenario.target_id,
            self.scenario.target,
            self.scenario.target_input,
        );
        let trail = self.predict_target(handle);

        let launch = self.launch();
        let center = DVec3::new(0.0, self.scenario.target.height * 0.5, 0.0);
        let solution = SampledPath::new(trail.clone())
            .map(|path| path.offset(center))
            .and_then(|path| self.solver.solve(&launch, &path));

        self.look_yaw = wrap_degrees(self.look_yaw + LOOK_SPEED);
        let (aim_owner, look_owner, look_yaw) = (self.aim_owner, self.look_owner, self.look_yaw);
        let resolved = rotation_session::with_scheduler(|scheduler| {
            if let Some(solution) = &solution {
                let request =
                    RotationRequest::new(solution.rotation, Priority::IMPORTANT_FOR_USAGE_2, aim_owner)
                        .with_movement_correction(MovementCorrection::Silent);
                scheduler.submit(request);
            }
            scheduler.submit(RotationRequest::yaw_only(look_yaw, Priority::NORMAL, look_owner));
            scheduler.end_tick()
        })
        .ok_or(SessionError::NoRotationSession)?;

        let thrown = self.update_aim(solution.as_ref(), &resolved, &launch);
        let hit = self.update_projectiles();
        if thrown || hit {
            self.snapshot_builder.force_next();
        }

        let snapshot = self.snapshot_builder.should_send().then(|| {
            let winner_feature = resolved.target.map(|target| {
                if target.owner == aim_owner {
                    "aim"
                } else {
                    "look_around"
                }
            });
            self.snapshot_builder.build(TickView {
                tick: self.tick,
                resolved: &resolved,
                winner_feature,
                target: self.scenario.target.position,
                trail: &trail,
                solution: solution.as_ref(),
                aim_phase: self.aim.as_ref().map(AimSequence::phase),
                projectiles_in_flight: self.projectiles.len(),
                hits: self.hits,
                throws: self.throws,
            })
        });

        Ok(TickReport {
            tick: self.tick,
            resolved,
            solution,
            thrown,
            hit,
            snapshot,
        })
    }

    fn launch(&self) -> Launch {
        Launch::new(self.scenario.launch_origin(), self.projectile_model.params().launch_speed)
            .with_shooter_velocity(self.scenario.shooter.velocity, self.scenario.shooter.on_ground)
    }

    /// Predicted target feet positions, starting with the current one
    fn predict_target(&mut self, handle: SubjectHandle) -> Vec<DVec3> {
        let subject = self.scenario.target_id;
        let Some(cache) = self.predictions.get_mut(handle) else {
            return Vec::new();
        };

        let end = cache.horizon() + 1;
        let trail = cache
            .snapshots_between(0..end)
            .map(|states| states.map(|state| state.position).collect::<Vec<_>>());
        match trail {
            Ok(trail) => trail,
            Err(err) => {
                warn!(subject = %subject, error = %err, "Target prediction failed");
                vec![cache.ground_truth().position]
            }
        }
    }

    /// Rotate, wait for the server rotation to settle, then throw
    fn update_aim(
        &mut self,
        solution: Option<&BallisticSolution>,
        resolved: &ResolvedRotation,
        launch: &Launch,
    ) -> bool {
        if let Some(solution) = solution {
            match self.aim.as_mut().filter(|aim| aim.phase() != AimPhase::Acted) {
                Some(aim) => aim.retarget(solution.rotation),
                None => {
                    let aim = AimSequence::new(solution.rotation, AIM_THRESHOLD)
                        .with_max_wait(AIM_MAX_WAIT);
                    self.aim = Some(aim);
                }
            }
        }

        let Some(aim) = &mut self.aim else {
            return false;
        };

        let cooled_down = self
            .last_throw
            .map_or(true, |last| self.tick - last >= THROW_COOLDOWN);
        let phase = aim.poll(&resolved.server);

        if phase == AimPhase::Converged && solution.is_some() && cooled_down && aim.act() {
            let velocity = launch.velocity_for(&resolved.server);
            let state = self.projectile_model.params().spawn(launch.origin, velocity);
            self.projectiles.push(Projectile { state, age: 0 });
            self.last_throw = Some(self.tick);
            self.throws += 1;
            info!(
                session_id = %self.id,
                tick = self.tick,
                yaw = resolved.server.yaw,
                pitch = resolved.server.pitch,
                "Projectile thrown"
            );
            return true;
        }

        if aim.timed_out() {
            debug!(waited = aim.waited(), "Aim never converged, dropping it");
            self.aim = None;
        }
        false
    }

    /// Steps projectiles in flight. Returns whether any hit the target.
    fn update_projectiles(&mut self) -> bool {
        let target_box = self.scenario.target.bounding_box();
        let target_center = self.scenario.target.center();
        let horizon = self.projectile_model.horizon();
        let idle = MotionInput::idle();

        let model = &self.projectile_model;
        let mut hits = 0;
        self.projectiles.retain_mut(|projectile| {
            let before = projectile.state.bounding_box();
            let from = projectile.state.position;
            projectile.state = model.step(&projectile.state, &idle);
            projectile.age += 1;

            let travel = projectile.state.position - from;
            let struck = (1..=HIT_SAMPLES).any(|i| {
                let s = f64::from(i) / f64::from(HIT_SAMPLES);
                before.offset(travel * s).intersects(&target_box)
            });

            if struck {
                hits += 1;
                return false;
            }
            if projectile.state.collisions.any() {
                debug!(
                    miss = projectile.state.position.distance(target_center),
                    age = projectile.age,
                    "Projectile landed"
                );
                return false;
            }
            projectile.age < horizon
        });

        if hits == 0 {
            return false;
        }
        self.hits += hits;
        info!(session_id = %self.id, tick = self.tick, total_hits = self.hits, "Target hit");
        true
    }
}
