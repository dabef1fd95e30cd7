//! Per-tick debug snapshots emitted as JSON lines

use glam::DVec3;
use serde::Serialize;

use crate::ballistics::{BallisticSolution, SolveMethod};
use crate::rotation::{AimPhase, OwnerId, ResolvedRotation, Rotation};

/// Winning request as shown in a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct WinnerView {
    pub owner: OwnerId,
    /// Feature name of the owner
    pub feature: &'static str,
    pub priority: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SolutionView {
    pub yaw: f32,
    pub pitch: f32,
    pub arrival_tick: f64,
    pub miss_distance: f64,
    pub method: SolveMethod,
}

impl From<&BallisticSolution> for SolutionView {
    fn from(solution: &BallisticSolution) -> Self {
        Self {
            yaw: solution.rotation.yaw,
            pitch: solution.rotation.pitch,
            arrival_tick: solution.arrival_tick,
            miss_distance: solution.miss_distance,
            method: solution.method,
        }
    }
}

/// One line of driver output
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub tick: u64,
    pub current: Rotation,
    pub server: Rotation,
    pub winner: Option<WinnerView>,
    pub target: DVec3,
    /// Predicted target positions, one per tick ahead
    pub trail: Vec<DVec3>,
    pub solution: Option<SolutionView>,
    pub aim_phase: Option<AimPhase>,
    pub projectiles_in_flight: usize,
    pub hits: u32,
    pub throws: u32,
}

/// Everything the snapshot builder reads from a finished tick
pub struct TickView<'a> {
    pub tick: u64,
    pub resolved: &'a ResolvedRotation,
    pub winner_feature: Option<&'static str>,
    pub target: DVec3,
    pub trail: &'a [DVec3],
    pub solution: Option<&'a BallisticSolution>,
    pub aim_phase: Option<AimPhase>,
    pub projectiles_in_flight: usize,
    pub hits: u32,
    pub throws: u32,
}

/// Decides when to emit snapshots and builds them
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
    /// Trail points kept per snapshot
    trail_length: usize,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32, trail_length: usize) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
            trail_length,
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for throws and hits)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    pub fn build(&self, view: TickView<'_>) -> SessionSnapshot {
        let winner = view.resolved.target.map(|target| WinnerView {
            owner: target.owner,
            feature: view.winner_feature.unwrap_or("unknown"),
            priority: target.priority.0,
        });

        SessionSnapshot {
            tick: view.tick,
            current: view.resolved.current,
            server: view.resolved.server,
            winner,
            target: view.target,
            trail: view.trail.iter().take(self.trail_length).copied().collect(),
            solution: view.solution.map(SolutionView::from),
            aim_phase: view.aim_phase,
            projectiles_in_flight: view.projectiles_in_flight,
            hits: view.hits,
            throws: view.throws,
        }
    }
}
