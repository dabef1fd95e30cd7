//! Memoized forward simulation of one subject

use std::ops::Range;

use tracing::{debug, warn};

use crate::kinematics::{KinematicState, Kinematics, MotionInput};

use super::SimulationError;

/// Input assumed for every simulated tick
#[derive(Debug, Clone, PartialEq)]
pub enum InputSchedule {
    /// The same keys held for the whole lookahead
    Constant(MotionInput),
    /// One input per tick; the last entry repeats once the script runs out
    Scripted(Vec<MotionInput>),
}

impl InputSchedule {
    /// Input applied when stepping from `tick` to `tick + 1`
    pub fn input_at(&self, tick: u32) -> MotionInput {
        match self {
            InputSchedule::Constant(input) => *input,
            InputSchedule::Scripted(inputs) => inputs
                .get(tick as usize)
                .or_else(|| inputs.last())
                .copied()
                .unwrap_or_default(),
        }
    }
}

impl Default for InputSchedule {
    fn default() -> Self {
        InputSchedule::Constant(MotionInput::idle())
    }
}

impl From<MotionInput> for InputSchedule {
    fn from(input: MotionInput) -> Self {
        InputSchedule::Constant(input)
    }
}

/// Forward simulation of one subject, computed lazily and kept per tick.
///
/// Tick 0 is the ground truth the cache was built from. Tick `n` is only
/// ever computed from tick `n - 1`, so memoized answers are identical to a
/// fresh simulation.
#[derive(Debug, Clone)]
pub struct SimulationCache<M> {
    model: M,
    inputs: InputSchedule,
    snapshots: Vec<KinematicState>,
}

impl<M: Kinematics> SimulationCache<M> {
    pub fn new(model: M, ground_truth: KinematicState, inputs: impl Into<InputSchedule>) -> Self {
        Self {
            model,
            inputs: inputs.into(),
            snapshots: vec![ground_truth],
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn ground_truth(&self) -> &KinematicState {
        &self.snapshots[0]
    }

    pub fn inputs(&self) -> &InputSchedule {
        &self.inputs
    }

    /// Furthest tick this cache will simulate to
    pub fn horizon(&self) -> u32 {
        self.model.horizon()
    }

    /// Number of ticks already simulated (tick 0 excluded)
    pub fn simulated_ticks(&self) -> u32 {
        (self.snapshots.len() - 1) as u32
    }

    /// Drops every simulated tick, keeping only the ground truth
    pub fn invalidate(&mut self) {
        if self.snapshots.len() > 1 {
            debug!(dropped = self.snapshots.len() - 1, "Simulation cache invalidated");
        }
        self.snapshots.truncate(1);
    }

    /// Starts over from a newly observed ground truth
    pub fn rebase(&mut self, ground_truth: KinematicState) {
        self.invalidate();
        self.snapshots[0] = ground_truth;
    }

    /// Changes the assumed input and discards everything derived from the old one
    pub fn set_inputs(&mut self, inputs: impl Into<InputSchedule>) {
        self.inputs = inputs.into();
        self.invalidate();
    }

    fn check_horizon(&self, tick: u32) -> Result<(), SimulationError> {
        let horizon = self.horizon();
        if tick > horizon {
            return Err(SimulationError::BeyondHorizon {
                requested: tick,
                horizon,
            });
        }
        Ok(())
    }

    /// Simulates forward until `tick` is cached
    pub fn simulate_until(&mut self, tick: u32) -> Result<(), SimulationError> {
        self.check_horizon(tick)?;

        while self.simulated_ticks() < tick {
            let current = self.simulated_ticks();
            let input = self.inputs.input_at(current);
            let next = self.model.step(&self.snapshots[current as usize], &input);

            if !next.is_finite() {
                warn!(tick = current + 1, "Simulation diverged");
                return Err(SimulationError::Diverged { tick: current + 1 });
            }
            self.snapshots.push(next);
        }
        Ok(())
    }

    /// State `tick` ticks after the ground truth
    pub fn snapshot_at(&mut self, tick: u32) -> Result<KinematicState, SimulationError> {
        self.simulate_until(tick)?;
        Ok(self.snapshots[tick as usize])
    }

    /// States for every tick in `range`, stepped only as far as the caller reads.
    ///
    /// The range is checked against the horizon up front. Ticks already in
    /// the cache are re-walked without stepping the model. The walk ends
    /// early if the model diverges.
    pub fn snapshots_between(&mut self, range: Range<u32>) -> Result<Snapshots<'_, M>, SimulationError> {
        if range.start > range.end {
            return Err(SimulationError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        if range.end > range.start {
            self.check_horizon(range.end - 1)?;
        } else {
            self.check_horizon(range.start.saturating_sub(1))?;
        }

        Ok(Snapshots {
            cache: self,
            next: range.start,
            end: range.end,
        })
    }
}

/// Forward-only walk over a [`SimulationCache`]
#[derive(Debug)]
pub struct Snapshots<'a, M> {
    cache: &'a mut SimulationCache<M>,
    next: u32,
    end: u32,
}

impl<M: Kinematics> Iterator for Snapshots<'_, M> {
    type Item = KinematicState;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        match self.cache.snapshot_at(self.next) {
            Ok(state) => {
                self.next += 1;
                Some(state)
            }
            Err(_) => {
                self.next = self.end;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some((self.end - self.next) as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::{
        CollisionFn, EmptyWorld, FlatGround, KinematicModel, ModelParams,
    };
    use glam::DVec3;
    use std::cell::Cell;

    fn falling_player() -> KinematicState {
        ModelParams::player().spawn(DVec3::new(0.0, 20.0, 0.0), DVec3::new(0.1, 0.0, 0.0))
    }

    #[test]
    fn test_tick_zero_is_ground_truth() {
        let model = KinematicModel::new(ModelParams::player(), EmptyWorld);
        let mut cache = SimulationCache::new(&model, falling_player(), MotionInput::idle());
        assert_eq!(cache.snapshot_at(0).unwrap(), falling_player());
        assert_eq!(cache.simulated_ticks(), 0);
    }

    #[test]
    fn test_memoized_matches_fresh() {
        let model = KinematicModel::new(ModelParams::player(), FlatGround::at(0.0));
        let input = MotionInput::walking(1.0, 0.0, 30.0).with_jump(true);

        let mut warm = SimulationCache::new(&model, falling_player(), input);
        warm.snapshot_at(5).unwrap();
        let from_warm = warm.snapshot_at(3).unwrap();

        let mut fresh = SimulationCache::new(&model, falling_player(), input);
        assert_eq!(from_warm, fresh.snapshot_at(3).unwrap());
    }

    #[test]
    fn test_beyond_horizon_is_an_error() {
        let model = KinematicModel::new(ModelParams::player(), EmptyWorld);
        let mut cache = SimulationCache::new(&model, falling_player(), MotionInput::idle());
        let horizon = cache.horizon();

        assert!(cache.snapshot_at(horizon).is_ok());
        assert_eq!(
            cache.snapshot_at(horizon + 1),
            Err(SimulationError::BeyondHorizon {
                requested: horizon + 1,
                horizon
            })
        );
    }

    #[test]
    fn test_snapshots_between_rewalks_cache() {
        let steps = Cell::new(0u32);
        let world = CollisionFn(|_: &crate::kinematics::Aabb| {
            steps.set(steps.get() + 1);
            true
        });
        let model = KinematicModel::new(ModelParams::player(), world);
        let mut cache = SimulationCache::new(&model, falling_player(), MotionInput::idle());

        let first: Vec<_> = cache.snapshots_between(2..8).unwrap().collect();
        let queries = steps.get();
        let second: Vec<_> = cache.snapshots_between(2..8).unwrap().collect();

        assert_eq!(first.len(), 6);
        assert_eq!(first, second);
        assert_eq!(steps.get(), queries, "second walk must not touch the model");
    }

    #[test]
    fn test_snapshots_step_only_as_far_as_read() {
        let model = KinematicModel::new(ModelParams::player(), EmptyWorld);
        let mut cache = SimulationCache::new(&model, falling_player(), MotionInput::idle());

        let firsts: Vec<_> = cache.snapshots_between(0..50).unwrap().take(3).collect();
        assert_eq!(firsts.len(), 3);
        assert_eq!(cache.simulated_ticks(), 2);
    }

    #[test]
    fn test_empty_range_past_simulated_prefix() {
        let model = KinematicModel::new(ModelParams::player(), EmptyWorld);
        let mut cache = SimulationCache::new(&model, falling_player(), MotionInput::idle());

        assert_eq!(cache.snapshots_between(50..50).unwrap().count(), 0);
        assert_eq!(cache.simulated_ticks(), 0);
    }

    #[test]
    fn test_range_beyond_horizon_rejected() {
        let model = KinematicModel::new(ModelParams::player(), EmptyWorld);
        let mut cache = SimulationCache::new(&model, falling_player(), MotionInput::idle());
        let horizon = cache.horizon();

        let empty = cache.snapshots_between(500..500).map(|s| s.count());
        assert!(matches!(empty, Err(SimulationError::BeyondHorizon { .. })));

        let overlong = cache.snapshots_between(0..horizon + 2).map(|s| s.count());
        assert_eq!(
            overlong,
            Err(SimulationError::BeyondHorizon {
                requested: horizon + 1,
                horizon
            })
        );
        assert_eq!(cache.snapshots_between(0..horizon + 1).unwrap().count(), horizon as usize + 1);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let model = KinematicModel::new(ModelParams::player(), EmptyWorld);
        let mut cache = SimulationCache::new(&model, falling_player(), MotionInput::idle());
        #[allow(clippy::reversed_empty_ranges)]
        let result = cache.snapshots_between(5..2).map(|s| s.count());
        assert_eq!(result, Err(SimulationError::InvalidRange { start: 5, end: 2 }));
    }

    #[test]
    fn test_rebase_discards_old_future() {
        let model = KinematicModel::new(ModelParams::player(), EmptyWorld);
        let mut cache = SimulationCache::new(&model, falling_player(), MotionInput::idle());
        let before = cache.snapshot_at(10).unwrap();

        let moved = ModelParams::player().spawn(DVec3::new(5.0, 20.0, 0.0), DVec3::ZERO);
        cache.rebase(moved);
        assert_eq!(cache.simulated_ticks(), 0);
        assert_ne!(cache.snapshot_at(10).unwrap(), before);
    }

    #[test]
    fn test_scripted_inputs_repeat_last() {
        let schedule = InputSchedule::Scripted(vec![
            MotionInput::idle().with_jump(true),
            MotionInput::walking(1.0, 0.0, 0.0),
        ]);
        assert!(schedule.input_at(0).jump);
        assert_eq!(schedule.input_at(7), MotionInput::walking(1.0, 0.0, 0.0));
        assert_eq!(InputSchedule::Scripted(Vec::new()).input_at(3), MotionInput::idle());
    }
}
