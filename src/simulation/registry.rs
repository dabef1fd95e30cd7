//! Per-subject simulation caches, rebuilt every game tick

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::kinematics::{KinematicState, Kinematics};

use super::{InputSchedule, SimulationCache, SimulationError};

/// Stable index of an observed subject within one registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubjectHandle(usize);

struct Slot<M> {
    subject: Uuid,
    /// Generation the ground truth was last observed in
    generation: u64,
    cache: SimulationCache<M>,
}

/// Keeps one [`SimulationCache`] per tracked subject.
///
/// Every game tick starts a new generation. Subjects observed again keep
/// their slot but restart from the new ground truth; subjects not observed
/// during a generation are dropped when the next one begins.
pub struct SimulationRegistry<M> {
    model: M,
    slots: Vec<Slot<M>>,
    index: HashMap<Uuid, usize>,
    generation: u64,
}

impl<M: Kinematics + Clone> SimulationRegistry<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            slots: Vec::new(),
            index: HashMap::new(),
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Opens a new tick: subjects not observed since the previous call are evicted
    pub fn begin_generation(&mut self) {
        let current = self.generation;
        let before = self.slots.len();
        self.slots.retain(|slot| slot.generation == current);

        if self.slots.len() != before {
            debug!(
                evicted = before - self.slots.len(),
                remaining = self.slots.len(),
                "Evicted stale simulations"
            );
            self.index = self
                .slots
                .iter()
                .enumerate()
                .map(|(i, slot)| (slot.subject, i))
                .collect();
        }

        self.generation += 1;
    }

    /// Records this tick's ground truth for `subject`
    pub fn observe(
        &mut self,
        subject: Uuid,
        ground_truth: KinematicState,
        inputs: impl Into<InputSchedule>,
    ) -> SubjectHandle {
        let generation = self.generation;
        let inputs = inputs.into();

        if let Some(&i) = self.index.get(&subject) {
            let slot = &mut self.slots[i];
            slot.generation = generation;
            slot.cache.set_inputs(inputs);
            slot.cache.rebase(ground_truth);
            return SubjectHandle(i);
        }

        let i = self.slots.len();
        self.slots.push(Slot {
            subject,
            generation,
            cache: SimulationCache::new(self.model.clone(), ground_truth, inputs),
        });
        self.index.insert(subject, i);
        SubjectHandle(i)
    }

    pub fn handle(&self, subject: Uuid) -> Option<SubjectHandle> {
        self.index.get(&subject).copied().map(SubjectHandle)
    }

    pub fn get(&self, handle: SubjectHandle) -> Option<&SimulationCache<M>> {
        self.slots.get(handle.0).map(|slot| &slot.cache)
    }

    pub fn get_mut(&mut self, handle: SubjectHandle) -> Option<&mut SimulationCache<M>> {
        self.slots.get_mut(handle.0).map(|slot| &mut slot.cache)
    }

    /// Predicted state of `subject` `tick` ticks after its last observation
    pub fn snapshot_at(&mut self, subject: Uuid, tick: u32) -> Result<KinematicState, SimulationError> {
        let i = *self
            .index
            .get(&subject)
            .ok_or(SimulationError::UnknownSubject(subject))?;
        self.slots[i].cache.snapshot_at(tick)
    }

    /// Stops tracking `subject`. Handles issued earlier in this generation
    /// are invalid afterwards.
    pub fn remove(&mut self, subject: Uuid) -> bool {
        let Some(i) = self.index.remove(&subject) else {
            return false;
        };
        self.slots.swap_remove(i);
        if let Some(moved) = self.slots.get(i) {
            self.index.insert(moved.subject, i);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::{EmptyWorld, KinematicModel, ModelParams, MotionInput};
    use glam::DVec3;

    fn registry() -> SimulationRegistry<std::sync::Arc<KinematicModel<EmptyWorld>>> {
        let model = KinematicModel::new(ModelParams::player(), EmptyWorld);
        SimulationRegistry::new(std::sync::Arc::new(model))
    }

    fn body(x: f64) -> KinematicState {
        ModelParams::player().spawn(DVec3::new(x, 10.0, 0.0), DVec3::ZERO)
    }

    #[test]
    fn test_observe_then_query() {
        let mut reg = registry();
        let id = Uuid::new_v4();
        reg.begin_generation();
        reg.observe(id, body(1.0), MotionInput::idle());

        let later = reg.snapshot_at(id, 5).unwrap();
        assert!(later.position.y < 10.0);
        assert_eq!(later.position.x, 1.0);
    }

    #[test]
    fn test_unobserved_subject_evicted() {
        let mut reg = registry();
        let kept = Uuid::new_v4();
        let dropped = Uuid::new_v4();

        reg.begin_generation();
        reg.observe(kept, body(0.0), MotionInput::idle());
        reg.observe(dropped, body(1.0), MotionInput::idle());

        reg.begin_generation();
        reg.observe(kept, body(0.5), MotionInput::idle());
        reg.begin_generation();

        assert_eq!(reg.len(), 1);
        assert!(reg.handle(kept).is_some());
        assert_eq!(
            reg.snapshot_at(dropped, 0),
            Err(SimulationError::UnknownSubject(dropped))
        );
    }

    #[test]
    fn test_reobserve_rebases_cache() {
        let mut reg = registry();
        let id = Uuid::new_v4();
        reg.begin_generation();
        let handle = reg.observe(id, body(0.0), MotionInput::idle());
        reg.snapshot_at(id, 20).unwrap();

        reg.begin_generation();
        let again = reg.observe(id, body(3.0), MotionInput::idle());
        assert_eq!(handle, again);
        let cache = reg.get(again).unwrap();
        assert_eq!(cache.simulated_ticks(), 0);
        assert_eq!(cache.ground_truth().position.x, 3.0);
    }

    #[test]
    fn test_identical_observation_starts_fresh() {
        let mut reg = registry();
        let id = Uuid::new_v4();
        reg.begin_generation();
        let handle = reg.observe(id, body(0.0), MotionInput::idle());
        reg.snapshot_at(id, 12).unwrap();

        // A new tick never reuses last tick's future, even for the same body
        reg.begin_generation();
        reg.observe(id, body(0.0), MotionInput::idle());
        assert_eq!(reg.get(handle).unwrap().simulated_ticks(), 0);
        assert_eq!(reg.snapshot_at(id, 12).unwrap().position.x, 0.0);
    }

    #[test]
    fn test_remove_keeps_other_subjects_reachable() {
        let mut reg = registry();
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        reg.begin_generation();
        for (i, id) in ids.iter().enumerate() {
            reg.observe(*id, body(i as f64), MotionInput::idle());
        }

        assert!(reg.remove(ids[0]));
        assert!(!reg.remove(ids[0]));
        assert_eq!(reg.snapshot_at(ids[2], 0).unwrap().position.x, 2.0);
        assert_eq!(reg.snapshot_at(ids[1], 0).unwrap().position.x, 1.0);
    }
}
