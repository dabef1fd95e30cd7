//! Rotate-then-act sequencing polled once per tick

use serde::{Deserialize, Serialize};

use super::angle::Rotation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AimPhase {
    /// Waiting for the server rotation to reach the aim
    Pending,
    /// Close enough; the action may fire this tick
    Converged,
    /// Action fired; nothing left to do until restarted
    Acted,
}

/// Waits for the server-side rotation to settle on an intended rotation
/// before letting its owner act (throwing, placing, shooting).
#[derive(Debug, Clone, PartialEq)]
pub struct AimSequence {
    phase: AimPhase,
    aim: Rotation,
    threshold: f32,
    /// Ticks spent in `Pending`
    waited: u32,
    max_wait: Option<u32>,
}

impl AimSequence {
    pub fn new(aim: Rotation, threshold: f32) -> Self {
        Self {
            phase: AimPhase::Pending,
            aim,
            threshold,
            waited: 0,
            max_wait: None,
        }
    }

    /// Give up (stay `Pending`, report timed out) after `ticks`
    pub fn with_max_wait(mut self, ticks: u32) -> Self {
        self.max_wait = Some(ticks);
        self
    }

    pub fn phase(&self) -> AimPhase {
        self.phase
    }

    pub fn aim(&self) -> Rotation {
        self.aim
    }

    pub fn waited(&self) -> u32 {
        self.waited
    }

    pub fn timed_out(&self) -> bool {
        self.phase == AimPhase::Pending && self.max_wait.is_some_and(|max| self.waited >= max)
    }

    /// Moves the aim point without restarting the wait
    pub fn retarget(&mut self, aim: Rotation) {
        self.aim = aim;
        if self.phase == AimPhase::Converged {
            self.phase = AimPhase::Pending;
        }
    }

    /// Advances with this tick's server rotation
    pub fn poll(&mut self, server: &Rotation) -> AimPhase {
        match self.phase {
            AimPhase::Pending if server.approximately_equals(&self.aim, self.threshold) => {
                self.phase = AimPhase::Converged;
            }
            AimPhase::Pending => self.waited += 1,
            AimPhase::Converged if !server.approximately_equals(&self.aim, self.threshold) => {
                self.phase = AimPhase::Pending;
                self.waited += 1;
            }
            AimPhase::Converged | AimPhase::Acted => {}
        }
        self.phase
    }

    /// Marks the action done. Only allowed once converged.
    pub fn act(&mut self) -> bool {
        if self.phase != AimPhase::Converged {
            return false;
        }
        self.phase = AimPhase::Acted;
        true
    }

    /// Starts a new sequence toward `aim`
    pub fn restart(&mut self, aim: Rotation) {
        *self = Self {
            max_wait: self.max_wait,
            ..Self::new(aim, self.threshold)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_converged_acted() {
        let mut seq = AimSequence::new(Rotation::new(30.0, 10.0), 1.0);
        assert_eq!(seq.poll(&Rotation::ZERO), AimPhase::Pending);
        assert!(!seq.act());

        assert_eq!(seq.poll(&Rotation::new(29.5, 10.0)), AimPhase::Converged);
        assert!(seq.act());
        assert_eq!(seq.poll(&Rotation::ZERO), AimPhase::Acted);
        assert!(!seq.act());
    }

    #[test]
    fn test_drifting_away_returns_to_pending() {
        let mut seq = AimSequence::new(Rotation::new(30.0, 0.0), 1.0);
        seq.poll(&Rotation::new(30.0, 0.0));
        assert_eq!(seq.poll(&Rotation::new(20.0, 0.0)), AimPhase::Pending);
    }

    #[test]
    fn test_times_out() {
        let mut seq = AimSequence::new(Rotation::new(90.0, 0.0), 1.0).with_max_wait(3);
        for _ in 0..3 {
            seq.poll(&Rotation::ZERO);
        }
        assert!(seq.timed_out());

        seq.restart(Rotation::ZERO);
        assert!(!seq.timed_out());
        assert_eq!(seq.poll(&Rotation::ZERO), AimPhase::Converged);
    }
}
