//! Lookahead simulation: per-subject caches of predicted future states

pub mod cache;
pub mod registry;

pub use cache::{InputSchedule, SimulationCache, Snapshots};
pub use registry::{SimulationRegistry, SubjectHandle};

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("tick {requested} is beyond the simulation horizon of {horizon}")]
    BeyondHorizon { requested: u32, horizon: u32 },

    #[error("invalid tick range {start}..{end}")]
    InvalidRange { start: u32, end: u32 },

    #[error("simulation diverged at tick {tick}")]
    Diverged { tick: u32 },

    #[error("no simulation observed for subject {0}")]
    UnknownSubject(Uuid),
}
