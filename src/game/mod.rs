//! Headless driver: a scripted scenario run through the simulation core

pub mod scenario;
pub mod session;
pub mod snapshot;

pub use scenario::Scenario;
pub use session::{GameSession, SessionError, SessionSummary, TickReport};
pub use snapshot::{SessionSnapshot, SnapshotBuilder};
