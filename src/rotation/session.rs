//! Process-wide scheduler tied to the game session lifecycle

use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::info;

use super::angle::Rotation;
use super::scheduler::{RotationScheduler, SchedulerConfig};

/// `None` outside a session
static SCHEDULER: OnceLock<Mutex<Option<RotationScheduler>>> = OnceLock::new();

fn slot() -> &'static Mutex<Option<RotationScheduler>> {
    SCHEDULER.get_or_init(|| Mutex::new(None))
}

/// Installs a fresh scheduler for a new session, replacing any previous one
pub fn start_session(config: SchedulerConfig, initial: Rotation) {
    let mut guard = slot().lock();
    if guard.is_some() {
        info!("Rotation session restarted");
    } else {
        info!(max_turn_rate = config.max_turn_rate, "Rotation session started");
    }
    *guard = Some(RotationScheduler::new(config, initial));
}

/// Tears the session down: pending requests are discarded and published
/// rotations are reset before the scheduler is dropped
pub fn end_session() {
    let mut guard = slot().lock();
    if let Some(mut scheduler) = guard.take() {
        let ticks = scheduler.tick();
        scheduler.reset();
        info!(ticks, "Rotation session ended");
    }
}

pub fn is_active() -> bool {
    slot().lock().is_some()
}

/// Runs `f` against the session scheduler. Returns `None` outside a session.
pub fn with_scheduler<R>(f: impl FnOnce(&mut RotationScheduler) -> R) -> Option<R> {
    slot().lock().as_mut().map(f)
}
