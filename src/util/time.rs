//! Tick timing for the simulation driver

use std::time::{Duration, Instant};

/// Reference engine cadence
pub const DEFAULT_TICK_RATE: u32 = 20;

/// Driver start time for uptime tracking
static DRIVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize driver start time (call once at startup)
pub fn init_start_time() {
    DRIVER_START.get_or_init(Instant::now);
}

/// Get driver uptime in milliseconds
pub fn uptime_millis() -> u64 {
    DRIVER_START
        .get()
        .map(|start| start.elapsed().as_millis() as u64)
        .unwrap_or(0)
}

/// Wall-clock length of one tick
pub fn tick_duration(tick_rate: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(tick_rate.max(1)))
}

/// A simple timer for measuring durations
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_micros(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    pub fn reset(&mut self) {
        self.start = Instant::now();
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
