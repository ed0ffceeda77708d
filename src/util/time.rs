//! Tick-rate configuration and server uptime

use std::time::{Duration, Instant};

/// Simulation ticks per second. Physics integrates at this rate.
pub const SIMULATION_TPS: u32 = 100;

/// Snapshot broadcasts per second. Deliberately slower than the
/// simulation: bandwidth is decoupled from simulation fidelity.
pub const SNAPSHOT_TPS: u32 = 20;

/// Fixed period between simulation ticks.
pub fn simulation_interval() -> Duration {
    Duration::from_micros(1_000_000 / SIMULATION_TPS as u64)
}

/// Fixed period between snapshot broadcasts.
pub fn snapshot_interval() -> Duration {
    Duration::from_micros(1_000_000 / SNAPSHOT_TPS as u64)
}

/// Server start time for uptime tracking.
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup).
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds.
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}
