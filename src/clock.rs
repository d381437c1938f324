//! Pacing of simulated time against the wall clock.

use std::thread;
use std::time::Duration;

/// Failed robots back off this long between checks.
pub const FAILED_BACKOFF_S: f64 = 0.1;
/// Pause while the box is outside a robot's zone or nothing is claimable.
pub const IDLE_POLL_S: f64 = 0.01;
/// Pause at the end of every worker iteration.
pub const LOOP_PAUSE_S: f64 = 0.001;

/// Converts simulated durations into real sleeps.
#[derive(Clone, Copy, Debug)]
pub struct SimClock {
    time_scale: f64,
}

impl SimClock {
    /// `time_scale` simulated seconds elapse per wall second.
    pub fn new(time_scale: f64) -> Self {
        debug_assert!(time_scale > 0.0, "time_scale must be > 0");
        Self { time_scale }
    }

    /// Wall-clock length of `sim_seconds`; saturates instead of overflowing.
    pub fn wall(&self, sim_seconds: f64) -> Duration {
        let secs = (sim_seconds / self.time_scale).max(0.0);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Suspend the calling thread for `sim_seconds` of simulated time.
    pub fn pause(&self, sim_seconds: f64) {
        let wall = self.wall(sim_seconds);
        if !wall.is_zero() {
            thread::sleep(wall);
        }
    }
}
