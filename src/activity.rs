//! Last-activity tracking for the idle reclaimer.
//!
//! Single writer (the request handler) overwrites a monotonic timestamp on
//! every admitted request; the idle loop reads it on a fixed interval. Relaxed
//! atomics are sufficient: the reader tolerates staleness bounded by its own
//! check interval, so a racing read is never a correctness hazard.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Tracks when the server last admitted a request.
#[derive(Debug)]
pub struct ActivityTracker {
    /// Reference point for the stored offset
    epoch: Instant,
    /// Milliseconds since `epoch` at the last `touch`
    last_activity_ms: AtomicU64,
}

impl ActivityTracker {
    /// Create a tracker initialized to "now".
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
        }
    }

    /// Record activity at the current instant.
    pub fn touch(&self) {
        let elapsed = self.epoch.elapsed().as_millis() as u64;
        self.last_activity_ms.store(elapsed, Ordering::Relaxed);
    }

    /// Time since the last recorded activity.
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_activity_ms.load(Ordering::Relaxed));
        self.epoch.elapsed().saturating_sub(last)
    }
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}
