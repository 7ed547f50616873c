//! Wait-time and queue-depth statistics for admitted requests.
//!
//! A single window accumulates observations between periodic flushes. The
//! flush task calls [`StatsAggregator::get_and_reset`], which snapshots and
//! zeroes the window in one step so no concurrent update is split across two
//! windows.

use std::sync::Mutex;

/// One accumulation window of request statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsWindow {
    /// Requests folded into this window
    pub requests_processed: u64,

    /// Sum of gate wait times in seconds (for averaging)
    pub total_wait_time: f64,

    /// Longest single gate wait in seconds
    pub max_wait_time: f64,

    /// Deepest queue observed at admission
    pub max_queue_depth: u64,
}

impl StatsWindow {
    /// Average gate wait in seconds, 0 for an empty window.
    pub fn avg_wait_time(&self) -> f64 {
        if self.requests_processed == 0 {
            0.0
        } else {
            self.total_wait_time / self.requests_processed as f64
        }
    }

    /// True if no request landed in this window.
    pub fn is_empty(&self) -> bool {
        self.requests_processed == 0
    }
}

/// Accumulates per-request observations with atomic snapshot-and-reset.
///
/// The four window fields are only ever touched together under one short
/// mutex, so an `update` racing a `get_and_reset` lands fully in the
/// pre-reset or fully in the post-reset window, never split.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    window: Mutex<StatsWindow>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one observation into the current window.
    pub fn update(&self, wait_time: f64, queue_depth: u64) {
        let mut w = self.window.lock().unwrap_or_else(|e| e.into_inner());
        w.requests_processed += 1;
        w.total_wait_time += wait_time;
        if wait_time > w.max_wait_time {
            w.max_wait_time = wait_time;
        }
        if queue_depth > w.max_queue_depth {
            w.max_queue_depth = queue_depth;
        }
    }

    /// Return the current window and reset it to zero in one step.
    pub fn get_and_reset(&self) -> StatsWindow {
        let mut w = self.window.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *w)
    }
}
