//! Startup and shutdown of supervised background tasks.
//!
//! Two periodic loops run for the life of the process: the stats flush and
//! the idle reclaimer. Both are owned here, share one cancellation token, and
//! are awaited on shutdown so no orphaned task survives the server.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::reclaim::{probe_trim, resident_set_bytes, IdleReclaimer};
use crate::state::AppState;

/// Owns the background tasks spawned at startup.
pub struct Lifecycle {
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl Lifecycle {
    /// Probe host capabilities and spawn the stats-flush and idle-reclaim
    /// loops.
    pub fn start(state: Arc<AppState>) -> Self {
        let cancel = CancellationToken::new();
        let mut handles = Vec::new();

        handles.push(tokio::spawn(stats_flush_loop(
            Arc::clone(&state),
            cancel.clone(),
        )));

        let reclaimer = IdleReclaimer::new(
            Arc::clone(&state.activity),
            Arc::clone(state.pool.embedder()),
            probe_trim(),
            state.config.reclaim_config(),
        );
        handles.push(tokio::spawn(reclaimer.run(cancel.clone())));

        info!("background tasks started");
        Self { handles, cancel }
    }

    /// Cancel both loops and wait for them to finish.
    ///
    /// Cooperative termination is the expected path here; only a panicked
    /// task is treated as an error.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            match handle.await {
                Ok(()) => {}
                Err(e) => error!("background task panicked during shutdown: {e}"),
            }
        }
        info!("background tasks stopped");
    }
}

/// Periodically drain the stats window, logging only non-empty windows.
async fn stats_flush_loop(state: Arc<AppState>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(state.config.stats_interval) => {}
        }

        let window = state.stats.get_and_reset();
        if !window.is_empty() {
            info!(
                processed = window.requests_processed,
                avg_wait_ms = window.avg_wait_time() * 1000.0,
                max_wait_ms = window.max_wait_time * 1000.0,
                max_queue_depth = window.max_queue_depth,
                "embedding request stats"
            );
        }
        if let Some(rss) = resident_set_bytes() {
            info!(rss_mb = rss / (1024 * 1024), "memory usage");
        }
    }
}
