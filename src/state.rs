//! Application state shared across handlers and background tasks.
//!
//! Constructed once at startup and passed by reference everywhere; nothing in
//! the server reaches for module-level state.

use std::sync::Arc;

use crate::activity::ActivityTracker;
use crate::compute::Embedder;
use crate::config::ServerConfig;
use crate::gate::RequestGate;
use crate::pool::ComputeWorkerPool;
use crate::stats::StatsAggregator;

/// Process-lifetime service context.
pub struct AppState {
    /// Configuration snapshot
    pub config: ServerConfig,

    /// Admission gate for the embeddings endpoint
    pub gate: RequestGate,

    /// Wait-time/queue-depth window
    pub stats: StatsAggregator,

    /// Last-activity timestamp for the idle reclaimer
    pub activity: Arc<ActivityTracker>,

    /// Dispatcher onto the blocking worker pool
    pub pool: ComputeWorkerPool,
}

impl AppState {
    /// Wire the service context around a compute backend.
    pub fn new(config: ServerConfig, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            gate: RequestGate::new(config.max_concurrent),
            stats: StatsAggregator::new(),
            activity: Arc::new(ActivityTracker::new()),
            pool: ComputeWorkerPool::new(embedder, config.micro_batch),
            config,
        }
    }
}
