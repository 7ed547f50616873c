//! Idle-triggered memory reclamation.
//!
//! After a sustained idle period the server hands retained memory back to the
//! OS: the embedding backend drops its caches, then the allocator is asked to
//! trim. Trimming is a glibc-only call, so it is probed once at startup and
//! expressed as a capability with a no-op fallback; on hosts without it the
//! rest of the reclamation pass still runs.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::activity::ActivityTracker;
use crate::compute::Embedder;

/// Allocator-level trim capability, resolved once at startup.
pub trait MemoryTrim: Send + Sync {
    /// Ask the allocator to return free memory to the OS.
    fn trim(&self);
}

/// glibc `malloc_trim(0)`.
#[cfg(all(target_os = "linux", target_env = "gnu"))]
struct OsTrim;

#[cfg(all(target_os = "linux", target_env = "gnu"))]
impl MemoryTrim for OsTrim {
    fn trim(&self) {
        // SAFETY: malloc_trim has no preconditions and only touches
        // allocator bookkeeping.
        unsafe {
            libc::malloc_trim(0);
        }
    }
}

/// Fallback when no allocator trim is available on the host.
#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
struct NoopTrim;

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
impl MemoryTrim for NoopTrim {
    fn trim(&self) {}
}

/// Probe the host for allocator-trim support.
///
/// Logged once here; reclamation cycles never re-probe.
pub fn probe_trim() -> Arc<dyn MemoryTrim> {
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    {
        debug!("allocator trim available (glibc malloc_trim)");
        Arc::new(OsTrim)
    }
    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    {
        tracing::warn!(
            "allocator trim unavailable on this platform, idle reclamation will skip the OS-trim step"
        );
        Arc::new(NoopTrim)
    }
}

/// Timing knobs for the idle loop.
#[derive(Debug, Clone)]
pub struct ReclaimConfig {
    /// Idle time that triggers a reclamation pass
    pub idle_threshold: Duration,
    /// How often the loop wakes up to check
    pub check_interval: Duration,
}

/// Background loop that trims memory after sustained idleness.
///
/// Cycle: sleep `check_interval`; if the tracker reports more than
/// `idle_threshold` of idleness, run one reclamation pass and then back off
/// for `idle_threshold - check_interval` so a still-idle process is not
/// re-trimmed every tick. Cancellation is observed at the sleep boundaries.
pub struct IdleReclaimer {
    activity: Arc<ActivityTracker>,
    embedder: Arc<dyn Embedder>,
    trim: Arc<dyn MemoryTrim>,
    config: ReclaimConfig,
}

impl IdleReclaimer {
    pub fn new(
        activity: Arc<ActivityTracker>,
        embedder: Arc<dyn Embedder>,
        trim: Arc<dyn MemoryTrim>,
        config: ReclaimConfig,
    ) -> Self {
        Self {
            activity,
            embedder,
            trim,
            config,
        }
    }

    /// Run until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.check_interval) => {}
            }

            let idle = self.activity.idle_for();
            if idle <= self.config.idle_threshold {
                continue;
            }

            self.reclaim(idle);

            // Extended sleep while the process remains idle.
            let backoff = self
                .config
                .idle_threshold
                .saturating_sub(self.config.check_interval);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(backoff) => {}
            }
        }
        debug!("idle reclaimer stopped");
    }

    /// One reclamation pass: backend caches first, then the allocator.
    fn reclaim(&self, idle: Duration) {
        info!(
            idle_secs = idle.as_secs(),
            rss_bytes = resident_set_bytes(),
            "idle threshold exceeded, reclaiming memory"
        );
        self.embedder.release_cache();
        self.trim.trim();
    }
}

/// Resident set size of this process, if the host exposes it.
pub fn resident_set_bytes() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
        let rss_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
        Some(rss_pages * 4096)
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}
