//! Capacity-bounded admission gate for the embeddings endpoint.
//!
//! At most `capacity` requests hold a permit at once; excess callers suspend
//! in [`RequestGate::acquire`] until a permit frees up. Admission order
//! follows the tokio semaphore's queue, which is FIFO in practice but not a
//! hard guarantee. The gate also maintains its own waiter counter so queue
//! depth is observable without reaching into semaphore internals.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum GateError {
    /// The gate's semaphore was closed; only possible during shutdown.
    #[error("request gate is closed")]
    Closed,
}

/// Bounds concurrent in-flight compute calls.
#[derive(Debug)]
pub struct RequestGate {
    semaphore: Arc<Semaphore>,
    /// Tasks currently suspended in `acquire`
    waiting: AtomicU64,
    capacity: usize,
}

impl RequestGate {
    /// Create a gate admitting at most `capacity` concurrent holders.
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            waiting: AtomicU64::new(0),
            capacity,
        }
    }

    /// Suspend until a permit is available.
    ///
    /// The returned [`GatePermit`] releases its slot exactly once when
    /// dropped, on every exit path. The measured wait time is carried on the
    /// permit for stats reporting.
    pub async fn acquire(&self) -> Result<GatePermit, GateError> {
        let started = Instant::now();

        // Counter discipline: increment before suspending, decrement after
        // resuming. The guard also decrements if the waiting future is
        // dropped mid-suspend (client gone before admission).
        let _waiting = WaitingGuard::enter(&self.waiting);
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| GateError::Closed)?;
        drop(_waiting);

        Ok(GatePermit {
            _permit: permit,
            waited: started.elapsed(),
        })
    }

    /// Best-effort number of tasks currently blocked in `acquire`.
    pub fn queue_depth(&self) -> u64 {
        self.waiting.load(Ordering::Relaxed)
    }

    /// Permits not currently held.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Admission slot held by one request. Dropping it releases the slot.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    waited: Duration,
}

impl GatePermit {
    /// How long the request waited for admission.
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

/// Decrements the waiter counter on drop, whether `acquire` resumed normally
/// or was cancelled while suspended.
struct WaitingGuard<'a> {
    waiting: &'a AtomicU64,
}

impl<'a> WaitingGuard<'a> {
    fn enter(waiting: &'a AtomicU64) -> Self {
        waiting.fetch_add(1, Ordering::Relaxed);
        Self { waiting }
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.waiting.fetch_sub(1, Ordering::Relaxed);
    }
}
