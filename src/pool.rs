//! Worker-pool dispatch and micro-batching for blocking embedding calls.
//!
//! A compute call is dispatched onto tokio's blocking thread pool so it never
//! stalls the admission scheduler. Inside one dispatched call the input is
//! walked in consecutive micro-batches of at most `micro_batch` strings,
//! sequentially, so peak transient memory is bounded by the batch size rather
//! than the request size. Batching is purely a memory-shaping strategy: the
//! assembled result is identical to a single full-input call.

use std::sync::Arc;

use crate::compute::{ComputeError, Embedder};
use crate::gate::GatePermit;

/// Dispatches admitted requests onto the blocking worker pool.
#[derive(Clone)]
pub struct ComputeWorkerPool {
    embedder: Arc<dyn Embedder>,
    micro_batch: usize,
}

impl ComputeWorkerPool {
    /// `micro_batch` is clamped to at least 1.
    pub fn new(embedder: Arc<dyn Embedder>, micro_batch: usize) -> Self {
        Self {
            embedder,
            micro_batch: micro_batch.max(1),
        }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Embed `inputs` on a worker thread while holding `permit`.
    ///
    /// The permit travels into the blocking closure: if the calling
    /// connection goes away mid-compute, the in-flight call is not
    /// interrupted and its gate slot stays occupied until the call finishes.
    /// That keeps the concurrency bound honest under client disconnects.
    pub async fn run(
        &self,
        inputs: Vec<String>,
        permit: GatePermit,
    ) -> Result<Vec<Vec<f32>>, ComputeError> {
        let embedder = Arc::clone(&self.embedder);
        let micro_batch = self.micro_batch;

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let mut output: Vec<Vec<f32>> = Vec::with_capacity(inputs.len());
            for chunk in inputs.chunks(micro_batch) {
                let batch = embedder.embed(chunk)?;
                output.extend(batch);
                // Intermediate buffers for this chunk are gone here; give the
                // backend a chance to drop accelerator-side state too.
                embedder.release_cache();
            }
            Ok(output)
        });

        handle
            .await
            .map_err(|e| ComputeError::WorkerTerminated(e.to_string()))?
    }
}
