//! The compute capability boundary.
//!
//! An [`Embedder`] turns strings into fixed-dimension unit vectors. The call
//! is blocking and potentially heavy (tokenization + model forward pass), so
//! it must only ever run inside the worker pool, never on the admission
//! scheduler. The model backend is opaque to the rest of the server; this
//! module ships a deterministic hashing backend that exercises the full
//! pipeline shape (feature extraction, pooling, L2 normalization) without a
//! model dependency.

use thiserror::Error;

/// Opaque failure surfaced by the embedding backend. Never retried.
#[derive(Debug, Error)]
pub enum ComputeError {
    /// The backend rejected or failed on the given input
    #[error("embedding computation failed: {0}")]
    Backend(String),

    /// The dispatched worker task terminated abnormally
    #[error("embedding worker terminated: {0}")]
    WorkerTerminated(String),
}

/// Blocking text-to-vector computation.
///
/// Implementations must be safely invocable concurrently up to the worker
/// pool size; the server shares one instance read-only across all workers.
pub trait Embedder: Send + Sync {
    /// Output vector dimension.
    fn dimension(&self) -> usize;

    /// Embed a batch of strings, one L2-normalized vector per input, in
    /// input order.
    fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ComputeError>;

    /// Release any accelerator-side cache held by the backend. Called between
    /// micro-batches and during idle reclamation. Default: nothing to
    /// release.
    fn release_cache(&self) {}
}

/// Floor applied to the norm so all-zero vectors never divide by zero.
const NORM_EPSILON: f32 = 1e-12;

/// Scale `v` to unit Euclidean length in place.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(NORM_EPSILON);
    for x in v.iter_mut() {
        *x /= norm;
    }
}

/// Deterministic hashing embedder.
///
/// Maps byte bigrams into hashed buckets and normalizes the result. Purely a
/// function of the input string, so batch boundaries cannot affect output;
/// useful as a stand-in backend and for batching tests.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        let bytes = text.as_bytes();
        for (i, window) in bytes.windows(2).enumerate() {
            let h = fnv1a(&[window[0], window[1], (i % 251) as u8]);
            let bucket = (h % self.dimension as u64) as usize;
            let sign = if h & (1 << 32) == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        if let Some(&b) = bytes.first() {
            v[(fnv1a(&[b]) % self.dimension as u64) as usize] += 1.0;
        }
        l2_normalize(&mut v);
        v
    }
}

impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ComputeError> {
        Ok(inputs.iter().map(|s| self.embed_one(s)).collect())
    }
}

/// 64-bit FNV-1a over a byte slice.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100_0000_01b3);
    }
    hash
}
