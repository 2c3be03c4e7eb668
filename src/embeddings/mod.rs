//! Embedding providers and the batch driver that runs them over chunks.
//!
//! An [`EmbeddingProvider`] turns one chunk's text into a fixed-length vector
//! or fails. Failures come in two kinds and the distinction drives the whole
//! partial-failure policy: [`EmbedError::Failed`] skips one chunk,
//! [`EmbedError::Unavailable`] aborts the run because no progress is possible.

pub mod driver;
pub mod google;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

pub use driver::{ChunkFailure, EmbeddingBatchDriver, EmbeddingRecord, EmbeddingReport};
pub use google::GoogleAiEmbeddingProvider;

/// Hint telling asymmetric embedding models which side of retrieval the
/// vector serves.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TaskIntent {
    /// The vector will be stored in an index and searched against later.
    Document,
    /// The vector is a query-time probe.
    Query,
}

impl fmt::Display for TaskIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskIntent::Document => f.write_str("document"),
            TaskIntent::Query => f.write_str("query"),
        }
    }
}

/// Failure modes of a single embedding call.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// This call failed but the service is still usable; the chunk is
    /// recorded as failed and excluded from the index.
    #[error("embedding call failed: {0}")]
    Failed(String),

    /// The service cannot be used at all (bad credentials, unreachable
    /// endpoint). The batch driver aborts the run on sight.
    #[error("embedding service unavailable: {0}")]
    Unavailable(String),
}

/// An external service converting text into a fixed-length vector.
///
/// Implementations must return vectors of uniform dimensionality across all
/// calls within one run; the batch driver treats a mismatch as fatal.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier used in status messages and logs.
    fn name(&self) -> &str;

    async fn embed(&self, text: &str, intent: TaskIntent) -> Result<Vec<f32>, EmbedError>;
}

/// Deterministic offline provider for tests and demos.
///
/// Vectors are derived from a hash of the input text, so identical text
/// always embeds identically and different text almost never collides.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dims: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dims: 8 }
    }

    #[must_use]
    pub fn with_dims(mut self, dims: usize) -> Self {
        self.dims = dims.max(1);
        self
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn embed(&self, text: &str, _intent: TaskIntent) -> Result<Vec<f32>, EmbedError> {
        Ok(hash_to_vec(text, self.dims))
    }
}

fn hash_to_vec(text: &str, dims: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..dims)
        .map(|i| {
            let bits = seed.rotate_left((i * 8) as u32) ^ ((i as u64) << 24);
            (bits as f32) / u32::MAX as f32
        })
        .collect()
}
