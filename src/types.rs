//! Shared error taxonomy and control primitives for the indexing pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

/// Errors surfaced by the pipeline and its components.
///
/// Per-file and per-chunk problems are accumulated into reports rather than
/// raised through this enum; the variants here either reject a run before any
/// work happens or abort it with no artifact produced.
#[derive(Debug, Error)]
pub enum RagPackError {
    /// Chunking parameters are unusable. Rejected before any work.
    #[error("invalid chunking configuration: {0}")]
    InvalidConfiguration(String),

    /// A single input file could not be read. Non-fatal when loading a batch;
    /// fatal only when a caller loads exactly this file.
    #[error("input '{path}' could not be read: {reason}")]
    InputUnreadable { path: PathBuf, reason: String },

    /// The embedding service cannot be used at all, so no progress is
    /// possible. Also raised when vector dimensionality shifts mid-run.
    #[error("embedding service unavailable: {0}")]
    EmbeddingServiceUnavailable(String),

    /// Every chunk failed embedding; there is nothing to index.
    #[error("no embeddings produced: all {failed} chunk(s) failed")]
    NoEmbeddingsProduced { failed: usize },

    /// The assembler was handed zero records.
    #[error("cannot assemble an index from zero vectors")]
    EmptyIndex,

    /// The ordinal -> chunk id -> docstore bijection could not be built or
    /// did not hold on load.
    #[error("index mapping violation: {0}")]
    MappingViolation(String),

    /// Writing or reading the packaged artifact failed.
    #[error("artifact serialization failed: {0}")]
    Serialization(String),

    /// The run was cancelled before completing. No artifact is produced.
    #[error("pipeline run cancelled")]
    Cancelled,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cooperative cancellation flag shared between a pipeline run and its owner.
///
/// Cancelling stops the pipeline at the next stage boundary and stops the
/// embedding driver from issuing new calls. A cancelled run always ends with
/// [`RagPackError::Cancelled`]; cancellation is never a partial-success path.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call from any thread, any number of times.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
