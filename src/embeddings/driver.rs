//! Batch orchestration of embedding calls over chunks.
//!
//! Calls are dispatched with bounded concurrency purely to hide network
//! latency; results always come back in input order because the stream is
//! buffered by original position. Per-chunk failures are collected into an
//! [`EmbeddingReport`] and never abort the batch on their own. Two conditions
//! do abort it: the provider reporting itself unusable, and a vector whose
//! dimensionality disagrees with the rest of the run.

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;

use crate::embeddings::{EmbedError, EmbeddingProvider, TaskIntent};
use crate::ingestion::chunker::{Chunk, ChunkId};
use crate::types::{CancelHandle, RagPackError};

/// A chunk id paired with its embedding vector.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingRecord {
    pub chunk_id: ChunkId,
    pub vector: Vec<f32>,
}

/// One chunk that failed embedding, with the reason it was excluded.
#[derive(Clone, Debug)]
pub struct ChunkFailure {
    pub chunk_id: ChunkId,
    pub reason: String,
}

/// Aggregate status of one embedding batch.
#[derive(Clone, Debug, Default)]
pub struct EmbeddingReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<ChunkFailure>,
}

impl EmbeddingReport {
    /// Human-readable one-line summary for status reporting.
    pub fn summary(&self) -> String {
        if self.failures.is_empty() {
            format!("embedded {} of {} chunks", self.succeeded, self.attempted)
        } else {
            format!(
                "embedded {} of {} chunks ({} failed and excluded)",
                self.succeeded,
                self.attempted,
                self.failures.len()
            )
        }
    }
}

/// Runs an [`EmbeddingProvider`] over a batch of chunks.
pub struct EmbeddingBatchDriver {
    provider: Arc<dyn EmbeddingProvider>,
    concurrency: usize,
}

impl EmbeddingBatchDriver {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            concurrency: 8,
        }
    }

    /// Bounds the number of concurrently in-flight embedding calls.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Embeds every chunk with the `document` task intent.
    ///
    /// Returns records in the same order as the input chunks together with
    /// the aggregate report. Fails with
    /// [`RagPackError::NoEmbeddingsProduced`] when nothing survives,
    /// [`RagPackError::EmbeddingServiceUnavailable`] when the provider is
    /// unusable or dimensionality shifts, and [`RagPackError::Cancelled`]
    /// when the handle fires mid-batch (in-flight calls are dropped, no new
    /// calls are issued).
    pub async fn embed_all(
        &self,
        chunks: &[Chunk],
        cancel: &CancelHandle,
    ) -> Result<(Vec<EmbeddingRecord>, EmbeddingReport), RagPackError> {
        let mut report = EmbeddingReport {
            attempted: chunks.len(),
            ..Default::default()
        };
        let mut records: Vec<EmbeddingRecord> = Vec::with_capacity(chunks.len());
        let mut expected_dims: Option<usize> = None;

        let mut results = stream::iter(chunks.iter().map(|chunk| {
            let provider = Arc::clone(&self.provider);
            let chunk_id = chunk.id;
            let text = chunk.text.clone();
            async move {
                let result = provider.embed(&text, TaskIntent::Document).await;
                (chunk_id, result)
            }
        }))
        .buffered(self.concurrency);

        while !cancel.is_cancelled() {
            let Some((chunk_id, result)) = results.next().await else {
                break;
            };
            match result {
                Ok(vector) => {
                    let dims = expected_dims.get_or_insert(vector.len());
                    if *dims != vector.len() {
                        return Err(RagPackError::EmbeddingServiceUnavailable(format!(
                            "dimensionality mismatch: {} produced a {}-dim vector, expected {}",
                            chunk_id,
                            vector.len(),
                            dims
                        )));
                    }
                    report.succeeded += 1;
                    records.push(EmbeddingRecord { chunk_id, vector });
                }
                Err(EmbedError::Failed(reason)) => {
                    tracing::warn!(%chunk_id, %reason, "embedding failed, excluding chunk");
                    report.failures.push(ChunkFailure { chunk_id, reason });
                }
                Err(EmbedError::Unavailable(reason)) => {
                    return Err(RagPackError::EmbeddingServiceUnavailable(reason));
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(RagPackError::Cancelled);
        }
        if records.is_empty() {
            return Err(RagPackError::NoEmbeddingsProduced {
                failed: report.failures.len(),
            });
        }
        Ok((records, report))
    }
}
