//! End-to-end pipeline: load documents, chunk, embed, assemble, package.
//!
//! Data flows strictly forward through the stages; the cancel handle is
//! checked at every stage boundary so a cancelled run stops promptly and
//! produces no artifact.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::artifact::ArtifactWriter;
use crate::config::ChunkingConfig;
use crate::embeddings::driver::{EmbeddingBatchDriver, EmbeddingReport};
use crate::embeddings::EmbeddingProvider;
use crate::events::StatusSender;
use crate::index::assembler::IndexAssembler;
use crate::ingestion::chunker::Chunker;
use crate::ingestion::document::{self, InputFailure, LoadOutcome};
use crate::types::{CancelHandle, RagPackError};

/// Terminal summary of a successful run.
#[derive(Clone, Debug)]
pub struct PipelineOutcome {
    /// Where the packaged artifact landed.
    pub artifact_path: PathBuf,
    pub documents_loaded: usize,
    /// Chunks that made it into the index.
    pub chunks_indexed: usize,
    /// Input files that were skipped, per-file reasons included.
    pub input_failures: Vec<InputFailure>,
    /// Per-chunk embedding outcome for the whole batch.
    pub report: EmbeddingReport,
}

/// Builder for [`IndexPipeline`].
#[derive(Default)]
pub struct IndexPipelineBuilder {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    chunking: Option<ChunkingConfig>,
    concurrency: Option<usize>,
    status: Option<StatusSender>,
    cancel: Option<CancelHandle>,
}

impl IndexPipelineBuilder {
    /// Set the embedding provider. Required.
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Override the default 800/180 chunking configuration.
    #[must_use]
    pub fn chunking(mut self, config: ChunkingConfig) -> Self {
        self.chunking = Some(config);
        self
    }

    /// Bound on concurrently in-flight embedding calls. Defaults to 8.
    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency.max(1));
        self
    }

    /// Attach a status channel for progress events.
    #[must_use]
    pub fn status(mut self, status: StatusSender) -> Self {
        self.status = Some(status);
        self
    }

    /// Share an externally owned cancel handle.
    #[must_use]
    pub fn cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Build the pipeline.
    ///
    /// # Panics
    ///
    /// Panics if [`provider()`](Self::provider) was not called.
    pub fn build(self) -> IndexPipeline {
        IndexPipeline {
            provider: self
                .provider
                .expect("IndexPipelineBuilder requires a provider"),
            chunking: self.chunking.unwrap_or_default(),
            concurrency: self.concurrency.unwrap_or(8),
            status: self.status.unwrap_or_default(),
            cancel: self.cancel.unwrap_or_default(),
        }
    }
}

/// One configured pipeline, reusable across runs.
pub struct IndexPipeline {
    provider: Arc<dyn EmbeddingProvider>,
    chunking: ChunkingConfig,
    concurrency: usize,
    status: StatusSender,
    cancel: CancelHandle,
}

impl IndexPipeline {
    pub fn builder() -> IndexPipelineBuilder {
        IndexPipelineBuilder::default()
    }

    /// Handle callers can use to cancel a running pipeline.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Loads every `.txt` file in `input_dir` and runs the pipeline over it.
    pub async fn run_dir(
        &self,
        input_dir: &Path,
        destination: &Path,
    ) -> Result<PipelineOutcome, RagPackError> {
        let loaded = document::load_text_dir(input_dir).await?;
        self.run(loaded, destination).await
    }

    /// Runs the pipeline over already-loaded documents and writes the
    /// artifact to `destination`.
    pub async fn run(
        &self,
        loaded: LoadOutcome,
        destination: &Path,
    ) -> Result<PipelineOutcome, RagPackError> {
        // Reject bad configuration before any work.
        self.chunking.validate()?;
        self.checkpoint()?;

        let LoadOutcome {
            documents,
            failures: input_failures,
        } = loaded;
        self.status.emit(
            "ingest",
            format!(
                "loaded {} document(s), skipped {} unreadable",
                documents.len(),
                input_failures.len()
            ),
        );
        tracing::info!(
            documents = documents.len(),
            skipped = input_failures.len(),
            "ingestion complete"
        );

        self.checkpoint()?;
        let mut chunker = Chunker::new(self.chunking.clone())?;
        let chunks = chunker.split_all(&documents);
        self.status
            .emit("chunking", format!("split into {} chunk(s)", chunks.len()));
        tracing::info!(chunks = chunks.len(), "chunking complete");

        self.checkpoint()?;
        self.status.emit(
            "embedding",
            format!(
                "embedding {} chunk(s) via {}",
                chunks.len(),
                self.provider.name()
            ),
        );
        let driver = EmbeddingBatchDriver::new(Arc::clone(&self.provider))
            .with_concurrency(self.concurrency);
        let (records, report) = driver.embed_all(&chunks, &self.cancel).await?;
        self.status.emit("embedding", report.summary());
        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failures.len(),
            "embedding complete"
        );

        self.checkpoint()?;
        let assembled = IndexAssembler::assemble(&records, &chunks)?;
        self.status.emit(
            "index",
            format!(
                "assembled index of {} vector(s), {} dimensions",
                assembled.len(),
                assembled.index.dims()
            ),
        );

        self.checkpoint()?;
        let artifact_path = ArtifactWriter::new(destination).write(&assembled)?;
        self.status.emit(
            "artifact",
            format!("wrote {}", artifact_path.display()),
        );
        tracing::info!(path = %artifact_path.display(), "artifact written");

        Ok(PipelineOutcome {
            artifact_path,
            documents_loaded: documents.len(),
            chunks_indexed: assembled.len(),
            input_failures,
            report,
        })
    }

    fn checkpoint(&self) -> Result<(), RagPackError> {
        if self.cancel.is_cancelled() {
            Err(RagPackError::Cancelled)
        } else {
            Ok(())
        }
    }
}
