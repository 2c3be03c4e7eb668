//! Builds a portable retrieval index from plain-text documents.
//!
//! ```text
//! Input files ──► ingestion::document ──► ingestion::chunker
//!                                               │
//!                                               ▼
//!                     embeddings::driver (EmbeddingProvider)
//!                                               │
//!                                               ▼
//!                 index::assembler ──► FlatIndex + DocStore + mapping
//!                                               │
//!                                               ▼
//!                  artifact::ArtifactWriter ──► index.zip
//!                        (index.flat + index.docstore.json)
//! ```
//!
//! Status events flow sideways to any subscriber via [`events::StatusSender`];
//! the whole run is cancellable through [`types::CancelHandle`].

pub mod artifact;
pub mod config;
pub mod embeddings;
pub mod events;
pub mod index;
pub mod ingestion;
pub mod pipeline;
pub mod types;

pub use artifact::{Artifact, ArtifactWriter, DOCSTORE_ENTRY, INDEX_ENTRY};
pub use config::{ChunkingConfig, EmbeddingConfig};
pub use embeddings::{
    EmbedError, EmbeddingBatchDriver, EmbeddingProvider, EmbeddingRecord, EmbeddingReport,
    GoogleAiEmbeddingProvider, MockEmbeddingProvider, TaskIntent,
};
pub use events::{PipelineEvent, StatusSender};
pub use index::{AssembledIndex, DocStore, FlatIndex, IndexAssembler, StorePayload};
pub use ingestion::{Chunk, ChunkId, Chunker, Document, InputFailure, LoadOutcome};
pub use pipeline::{IndexPipeline, PipelineOutcome};
pub use types::{CancelHandle, RagPackError};
