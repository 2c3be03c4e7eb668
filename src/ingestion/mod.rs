//! Ingestion utilities for turning raw input files into chunked datasets.
//!
//! * [`document`] — document model and loaders with per-file failure reporting.
//! * [`chunker`] — overlap-aware splitting with run-global chunk ids.

pub mod chunker;
pub mod document;

pub use chunker::{Chunk, ChunkId, Chunker};
pub use document::{Document, InputFailure, LoadOutcome, load_files, load_text_dir};
