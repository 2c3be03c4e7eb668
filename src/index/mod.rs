//! Similarity-search index construction.
//!
//! * [`flat`] — the vector structure itself and its binary layout.
//! * [`docstore`] — chunk id to text/metadata mapping plus the combined
//!   payload serialized alongside the index.
//! * [`assembler`] — builds all three structures in lockstep so the
//!   ordinal -> chunk id -> document bijection can never be observed broken.

pub mod assembler;
pub mod docstore;
pub mod flat;

pub use assembler::{AssembledIndex, IndexAssembler};
pub use docstore::{DocStore, StorePayload, StoredChunk};
pub use flat::{FlatIndex, SearchHit};
