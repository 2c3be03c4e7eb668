//! Builds the index, docstore, and ordinal mapping from embedding records.

use std::collections::BTreeMap;

use crate::embeddings::driver::EmbeddingRecord;
use crate::index::docstore::{DocStore, StorePayload, StoredChunk};
use crate::index::flat::FlatIndex;
use crate::ingestion::chunker::{Chunk, ChunkId};
use crate::types::RagPackError;

/// The three structures a pipeline run produces, handed immutably to the
/// artifact writer.
#[derive(Clone, Debug, PartialEq)]
pub struct AssembledIndex {
    pub index: FlatIndex,
    pub payload: StorePayload,
}

impl AssembledIndex {
    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Assembles the similarity index and its companion mappings.
pub struct IndexAssembler;

impl IndexAssembler {
    /// Assigns ordinal positions `0..N-1` to the records in the order given
    /// and grows index, docstore, and mapping in the same loop step, so the
    /// three structures never disagree.
    ///
    /// `chunks` must contain every chunk referenced by `records`; records of
    /// unknown or duplicate chunk ids break the bijection and fail with
    /// [`RagPackError::MappingViolation`]. Zero records fail with
    /// [`RagPackError::EmptyIndex`].
    pub fn assemble(
        records: &[EmbeddingRecord],
        chunks: &[Chunk],
    ) -> Result<AssembledIndex, RagPackError> {
        let first = records.first().ok_or(RagPackError::EmptyIndex)?;

        let by_id: BTreeMap<ChunkId, &Chunk> =
            chunks.iter().map(|chunk| (chunk.id, chunk)).collect();

        let mut index = FlatIndex::new(first.vector.len());
        let mut docstore = DocStore::new();
        let mut index_to_docstore_id = Vec::with_capacity(records.len());

        for record in records {
            let chunk = by_id.get(&record.chunk_id).ok_or_else(|| {
                RagPackError::MappingViolation(format!(
                    "embedding record for unknown {}",
                    record.chunk_id
                ))
            })?;

            let ordinal = index.push(&record.vector)?;
            if !docstore.insert(record.chunk_id, StoredChunk::from(*chunk)) {
                return Err(RagPackError::MappingViolation(format!(
                    "duplicate embedding record for {}",
                    record.chunk_id
                )));
            }
            index_to_docstore_id.push(record.chunk_id);
            debug_assert_eq!(index_to_docstore_id.len(), ordinal + 1);
        }

        let payload = StorePayload {
            docstore,
            index_to_docstore_id,
        };
        payload.validate(index.len())?;

        Ok(AssembledIndex { index, payload })
    }
}
