//! Chunk id to document mapping and the combined companion payload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ingestion::chunker::{Chunk, ChunkId};
use crate::types::RagPackError;

/// Everything retrieval needs to hand back once a vector matches: the chunk
/// text and where it came from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredChunk {
    pub text: String,
    /// Name of the owning document.
    pub document: String,
    /// Byte offset of the chunk within the source document.
    pub start_offset: usize,
}

impl From<&Chunk> for StoredChunk {
    fn from(chunk: &Chunk) -> Self {
        Self {
            text: chunk.text.clone(),
            document: chunk.document.clone(),
            start_offset: chunk.start_offset,
        }
    }
}

/// Mapping from chunk id to stored chunk, read-only after assembly.
///
/// Backed by a `BTreeMap` so serialization order is deterministic across
/// runs on identical input.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct DocStore {
    chunks: BTreeMap<ChunkId, StoredChunk>,
}

impl DocStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, returning `false` if the id was already present.
    pub fn insert(&mut self, id: ChunkId, chunk: StoredChunk) -> bool {
        self.chunks.insert(id, chunk).is_none()
    }

    pub fn get(&self, id: ChunkId) -> Option<&StoredChunk> {
        self.chunks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChunkId, &StoredChunk)> {
        self.chunks.iter().map(|(id, chunk)| (*id, chunk))
    }
}

/// The companion blob written next to the index: docstore plus the
/// ordinal -> chunk id mapping, combined so a loader reconstructs the
/// bijection in one read.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorePayload {
    pub docstore: DocStore,
    /// `index_to_docstore_id[p]` is the chunk id whose vector occupies
    /// ordinal position `p` in the index.
    pub index_to_docstore_id: Vec<ChunkId>,
}

impl StorePayload {
    /// Resolves an ordinal position to its stored chunk.
    pub fn chunk_at(&self, ordinal: usize) -> Option<&StoredChunk> {
        let id = self.index_to_docstore_id.get(ordinal)?;
        self.docstore.get(*id)
    }

    /// Checks the cross-structure invariant against an index of `index_len`
    /// vectors: equal cardinalities and every mapped id resolvable.
    pub fn validate(&self, index_len: usize) -> Result<(), RagPackError> {
        if self.index_to_docstore_id.len() != index_len {
            return Err(RagPackError::MappingViolation(format!(
                "index holds {} vectors but mapping has {} entries",
                index_len,
                self.index_to_docstore_id.len()
            )));
        }
        if self.docstore.len() != index_len {
            return Err(RagPackError::MappingViolation(format!(
                "index holds {} vectors but docstore has {} entries",
                index_len,
                self.docstore.len()
            )));
        }
        for (ordinal, id) in self.index_to_docstore_id.iter().enumerate() {
            if self.docstore.get(*id).is_none() {
                return Err(RagPackError::MappingViolation(format!(
                    "ordinal {ordinal} maps to {id} which is missing from the docstore"
                )));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<Vec<u8>, RagPackError> {
        serde_json::to_vec(self).map_err(|err| RagPackError::Serialization(err.to_string()))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, RagPackError> {
        serde_json::from_slice(bytes).map_err(|err| RagPackError::Serialization(err.to_string()))
    }
}
