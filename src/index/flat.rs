//! Flat vector index with exhaustive cosine-distance search.
//!
//! Vectors live in one contiguous row-major buffer; a vector's row number is
//! its ordinal position, assigned by insertion order and never reused. The
//! on-disk layout is a fixed little-endian framing (magic, version, dims,
//! count, payload) so the artifact stays loadable across platforms.

use std::io::{self, Read, Write};

use crate::types::RagPackError;

const MAGIC: &[u8; 10] = b"RAGPACKIDX";
const VERSION: u32 = 1;

/// One nearest-neighbor result: ordinal position and cosine distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchHit {
    pub ordinal: usize,
    pub distance: f32,
}

/// In-memory flat index over fixed-dimensionality vectors.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatIndex {
    dims: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Creates an empty index for vectors of the given dimensionality.
    pub fn new(dims: usize) -> Self {
        debug_assert!(dims > 0, "vector dimensionality must be positive");
        Self {
            dims,
            data: Vec::new(),
        }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Number of vectors stored; ordinals are `0..len()`.
    pub fn len(&self) -> usize {
        if self.dims == 0 {
            0
        } else {
            self.data.len() / self.dims
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Appends a vector and returns its ordinal position.
    pub fn push(&mut self, vector: &[f32]) -> Result<usize, RagPackError> {
        if vector.len() != self.dims {
            return Err(RagPackError::MappingViolation(format!(
                "vector has {} dimensions, index holds {}-dim vectors",
                vector.len(),
                self.dims
            )));
        }
        let ordinal = self.len();
        self.data.extend_from_slice(vector);
        Ok(ordinal)
    }

    /// Returns the vector at an ordinal position.
    pub fn vector(&self, ordinal: usize) -> Option<&[f32]> {
        let start = ordinal.checked_mul(self.dims)?;
        self.data.get(start..start + self.dims)
    }

    /// Exhaustive k-nearest-neighbor search by cosine distance, smallest
    /// distance first. Ties keep ordinal order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        if k == 0 || query.len() != self.dims {
            return Vec::new();
        }
        let mut hits: Vec<SearchHit> = (0..self.len())
            .filter_map(|ordinal| {
                let vector = self.vector(ordinal)?;
                Some(SearchHit {
                    ordinal,
                    distance: 1.0 - cosine_similarity(query, vector),
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.ordinal.cmp(&b.ordinal))
        });
        hits.truncate(k);
        hits
    }

    /// Writes the index in its native binary layout.
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&(self.dims as u32).to_le_bytes())?;
        writer.write_all(&(self.len() as u64).to_le_bytes())?;
        for value in &self.data {
            writer.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }

    /// Serializes the index to a byte buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(MAGIC.len() + 16 + self.data.len() * 4);
        self.write_to(&mut bytes)
            .expect("write to Vec<u8> is infallible");
        bytes
    }

    /// Reads and validates an index from its native binary layout.
    pub fn read_from(reader: &mut impl Read) -> Result<Self, RagPackError> {
        let mut magic = [0u8; 10];
        reader.read_exact(&mut magic).map_err(invalid_layout)?;
        if &magic != MAGIC {
            return Err(RagPackError::Serialization(
                "not a ragpack index: bad magic".to_string(),
            ));
        }

        let version = read_u32(reader)?;
        if version != VERSION {
            return Err(RagPackError::Serialization(format!(
                "unsupported index version {version}, expected {VERSION}"
            )));
        }

        let dims = read_u32(reader)? as usize;
        if dims == 0 {
            return Err(RagPackError::Serialization(
                "index declares zero dimensions".to_string(),
            ));
        }
        let count = read_u64(reader)? as usize;

        let expected = count
            .checked_mul(dims)
            .ok_or_else(|| RagPackError::Serialization("index size overflow".to_string()))?;
        let mut data = Vec::with_capacity(expected);
        let mut buf = [0u8; 4];
        for _ in 0..expected {
            reader.read_exact(&mut buf).map_err(invalid_layout)?;
            data.push(f32::from_le_bytes(buf));
        }

        // Trailing bytes mean the frame is inconsistent with its header.
        let mut trailing = [0u8; 1];
        match reader.read(&mut trailing) {
            Ok(0) => {}
            Ok(_) => {
                return Err(RagPackError::Serialization(
                    "trailing bytes after index payload".to_string(),
                ));
            }
            Err(err) => return Err(invalid_layout(err)),
        }

        Ok(Self { dims, data })
    }
}

fn read_u32(reader: &mut impl Read) -> Result<u32, RagPackError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).map_err(invalid_layout)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(reader: &mut impl Read) -> Result<u64, RagPackError> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf).map_err(invalid_layout)?;
    Ok(u64::from_le_bytes(buf))
}

fn invalid_layout(err: io::Error) -> RagPackError {
    RagPackError::Serialization(format!("truncated or unreadable index: {err}"))
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
