//! Overlap-aware document splitting.
//!
//! The chunker accumulates text greedily up to the configured maximum and
//! prefers to break at the largest semantic boundary available inside the
//! window: paragraph break, then line break, then sentence punctuation, then
//! any whitespace, then a hard cut. After emitting a chunk the next one starts
//! `overlap` characters before the previous end, so consecutive chunks of a
//! document share context.
//!
//! Chunk ids come from a counter owned by the [`Chunker`] instance, making
//! them unique across every document split by the same instance in one run.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ChunkingConfig;
use crate::ingestion::document::Document;
use crate::types::RagPackError;

/// Stable identifier for a chunk, unique within one pipeline run.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ChunkId(pub u64);

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk-{}", self.0)
    }
}

/// A contiguous substring of a document, never mutated after creation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub id: ChunkId,
    /// Name of the owning document.
    pub document: String,
    pub text: String,
    /// Byte offset of the chunk within the source text, for traceability:
    /// `source[start_offset..start_offset + text.len()] == text`.
    pub start_offset: usize,
}

/// Splits documents into bounded overlapping chunks.
pub struct Chunker {
    config: ChunkingConfig,
    next_id: u64,
}

impl Chunker {
    /// Creates a chunker, rejecting unusable configurations up front.
    pub fn new(config: ChunkingConfig) -> Result<Self, RagPackError> {
        config.validate()?;
        Ok(Self { config, next_id: 0 })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    fn next_id(&mut self) -> ChunkId {
        let id = ChunkId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Splits one document. Empty documents produce zero chunks.
    pub fn split(&mut self, document: &Document) -> Vec<Chunk> {
        let text = &document.text;
        if text.is_empty() {
            return Vec::new();
        }

        // Work in characters (the size budget is a character count) while
        // tracking byte offsets for slicing and traceability.
        let chars: Vec<char> = text.chars().collect();
        let byte_offsets: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
        let total = chars.len();
        let byte_at = |char_idx: usize| {
            if char_idx < total {
                byte_offsets[char_idx]
            } else {
                text.len()
            }
        };

        let max = self.config.max_chunk_size;
        let overlap = self.config.overlap;
        let mut chunks = Vec::new();
        let mut start = 0usize;

        loop {
            let window_end = (start + max).min(total);
            let end = if window_end == total {
                total
            } else {
                // A break must clear the overlap carry-back region, otherwise
                // the next chunk would start at or before the current one.
                break_point(&chars, start + overlap + 1, window_end)
            };

            let byte_start = byte_at(start);
            let byte_end = byte_at(end);
            chunks.push(Chunk {
                id: self.next_id(),
                document: document.name.clone(),
                text: text[byte_start..byte_end].to_string(),
                start_offset: byte_start,
            });

            if end == total {
                break;
            }
            start = end - overlap;
        }

        chunks
    }

    /// Splits every document in order, assigning ids from the shared counter
    /// so they stay unique across the whole batch.
    pub fn split_all<'a>(
        &mut self,
        documents: impl IntoIterator<Item = &'a Document>,
    ) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for document in documents {
            chunks.extend(self.split(document));
        }
        chunks
    }
}

/// Picks a break position in `[min_break, window_end]`, trying boundary
/// classes from largest to smallest and falling back to a hard cut at the
/// window edge. A break at position `p` ends the chunk before `chars[p]`.
fn break_point(chars: &[char], min_break: usize, window_end: usize) -> usize {
    if min_break >= window_end {
        return window_end;
    }
    // Paragraph break: end the chunk just after a blank line.
    for p in (min_break..=window_end).rev() {
        if p >= 2 && chars[p - 1] == '\n' && chars[p - 2] == '\n' {
            return p;
        }
    }
    // Line break.
    for p in (min_break..=window_end).rev() {
        if chars[p - 1] == '\n' {
            return p;
        }
    }
    // Sentence punctuation followed by whitespace (or the window edge).
    for p in (min_break..=window_end).rev() {
        if matches!(chars[p - 1], '.' | '!' | '?')
            && chars.get(p).is_none_or(|next| next.is_whitespace())
        {
            return p;
        }
    }
    // Any whitespace.
    for p in (min_break..=window_end).rev() {
        if chars[p - 1].is_whitespace() {
            return p;
        }
    }
    // Hard cut.
    window_end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(max: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkingConfig::new(max, overlap).unwrap()).unwrap()
    }

    fn doc(name: &str, text: impl Into<String>) -> Document {
        Document::new(name, text)
    }

    #[test]
    fn empty_document_produces_no_chunks() {
        let mut chunker = chunker(800, 180);
        assert!(chunker.split(&doc("empty.txt", "")).is_empty());
    }

    #[test]
    fn short_document_is_a_single_whole_chunk() {
        let mut chunker = chunker(800, 180);
        let document = doc("short.txt", "just a short transcript");
        let chunks = chunker.split(&document);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, document.text);
        assert_eq!(chunks[0].start_offset, 0);
    }

    #[test]
    fn unbreakable_text_hard_cuts_with_fixed_overlap() {
        // 2000 characters with no natural break points: exactly three chunks,
        // each following one starting 180 characters before the previous end.
        let mut chunker = chunker(800, 180);
        let text: String = std::iter::repeat('x').take(2000).collect();
        let chunks = chunker.split(&doc("dense.txt", text));

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].text.len(), 800);
        assert_eq!(chunks[1].start_offset, 800 - 180);
        assert_eq!(chunks[1].text.len(), 800);
        assert_eq!(chunks[2].start_offset, 2 * (800 - 180));
        assert_eq!(chunks[2].text.len(), 2000 - 2 * (800 - 180));
    }

    #[test]
    fn chunks_never_exceed_max_size() {
        let mut chunker = chunker(50, 10);
        let text = "word ".repeat(100);
        for chunk in chunker.split(&doc("words.txt", text)) {
            assert!(chunk.text.chars().count() <= 50, "oversized: {:?}", chunk.text);
        }
    }

    #[test]
    fn prefers_paragraph_breaks() {
        let mut chunker = chunker(40, 5);
        let text = "first paragraph here.\n\nsecond paragraph follows with more text.";
        let chunks = chunker.split(&doc("paras.txt", text));
        assert!(chunks.len() >= 2);
        assert!(
            chunks[0].text.ends_with("\n\n"),
            "expected paragraph boundary, got {:?}",
            chunks[0].text
        );
    }

    #[test]
    fn prefers_whitespace_over_severing_words() {
        let mut chunker = chunker(20, 4);
        let text = "alpha beta gamma delta epsilon zeta";
        let chunks = chunker.split(&doc("words.txt", text));
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(
                chunk.text.ends_with(char::is_whitespace),
                "chunk severed a word: {:?}",
                chunk.text
            );
        }
    }

    #[test]
    fn offsets_trace_back_into_the_source() {
        let mut chunker = chunker(30, 8);
        let document = doc(
            "trace.txt",
            "One sentence here. Another sentence there. And a third one to finish.",
        );
        for chunk in chunker.split(&document) {
            let slice = &document.text[chunk.start_offset..chunk.start_offset + chunk.text.len()];
            assert_eq!(slice, chunk.text);
        }
    }

    #[test]
    fn chunks_cover_the_source_without_gaps() {
        let mut chunker = chunker(25, 6);
        let document = doc(
            "cover.txt",
            "The quick brown fox jumps over the lazy dog.\nA second line of text follows here.\n\nAnd a final paragraph closes it out.",
        );
        let chunks = chunker.split(&document);
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].start_offset, 0);
        let mut covered_to = 0usize;
        for chunk in &chunks {
            assert!(
                chunk.start_offset <= covered_to,
                "gap before offset {}",
                chunk.start_offset
            );
            covered_to = covered_to.max(chunk.start_offset + chunk.text.len());
        }
        assert_eq!(covered_to, document.text.len());
    }

    #[test]
    fn ids_are_unique_across_documents() {
        let mut chunker = chunker(30, 6);
        let docs = vec![
            doc("a.txt", "some text for the first document to split up"),
            doc("b.txt", "and a second document with its own content here"),
        ];
        let chunks = chunker.split_all(&docs);
        let mut ids: Vec<u64> = chunks.iter().map(|chunk| chunk.id.0).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), before);
        assert!(chunks.iter().any(|chunk| chunk.document == "a.txt"));
        assert!(chunks.iter().any(|chunk| chunk.document == "b.txt"));
    }

    #[test]
    fn multibyte_text_slices_on_char_boundaries() {
        let mut chunker = chunker(10, 3);
        let document = doc("utf8.txt", "héllo wörld ünïcode tèxt çontent hère");
        for chunk in chunker.split(&document) {
            assert!(chunk.text.chars().count() <= 10);
            let slice = &document.text[chunk.start_offset..chunk.start_offset + chunk.text.len()];
            assert_eq!(slice, chunk.text);
        }
    }
}
