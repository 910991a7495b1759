// Path: crates/index/src/chunker.rs

//! Deterministic paragraph-preserving chunking.
//!
//! Same text in, same chunks out, always: chunk boundaries are a pure
//! function of the extracted text. Chunks are 400–1,200 characters,
//! preferring paragraph breaks, then whitespace, then a hard cut; adjacent
//! chunks overlap by up to 50 characters. In-order concatenation covers the
//! text without gaps.

use scopegate_types::document::{ChunkLocation, DocumentChunk, DocumentId};
use scopegate_types::{CHUNK_MAX_CHARS, CHUNK_MIN_CHARS, CHUNK_OVERLAP_CHARS};

/// Splits extracted text into chunks for one document.
pub fn chunk_text(document_id: DocumentId, text: &str) -> Vec<DocumentChunk> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0u32;

    while start < total {
        let hard_end = (start + CHUNK_MAX_CHARS).min(total);
        let end = if hard_end == total {
            total
        } else {
            pick_boundary(&chars, start, hard_end)
        };

        let chunk_text: String = chars
            .get(start..end)
            .map(|s| s.iter().collect())
            .unwrap_or_default();
        chunks.push(DocumentChunk {
            document_id,
            chunk_index: index,
            text: chunk_text,
            location: ChunkLocation {
                page: None,
                section: None,
                char_start: start,
                char_end: end,
            },
        });
        index += 1;

        if end == total {
            break;
        }
        // Carry a short overlap into the next chunk for context, while
        // guaranteeing forward progress.
        let next = end.saturating_sub(CHUNK_OVERLAP_CHARS);
        start = next.max(start + 1);
    }

    chunks
}

/// Picks the chunk end: the last paragraph break in the window if it leaves
/// a chunk of at least the minimum size, else the last whitespace, else the
/// hard cut.
fn pick_boundary(chars: &[char], start: usize, hard_end: usize) -> usize {
    let min_end = start + CHUNK_MIN_CHARS;

    // Paragraph break: a newline followed by another newline (allowing
    // spaces between), ending the paragraph at the first of the pair.
    let mut best_paragraph = None;
    let mut best_whitespace = None;
    let mut i = start + 1;
    while i < hard_end {
        let c = match chars.get(i) {
            Some(c) => *c,
            None => break,
        };
        if c == '\n' {
            let mut j = i + 1;
            while chars.get(j).is_some_and(|c| *c == ' ' || *c == '\t') {
                j += 1;
            }
            if chars.get(j).is_some_and(|c| *c == '\n') && i + 1 >= min_end {
                best_paragraph = Some(i + 1);
            }
        }
        if c.is_whitespace() && i + 1 >= min_end {
            best_whitespace = Some(i + 1);
        }
        i += 1;
    }

    best_paragraph.or(best_whitespace).unwrap_or(hard_end)
}
