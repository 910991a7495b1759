// Path: crates/types/src/evidence.rs

//! Verbatim evidence quotes and the whitespace normalization they are
//! compared under.
//!
//! The cornerstone property of the engine: `quote_text` must appear as an
//! exact substring of the chunk it was extracted from, compared after
//! whitespace collapsing. Paraphrases are never evidence; an almost-matching
//! quote is a gate rejection, not something to repair.

use crate::document::{ChunkUid, DocumentId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A verbatim excerpt pulled from exactly one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceQuote {
    /// The chunk the quote was extracted from.
    pub chunk: ChunkUid,
    /// The quote text, verbatim from the chunk.
    pub quote_text: String,
    /// Character offset of the quote start inside the chunk text.
    pub char_start: usize,
    /// Character offset one past the quote end inside the chunk text.
    pub char_end: usize,
    /// SHA-256 of the normalized quote (lowercased, whitespace-collapsed).
    pub sha256_normalized: [u8; 32],
}

impl EvidenceQuote {
    /// Builds a quote record, computing offsets and the normalized digest.
    ///
    /// Returns `None` when the quote is not a substring of the chunk text
    /// under whitespace normalization; callers treat that as a hard failure.
    pub fn locate(chunk: ChunkUid, chunk_text: &str, quote: &str) -> Option<Self> {
        let (start, end) = find_normalized(chunk_text, quote)?;
        Some(Self {
            chunk,
            quote_text: quote.to_string(),
            char_start: start,
            char_end: end,
            sha256_normalized: normalized_digest(quote),
        })
    }

    /// The owning document.
    pub fn document_id(&self) -> DocumentId {
        self.chunk.document_id
    }
}

/// Collapses runs of whitespace to single spaces and trims the ends.
///
/// This is the only normalization applied before substring comparison; case
/// and punctuation are preserved because the legal text must match exactly.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true;
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// The digest stored with a quote: SHA-256 of the lowercased,
/// whitespace-collapsed text.
pub fn normalized_digest(quote: &str) -> [u8; 32] {
    let canon = normalize_whitespace(quote).to_lowercase();
    let digest = Sha256::digest(canon.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Tests whether `needle` appears in `haystack` under whitespace
/// normalization of both sides.
pub fn contains_normalized(haystack: &str, needle: &str) -> bool {
    let needle = normalize_whitespace(needle);
    if needle.is_empty() {
        return false;
    }
    normalize_whitespace(haystack).contains(&needle)
}

/// Locates `needle` inside `haystack` under whitespace normalization and
/// maps the match back to character offsets in the original `haystack`.
///
/// Returns `(char_start, char_end)` of the matched span, or `None` when the
/// needle does not occur.
pub fn find_normalized(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let norm_needle = normalize_whitespace(needle);
    if norm_needle.is_empty() {
        return None;
    }

    // Build the normalized haystack together with a map from each normalized
    // character back to its character offset in the original.
    let mut norm = String::with_capacity(haystack.len());
    let mut offsets: Vec<usize> = Vec::with_capacity(haystack.len());
    let mut last_was_space = true;
    for (char_idx, c) in haystack.chars().enumerate() {
        if c.is_whitespace() {
            if !last_was_space {
                norm.push(' ');
                offsets.push(char_idx);
                last_was_space = true;
            }
        } else {
            norm.push(c);
            offsets.push(char_idx);
            last_was_space = false;
        }
    }

    let byte_pos = norm.find(&norm_needle)?;
    let char_pos = norm[..byte_pos].chars().count();
    let needle_chars = norm_needle.chars().count();

    let start = *offsets.get(char_pos)?;
    let end = *offsets.get(char_pos + needle_chars - 1)? + 1;
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ChunkUid, DocumentId};

    fn uid() -> ChunkUid {
        ChunkUid {
            document_id: DocumentId([7u8; 16]),
            chunk_index: 0,
        }
    }

    #[test]
    fn whitespace_runs_collapse() {
        assert_eq!(
            normalize_whitespace("heading\n\n  9903.88.01   applies\t "),
            "heading 9903.88.01 applies"
        );
    }

    #[test]
    fn exact_substring_is_found_despite_line_breaks() {
        let chunk = "Products of China classified under\nsubheading 8544.42.90 are covered.";
        assert!(contains_normalized(chunk, "under subheading 8544.42.90"));
        let q = EvidenceQuote::locate(uid(), chunk, "under  subheading\n8544.42.90").unwrap();
        let span: String = chunk
            .chars()
            .skip(q.char_start)
            .take(q.char_end - q.char_start)
            .collect();
        assert_eq!(normalize_whitespace(&span), "under subheading 8544.42.90");
    }

    #[test]
    fn paraphrase_is_not_a_substring() {
        let chunk = "Subheading 8544.42.90 is covered by the copper action.";
        assert!(!contains_normalized(
            chunk,
            "8544.42.90 falls within the copper action"
        ));
        assert!(EvidenceQuote::locate(uid(), chunk, "is not covered").is_none());
    }

    #[test]
    fn empty_needle_never_matches() {
        assert!(!contains_normalized("anything", "   "));
        assert!(find_normalized("anything", "").is_none());
    }

    #[test]
    fn normalized_digest_ignores_case_and_spacing() {
        assert_eq!(
            normalized_digest("Subheading  8544.42.90\nIS covered"),
            normalized_digest("subheading 8544.42.90 is covered")
        );
        assert_ne!(
            normalized_digest("subheading 8544.42.90"),
            normalized_digest("subheading 8544.42.91")
        );
    }
}
