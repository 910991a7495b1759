// Path: crates/types/src/document.rs

//! Tier-A documents and their chunks.
//!
//! Documents are immutable once written. Identity is content-addressed:
//! `sha256_raw` is computed over the exact bytes fetched and never
//! recomputed; the document id is derived from it, which makes ingestion
//! idempotent by construction.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// The provenance class of a stored document.
///
/// Only Tier A documents may back verified assertions; the write gate
/// enforces this on every citation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Primary-source regulatory documents from approved origins.
    A,
    /// Secondary sources (agency FAQs, trade press with citations).
    B,
    /// Everything else; retained for research, never cited.
    C,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::A => f.write_str("A"),
            Tier::B => f.write_str("B"),
            Tier::C => f.write_str("C"),
        }
    }
}

/// The kind of primary source a document was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A Federal Register notice or proclamation.
    FederalRegister,
    /// A CBP Cargo Systems Messaging Service bulletin.
    CsmsBulletin,
    /// A USITC Harmonized Tariff Schedule edition.
    UsitcHts,
}

impl SourceKind {
    /// The stable wire name used in agent payloads and audit rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::FederalRegister => "federal_register",
            SourceKind::CsmsBulletin => "csms_bulletin",
            SourceKind::UsitcHts => "usitc_hts",
        }
    }

    /// Parses a wire name back into a kind. Unknown names yield `None`;
    /// discovery drops such candidates rather than guessing.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "federal_register" => Some(SourceKind::FederalRegister),
            "csms_bulletin" => Some(SourceKind::CsmsBulletin),
            "usitc_hts" => Some(SourceKind::UsitcHts),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stable document identifier, derived from the content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub [u8; 16]);

impl DocumentId {
    /// Derives the id from a raw-byte SHA-256 (first 16 bytes).
    pub fn from_sha256(sha256_raw: &[u8; 32]) -> Self {
        let mut id = [0u8; 16];
        id.copy_from_slice(&sha256_raw[..16]);
        Self(id)
    }

    /// Parses the hex form produced by `Display`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 16] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// A single Tier-A artifact: a Federal Register notice, CSMS bulletin, or
/// HTS schedule edition, with its raw bytes and extracted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Content-derived stable identifier.
    pub id: DocumentId,
    /// Which primary source produced this document.
    pub source_kind: SourceKind,
    /// Provenance tier, fixed by the fetching connector at build time.
    pub tier: Tier,
    /// The source's own identifier (CSMS number, FR citation, HTS edition).
    pub canonical_ref: String,
    /// Canonical URL the bytes were fetched from.
    pub url: String,
    /// Publication timestamp per the source.
    pub published_at: DateTime<Utc>,
    /// Effective-start date derived from the document's own language.
    pub effective_start: NaiveDate,
    /// SHA-256 over the exact fetched bytes. Never recomputed.
    pub sha256_raw: [u8; 32],
    /// The raw bytes as fetched.
    pub raw: Vec<u8>,
    /// The deterministically extracted plain text.
    pub text: String,
}

impl Document {
    /// Computes the content hash of fetched bytes.
    pub fn hash_raw(bytes: &[u8]) -> [u8; 32] {
        let digest = Sha256::digest(bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }
}

/// Where a chunk sits inside its document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkLocation {
    /// Page number where known (PDF-derived sources).
    pub page: Option<u32>,
    /// Section heading where known.
    pub section: Option<String>,
    /// Character offset of the chunk start in the extracted text.
    pub char_start: usize,
    /// Character offset one past the chunk end in the extracted text.
    pub char_end: usize,
}

/// A contiguous fragment of a document's extracted text.
///
/// In-order concatenation of a document's chunks spans its extracted text
/// without gaps; adjacent chunks may overlap by up to
/// [`crate::CHUNK_OVERLAP_CHARS`] characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// The owning document.
    pub document_id: DocumentId,
    /// Position of this chunk within the document, starting at zero.
    pub chunk_index: u32,
    /// The chunk text (400–1,200 characters, paragraph-preserving).
    pub text: String,
    /// Location of the chunk inside the document.
    pub location: ChunkLocation,
}

impl DocumentChunk {
    /// The index key used by the corpus index for upsert idempotence.
    pub fn uid(&self) -> ChunkUid {
        ChunkUid {
            document_id: self.document_id,
            chunk_index: self.chunk_index,
        }
    }
}

/// The `(document, index)` address of a chunk, used as the corpus index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkUid {
    /// The owning document.
    pub document_id: DocumentId,
    /// Position of the chunk within the document.
    pub chunk_index: u32,
}

impl fmt::Display for ChunkUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.document_id, self.chunk_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_is_stable_for_identical_bytes() {
        let h1 = Document::hash_raw(b"the same bytes");
        let h2 = Document::hash_raw(b"the same bytes");
        assert_eq!(h1, h2);
        assert_eq!(DocumentId::from_sha256(&h1), DocumentId::from_sha256(&h2));
        assert_ne!(
            DocumentId::from_sha256(&Document::hash_raw(b"different")),
            DocumentId::from_sha256(&h1)
        );
    }

    #[test]
    fn document_id_hex_round_trip() {
        let id = DocumentId::from_sha256(&Document::hash_raw(b"abc"));
        let parsed = DocumentId::from_hex(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(DocumentId::from_hex("zz").is_none());
    }

    #[test]
    fn source_kind_wire_names_round_trip() {
        for kind in [
            SourceKind::FederalRegister,
            SourceKind::CsmsBulletin,
            SourceKind::UsitcHts,
        ] {
            assert_eq!(SourceKind::from_str_opt(kind.as_str()), Some(kind));
        }
        assert_eq!(SourceKind::from_str_opt("blog_post"), None);
    }
}
