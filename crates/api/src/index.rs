// Path: crates/api/src/index.rs

//! The hybrid corpus index contract.
//!
//! Retrieval combines dense-vector cosine similarity with a lexical match
//! score; tier filtering is hard, never a ranking signal. The index is
//! read-mostly: the ingestion pipeline is the only writer and uses
//! upsert-by-chunk-uid, so refreshing a document is idempotent.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use scopegate_types::document::{ChunkUid, DocumentId, SourceKind, Tier};
use scopegate_types::error::IndexError;
use scopegate_types::hts::HtsCode;
use scopegate_types::program::ProgramId;
use serde::{Deserialize, Serialize};

/// Chunk metadata the index stores alongside the text and embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Provenance tier of the owning document.
    pub tier: Tier,
    /// Source kind of the owning document.
    pub source_kind: SourceKind,
    /// The owning document.
    pub document_id: DocumentId,
    /// Chunk index inside the document.
    pub chunk_index: u32,
    /// Publication timestamp of the owning document.
    pub published_at: DateTime<Utc>,
    /// Effective-start date of the owning document.
    pub effective_start: NaiveDate,
    /// Program hint attached at ingest, when the source names one.
    pub program_hint: Option<ProgramId>,
}

impl ChunkMeta {
    /// The chunk's upsert key.
    pub fn uid(&self) -> ChunkUid {
        ChunkUid {
            document_id: self.document_id,
            chunk_index: self.chunk_index,
        }
    }
}

/// Hard filters applied before ranking. Tier A is always enforced and is
/// not part of this struct.
#[derive(Debug, Clone, Default)]
pub struct RetrievalFilter {
    /// Restrict to chunks hinted at a program, when the hint is present on
    /// the chunk. Chunks without a hint always pass.
    pub program_hint: Option<ProgramId>,
    /// Require the chunk text to mention this HTS (dotted and undotted
    /// spellings are equivalent), matched by prefix at the stored length.
    pub hts: Option<HtsCode>,
}

/// A retrieval request. When `embedding` is absent the dense side is
/// skipped and ranking is purely lexical, which keeps tests deterministic
/// without an embedding model.
#[derive(Debug, Clone)]
pub struct RetrievalQuery {
    /// The composed query text.
    pub text: String,
    /// Query embedding, 1,536-dimensional when present.
    pub embedding: Option<Vec<f32>>,
    /// Hard filters.
    pub filter: RetrievalFilter,
    /// Maximum chunks to return.
    pub k: usize,
}

/// One ranked chunk returned by retrieval.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    /// Stored metadata.
    pub meta: ChunkMeta,
    /// The chunk text as stored.
    pub text: String,
    /// Convex combination of dense and lexical scores.
    pub score: f32,
    /// The lexical component, exposed for the deterministic tie-break.
    pub lexical_score: f32,
}

/// The hybrid retriever contract.
#[async_trait]
pub trait CorpusIndex: Send + Sync {
    /// Inserts or replaces a chunk by its uid.
    async fn upsert_chunk(
        &self,
        meta: ChunkMeta,
        text: &str,
        embedding: Option<Vec<f32>>,
    ) -> Result<(), IndexError>;

    /// Retrieves up to `query.k` Tier-A chunks ranked by the convex score.
    ///
    /// Ordering is deterministic for a corpus snapshot: score, then newer
    /// `effective_start`, then larger lexical score, then stable chunk uid.
    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<IndexedChunk>, IndexError>;

    /// Monotonic generation counter, bumped on every upsert batch. Readers
    /// are eventually consistent with the corpus; the counter lets callers
    /// observe refresh boundaries without depending on timing.
    async fn generation(&self) -> u64;
}
