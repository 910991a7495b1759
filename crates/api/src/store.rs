// Path: crates/api/src/store.rs

//! Store contracts: documents, truth, review queue, audit log.
//!
//! The document and truth stores are the authoritative shared state; both
//! serialize writes through single-writer transactions in the implementing
//! crate. The review queue and audit log are append-only and need no
//! coordination.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use scopegate_types::assertion::{Material, VerifiedAssertion};
use scopegate_types::audit::{AuditLogEntry, ReviewQueueEntry, ReviewStatus};
use scopegate_types::document::{ChunkUid, Document, DocumentChunk, DocumentId};
use scopegate_types::error::StoreError;
use scopegate_types::hts::HtsCode;
use scopegate_types::program::ProgramId;
use uuid::Uuid;

/// Outcome of an idempotent document ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The bytes were new; a document row was created.
    Inserted(DocumentId),
    /// A document with the same `sha256_raw` already existed.
    AlreadyPresent(DocumentId),
}

impl IngestOutcome {
    /// The id either way.
    pub fn document_id(&self) -> DocumentId {
        match self {
            IngestOutcome::Inserted(id) | IngestOutcome::AlreadyPresent(id) => *id,
        }
    }
}

/// Immutable Tier-A documents and their chunks, idempotent by content hash.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates the document and its chunks if the content hash is new.
    /// Chunks are written exactly once, at ingest.
    async fn put_if_new(
        &self,
        document: Document,
        chunks: Vec<DocumentChunk>,
    ) -> Result<IngestOutcome, StoreError>;

    /// Fetches a document by id.
    async fn get(&self, id: DocumentId) -> Result<Option<Document>, StoreError>;

    /// Fetches all chunks of a document, in chunk order.
    async fn chunks(&self, id: DocumentId) -> Result<Vec<DocumentChunk>, StoreError>;

    /// Fetches one chunk by its `(document, index)` address.
    async fn chunk(&self, uid: ChunkUid) -> Result<Option<DocumentChunk>, StoreError>;

    /// The only authoritative quote check: whether `text` occurs in any of
    /// the document's chunks under whitespace-normalized comparison.
    async fn substring_present(&self, id: DocumentId, text: &str) -> Result<bool, StoreError>;
}

/// What a successful promotion did.
#[derive(Debug, Clone)]
pub struct PromotionOutcome {
    /// The newly inserted assertion.
    pub assertion: VerifiedAssertion,
    /// The effective start of the row that was closed, if any.
    pub superseded_start: Option<NaiveDate>,
}

/// The temporally-versioned catalogue of verified assertions.
///
/// Insertion is the only mutation; closing a row sets `effective_end`
/// exactly once. Implementations must keep the supersession close-and-insert
/// a single transaction: a state where both rows are open, or both closed,
/// must never be observable.
#[async_trait]
pub trait TruthStore: Send + Sync {
    /// The currently in-force assertion for the exact key, if any.
    ///
    /// Lookups are exact on the stored HTS. The resolution layer owns the
    /// 10-digit-to-8-digit prefix fallback, so that supersession checks
    /// always see a single key group.
    async fn current(
        &self,
        program: &ProgramId,
        hts: &HtsCode,
        material: Option<Material>,
    ) -> Result<Option<VerifiedAssertion>, StoreError>;

    /// The assertion in force on `date` for the exact key, if any.
    async fn as_of(
        &self,
        program: &ProgramId,
        hts: &HtsCode,
        material: Option<Material>,
        date: NaiveDate,
    ) -> Result<Option<VerifiedAssertion>, StoreError>;

    /// Every assertion in force on `date`. Used to rebuild compiled lookup
    /// tables.
    async fn all_in_force(&self, date: NaiveDate) -> Result<Vec<VerifiedAssertion>, StoreError>;

    /// The `Rate`-kind assertion in force on `date` for a program and HTS,
    /// if any. This is how proclamation-driven rate changes flow into the
    /// duty math without code changes.
    async fn rate_as_of(
        &self,
        program: &ProgramId,
        hts: &HtsCode,
        date: NaiveDate,
    ) -> Result<Option<VerifiedAssertion>, StoreError>;

    /// Atomically promotes a new assertion: closes any superseded in-force
    /// row (setting `effective_end = new.effective_start`), inserts the new
    /// row, and appends the audit entry, all in one transaction.
    ///
    /// Fails with `StoreError::Conflict` when the new `effective_start` is
    /// not strictly later than an existing in-force row's start; history is
    /// never rewritten.
    async fn promote(
        &self,
        assertion: VerifiedAssertion,
        audit: AuditLogEntry,
    ) -> Result<PromotionOutcome, StoreError>;
}

/// The append-only queue of blocked or ambiguous promotion attempts.
#[async_trait]
pub trait ReviewQueue: Send + Sync {
    /// Appends a new entry.
    async fn push(&self, entry: ReviewQueueEntry) -> Result<(), StoreError>;

    /// Fetches one entry.
    async fn get(&self, id: Uuid) -> Result<Option<ReviewQueueEntry>, StoreError>;

    /// Lists entries, newest first, optionally only pending ones.
    async fn list(&self, pending_only: bool) -> Result<Vec<ReviewQueueEntry>, StoreError>;

    /// Records an operator decision. Fails with `Conflict` when the entry is
    /// not pending.
    async fn decide(&self, id: Uuid, status: ReviewStatus) -> Result<(), StoreError>;
}

/// The append-only audit log.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Appends one entry.
    async fn append(&self, entry: AuditLogEntry) -> Result<(), StoreError>;

    /// Entries created within `[from, to)`, oldest first.
    async fn between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditLogEntry>, StoreError>;
}
