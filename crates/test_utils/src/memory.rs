// Path: crates/test_utils/src/memory.rs

//! In-memory implementations of every store trait, with the same observable
//! semantics as the redb-backed stores: idempotent ingest by content hash,
//! exact-key truth lookups, strictly-later supersession, exactly-once
//! review decisions.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use scopegate_api::store::{
    AuditSink, DocumentStore, IngestOutcome, PromotionOutcome, ReviewQueue, TruthStore,
};
use scopegate_types::assertion::{AssertionKey, AssertionKind, Material, VerifiedAssertion};
use scopegate_types::audit::{AuditLogEntry, ReviewQueueEntry, ReviewStatus};
use scopegate_types::document::{ChunkUid, Document, DocumentChunk, DocumentId};
use scopegate_types::error::StoreError;
use scopegate_types::evidence::contains_normalized;
use scopegate_types::hts::HtsCode;
use scopegate_types::program::ProgramId;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    documents: HashMap<DocumentId, Document>,
    by_hash: HashMap<[u8; 32], DocumentId>,
    chunks: BTreeMap<(DocumentId, u32), DocumentChunk>,
    assertions: Vec<VerifiedAssertion>,
    review: HashMap<Uuid, ReviewQueueEntry>,
    audit: Vec<AuditLogEntry>,
}

/// One shared in-memory backend implementing all four store traits.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// A fresh, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    fn group_key(a: &AssertionKey) -> (String, String, Option<Material>, AssertionKind) {
        (
            a.program.as_str().to_string(),
            a.hts.digits().to_string(),
            a.material,
            a.kind,
        )
    }

    /// Number of stored assertion rows, open and closed. Test-only insight.
    pub fn assertion_rows(&self) -> usize {
        self.lock().map(|inner| inner.assertions.len()).unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn put_if_new(
        &self,
        document: Document,
        chunks: Vec<DocumentChunk>,
    ) -> Result<IngestOutcome, StoreError> {
        let mut inner = self.lock()?;
        if let Some(existing) = inner.by_hash.get(&document.sha256_raw) {
            return Ok(IngestOutcome::AlreadyPresent(*existing));
        }
        let id = document.id;
        inner.by_hash.insert(document.sha256_raw, id);
        inner.documents.insert(id, document);
        for chunk in chunks {
            inner.chunks.insert((id, chunk.chunk_index), chunk);
        }
        Ok(IngestOutcome::Inserted(id))
    }

    async fn get(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        Ok(self.lock()?.documents.get(&id).cloned())
    }

    async fn chunks(&self, id: DocumentId) -> Result<Vec<DocumentChunk>, StoreError> {
        Ok(self
            .lock()?
            .chunks
            .range((id, 0)..=(id, u32::MAX))
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn chunk(&self, uid: ChunkUid) -> Result<Option<DocumentChunk>, StoreError> {
        Ok(self
            .lock()?
            .chunks
            .get(&(uid.document_id, uid.chunk_index))
            .cloned())
    }

    async fn substring_present(&self, id: DocumentId, text: &str) -> Result<bool, StoreError> {
        Ok(self
            .lock()?
            .chunks
            .range((id, 0)..=(id, u32::MAX))
            .any(|(_, chunk)| contains_normalized(&chunk.text, text)))
    }
}

#[async_trait]
impl TruthStore for MemoryStore {
    async fn current(
        &self,
        program: &ProgramId,
        hts: &HtsCode,
        material: Option<Material>,
    ) -> Result<Option<VerifiedAssertion>, StoreError> {
        let today = Utc::now().date_naive();
        self.as_of(program, hts, material, today).await
    }

    async fn as_of(
        &self,
        program: &ProgramId,
        hts: &HtsCode,
        material: Option<Material>,
        date: NaiveDate,
    ) -> Result<Option<VerifiedAssertion>, StoreError> {
        let inner = self.lock()?;
        for kind in [AssertionKind::InScope, AssertionKind::OutOfScope] {
            let hit = inner.assertions.iter().find(|a| {
                a.key.program == *program
                    && a.key.hts == *hts
                    && a.key.material == material
                    && a.key.kind == kind
                    && a.in_force_on(date)
            });
            if let Some(a) = hit {
                return Ok(Some(a.clone()));
            }
        }
        Ok(None)
    }

    async fn all_in_force(&self, date: NaiveDate) -> Result<Vec<VerifiedAssertion>, StoreError> {
        Ok(self
            .lock()?
            .assertions
            .iter()
            .filter(|a| a.in_force_on(date))
            .cloned()
            .collect())
    }

    async fn rate_as_of(
        &self,
        program: &ProgramId,
        hts: &HtsCode,
        date: NaiveDate,
    ) -> Result<Option<VerifiedAssertion>, StoreError> {
        Ok(self
            .lock()?
            .assertions
            .iter()
            .find(|a| {
                a.key.program == *program
                    && a.key.hts == *hts
                    && a.key.material.is_none()
                    && a.key.kind == AssertionKind::Rate
                    && a.in_force_on(date)
            })
            .cloned())
    }

    async fn promote(
        &self,
        assertion: VerifiedAssertion,
        audit: AuditLogEntry,
    ) -> Result<PromotionOutcome, StoreError> {
        if assertion.effective_end.is_some() {
            return Err(StoreError::Conflict(
                "a promoted assertion must be open-ended".into(),
            ));
        }
        let mut inner = self.lock()?;
        let group = Self::group_key(&assertion.key);
        let mut superseded_start = None;

        let last_start = inner
            .assertions
            .iter()
            .filter(|a| Self::group_key(&a.key) == group)
            .map(|a| a.effective_start)
            .max();
        if let Some(last) = last_start {
            if assertion.effective_start <= last {
                return Err(StoreError::Conflict(format!(
                    "effective_start {} is not later than existing row {}",
                    assertion.effective_start, last
                )));
            }
        }
        for row in inner
            .assertions
            .iter_mut()
            .filter(|a| Self::group_key(&a.key) == group)
        {
            if row.effective_end.is_none() {
                row.effective_end = Some(assertion.effective_start);
                superseded_start = Some(row.effective_start);
            }
        }

        inner.assertions.push(assertion.clone());
        inner.audit.push(audit);
        Ok(PromotionOutcome {
            assertion,
            superseded_start,
        })
    }
}

#[async_trait]
impl ReviewQueue for MemoryStore {
    async fn push(&self, entry: ReviewQueueEntry) -> Result<(), StoreError> {
        self.lock()?.review.insert(entry.id, entry);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ReviewQueueEntry>, StoreError> {
        Ok(self.lock()?.review.get(&id).cloned())
    }

    async fn list(&self, pending_only: bool) -> Result<Vec<ReviewQueueEntry>, StoreError> {
        let mut entries: Vec<ReviewQueueEntry> = self
            .lock()?
            .review
            .values()
            .filter(|e| !pending_only || e.status == ReviewStatus::Pending)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn decide(&self, id: Uuid, status: ReviewStatus) -> Result<(), StoreError> {
        if status == ReviewStatus::Pending {
            return Err(StoreError::Conflict(
                "a decision cannot set an entry back to pending".into(),
            ));
        }
        let mut inner = self.lock()?;
        let entry = inner
            .review
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("review entry {}", id)))?;
        if entry.status != ReviewStatus::Pending {
            return Err(StoreError::Conflict(format!(
                "review entry {} was already decided",
                id
            )));
        }
        entry.status = status;
        Ok(())
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn append(&self, entry: AuditLogEntry) -> Result<(), StoreError> {
        self.lock()?.audit.push(entry);
        Ok(())
    }

    async fn between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditLogEntry>, StoreError> {
        let mut entries: Vec<AuditLogEntry> = self
            .lock()?
            .audit
            .iter()
            .filter(|e| e.created_at >= from && e.created_at < to)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(entries)
    }
}
