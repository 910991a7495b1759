// Path: crates/storage/src/document_store.rs

//! The redb-backed document store: append-only documents and chunks,
//! idempotent by content hash.

use crate::tables::{k_chunk, prefix_range, CHUNKS, DOCUMENTS, DOC_BY_HASH};
use crate::ScopeDb;
use async_trait::async_trait;
use redb::ReadableTable;
use scopegate_api::store::{DocumentStore, IngestOutcome};
use scopegate_types::codec;
use scopegate_types::document::{ChunkUid, Document, DocumentChunk, DocumentId};
use scopegate_types::error::StoreError;
use scopegate_types::evidence::contains_normalized;

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl ScopeDb {
    /// Every stored document, in id order. The corpus index is a derived
    /// view; this is what rebuilds feed from.
    pub fn all_documents(&self) -> Result<Vec<Document>, StoreError> {
        let r = self.db.begin_read().map_err(backend)?;
        let table = r.open_table(DOCUMENTS).map_err(backend)?;
        let mut out = Vec::new();
        for item in table.iter().map_err(backend)? {
            let (_, v) = item.map_err(backend)?;
            out.push(codec::from_row::<Document>(v.value())?);
        }
        Ok(out)
    }
}

#[async_trait]
impl DocumentStore for ScopeDb {
    async fn put_if_new(
        &self,
        document: Document,
        chunks: Vec<DocumentChunk>,
    ) -> Result<IngestOutcome, StoreError> {
        let w = self.db.begin_write().map_err(backend)?;
        let outcome = {
            let mut by_hash = w.open_table(DOC_BY_HASH).map_err(backend)?;
            let existing = by_hash
                .get(&document.sha256_raw)
                .map_err(backend)?
                .map(|guard| DocumentId(*guard.value()));
            if let Some(id) = existing {
                // Same bytes were ingested before; the stored row wins.
                tracing::debug!(document_id = %id, "ingest skipped: content hash already present");
                IngestOutcome::AlreadyPresent(id)
            } else {
                let id = document.id;
                by_hash
                    .insert(&document.sha256_raw, &id.0)
                    .map_err(backend)?;
                drop(by_hash);

                let mut docs = w.open_table(DOCUMENTS).map_err(backend)?;
                docs.insert(&id.0, codec::to_row(&document)?.as_slice())
                    .map_err(backend)?;
                drop(docs);

                // Chunks are written exactly once, at ingest.
                let mut chunk_table = w.open_table(CHUNKS).map_err(backend)?;
                for chunk in &chunks {
                    chunk_table
                        .insert(
                            k_chunk(id, chunk.chunk_index).as_slice(),
                            codec::to_row(chunk)?.as_slice(),
                        )
                        .map_err(backend)?;
                }
                IngestOutcome::Inserted(id)
            }
        };
        w.commit().map_err(backend)?;
        Ok(outcome)
    }

    async fn get(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        let r = self.db.begin_read().map_err(backend)?;
        let table = r.open_table(DOCUMENTS).map_err(backend)?;
        let result = match table.get(&id.0).map_err(backend)? {
            Some(bytes) => Ok(Some(codec::from_row(bytes.value())?)),
            None => Ok(None),
        };
        result
    }

    async fn chunks(&self, id: DocumentId) -> Result<Vec<DocumentChunk>, StoreError> {
        let r = self.db.begin_read().map_err(backend)?;
        let table = r.open_table(CHUNKS).map_err(backend)?;
        let (start, end) = prefix_range(&id.0);
        let mut out = Vec::new();
        for item in table
            .range(start.as_slice()..end.as_slice())
            .map_err(backend)?
        {
            let (_, v) = item.map_err(backend)?;
            out.push(codec::from_row::<DocumentChunk>(v.value())?);
        }
        // Keys are big-endian indexed, so the scan is already in order;
        // keep the sort as the stated invariant.
        out.sort_by_key(|c| c.chunk_index);
        Ok(out)
    }

    async fn chunk(&self, uid: ChunkUid) -> Result<Option<DocumentChunk>, StoreError> {
        let r = self.db.begin_read().map_err(backend)?;
        let table = r.open_table(CHUNKS).map_err(backend)?;
        let result = match table
            .get(k_chunk(uid.document_id, uid.chunk_index).as_slice())
            .map_err(backend)?
        {
            Some(bytes) => Ok(Some(codec::from_row(bytes.value())?)),
            None => Ok(None),
        };
        result
    }

    async fn substring_present(&self, id: DocumentId, text: &str) -> Result<bool, StoreError> {
        let chunks = self.chunks(id).await?;
        Ok(chunks
            .iter()
            .any(|chunk| contains_normalized(&chunk.text, text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use scopegate_types::document::{ChunkLocation, SourceKind, Tier};
    use tempfile::tempdir;

    fn doc(text: &str, raw: &[u8]) -> (Document, Vec<DocumentChunk>) {
        let sha = Document::hash_raw(raw);
        let id = DocumentId::from_sha256(&sha);
        let document = Document {
            id,
            source_kind: SourceKind::CsmsBulletin,
            tier: Tier::A,
            canonical_ref: "CSMS #65936570".into(),
            url: "https://content.govdelivery.com/accounts/USDHSCBP/bulletins/65936570".into(),
            published_at: Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap(),
            effective_start: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            sha256_raw: sha,
            raw: raw.to_vec(),
            text: text.into(),
        };
        let chunks = vec![DocumentChunk {
            document_id: id,
            chunk_index: 0,
            text: text.into(),
            location: ChunkLocation {
                page: None,
                section: None,
                char_start: 0,
                char_end: text.chars().count(),
            },
        }];
        (document, chunks)
    }

    #[tokio::test]
    async fn ingest_is_idempotent_by_content_hash() {
        let dir = tempdir().unwrap();
        let db = ScopeDb::open(dir.path().join("scope.redb")).unwrap();
        let (document, chunks) = doc("Subheading 8544.42.90 is covered.", b"bulletin-bytes");

        let first = db.put_if_new(document.clone(), chunks.clone()).await.unwrap();
        let second = db.put_if_new(document.clone(), chunks).await.unwrap();
        assert!(matches!(first, IngestOutcome::Inserted(_)));
        assert!(matches!(second, IngestOutcome::AlreadyPresent(_)));
        assert_eq!(first.document_id(), second.document_id());

        let stored = db.get(document.id).await.unwrap().unwrap();
        assert_eq!(stored.sha256_raw, document.sha256_raw);
        assert_eq!(db.chunks(document.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn substring_present_normalizes_whitespace() {
        let dir = tempdir().unwrap();
        let db = ScopeDb::open(dir.path().join("scope.redb")).unwrap();
        let (document, chunks) = doc(
            "Products of China classified under\nsubheading 8544.42.90 are covered.",
            b"b2",
        );
        db.put_if_new(document.clone(), chunks).await.unwrap();

        assert!(db
            .substring_present(document.id, "under  subheading 8544.42.90")
            .await
            .unwrap());
        assert!(!db
            .substring_present(document.id, "8544.42.90 falls within scope")
            .await
            .unwrap());
        // Unknown document: nothing to match.
        assert!(!db
            .substring_present(DocumentId([9u8; 16]), "anything")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn chunks_come_back_in_index_order() {
        let dir = tempdir().unwrap();
        let db = ScopeDb::open(dir.path().join("scope.redb")).unwrap();
        let (document, _) = doc("first part. second part.", b"b3");
        let mk = |i: u32, text: &str| DocumentChunk {
            document_id: document.id,
            chunk_index: i,
            text: text.into(),
            location: ChunkLocation {
                page: None,
                section: None,
                char_start: 0,
                char_end: text.chars().count(),
            },
        };
        db.put_if_new(
            document.clone(),
            vec![mk(1, "second part."), mk(0, "first part.")],
        )
        .await
        .unwrap();

        let chunks = db.chunks(document.id).await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].chunk_index, 1);
    }
}
