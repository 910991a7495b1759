// Path: crates/storage/src/review_queue.rs

//! The redb-backed review queue. Entries are appended by the write gate's
//! reject path; operators decide them exactly once.

use crate::tables::REVIEW;
use crate::ScopeDb;
use async_trait::async_trait;
use redb::ReadableTable;
use scopegate_api::store::ReviewQueue;
use scopegate_types::audit::{ReviewQueueEntry, ReviewStatus};
use scopegate_types::codec;
use scopegate_types::error::StoreError;
use uuid::Uuid;

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl ReviewQueue for ScopeDb {
    async fn push(&self, entry: ReviewQueueEntry) -> Result<(), StoreError> {
        let w = self.db.begin_write().map_err(backend)?;
        {
            let mut table = w.open_table(REVIEW).map_err(backend)?;
            table
                .insert(entry.id.as_bytes(), codec::to_row(&entry)?.as_slice())
                .map_err(backend)?;
        }
        w.commit().map_err(backend)?;
        tracing::warn!(
            entry_id = %entry.id,
            key = %entry.key,
            reasons = entry.reasons.len(),
            "promotion blocked; review entry recorded"
        );
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ReviewQueueEntry>, StoreError> {
        let r = self.db.begin_read().map_err(backend)?;
        let table = r.open_table(REVIEW).map_err(backend)?;
        let result = match table.get(id.as_bytes()).map_err(backend)? {
            Some(bytes) => Ok(Some(codec::from_row(bytes.value())?)),
            None => Ok(None),
        };
        result
    }

    async fn list(&self, pending_only: bool) -> Result<Vec<ReviewQueueEntry>, StoreError> {
        let r = self.db.begin_read().map_err(backend)?;
        let table = r.open_table(REVIEW).map_err(backend)?;
        let mut out: Vec<ReviewQueueEntry> = Vec::new();
        for item in table.iter().map_err(backend)? {
            let (_, v) = item.map_err(backend)?;
            let entry: ReviewQueueEntry = codec::from_row(v.value())?;
            if !pending_only || entry.status == ReviewStatus::Pending {
                out.push(entry);
            }
        }
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn decide(&self, id: Uuid, status: ReviewStatus) -> Result<(), StoreError> {
        if status == ReviewStatus::Pending {
            return Err(StoreError::Conflict(
                "a decision cannot set an entry back to pending".into(),
            ));
        }
        let w = self.db.begin_write().map_err(backend)?;
        {
            let mut table = w.open_table(REVIEW).map_err(backend)?;
            let mut entry: ReviewQueueEntry = match table.get(id.as_bytes()).map_err(backend)? {
                Some(bytes) => codec::from_row(bytes.value())?,
                None => return Err(StoreError::NotFound(format!("review entry {}", id))),
            };
            if entry.status != ReviewStatus::Pending {
                return Err(StoreError::Conflict(format!(
                    "review entry {} was already decided",
                    id
                )));
            }
            entry.status = status;
            table
                .insert(id.as_bytes(), codec::to_row(&entry)?.as_slice())
                .map_err(backend)?;
        }
        w.commit().map_err(backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use scopegate_types::assertion::{AgentTranscripts, AssertionKey, AssertionKind, Material};
    use scopegate_types::audit::BlockReason;
    use scopegate_types::hts::HtsCode;
    use scopegate_types::program::ProgramId;
    use tempfile::tempdir;

    fn entry() -> ReviewQueueEntry {
        ReviewQueueEntry {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            key: AssertionKey {
                program: ProgramId::section_232_copper(),
                hts: HtsCode::parse("8544.42.9090").unwrap(),
                material: Some(Material::Copper),
                kind: AssertionKind::InScope,
            },
            reasons: vec![BlockReason::QuoteNotSubstring { citation_index: 0 }],
            transcripts: AgentTranscripts::default(),
            draft: None,
            status: ReviewStatus::Pending,
        }
    }

    #[tokio::test]
    async fn decide_is_exactly_once() {
        let dir = tempdir().unwrap();
        let db = ScopeDb::open(dir.path().join("r.redb")).unwrap();
        let e = entry();
        db.push(e.clone()).await.unwrap();

        assert_eq!(db.list(true).await.unwrap().len(), 1);

        db.decide(
            e.id,
            ReviewStatus::Rejected {
                operator: "ops-1".into(),
            },
        )
        .await
        .unwrap();
        assert!(db.list(true).await.unwrap().is_empty());
        assert_eq!(db.list(false).await.unwrap().len(), 1);

        let second = db
            .decide(
                e.id,
                ReviewStatus::Approved {
                    operator: "ops-2".into(),
                },
            )
            .await;
        assert!(matches!(second, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn deciding_missing_entry_is_not_found() {
        let dir = tempdir().unwrap();
        let db = ScopeDb::open(dir.path().join("r.redb")).unwrap();
        let missing = db
            .decide(
                Uuid::new_v4(),
                ReviewStatus::Approved {
                    operator: "ops".into(),
                },
            )
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }
}
