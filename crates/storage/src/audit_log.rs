// Path: crates/storage/src/audit_log.rs

//! The redb-backed audit log: one append-only row per resolve, ingest, and
//! promote event, keyed in time order.

use crate::tables::{k_audit, prefix_range, AUDIT};
use crate::ScopeDb;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::ReadableTable;
use scopegate_api::store::AuditSink;
use scopegate_types::audit::AuditLogEntry;
use scopegate_types::codec;
use scopegate_types::error::StoreError;

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl AuditSink for ScopeDb {
    async fn append(&self, entry: AuditLogEntry) -> Result<(), StoreError> {
        let w = self.db.begin_write().map_err(backend)?;
        {
            let mut table = w.open_table(AUDIT).map_err(backend)?;
            table
                .insert(
                    k_audit(entry.created_at.timestamp_millis(), entry.id).as_slice(),
                    codec::to_row(&entry)?.as_slice(),
                )
                .map_err(backend)?;
        }
        w.commit().map_err(backend)?;
        Ok(())
    }

    async fn between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AuditLogEntry>, StoreError> {
        let r = self.db.begin_read().map_err(backend)?;
        let table = r.open_table(AUDIT).map_err(backend)?;
        let start = (from.timestamp_millis() as u64).to_be_bytes().to_vec();
        let (_, end) = prefix_range(&(to.timestamp_millis() as u64).to_be_bytes());
        let mut out = Vec::new();
        for item in table
            .range(start.as_slice()..end.as_slice())
            .map_err(backend)?
        {
            let (_, v) = item.map_err(backend)?;
            let entry: AuditLogEntry = codec::from_row(v.value())?;
            if entry.created_at >= from && entry.created_at < to {
                out.push(entry);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use scopegate_types::audit::{AuditOutcome, LayerServed, UsageRecord};
    use tempfile::tempdir;
    use uuid::Uuid;

    fn row(at: DateTime<Utc>, outcome: AuditOutcome) -> AuditLogEntry {
        AuditLogEntry {
            id: Uuid::new_v4(),
            created_at: at,
            query: "section_301/8536908585".into(),
            layer_served: LayerServed::L1,
            latency_ms: 3,
            model: None,
            usage: UsageRecord::default(),
            outcome,
        }
    }

    #[tokio::test]
    async fn between_is_half_open_and_time_ordered() {
        let dir = tempdir().unwrap();
        let db = ScopeDb::open(dir.path().join("a.redb")).unwrap();
        let t0 = Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 8, 1, 10, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 8, 1, 11, 0, 0).unwrap();

        db.append(row(t1, AuditOutcome::Known)).await.unwrap();
        db.append(row(t0, AuditOutcome::Unknown)).await.unwrap();
        db.append(row(t2, AuditOutcome::Error)).await.unwrap();

        let window = db.between(t0, t2).await.unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].created_at, t0);
        assert_eq!(window[1].created_at, t1);
    }
}
