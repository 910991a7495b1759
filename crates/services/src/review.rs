// Path: crates/services/src/review.rs

//! The operator review workflow: approve (promoting the entry's draft
//! assertion with a recorded operator id) or reject.

use chrono::Utc;
use scopegate_api::store::{ReviewQueue, TruthStore};
use scopegate_types::assertion::VerifiedAssertion;
use scopegate_types::audit::{
    AuditLogEntry, AuditOutcome, LayerServed, ReviewStatus, UsageRecord,
};
use scopegate_types::error::StoreError;
use std::sync::Arc;
use uuid::Uuid;

/// Approves a pending entry: promotes its draft assertion and records the
/// operator. Entries without a draft (nothing assembled at gate time)
/// cannot be approved, only rejected.
pub async fn approve(
    review: Arc<dyn ReviewQueue>,
    truth: Arc<dyn TruthStore>,
    id: Uuid,
    operator: &str,
) -> Result<VerifiedAssertion, StoreError> {
    let entry = review
        .get(id)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("review entry {}", id)))?;
    if entry.status != ReviewStatus::Pending {
        return Err(StoreError::Conflict(format!(
            "review entry {} was already decided",
            id
        )));
    }
    let Some(draft) = entry.draft else {
        return Err(StoreError::Conflict(format!(
            "review entry {} has no draft assertion to promote",
            id
        )));
    };

    let audit = AuditLogEntry {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        query: format!("manual-approval/{}/{}", operator, entry.key),
        layer_served: LayerServed::None,
        latency_ms: 0,
        model: None,
        usage: UsageRecord::default(),
        outcome: AuditOutcome::Known,
    };
    let outcome = truth.promote(draft, audit).await?;
    review
        .decide(
            id,
            ReviewStatus::Approved {
                operator: operator.to_string(),
            },
        )
        .await?;
    tracing::info!(entry_id = %id, operator, key = %outcome.assertion.key, "review entry approved and promoted");
    Ok(outcome.assertion)
}

/// Rejects a pending entry, recording the operator.
pub async fn reject(
    review: Arc<dyn ReviewQueue>,
    id: Uuid,
    operator: &str,
) -> Result<(), StoreError> {
    review
        .decide(
            id,
            ReviewStatus::Rejected {
                operator: operator.to_string(),
            },
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use scopegate_test_utils::fixtures::in_scope_assertion;
    use scopegate_test_utils::MemoryStore;
    use scopegate_types::assertion::Material;
    use scopegate_types::audit::{BlockReason, ReviewQueueEntry};
    use scopegate_types::hts::HtsCode;
    use scopegate_types::program::ProgramId;

    fn entry(draft: Option<scopegate_types::assertion::VerifiedAssertion>) -> ReviewQueueEntry {
        ReviewQueueEntry {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            key: scopegate_types::assertion::AssertionKey {
                program: ProgramId::section_232_steel(),
                hts: HtsCode::parse("94039990").unwrap(),
                material: Some(Material::Steel),
                kind: scopegate_types::assertion::AssertionKind::InScope,
            },
            reasons: vec![BlockReason::ValidatorFailed { reasons: vec![] }],
            transcripts: Default::default(),
            draft,
            status: ReviewStatus::Pending,
        }
    }

    #[tokio::test]
    async fn approval_promotes_the_draft() {
        let store = Arc::new(MemoryStore::new());
        let draft = in_scope_assertion(
            ProgramId::section_232_steel(),
            "94039990",
            Some(Material::Steel),
            Some("9903.81.91"),
            NaiveDate::from_ymd_opt(2025, 6, 23).unwrap(),
        )
        .unwrap();
        let e = entry(Some(draft));
        store.push(e.clone()).await.unwrap();

        let promoted = approve(store.clone(), store.clone(), e.id, "ops-3")
            .await
            .unwrap();
        assert!(promoted.is_current());

        let current = store
            .current(
                &ProgramId::section_232_steel(),
                &HtsCode::parse("94039990").unwrap(),
                Some(Material::Steel),
            )
            .await
            .unwrap();
        assert!(current.is_some());

        // Decisions are exactly-once.
        let again = approve(store.clone(), store.clone(), e.id, "ops-3").await;
        assert!(matches!(again, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn draftless_entries_cannot_be_approved() {
        let store = Arc::new(MemoryStore::new());
        let e = entry(None);
        store.push(e.clone()).await.unwrap();

        let err = approve(store.clone(), store.clone(), e.id, "ops-3")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Rejecting it still works.
        reject(store.clone(), e.id, "ops-3").await.unwrap();
        let after = store.get(e.id).await.unwrap().unwrap();
        assert!(matches!(after.status, ReviewStatus::Rejected { .. }));
    }
}

