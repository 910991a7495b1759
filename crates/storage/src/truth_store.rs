// Path: crates/storage/src/truth_store.rs

//! The redb-backed truth store: temporally-versioned assertion rows with a
//! compiled "current" projection.
//!
//! Insertion is the only mutation. Supersession (close the old row, insert
//! the new one, refresh the projection, append the audit row) is a single
//! write transaction.

use crate::tables::{
    k_assertion, k_audit, k_logical, k_logical_of, prefix_range, ASSERTIONS, AUDIT, CURRENT,
};
use crate::ScopeDb;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use redb::ReadableTable;
use scopegate_api::store::{PromotionOutcome, TruthStore};
use scopegate_types::assertion::{AssertionKind, Material, VerifiedAssertion};
use scopegate_types::audit::AuditLogEntry;
use scopegate_types::codec;
use scopegate_types::error::StoreError;
use scopegate_types::hts::HtsCode;
use scopegate_types::program::ProgramId;

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl ScopeDb {
    /// Reads the compiled projection for one logical key, checking the row
    /// is actually in force on `date` (the projection can hold rows whose
    /// start is still in the future).
    fn current_row(
        &self,
        program: &ProgramId,
        hts: &HtsCode,
        material: Option<Material>,
        kind: AssertionKind,
        date: NaiveDate,
    ) -> Result<Option<VerifiedAssertion>, StoreError> {
        let r = self.db.begin_read().map_err(backend)?;
        let table = r.open_table(CURRENT).map_err(backend)?;
        let result = match table
            .get(k_logical(program, hts, material, kind).as_slice())
            .map_err(backend)?
        {
            Some(bytes) => {
                let row: VerifiedAssertion = codec::from_row(bytes.value())?;
                Ok(row.in_force_on(date).then_some(row))
            }
            None => Ok(None),
        };
        result
    }

    /// Scans the temporal rows of one logical key for the row in force on
    /// `date`.
    fn row_as_of(
        &self,
        program: &ProgramId,
        hts: &HtsCode,
        material: Option<Material>,
        kind: AssertionKind,
        date: NaiveDate,
    ) -> Result<Option<VerifiedAssertion>, StoreError> {
        let r = self.db.begin_read().map_err(backend)?;
        let table = r.open_table(ASSERTIONS).map_err(backend)?;
        let mut logical = k_logical(program, hts, material, kind);
        logical.push(crate::tables::KEY_SEP);
        let (start, end) = prefix_range(&logical);
        for item in table
            .range(start.as_slice()..end.as_slice())
            .map_err(backend)?
        {
            let (_, v) = item.map_err(backend)?;
            let row: VerifiedAssertion = codec::from_row(v.value())?;
            if row.in_force_on(date) {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    /// Rebuilds the compiled projection from the temporal rows. The
    /// projection is always derived state; this is the maintainer entry
    /// point after manual interventions.
    pub fn rebuild_current(&self) -> Result<u64, StoreError> {
        let w = self.db.begin_write().map_err(backend)?;
        let mut rebuilt = 0u64;
        {
            let assertions = w.open_table(ASSERTIONS).map_err(backend)?;
            let mut current = w.open_table(CURRENT).map_err(backend)?;

            // Drain the projection.
            let existing: Vec<Vec<u8>> = current
                .iter()
                .map_err(backend)?
                .map(|item| item.map(|(k, _)| k.value().to_vec()).map_err(backend))
                .collect::<Result<_, _>>()?;
            for key in existing {
                current.remove(key.as_slice()).map_err(backend)?;
            }

            // Reinsert every open row.
            let rows: Vec<VerifiedAssertion> = assertions
                .iter()
                .map_err(backend)?
                .map(|item| {
                    item.map_err(backend)
                        .and_then(|(_, v)| codec::from_row(v.value()))
                })
                .collect::<Result<_, _>>()?;
            for row in rows.into_iter().filter(|r| r.is_current()) {
                current
                    .insert(
                        k_logical_of(&row.key).as_slice(),
                        codec::to_row(&row)?.as_slice(),
                    )
                    .map_err(backend)?;
                rebuilt += 1;
            }
        }
        w.commit().map_err(backend)?;
        Ok(rebuilt)
    }
}

#[async_trait]
impl TruthStore for ScopeDb {
    async fn current(
        &self,
        program: &ProgramId,
        hts: &HtsCode,
        material: Option<Material>,
    ) -> Result<Option<VerifiedAssertion>, StoreError> {
        let today = Utc::now().date_naive();
        for kind in [AssertionKind::InScope, AssertionKind::OutOfScope] {
            if let Some(row) = self.current_row(program, hts, material, kind, today)? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    async fn as_of(
        &self,
        program: &ProgramId,
        hts: &HtsCode,
        material: Option<Material>,
        date: NaiveDate,
    ) -> Result<Option<VerifiedAssertion>, StoreError> {
        for kind in [AssertionKind::InScope, AssertionKind::OutOfScope] {
            if let Some(row) = self.row_as_of(program, hts, material, kind, date)? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    async fn all_in_force(&self, date: NaiveDate) -> Result<Vec<VerifiedAssertion>, StoreError> {
        let r = self.db.begin_read().map_err(backend)?;
        let table = r.open_table(ASSERTIONS).map_err(backend)?;
        let mut out = Vec::new();
        for item in table.iter().map_err(backend)? {
            let (_, v) = item.map_err(backend)?;
            let row: VerifiedAssertion = codec::from_row(v.value())?;
            if row.in_force_on(date) {
                out.push(row);
            }
        }
        Ok(out)
    }

    async fn rate_as_of(
        &self,
        program: &ProgramId,
        hts: &HtsCode,
        date: NaiveDate,
    ) -> Result<Option<VerifiedAssertion>, StoreError> {
        self.row_as_of(program, hts, None, AssertionKind::Rate, date)
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

        let w = self.db.begin_write().map_err(backend)?;
        let superseded_start = {
            let mut assertions = w.open_table(ASSERTIONS).map_err(backend)?;

            // Load the group's temporal rows; the scan is in start order.
            let mut logical = k_logical_of(&assertion.key);
            logical.push(crate::tables::KEY_SEP);
            let (start, end) = prefix_range(&logical);
            let existing: Vec<VerifiedAssertion> = assertions
                .range(start.as_slice()..end.as_slice())
                .map_err(backend)?
                .map(|item| {
                    item.map_err(backend)
                        .and_then(|(_, v)| codec::from_row(v.value()))
                })
                .collect::<Result<_, _>>()?;

            let superseded = match existing.last() {
                Some(last) => {
                    if assertion.effective_start <= last.effective_start {
                        // History is never rewritten; earlier-dated facts go
                        // to review instead.
                        return Err(StoreError::Conflict(format!(
                            "effective_start {} is not later than existing row {}",
                            assertion.effective_start, last.effective_start
                        )));
                    }
                    match last.effective_end {
                        None => {
                            // Close the in-force row at the new start.
                            let mut closed = last.clone();
                            closed.effective_end = Some(assertion.effective_start);
                            assertions
                                .insert(
                                    k_assertion(&closed.key, closed.effective_start).as_slice(),
                                    codec::to_row(&closed)?.as_slice(),
                                )
                                .map_err(backend)?;
                            Some(closed.effective_start)
                        }
                        Some(closed_end) if closed_end > assertion.effective_start => {
                            return Err(StoreError::Conflict(format!(
                                "new row at {} would overlap closed history ending {}",
                                assertion.effective_start, closed_end
                            )));
                        }
                        Some(_) => None,
                    }
                }
                None => None,
            };

            assertions
                .insert(
                    k_assertion(&assertion.key, assertion.effective_start).as_slice(),
                    codec::to_row(&assertion)?.as_slice(),
                )
                .map_err(backend)?;
            drop(assertions);

            // Refresh the compiled projection for this key.
            let mut current = w.open_table(CURRENT).map_err(backend)?;
            current
                .insert(
                    k_logical_of(&assertion.key).as_slice(),
                    codec::to_row(&assertion)?.as_slice(),
                )
                .map_err(backend)?;
            drop(current);

            // The audit row commits with the promotion or not at all.
            let mut audit_table = w.open_table(AUDIT).map_err(backend)?;
            audit_table
                .insert(
                    k_audit(audit.created_at.timestamp_millis(), audit.id).as_slice(),
                    codec::to_row(&audit)?.as_slice(),
                )
                .map_err(backend)?;

            superseded
        };
        w.commit().map_err(backend)?;

        tracing::info!(
            key = %assertion.key,
            effective_start = %assertion.effective_start,
            superseded = ?superseded_start,
            "assertion promoted"
        );
        Ok(PromotionOutcome {
            assertion,
            superseded_start,
        })
    }
}
