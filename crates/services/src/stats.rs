// Path: crates/services/src/stats.rs

//! Audit-derived operational statistics: cache-hit rate, layer
//! distribution, validator-failure rate, and cost, computed from the audit
//! log and review queue rather than from in-memory counters, so restarts
//! lose nothing.

use chrono::{DateTime, Utc};
use scopegate_api::store::{AuditSink, ReviewQueue};
use scopegate_types::audit::{AuditOutcome, BlockReason, LayerServed};
use scopegate_types::error::StoreError;
use std::sync::Arc;

/// A summary of engine activity over a window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Resolutions attempted.
    pub total: u64,
    /// Served from the truth store.
    pub l1_hits: u64,
    /// Promoted through corpus RAG.
    pub l2_promotions: u64,
    /// Promoted after discovery.
    pub l3_promotions: u64,
    /// Ended `Unknown`.
    pub unknowns: u64,
    /// Ended in operational error.
    pub errors: u64,
    /// Cache-hit rate in hundredths of a percent (10_000 = 100%).
    pub cache_hit_rate_bps: u32,
    /// Prompt tokens consumed.
    pub tokens_in: u64,
    /// Completion tokens consumed.
    pub tokens_out: u64,
    /// Estimated LLM spend in micro-USD.
    pub cost_micro_usd: u64,
    /// Review entries still pending.
    pub pending_reviews: u64,
    /// Review entries whose first block reason was a validator failure.
    pub validator_failures: u64,
}

/// Collects stats for `[from, to)`.
pub async fn collect(
    audit: Arc<dyn AuditSink>,
    review: Arc<dyn ReviewQueue>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<EngineStats, StoreError> {
    let mut stats = EngineStats::default();

    for entry in audit.between(from, to).await? {
        stats.total += 1;
        match (entry.layer_served, entry.outcome) {
            (LayerServed::L1, AuditOutcome::Known) => stats.l1_hits += 1,
            (LayerServed::L2, AuditOutcome::Known) => stats.l2_promotions += 1,
            (LayerServed::L3, AuditOutcome::Known) => stats.l3_promotions += 1,
            (_, AuditOutcome::Unknown) => stats.unknowns += 1,
            (_, AuditOutcome::Error) => stats.errors += 1,
            _ => {}
        }
        stats.tokens_in += entry.usage.tokens_in;
        stats.tokens_out += entry.usage.tokens_out;
        stats.cost_micro_usd += entry.usage.cost_micro_usd;
    }
    if stats.total > 0 {
        stats.cache_hit_rate_bps = (stats.l1_hits * 10_000 / stats.total) as u32;
    }

    for entry in review.list(false).await? {
        if entry.created_at < from || entry.created_at >= to {
            continue;
        }
        if entry.status == scopegate_types::audit::ReviewStatus::Pending {
            stats.pending_reviews += 1;
        }
        if entry
            .reasons
            .iter()
            .any(|r| matches!(r, BlockReason::ValidatorFailed { .. }))
        {
            stats.validator_failures += 1;
        }
    }

    Ok(stats)
}
