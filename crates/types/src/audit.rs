// Path: crates/types/src/audit.rs

//! Audit log and review queue entry types.
//!
//! Every resolution attempt produces an audit row; every blocked or
//! ambiguous promotion attempt produces a review entry with the transcripts
//! and structured block reasons. Both stores are append-only.

use crate::assertion::{AgentTranscripts, AssertionKey};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Which pipeline layer served (or terminated) a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerServed {
    /// Truth-store hit.
    L1,
    /// Corpus RAG promotion.
    L2,
    /// Discovery-assisted promotion.
    L3,
    /// No layer produced a verified answer.
    None,
}

impl fmt::Display for LayerServed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerServed::L1 => f.write_str("l1"),
            LayerServed::L2 => f.write_str("l2"),
            LayerServed::L3 => f.write_str("l3"),
            LayerServed::None => f.write_str("none"),
        }
    }
}

/// Terminal outcome of one resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// A verified assertion was returned.
    Known,
    /// No verified proof was available.
    Unknown,
    /// The attempt failed operationally.
    Error,
}

/// Token and cost accounting for the LLM calls an attempt made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Prompt tokens across all calls.
    pub tokens_in: u64,
    /// Completion tokens across all calls.
    pub tokens_out: u64,
    /// Estimated cost in micro-USD.
    pub cost_micro_usd: u64,
}

impl UsageRecord {
    /// Accumulates another record into this one.
    pub fn absorb(&mut self, other: UsageRecord) {
        self.tokens_in += other.tokens_in;
        self.tokens_out += other.tokens_out;
        self.cost_micro_usd += other.cost_micro_usd;
    }
}

/// One append-only audit row per resolve/ingest/promote event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Row id.
    pub id: Uuid,
    /// When the attempt finished.
    pub created_at: DateTime<Utc>,
    /// The query, rendered as `program/hts[/material]`.
    pub query: String,
    /// Which layer served the result.
    pub layer_served: LayerServed,
    /// Wall-clock latency of the attempt.
    pub latency_ms: u64,
    /// Model id used, where an LLM ran.
    pub model: Option<String>,
    /// Token and cost accounting.
    pub usage: UsageRecord,
    /// Terminal outcome.
    pub outcome: AuditOutcome,
}

/// A structured reason the write gate blocked a promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum BlockReason {
    /// A cited document or chunk id did not resolve in the store.
    UnresolvedCitation {
        /// Index into the reader's citation list.
        citation_index: usize,
        /// The id that failed to resolve.
        reference: String,
    },
    /// A citation pointed at a non-Tier-A document.
    TierNotA {
        /// Index into the reader's citation list.
        citation_index: usize,
        /// The offending document id (hex).
        document_id: String,
    },
    /// The quote was not a substring of the chunk under whitespace
    /// normalization.
    QuoteNotSubstring {
        /// Index into the reader's citation list.
        citation_index: usize,
    },
    /// The normalized HTS could not be located in the quote or its window.
    HtsAbsentFromQuote {
        /// Index into the reader's citation list.
        citation_index: usize,
    },
    /// An in-scope answer arrived without a claim code, or the code does not
    /// occur in the cited document.
    ClaimCodeMissing,
    /// The validator did not verify, or reported outstanding failures.
    ValidatorFailed {
        /// The validator's stated reasons, flattened.
        reasons: Vec<String>,
    },
    /// The reader output failed schema validation after retries.
    SchemaViolation {
        /// Parser error detail.
        detail: String,
    },
    /// The new fact's effective start predates an existing in-force row.
    SupersessionConflict {
        /// The existing row's effective start (ISO date).
        existing_start: NaiveDate,
    },
    /// Multiple reciprocal exemption variants matched; the priority order
    /// was applied and is surfaced for operator review.
    VariantTieBreak {
        /// The variants that matched, in priority order.
        variants: Vec<String>,
    },
    /// Discovery ran (or was capped) and ingested nothing usable for the
    /// query; the engine answered `unknown` rather than guessing.
    DiscoveryExhausted {
        /// The unserved query.
        query: String,
    },
}

impl BlockReason {
    /// Stable reason code for dashboards and review filters.
    pub fn code(&self) -> &'static str {
        match self {
            BlockReason::UnresolvedCitation { .. } => "UNRESOLVED_CITATION",
            BlockReason::TierNotA { .. } => "TIER_NOT_A",
            BlockReason::QuoteNotSubstring { .. } => "QUOTE_NOT_SUBSTRING",
            BlockReason::HtsAbsentFromQuote { .. } => "HTS_ABSENT_FROM_QUOTE",
            BlockReason::ClaimCodeMissing => "CLAIM_CODE_MISSING",
            BlockReason::ValidatorFailed { .. } => "VALIDATOR_FAILED",
            BlockReason::SchemaViolation { .. } => "SCHEMA_VIOLATION",
            BlockReason::SupersessionConflict { .. } => "SUPERSESSION_CONFLICT",
            BlockReason::VariantTieBreak { .. } => "VARIANT_TIE_BREAK",
            BlockReason::DiscoveryExhausted { .. } => "DISCOVERY_EXHAUSTED",
        }
    }
}

/// Review status of a queue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ReviewStatus {
    /// Awaiting an operator.
    Pending,
    /// Manually promoted by an operator.
    Approved {
        /// The operator who approved.
        operator: String,
    },
    /// Rejected by an operator.
    Rejected {
        /// The operator who rejected.
        operator: String,
    },
}

/// A blocked or ambiguous promotion attempt awaiting operator review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewQueueEntry {
    /// Row id.
    pub id: Uuid,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
    /// The assertion key the attempt was about.
    pub key: AssertionKey,
    /// Structured block reasons, in check order.
    pub reasons: Vec<BlockReason>,
    /// Full reader/validator transcripts.
    pub transcripts: AgentTranscripts,
    /// The assertion the gate would have written, when the citations
    /// resolved far enough to assemble one. Operator approval promotes
    /// this draft.
    pub draft: Option<crate::assertion::VerifiedAssertion>,
    /// Review status.
    pub status: ReviewStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_reasons_serialize_with_stable_tags() {
        let r = BlockReason::QuoteNotSubstring { citation_index: 2 };
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"reason\":\"quote_not_substring\""));
        assert_eq!(r.code(), "QUOTE_NOT_SUBSTRING");
        let back: BlockReason = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn usage_absorb_accumulates() {
        let mut u = UsageRecord {
            tokens_in: 100,
            tokens_out: 20,
            cost_micro_usd: 300,
        };
        u.absorb(UsageRecord {
            tokens_in: 50,
            tokens_out: 5,
            cost_micro_usd: 100,
        });
        assert_eq!(u.tokens_in, 150);
        assert_eq!(u.tokens_out, 25);
        assert_eq!(u.cost_micro_usd, 400);
    }
}
