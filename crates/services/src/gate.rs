// Path: crates/services/src/gate.rs

//! The deterministic write gate.
//!
//! `gate(reader_output, validator_output)` either promotes a verified
//! assertion atomically or writes a review entry carrying every failed
//! check. Nothing probabilistic happens here: every check is a mechanical
//! comparison against the document store, and an almost-matching quote is a
//! rejection, never something to repair.

use chrono::Utc;
use scopegate_agents::json::transcript_fingerprint;
use scopegate_agents::{ReaderRun, ValidatorRun};
use scopegate_api::resolution::ResolveRequest;
use scopegate_api::store::{DocumentStore, ReviewQueue, TruthStore};
use scopegate_telemetry::gate_metrics;
use scopegate_types::agent::ScopeFinding;
use scopegate_types::assertion::{
    AgentTranscripts, AssertionKey, AssertionKind, VerifiedAssertion,
};
use scopegate_types::audit::{AuditLogEntry, BlockReason, ReviewQueueEntry, ReviewStatus};
use scopegate_types::document::{ChunkUid, Document, DocumentChunk, DocumentId};
use scopegate_types::error::{ResolveError, StoreError};
use scopegate_types::evidence::{contains_normalized, EvidenceQuote};
use scopegate_types::hts::HtsCode;
use scopegate_types::program::Chapter99Code;
use std::sync::Arc;
use uuid::Uuid;

/// The gate's verdict on one promotion attempt.
#[derive(Debug)]
pub enum GateResult {
    /// All checks passed; the assertion is in the truth store.
    Promoted(VerifiedAssertion),
    /// One or more checks failed; a review entry records them all.
    Rejected {
        /// Every failed check, in check order.
        reasons: Vec<BlockReason>,
    },
}

impl GateResult {
    /// The stable reason codes of a rejection (empty for promotions).
    pub fn reason_codes(&self) -> Vec<String> {
        match self {
            GateResult::Promoted(_) => Vec::new(),
            GateResult::Rejected { reasons } => {
                reasons.iter().map(|r| r.code().to_string()).collect()
            }
        }
    }
}

/// One citation resolved against the document store.
struct ResolvedCitation {
    document: Document,
    chunk: DocumentChunk,
    quote: EvidenceQuote,
}

/// Assembles the stored transcripts, fingerprinting each output over its
/// canonical JSON form so audits can match transcripts independent of key
/// order and whitespace.
fn transcripts_of(reader: &ReaderRun, validator: &ValidatorRun) -> AgentTranscripts {
    AgentTranscripts {
        reader_model: reader.model.clone(),
        reader_output: reader.raw.clone(),
        reader_fingerprint: transcript_fingerprint(&reader.raw).unwrap_or_default(),
        validator_model: validator.model.clone(),
        validator_output: validator.raw.clone(),
        validator_fingerprint: transcript_fingerprint(&validator.raw).unwrap_or_default(),
    }
}

/// The deterministic write gate.
pub struct WriteGate {
    documents: Arc<dyn DocumentStore>,
    truth: Arc<dyn TruthStore>,
    review: Arc<dyn ReviewQueue>,
    hts_window_chars: usize,
}

impl WriteGate {
    /// Builds the gate over its stores.
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        truth: Arc<dyn TruthStore>,
        review: Arc<dyn ReviewQueue>,
        hts_window_chars: usize,
    ) -> Self {
        Self {
            documents,
            truth,
            review,
            hts_window_chars,
        }
    }

    /// Runs every check; on success promotes atomically (assertion,
    /// evidence link, supersession close, audit row in one transaction),
    /// on failure writes the review entry and reports the reasons.
    pub async fn evaluate(
        &self,
        request: &ResolveRequest,
        reader: &ReaderRun,
        validator: &ValidatorRun,
        audit: AuditLogEntry,
    ) -> Result<GateResult, ResolveError> {
        let kind = match reader.output.answer.in_scope {
            ScopeFinding::Yes => AssertionKind::InScope,
            ScopeFinding::No => AssertionKind::OutOfScope,
            // Callers return Unknown before the gate; arriving here is a
            // contract violation worth recording, not panicking over.
            ScopeFinding::Unknown => {
                return self
                    .reject(
                        request,
                        reader,
                        validator,
                        AssertionKind::InScope,
                        vec![BlockReason::SchemaViolation {
                            detail: "reader answered unknown; nothing to promote".into(),
                        }],
                        None,
                    )
                    .await;
            }
        };
        let claims_in_scope = kind == AssertionKind::InScope;

        let mut reasons: Vec<BlockReason> = Vec::new();
        let mut resolved: Vec<ResolvedCitation> = Vec::new();

        if reader.output.citations.is_empty() {
            reasons.push(BlockReason::SchemaViolation {
                detail: "reader produced no citations".into(),
            });
        }

        for (index, citation) in reader.output.citations.iter().enumerate() {
            // Check 1: the citation must resolve in the document store.
            let Some(document_id) = DocumentId::from_hex(&citation.document_id) else {
                reasons.push(BlockReason::UnresolvedCitation {
                    citation_index: index,
                    reference: citation.document_id.clone(),
                });
                continue;
            };
            let Some(document) = self.documents.get(document_id).await? else {
                reasons.push(BlockReason::UnresolvedCitation {
                    citation_index: index,
                    reference: citation.document_id.clone(),
                });
                continue;
            };
            let uid = ChunkUid {
                document_id,
                chunk_index: citation.chunk_index,
            };
            let Some(chunk) = self.documents.chunk(uid).await? else {
                reasons.push(BlockReason::UnresolvedCitation {
                    citation_index: index,
                    reference: uid.to_string(),
                });
                continue;
            };

            // Check 2: only Tier A backs assertions.
            if document.tier != scopegate_types::document::Tier::A {
                reasons.push(BlockReason::TierNotA {
                    citation_index: index,
                    document_id: citation.document_id.clone(),
                });
                continue;
            }

            // Check 3: the quote must be an exact substring of the chunk
            // under whitespace normalization. No repair.
            let Some(quote) = EvidenceQuote::locate(uid, &chunk.text, &citation.quote) else {
                reasons.push(BlockReason::QuoteNotSubstring {
                    citation_index: index,
                });
                continue;
            };

            // Check 4: the normalized HTS must be locatable in the quote or
            // within the configured window of the chunk around it.
            if !self.hts_near_quote(&request.hts, &chunk, &quote) {
                if claims_in_scope {
                    reasons.push(BlockReason::HtsAbsentFromQuote {
                        citation_index: index,
                    });
                    continue;
                }
                tracing::warn!(
                    citation_index = index,
                    hts = %request.hts,
                    "HTS not near quote on a non-claiming citation"
                );
            }

            resolved.push(ResolvedCitation {
                document,
                chunk,
                quote,
            });
        }

        // Check 5: an in-scope answer must name a claim code that occurs in
        // a cited document (any chunk of it).
        let claim_code = if claims_in_scope {
            match self.locate_claim_code(reader, &resolved).await? {
                Some(code) => Some(code),
                None => {
                    reasons.push(BlockReason::ClaimCodeMissing);
                    None
                }
            }
        } else {
            None
        };

        // Check 6: the validator must have verified with no outstanding
        // failures.
        if !validator.output.verified || !validator.output.failures.is_empty() {
            reasons.push(BlockReason::ValidatorFailed {
                reasons: validator
                    .output
                    .failures
                    .iter()
                    .map(|f| format!("citation {}: {}", f.citation_index, f.reason))
                    .collect(),
            });
        }

        let Some(primary) = resolved.first() else {
            // Every citation failed earlier checks; there is nothing to
            // assemble a draft from.
            return self
                .reject(request, reader, validator, kind, reasons, None)
                .await;
        };
        let effective_start = primary.document.effective_start;

        // Check 7: supersession. History is never rewritten; an earlier
        // effective start goes to review instead. An equal start with all
        // other checks green is a re-proof of the standing row (the force
        // path lands here) and confirms it without writing.
        if let Some(existing) = self
            .truth
            .current(&request.program, &request.hts, request.material)
            .await?
        {
            if effective_start < existing.effective_start {
                reasons.push(BlockReason::SupersessionConflict {
                    existing_start: existing.effective_start,
                });
            } else if effective_start == existing.effective_start
                && existing.key.kind == kind
                && reasons.is_empty()
            {
                tracing::info!(key = %existing.key, "re-proof confirmed the standing assertion");
                gate_metrics().inc_gate_accepted();
                return Ok(GateResult::Promoted(existing));
            }
        }

        let assertion = VerifiedAssertion {
            key: AssertionKey {
                program: request.program.clone(),
                hts: request.hts.clone(),
                material: request.material,
                kind,
            },
            claim_code,
            disclaim_code: None,
            rate: None,
            effective_start,
            effective_end: None,
            document_id: primary.document.id,
            evidence: primary.quote.clone(),
            transcripts: transcripts_of(reader, validator),
            promoted_at: Utc::now(),
        };

        if !reasons.is_empty() {
            // The draft travels with the review entry so an operator can
            // promote it manually after inspection.
            return self
                .reject(request, reader, validator, kind, reasons, Some(assertion))
                .await;
        }

        // The store re-checks supersession inside its transaction; a
        // concurrent writer surfaces here as a conflict.
        match self.truth.promote(assertion.clone(), audit).await {
            Ok(outcome) => {
                gate_metrics().inc_gate_accepted();
                Ok(GateResult::Promoted(outcome.assertion))
            }
            Err(StoreError::Conflict(detail)) => {
                tracing::warn!(%detail, "promotion lost a supersession race");
                let existing_start = self
                    .truth
                    .current(&request.program, &request.hts, request.material)
                    .await?
                    .map(|a| a.effective_start)
                    .unwrap_or(effective_start);
                self.reject(
                    request,
                    reader,
                    validator,
                    kind,
                    vec![BlockReason::SupersessionConflict { existing_start }],
                    Some(assertion),
                )
                .await
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Whether the request HTS (either spelling) occurs in the quote or in
    /// the chunk within the configured window around the quote.
    fn hts_near_quote(&self, hts: &HtsCode, chunk: &DocumentChunk, quote: &EvidenceQuote) -> bool {
        let spellings = hts.search_terms();
        if spellings
            .iter()
            .any(|term| contains_normalized(&quote.quote_text, term))
        {
            return true;
        }
        let chars: Vec<char> = chunk.text.chars().collect();
        let start = quote.char_start.saturating_sub(self.hts_window_chars);
        let end = (quote.char_end + self.hts_window_chars).min(chars.len());
        let window: String = chars.get(start..end).unwrap_or_default().iter().collect();
        spellings
            .iter()
            .any(|term| contains_normalized(&window, term))
    }

    /// Finds the first well-formed claim code from the reader's answer that
    /// occurs somewhere in a cited document.
    async fn locate_claim_code(
        &self,
        reader: &ReaderRun,
        resolved: &[ResolvedCitation],
    ) -> Result<Option<Chapter99Code>, ResolveError> {
        for raw in &reader.output.answer.claim_codes {
            let Ok(code) = Chapter99Code::parse(raw) else {
                continue;
            };
            for citation in resolved {
                if self
                    .documents
                    .substring_present(citation.document.id, code.as_str())
                    .await?
                {
                    return Ok(Some(code));
                }
            }
        }
        Ok(None)
    }

    /// The reject path: review entry with all reasons, both transcripts,
    /// and the draft assertion where one could be assembled.
    async fn reject(
        &self,
        request: &ResolveRequest,
        reader: &ReaderRun,
        validator: &ValidatorRun,
        kind: AssertionKind,
        reasons: Vec<BlockReason>,
        draft: Option<VerifiedAssertion>,
    ) -> Result<GateResult, ResolveError> {
        if let Some(first) = reasons.first() {
            gate_metrics().inc_gate_rejected(first.code());
        }
        let entry = ReviewQueueEntry {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            key: AssertionKey {
                program: request.program.clone(),
                hts: request.hts.clone(),
                material: request.material,
                kind,
            },
            reasons: reasons.clone(),
            transcripts: transcripts_of(reader, validator),
            draft,
            status: ReviewStatus::Pending,
        };
        self.review.push(entry).await?;
        Ok(GateResult::Rejected { reasons })
    }
}
