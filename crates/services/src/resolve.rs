// Path: crates/services/src/resolve.rs

//! The L1/L2/L3 resolution orchestrator.
//!
//! L1 reads the truth store (exact key first, then the 8-digit parent for
//! 10-digit queries). L2 retrieves from the corpus and runs reader,
//! validator, and write gate. L3 triggers discovery and re-runs L2 once.
//! When L2 had chunks but could not prove the point, the call ends
//! `Unknown` without falling through to L3: chunks existed but did not
//! prove the point, and retrying would only loop. Every call appends an
//! audit row.

use crate::discovery::DiscoveryOrchestrator;
use crate::gate::{GateResult, WriteGate};
use async_trait::async_trait;
use chrono::Utc;
use scopegate_agents::{ReaderAgent, ValidatorAgent};
use scopegate_api::index::{CorpusIndex, IndexedChunk, RetrievalFilter, RetrievalQuery};
use scopegate_api::inference::InferenceRuntime;
use scopegate_api::resolution::{ResolveRequest, Resolution, ScopeResolver, UnknownReason};
use scopegate_api::store::{AuditSink, ReviewQueue, TruthStore};
use scopegate_telemetry::resolution_metrics;
use scopegate_types::agent::ScopeFinding;
use scopegate_types::assertion::{
    AgentTranscripts, AssertionKey, AssertionKind, VerifiedAssertion,
};
use scopegate_types::audit::{
    AuditLogEntry, AuditOutcome, BlockReason, LayerServed, ReviewQueueEntry, ReviewStatus,
    UsageRecord,
};
use scopegate_types::config::EngineConfig;
use scopegate_types::error::{AgentError, InferenceError, ResolveError, StoreError};
use scopegate_types::hts::HtsCode;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Tracks force-refresh spend per operator within the current hour.
#[derive(Default)]
struct ForceLedger {
    window_start: Option<Instant>,
    counts: HashMap<String, u32>,
}

/// The resolution orchestrator.
pub struct ResolutionOrchestrator {
    truth: Arc<dyn TruthStore>,
    index: Arc<dyn CorpusIndex>,
    inference: Arc<dyn InferenceRuntime>,
    reader: ReaderAgent,
    validator: ValidatorAgent,
    gate: WriteGate,
    discovery: Option<Arc<DiscoveryOrchestrator>>,
    audit: Arc<dyn AuditSink>,
    review: Arc<dyn ReviewQueue>,
    config: EngineConfig,
    force_ledger: Mutex<ForceLedger>,
}

impl ResolutionOrchestrator {
    /// Builds the orchestrator. Discovery is optional; without it, L3
    /// degrades to `Unknown` immediately.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        truth: Arc<dyn TruthStore>,
        index: Arc<dyn CorpusIndex>,
        inference: Arc<dyn InferenceRuntime>,
        reader: ReaderAgent,
        validator: ValidatorAgent,
        gate: WriteGate,
        discovery: Option<Arc<DiscoveryOrchestrator>>,
        audit: Arc<dyn AuditSink>,
        review: Arc<dyn ReviewQueue>,
        config: EngineConfig,
    ) -> Self {
        Self {
            truth,
            index,
            inference,
            reader,
            validator,
            gate,
            discovery,
            audit,
            review,
            config,
            force_ledger: Mutex::new(ForceLedger::default()),
        }
    }

    /// Records that the corpus and discovery both came up empty, so an
    /// operator can see what the engine could not prove.
    async fn record_exhaustion(&self, request: &ResolveRequest, query: &str) {
        let entry = ReviewQueueEntry {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            key: AssertionKey {
                program: request.program.clone(),
                hts: request.hts.clone(),
                material: request.material,
                kind: AssertionKind::InScope,
            },
            reasons: vec![BlockReason::DiscoveryExhausted {
                query: query.to_string(),
            }],
            transcripts: AgentTranscripts::default(),
            draft: None,
            status: ReviewStatus::Pending,
        };
        if let Err(e) = self.review.push(entry).await {
            tracing::error!(error = %e, "failed to record discovery exhaustion");
        }
    }

    /// Records an agent whose output never conformed to its schema.
    async fn record_schema_violation(
        &self,
        request: &ResolveRequest,
        stage: &str,
        attempts: u32,
        detail: &str,
    ) {
        let entry = ReviewQueueEntry {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            key: AssertionKey {
                program: request.program.clone(),
                hts: request.hts.clone(),
                material: request.material,
                kind: AssertionKind::InScope,
            },
            reasons: vec![BlockReason::SchemaViolation {
                detail: format!("{} non-conforming after {} attempts: {}", stage, attempts, detail),
            }],
            transcripts: AgentTranscripts::default(),
            draft: None,
            status: ReviewStatus::Pending,
        };
        if let Err(e) = self.review.push(entry).await {
            tracing::error!(error = %e, "failed to record schema violation");
        }
    }

    /// Composes the L2 retrieval question for a request.
    fn compose_query(request: &ResolveRequest) -> String {
        let mut query = format!(
            "Is HTS subheading {} ({}) within the scope of {}",
            request.hts.dotted(),
            request.hts,
            request.program
        );
        if let Some(material) = request.material {
            query.push_str(&format!(" for {}", material));
        }
        query.push_str("? Which chapter 99 claim code applies?");
        query
    }

    /// Enforces the per-operator hourly force budget.
    fn take_force_slot(&self, request: &ResolveRequest) -> Result<(), ResolveError> {
        let operator = request.operator.clone().unwrap_or_else(|| "anonymous".into());
        let mut ledger = self
            .force_ledger
            .lock()
            .map_err(|_| StoreError::Backend("force ledger lock poisoned".into()))
            .map_err(ResolveError::from)?;
        let reset = match ledger.window_start {
            Some(start) => start.elapsed().as_secs() >= 3_600,
            None => true,
        };
        if reset {
            ledger.window_start = Some(Instant::now());
            ledger.counts.clear();
        }
        let count = ledger.counts.entry(operator.clone()).or_insert(0);
        if *count >= self.config.force_refresh.per_operator_per_hour {
            return Err(ResolveError::RateLimited(operator));
        }
        *count += 1;
        Ok(())
    }

    /// L1: the truth store. Exact key first; a 10-digit query falls back to
    /// its 8-digit parent. The reverse never matches.
    async fn lookup_l1(
        &self,
        request: &ResolveRequest,
    ) -> Result<Option<VerifiedAssertion>, ResolveError> {
        let mut keys = vec![request.hts.clone()];
        if request.hts.is_ten_digit() {
            if let Ok(parent) = HtsCode::parse(request.hts.prefix(8)) {
                keys.push(parent);
            }
        }
        for hts in keys {
            let hit = match request.as_of {
                Some(date) => {
                    self.truth
                        .as_of(&request.program, &hts, request.material, date)
                        .await?
                }
                None => {
                    self.truth
                        .current(&request.program, &hts, request.material)
                        .await?
                }
            };
            if hit.is_some() {
                return Ok(hit);
            }
        }
        Ok(None)
    }

    /// L2: retrieve, read, validate, gate. `Ok(None)` means the corpus had
    /// no chunks at all (the only case that may continue to L3).
    async fn run_l2(
        &self,
        request: &ResolveRequest,
        layer: LayerServed,
        usage: &mut UsageRecord,
    ) -> Result<Option<L2Outcome>, ResolveError> {
        let query_text = Self::compose_query(request);
        let deadline = Duration::from_secs(self.config.agents.call_deadline_secs);
        let embedding = match self.inference.embed_text(&query_text, deadline).await {
            Ok(vector) => Some(vector),
            Err(e @ InferenceError::Timeout) => {
                // A hung embeddings endpoint aborts the step, not the
                // transport; the resolution surfaces it as a timeout.
                return Err(map_agent_error("query-embedding")(AgentError::from(e)));
            }
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed; retrieving lexical-only");
                None
            }
        };
        let chunks = self
            .index
            .retrieve(&RetrievalQuery {
                text: query_text.clone(),
                embedding,
                filter: RetrievalFilter {
                    program_hint: Some(request.program.clone()),
                    hts: Some(request.hts.clone()),
                },
                k: self.config.retrieval.k,
            })
            .await?;
        if chunks.is_empty() {
            return Ok(None);
        }

        let outcome = self.prove_from_chunks(request, layer, &query_text, &chunks, usage).await?;
        Ok(Some(outcome))
    }

    /// The reader → validator → gate segment of L2.
    async fn prove_from_chunks(
        &self,
        request: &ResolveRequest,
        layer: LayerServed,
        question: &str,
        chunks: &[IndexedChunk],
        usage: &mut UsageRecord,
    ) -> Result<L2Outcome, ResolveError> {
        let reader_run = match self.reader.read(question, chunks).await {
            Ok(run) => run,
            Err(AgentError::NonConforming { attempts, detail }) => {
                // Retries exhausted on non-conforming output: review queue,
                // then Unknown. Never an operational error, never a guess.
                self.record_schema_violation(request, "reader", attempts, &detail)
                    .await;
                return Ok(L2Outcome::Unknown(UnknownReason::GateRejected {
                    reason_codes: vec!["SCHEMA_VIOLATION".to_string()],
                }));
            }
            Err(e) => return Err(map_agent_error("reader")(e)),
        };
        usage.absorb(reader_run.usage);

        if reader_run.output.answer.in_scope == ScopeFinding::Unknown {
            return Ok(L2Outcome::Unknown(UnknownReason::ChunksInconclusive));
        }

        let validator_run = match self.validator.validate(chunks, &reader_run.output).await {
            Ok(run) => run,
            Err(AgentError::NonConforming { attempts, detail }) => {
                self.record_schema_violation(request, "validator", attempts, &detail)
                    .await;
                return Ok(L2Outcome::Unknown(UnknownReason::GateRejected {
                    reason_codes: vec!["SCHEMA_VIOLATION".to_string()],
                }));
            }
            Err(e) => return Err(map_agent_error("validator")(e)),
        };
        usage.absorb(validator_run.usage);

        let audit = self.audit_entry(request, layer, AuditOutcome::Known, *usage);
        match self
            .gate
            .evaluate(request, &reader_run, &validator_run, audit)
            .await?
        {
            GateResult::Promoted(assertion) => Ok(L2Outcome::Proven(assertion)),
            GateResult::Rejected { reasons } => Ok(L2Outcome::Unknown(UnknownReason::GateRejected {
                reason_codes: reasons.iter().map(|r| r.code().to_string()).collect(),
            })),
        }
    }

    fn audit_entry(
        &self,
        request: &ResolveRequest,
        layer: LayerServed,
        outcome: AuditOutcome,
        usage: UsageRecord,
    ) -> AuditLogEntry {
        AuditLogEntry {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            query: request.query_string(),
            layer_served: layer,
            latency_ms: 0,
            model: Some(self.config.agents.reader_model.clone()),
            usage,
            outcome,
        }
    }

    /// Finishes one call: audit row (unless the promotion transaction
    /// already committed one) and metrics.
    async fn record(
        &self,
        request: &ResolveRequest,
        layer: LayerServed,
        outcome: AuditOutcome,
        usage: UsageRecord,
        started: Instant,
        used_llm: bool,
        append: bool,
    ) {
        if append {
            let mut entry = self.audit_entry(request, layer, outcome, usage);
            entry.latency_ms = started.elapsed().as_millis() as u64;
            if !used_llm {
                entry.model = None;
            }
            if let Err(e) = self.audit.append(entry).await {
                tracing::error!(error = %e, "audit append failed");
            }
        }
        let outcome_str = match outcome {
            AuditOutcome::Known => "known",
            AuditOutcome::Unknown => "unknown",
            AuditOutcome::Error => "error",
        };
        let layer_str = layer.to_string();
        resolution_metrics().observe_resolution(
            &layer_str,
            outcome_str,
            started.elapsed().as_secs_f64(),
        );
        resolution_metrics().inc_tokens("in", usage.tokens_in);
        resolution_metrics().inc_tokens("out", usage.tokens_out);
        resolution_metrics().inc_cost_micro_usd(usage.cost_micro_usd);
    }
}

/// What one L2 pass concluded.
enum L2Outcome {
    Proven(VerifiedAssertion),
    Unknown(UnknownReason),
}

fn map_agent_error(stage: &'static str) -> impl Fn(AgentError) -> ResolveError {
    move |e| match e {
        AgentError::Inference(InferenceError::Timeout) => ResolveError::Timeout(stage.into()),
        other => other.into(),
    }
}

#[async_trait]
impl ScopeResolver for ResolutionOrchestrator {
    async fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, ResolveError> {
        let started = Instant::now();
        let mut usage = UsageRecord::default();

        if request.force {
            self.take_force_slot(request)?;
        }

        // --- L1: the truth store. No LLM call on a hit. ---
        if !request.force {
            if let Some(assertion) = self.lookup_l1(request).await? {
                self.record(
                    request,
                    LayerServed::L1,
                    AuditOutcome::Known,
                    usage,
                    started,
                    false,
                    true,
                )
                .await;
                return Ok(Resolution::Known {
                    assertion,
                    layer: LayerServed::L1,
                });
            }
        }

        // --- L2: corpus RAG. ---
        match self.run_l2(request, LayerServed::L2, &mut usage).await {
            Ok(Some(L2Outcome::Proven(assertion))) => {
                // The promotion's audit row committed with the write; only
                // metrics remain to report here.
                self.record(
                    request,
                    LayerServed::L2,
                    AuditOutcome::Known,
                    usage,
                    started,
                    true,
                    false,
                )
                .await;
                return Ok(Resolution::Known {
                    assertion,
                    layer: LayerServed::L2,
                });
            }
            Ok(Some(L2Outcome::Unknown(reason))) => {
                // Chunks existed but did not prove the point. Do not fall
                // through to discovery; that way lies an ingest storm.
                self.record(
                    request,
                    LayerServed::L2,
                    AuditOutcome::Unknown,
                    usage,
                    started,
                    true,
                    true,
                )
                .await;
                return Ok(Resolution::Unknown { reason });
            }
            Ok(None) => {}
            Err(e) => {
                self.record(
                    request,
                    LayerServed::L2,
                    AuditOutcome::Error,
                    usage,
                    started,
                    true,
                    true,
                )
                .await;
                return Err(e);
            }
        }

        // --- L3: discovery, then one more L2 pass. ---
        let Some(discovery) = &self.discovery else {
            self.record(
                request,
                LayerServed::None,
                AuditOutcome::Unknown,
                usage,
                started,
                false,
                true,
            )
            .await;
            return Ok(Resolution::Unknown {
                reason: UnknownReason::NoEvidence,
            });
        };

        let query_text = Self::compose_query(request);
        let outcome = discovery
            .run(&query_text, Some(request.program.clone()))
            .await?;
        usage.absorb(outcome.usage);

        if outcome.ingested > 0 {
            match self.run_l2(request, LayerServed::L3, &mut usage).await {
                Ok(Some(L2Outcome::Proven(assertion))) => {
                    self.record(
                        request,
                        LayerServed::L3,
                        AuditOutcome::Known,
                        usage,
                        started,
                        true,
                        false,
                    )
                    .await;
                    return Ok(Resolution::Known {
                        assertion,
                        layer: LayerServed::L3,
                    });
                }
                Ok(Some(L2Outcome::Unknown(reason))) => {
                    self.record(
                        request,
                        LayerServed::L3,
                        AuditOutcome::Unknown,
                        usage,
                        started,
                        true,
                        true,
                    )
                    .await;
                    return Ok(Resolution::Unknown { reason });
                }
                Ok(None) => {}
                Err(e) => {
                    self.record(
                        request,
                        LayerServed::L3,
                        AuditOutcome::Error,
                        usage,
                        started,
                        true,
                        true,
                    )
                    .await;
                    return Err(e);
                }
            }
        }

        let reason = if outcome.capped {
            UnknownReason::DiscoveryExhausted
        } else {
            UnknownReason::NoEvidence
        };
        self.record_exhaustion(request, &query_text).await;
        self.record(
            request,
            LayerServed::None,
            AuditOutcome::Unknown,
            usage,
            started,
            true,
            true,
        )
        .await;
        Ok(Resolution::Unknown { reason })
    }
}
