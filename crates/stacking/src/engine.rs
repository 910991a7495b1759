// Path: crates/stacking/src/engine.rs

//! The stacking engine: resolve scope per program, plan slices, build each
//! slice's chapter-99 stack in filing sequence, and compute duties.

use crate::planner::{plan_slices, remaining_value, PlannedSlice};
use crate::types::{EntrySlice, ProgramDuty, StackingInput, StackingResult};
use chrono::Utc;
use futures::future::join_all;
use scopegate_api::resolution::{ResolveRequest, Resolution, ScopeResolver};
use scopegate_api::store::{ReviewQueue, TruthStore};
use scopegate_types::assertion::{AgentTranscripts, AssertionKey, AssertionKind, Material};
use scopegate_types::audit::{BlockReason, ReviewQueueEntry, ReviewStatus};
use scopegate_types::error::StackingError;
use scopegate_types::hts::HtsCode;
use scopegate_types::money::{effective_rate, Cents, FixedRate};
use scopegate_types::program::{
    DisclaimBehavior, ProgramCatalog, ProgramConfig, ProgramId, ProgramKind, ReciprocalVariant,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use uuid::Uuid;

/// What the resolver said about one program for this line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeAnswer {
    /// A verified in-scope assertion exists.
    VerifiedIn,
    /// A verified out-of-scope assertion exists.
    VerifiedOut,
    /// No verified proof either way.
    Unproven,
}

/// The stacking engine.
pub struct StackingEngine {
    resolver: Arc<dyn ScopeResolver>,
    truth: Arc<dyn TruthStore>,
    catalog: ProgramCatalog,
    review: Option<Arc<dyn ReviewQueue>>,
}

impl StackingEngine {
    /// Builds the engine over a resolver, the truth store (for rate
    /// overrides), and a catalogue.
    pub fn new(
        resolver: Arc<dyn ScopeResolver>,
        truth: Arc<dyn TruthStore>,
        catalog: ProgramCatalog,
    ) -> Self {
        Self {
            resolver,
            truth,
            catalog,
            review: None,
        }
    }

    /// Attaches a review queue for surfacing variant tie-break conflicts.
    pub fn with_review(mut self, review: Arc<dyn ReviewQueue>) -> Self {
        self.review = Some(review);
        self
    }

    /// The public stacking API: one line item in, slices + stacks + duties
    /// out. No partial output: any failure aborts the whole computation.
    pub async fn stack(&self, input: &StackingInput) -> Result<StackingResult, StackingError> {
        input.validate()?;

        let applicable: Vec<&ProgramConfig> = self
            .catalog
            .in_filing_order()
            .iter()
            .filter(|p| p.origins.applies_to(input.origin_country))
            .collect();

        // One resolution per applicable program, dispatched concurrently
        // and joined. Stacking never proceeds on a partial picture.
        let scope = self.resolve_scope(input, &applicable).await?;

        let in_scope_materials: BTreeSet<Material> = applicable
            .iter()
            .filter(|p| p.kind == ProgramKind::Section232)
            .filter(|p| scope.get(&p.id) == Some(&ScopeAnswer::VerifiedIn))
            .filter_map(|p| p.material)
            .collect();

        let slices = plan_slices(input, &in_scope_materials)?;
        let remaining = remaining_value(input, &slices);

        // The once-per-entry programs charge on the residual (or full)
        // slice, or on the first metal slice when the metals consume the
        // whole value.
        let charge_index = slices
            .iter()
            .position(|s| s.claimed_material().is_none())
            .unwrap_or(0);

        let mut rates: BTreeMap<ProgramId, FixedRate> = BTreeMap::new();
        for program in &applicable {
            rates.insert(
                program.id.clone(),
                self.rate_for(program, &input.hts, input).await?,
            );
        }

        let mut out_slices = Vec::with_capacity(slices.len());
        let mut tie_break: Option<Vec<ReciprocalVariant>> = None;
        for (slice_index, slice) in slices.iter().enumerate() {
            let built = self.build_slice(
                input,
                slice,
                slice_index == charge_index,
                remaining,
                &applicable,
                &scope,
                &rates,
                &mut tie_break,
            )?;
            out_slices.push(built);
        }
        if let Some(candidates) = tie_break {
            self.report_tie_break(input, &candidates).await;
        }

        let total_duty: Cents = out_slices.iter().map(|s| s.duty()).sum();
        Ok(StackingResult {
            total_duty,
            effective_rate: effective_rate(total_duty, input.product_value),
            slices: out_slices,
        })
    }

    /// Resolves every applicable program concurrently.
    async fn resolve_scope(
        &self,
        input: &StackingInput,
        applicable: &[&ProgramConfig],
    ) -> Result<BTreeMap<ProgramId, ScopeAnswer>, StackingError> {
        let futures = applicable.iter().map(|program| {
            let request = ResolveRequest {
                program: program.id.clone(),
                hts: input.hts.clone(),
                material: program.material,
                as_of: Some(input.as_of),
                force: false,
                operator: None,
            };
            let resolver = self.resolver.clone();
            let id = program.id.clone();
            async move { (id, resolver.resolve(&request).await) }
        });

        let mut scope = BTreeMap::new();
        for (id, outcome) in join_all(futures).await {
            let answer = match outcome {
                Ok(Resolution::Known { assertion, .. }) => match assertion.key.kind {
                    AssertionKind::InScope => ScopeAnswer::VerifiedIn,
                    AssertionKind::OutOfScope => ScopeAnswer::VerifiedOut,
                    AssertionKind::Rate => ScopeAnswer::Unproven,
                },
                Ok(Resolution::Unknown { .. }) => ScopeAnswer::Unproven,
                Err(source) => {
                    return Err(StackingError::Resolution {
                        program: id.to_string(),
                        source,
                    });
                }
            };
            scope.insert(id, answer);
        }
        Ok(scope)
    }

    /// The effective rate for a program: a `Rate` assertion in force wins
    /// (exact HTS, then its 8-digit parent), then the catalogue fallback.
    async fn rate_for(
        &self,
        program: &ProgramConfig,
        hts: &HtsCode,
        input: &StackingInput,
    ) -> Result<FixedRate, StackingError> {
        let mut keys = vec![hts.clone()];
        if hts.is_ten_digit() {
            if let Ok(parent) = HtsCode::parse(hts.prefix(8)) {
                keys.push(parent);
            }
        }
        for key in keys {
            let hit = self
                .truth
                .rate_as_of(&program.id, &key, input.as_of)
                .await
                .map_err(|e| StackingError::Resolution {
                    program: program.id.to_string(),
                    source: e.into(),
                })?;
            if let Some(assertion) = hit {
                if let Some(rate) = assertion.rate {
                    return Ok(rate);
                }
            }
        }
        Ok(program.fallback_rate)
    }

    /// Builds one slice's stack and duties, walking programs in filing
    /// sequence and appending the base HTS last.
    #[allow(clippy::too_many_arguments)]
    fn build_slice(
        &self,
        input: &StackingInput,
        slice: &PlannedSlice,
        is_charge_slice: bool,
        remaining: Cents,
        applicable: &[&ProgramConfig],
        scope: &BTreeMap<ProgramId, ScopeAnswer>,
        rates: &BTreeMap<ProgramId, FixedRate>,
        tie_break: &mut Option<Vec<ReciprocalVariant>>,
    ) -> Result<EntrySlice, StackingError> {
        let mut stack: Vec<String> = Vec::new();
        let mut duties: Vec<ProgramDuty> = Vec::new();

        for program in applicable {
            let answer = scope
                .get(&program.id)
                .copied()
                .unwrap_or(ScopeAnswer::Unproven);
            let rate = rates
                .get(&program.id)
                .copied()
                .unwrap_or(program.fallback_rate);

            match program.kind {
                ProgramKind::Section232 => {
                    if answer != ScopeAnswer::VerifiedIn {
                        continue;
                    }
                    let material = program.material;
                    if slice.claimed_material() == material {
                        // Claim: this is the program's own metal slice.
                        let code = program.code_for(&input.hts).ok_or_else(|| {
                            StackingError::CatalogMissing(format!(
                                "claim code for {} / {}",
                                program.id, input.hts
                            ))
                        })?;
                        stack.push(code.as_str().to_string());
                        duties.push(ProgramDuty {
                            program: program.id.clone(),
                            code: Some(code.as_str().to_string()),
                            rate,
                            basis: slice.value,
                            duty: rate.apply(slice.value),
                        });
                    } else {
                        // Unclaimed scope on this slice: disclaim or omit.
                        match program.disclaim_behavior {
                            DisclaimBehavior::Required => {
                                let code = program.disclaim_code.as_ref().ok_or_else(|| {
                                    StackingError::CatalogMissing(format!(
                                        "disclaim code for {}",
                                        program.id
                                    ))
                                })?;
                                stack.push(code.as_str().to_string());
                            }
                            DisclaimBehavior::Omit | DisclaimBehavior::None => {}
                        }
                    }
                }
                ProgramKind::Section301 | ProgramKind::IeepaFentanyl => {
                    // A verified out-of-scope fact omits the program; an
                    // unproven one applies it by origin, per the catalogue.
                    if answer == ScopeAnswer::VerifiedOut {
                        continue;
                    }
                    let code = program.code_for(&input.hts).ok_or_else(|| {
                        StackingError::CatalogMissing(format!(
                            "apply code for {} / {}",
                            program.id, input.hts
                        ))
                    })?;
                    stack.push(code.as_str().to_string());
                    if is_charge_slice {
                        // Charged once per entry on the full product value.
                        duties.push(ProgramDuty {
                            program: program.id.clone(),
                            code: Some(code.as_str().to_string()),
                            rate,
                            basis: input.product_value,
                            duty: rate.apply(input.product_value),
                        });
                    }
                }
                ProgramKind::IeepaReciprocal => {
                    if answer == ScopeAnswer::VerifiedOut {
                        continue;
                    }
                    let variant = self.reciprocal_variant(input, slice, tie_break);
                    let code = program.variant_code(variant).ok_or_else(|| {
                        StackingError::CatalogMissing(format!(
                            "reciprocal variant code {}",
                            variant
                        ))
                    })?;
                    stack.push(code.as_str().to_string());
                    if variant == ReciprocalVariant::Taxable {
                        // The unstacking rule: the paid base is the product
                        // value minus each claimed material, deducted
                        // exactly once.
                        duties.push(ProgramDuty {
                            program: program.id.clone(),
                            code: Some(code.as_str().to_string()),
                            rate,
                            basis: remaining,
                            duty: rate.apply(remaining),
                        });
                    }
                }
            }
        }

        stack.push(input.hts.dotted());
        Ok(EntrySlice {
            kind: slice.kind,
            value: slice.value,
            quantity: input.quantity,
            stack,
            per_program_duties: duties,
        })
    }

    /// Picks the IEEPA Reciprocal variant for a slice. When more than one
    /// exemption matches, the catalogue's priority order decides and the
    /// conflict is surfaced to the review queue, not silently resolved.
    fn reciprocal_variant(
        &self,
        input: &StackingInput,
        slice: &PlannedSlice,
        tie_break: &mut Option<Vec<ReciprocalVariant>>,
    ) -> ReciprocalVariant {
        let mut candidates: Vec<ReciprocalVariant> = Vec::new();
        if self.catalog.annex_ii.contains(&input.hts) {
            candidates.push(ReciprocalVariant::AnnexIiExempt);
        }
        if slice.claimed_material().is_some() {
            candidates.push(ReciprocalVariant::MetalExempt);
        }

        match candidates.len() {
            0 => ReciprocalVariant::Taxable,
            1 => candidates.remove(0),
            _ => {
                let chosen = self
                    .catalog
                    .reciprocal_variant_priority
                    .iter()
                    .find(|v| candidates.contains(*v))
                    .copied()
                    .unwrap_or(ReciprocalVariant::MetalExempt);
                tie_break.get_or_insert(candidates);
                chosen
            }
        }
    }

    /// Surfaces a variant tie-break: the priority order is a convention,
    /// not settled regulation, so an operator gets to see every one.
    async fn report_tie_break(&self, input: &StackingInput, candidates: &[ReciprocalVariant]) {
        tracing::warn!(
            hts = %input.hts,
            candidates = ?candidates,
            "multiple reciprocal exemption variants matched; priority order applied"
        );
        let Some(review) = &self.review else {
            return;
        };
        let entry = ReviewQueueEntry {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            key: AssertionKey {
                program: ProgramId::ieepa_reciprocal(),
                hts: input.hts.clone(),
                material: None,
                kind: AssertionKind::InScope,
            },
            reasons: vec![BlockReason::VariantTieBreak {
                variants: candidates.iter().map(|v| v.as_str().to_string()).collect(),
            }],
            transcripts: AgentTranscripts::default(),
            draft: None,
            status: ReviewStatus::Pending,
        };
        if let Err(e) = review.push(entry).await {
            tracing::error!(error = %e, "failed to record variant tie-break");
        }
    }
}
