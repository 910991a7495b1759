// Path: crates/api/src/resolution.rs

//! The public resolution API: request and result sum types.
//!
//! `Unknown` is a first-class result, not an error: it means "no verified
//! proof", and the caller decides whether to surface or retry. Operational
//! failures travel as `Err(ResolveError)` so neither outcome can be
//! silently swallowed.

use async_trait::async_trait;
use chrono::NaiveDate;
use scopegate_types::assertion::{Material, VerifiedAssertion};
use scopegate_types::audit::LayerServed;
use scopegate_types::error::ResolveError;
use scopegate_types::hts::HtsCode;
use scopegate_types::program::ProgramId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One scope question put to the engine.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// The tariff program asked about.
    pub program: ProgramId,
    /// Canonical HTS code asked about.
    pub hts: HtsCode,
    /// The material, for Section-232 questions.
    pub material: Option<Material>,
    /// Date the answer should hold on; defaults to today.
    pub as_of: Option<NaiveDate>,
    /// Skip L1 and re-run L2 against the current corpus. The write gate is
    /// never skipped.
    pub force: bool,
    /// Operator id for force requests; force is rate-limited per operator.
    pub operator: Option<String>,
}

impl ResolveRequest {
    /// A plain lookup with defaults.
    pub fn new(program: ProgramId, hts: HtsCode, material: Option<Material>) -> Self {
        Self {
            program,
            hts,
            material,
            as_of: None,
            force: false,
            operator: None,
        }
    }

    /// Renders the query for audit rows: `program/hts[/material]`.
    pub fn query_string(&self) -> String {
        match self.material {
            Some(m) => format!("{}/{}/{}", self.program, self.hts, m),
            None => format!("{}/{}", self.program, self.hts),
        }
    }
}

/// Why a resolution ended without a verified answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownReason {
    /// The corpus returned no relevant chunks and discovery found nothing
    /// usable.
    NoEvidence,
    /// Chunks existed but the write gate rejected the promotion; the block
    /// reasons are in the review queue under stable codes.
    GateRejected {
        /// Stable reason codes, in check order.
        reason_codes: Vec<String>,
    },
    /// The reader answered `unknown`: the chunks did not entail an answer.
    ChunksInconclusive,
    /// Discovery was capped or exhausted without new usable documents.
    DiscoveryExhausted,
}

impl fmt::Display for UnknownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownReason::NoEvidence => f.write_str("no_evidence"),
            UnknownReason::GateRejected { reason_codes } => {
                write!(f, "gate_rejected({})", reason_codes.join(","))
            }
            UnknownReason::ChunksInconclusive => f.write_str("chunks_inconclusive"),
            UnknownReason::DiscoveryExhausted => f.write_str("discovery_exhausted"),
        }
    }
}

/// The outcome of a resolution.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// A verified assertion answers the question.
    Known {
        /// The assertion.
        assertion: VerifiedAssertion,
        /// Which layer served it.
        layer: LayerServed,
    },
    /// No verified proof is available. Never a guess.
    Unknown {
        /// Why.
        reason: UnknownReason,
    },
}

impl Resolution {
    /// The assertion, when known.
    pub fn known(&self) -> Option<&VerifiedAssertion> {
        match self {
            Resolution::Known { assertion, .. } => Some(assertion),
            Resolution::Unknown { .. } => None,
        }
    }

    /// True when the resolution proves in-scope.
    pub fn is_verified_in_scope(&self) -> bool {
        self.known().is_some_and(|a| a.states_in_scope())
    }
}

/// The resolution orchestrator's public contract.
#[async_trait]
pub trait ScopeResolver: Send + Sync {
    /// Runs the L1/L2/L3 pipeline for one question.
    async fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, ResolveError>;
}
