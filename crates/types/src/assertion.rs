// Path: crates/types/src/assertion.rs

//! Verified assertions: temporally-versioned facts the engine stands behind.
//!
//! Assertions are created only by the write gate and amended only by closing
//! (setting `effective_end` exactly once). For a fixed
//! `(program, hts, material, kind)` the effective ranges are non-overlapping
//! and totally ordered.

use crate::document::DocumentId;
use crate::evidence::EvidenceQuote;
use crate::hts::HtsCode;
use crate::money::FixedRate;
use crate::program::{Chapter99Code, ProgramId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The metal a Section-232 scope fact is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    /// Copper and copper derivatives.
    Copper,
    /// Steel and steel derivatives.
    Steel,
    /// Aluminum and aluminum derivatives.
    Aluminum,
}

impl Material {
    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Material::Copper => "copper",
            Material::Steel => "steel",
            Material::Aluminum => "aluminum",
        }
    }

    /// Parses a wire name. Unknown names yield `None`.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "copper" => Some(Material::Copper),
            "steel" => Some(Material::Steel),
            "aluminum" => Some(Material::Aluminum),
            _ => None,
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of fact an assertion states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionKind {
    /// The HTS is within the program's scope.
    InScope,
    /// The HTS is outside the program's scope.
    OutOfScope,
    /// The program's ad-valorem rate for this HTS.
    Rate,
}

impl AssertionKind {
    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssertionKind::InScope => "in_scope",
            AssertionKind::OutOfScope => "out_of_scope",
            AssertionKind::Rate => "rate",
        }
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The logical key an assertion is unique under (together with its
/// `effective_start`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssertionKey {
    /// The tariff program the fact belongs to.
    pub program: ProgramId,
    /// Canonical HTS code the fact is keyed on (8 or 10 digits).
    pub hts: HtsCode,
    /// The material, for Section-232 facts; `None` for country programs.
    pub material: Option<Material>,
    /// What the fact states.
    pub kind: AssertionKind,
}

impl fmt::Display for AssertionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.program, self.hts)?;
        if let Some(m) = self.material {
            write!(f, "/{}", m)?;
        }
        write!(f, "/{}", self.kind)
    }
}

/// The full reader and validator transcripts retained for audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTranscripts {
    /// Model id the reader ran on.
    pub reader_model: String,
    /// The reader's raw structured output, as JSON text.
    pub reader_output: String,
    /// SHA-256 over the canonical (RFC 8785) form of the reader output,
    /// hex. Stable across key order and whitespace, so two transcripts of
    /// the same structured output always fingerprint identically.
    pub reader_fingerprint: String,
    /// Model id the validator ran on.
    pub validator_model: String,
    /// The validator's raw structured output, as JSON text.
    pub validator_output: String,
    /// SHA-256 over the canonical (RFC 8785) form of the validator output,
    /// hex.
    pub validator_fingerprint: String,
}

/// A fact the engine stands behind, backed by a verbatim evidence quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedAssertion {
    /// The logical key.
    pub key: AssertionKey,
    /// Claim chapter-99 code established by the evidence, where stated.
    pub claim_code: Option<Chapter99Code>,
    /// Disclaim chapter-99 code established by the evidence, where stated.
    pub disclaim_code: Option<Chapter99Code>,
    /// For `Rate` assertions, the ad-valorem rate the evidence establishes.
    pub rate: Option<FixedRate>,
    /// First date the fact is in force.
    pub effective_start: NaiveDate,
    /// Date the fact stopped being in force; `None` while current.
    pub effective_end: Option<NaiveDate>,
    /// The Tier-A document backing the fact.
    pub document_id: DocumentId,
    /// The verbatim quote backing the fact.
    pub evidence: EvidenceQuote,
    /// Reader/validator transcripts for audit.
    pub transcripts: AgentTranscripts,
    /// When the write gate promoted the fact.
    pub promoted_at: DateTime<Utc>,
}

impl VerifiedAssertion {
    /// Whether the fact is in force on `date`.
    pub fn in_force_on(&self, date: NaiveDate) -> bool {
        if date < self.effective_start {
            return false;
        }
        match self.effective_end {
            Some(end) => date < end,
            None => true,
        }
    }

    /// Whether the fact is currently open (no effective end).
    pub fn is_current(&self) -> bool {
        self.effective_end.is_none()
    }

    /// True when the assertion states the HTS is in scope.
    pub fn states_in_scope(&self) -> bool {
        self.key.kind == AssertionKind::InScope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ChunkUid, DocumentId};

    fn sample(start: NaiveDate, end: Option<NaiveDate>) -> VerifiedAssertion {
        let doc = DocumentId([1u8; 16]);
        VerifiedAssertion {
            key: AssertionKey {
                program: ProgramId::section_232_copper(),
                hts: HtsCode::parse("8544.42.9090").unwrap(),
                material: Some(Material::Copper),
                kind: AssertionKind::InScope,
            },
            claim_code: Some(Chapter99Code::parse("9903.78.01").unwrap()),
            disclaim_code: Some(Chapter99Code::parse("9903.78.02").unwrap()),
            rate: None,
            effective_start: start,
            effective_end: end,
            document_id: doc,
            evidence: EvidenceQuote {
                chunk: ChunkUid {
                    document_id: doc,
                    chunk_index: 0,
                },
                quote_text: "covered".into(),
                char_start: 0,
                char_end: 7,
                sha256_normalized: [0u8; 32],
            },
            transcripts: AgentTranscripts::default(),
            promoted_at: Utc::now(),
        }
    }

    #[test]
    fn in_force_window_is_half_open() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 6, 4).unwrap();
        let closed = sample(start, Some(end));
        assert!(!closed.in_force_on(start.pred_opt().unwrap()));
        assert!(closed.in_force_on(start));
        assert!(closed.in_force_on(end.pred_opt().unwrap()));
        assert!(!closed.in_force_on(end));

        let open = sample(start, None);
        assert!(open.in_force_on(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()));
        assert!(open.is_current());
    }

    #[test]
    fn key_display_reads_as_a_path() {
        let a = sample(NaiveDate::from_ymd_opt(2025, 3, 12).unwrap(), None);
        assert_eq!(
            a.key.to_string(),
            "section_232_copper/8544429090/copper/in_scope"
        );
    }
}
