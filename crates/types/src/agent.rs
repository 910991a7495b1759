// Path: crates/types/src/agent.rs

//! Structured outputs exchanged with the reader, validator, and discovery
//! agents.
//!
//! Agents produce untyped structured text; the boundary here is a strict
//! serde schema. Non-conforming output is rejected and retried, never
//! coerced. Tri-valued scope is a real sum type, not a boolean with a
//! sentinel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The reader's scope finding. `Unknown` means the supplied chunks did not
/// entail a yes-or-no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeFinding {
    /// The chunks establish the HTS is in scope.
    Yes,
    /// The chunks establish the HTS is out of scope.
    No,
    /// The chunks do not decide the question.
    Unknown,
}

impl fmt::Display for ScopeFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeFinding::Yes => f.write_str("yes"),
            ScopeFinding::No => f.write_str("no"),
            ScopeFinding::Unknown => f.write_str("unknown"),
        }
    }
}

/// Agent self-reported confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Directly stated by the cited text.
    High,
    /// Stated with interpretation.
    Medium,
    /// Weakly supported.
    Low,
}

/// The answer object inside a reader output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderAnswer {
    /// Tri-valued scope finding.
    pub in_scope: ScopeFinding,
    /// The program the answer is about, as the reader saw it.
    pub program: String,
    /// The HTS code the answer is about, any accepted spelling.
    pub hts: String,
    /// Chapter-99 claim codes the cited text names, dotted form.
    #[serde(default)]
    pub claim_codes: Vec<String>,
    /// Self-reported confidence.
    pub confidence: Confidence,
}

/// One citation in a reader output. `quote` must be a verbatim substring of
/// the referenced chunk; the write gate enforces this mechanically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderCitation {
    /// Hex id of the cited document.
    pub document_id: String,
    /// Index of the cited chunk within the document.
    pub chunk_index: u32,
    /// The verbatim quote.
    pub quote: String,
    /// The reader's stated reason the quote supports the claim.
    pub why_this_supports: String,
}

/// The reader agent's full structured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderOutput {
    /// The answer object.
    pub answer: ReaderAnswer,
    /// Citations backing the answer.
    pub citations: Vec<ReaderCitation>,
    /// Information the reader found missing from the chunks.
    #[serde(default)]
    pub missing_info: Vec<String>,
    /// Contradictions the reader noticed between chunks.
    #[serde(default)]
    pub contradictions: Vec<String>,
}

/// One failed citation in a validator output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorFailure {
    /// Index into the reader's citation list.
    pub citation_index: usize,
    /// Why the citation does not support the claim.
    pub reason: String,
}

/// The validator agent's structured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorOutput {
    /// Whether the validator confirms the reader's citations support the
    /// claim. Advisory only; the write gate decides promotion.
    pub verified: bool,
    /// Citation-level failures.
    #[serde(default)]
    pub failures: Vec<ValidatorFailure>,
    /// Self-reported confidence.
    pub confidence: Confidence,
}

/// A candidate Tier-A source returned by the discovery agent.
///
/// Discovery is contractually limited to locator records; it never returns a
/// conclusion about scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryCandidate {
    /// Wire name of the source kind (`federal_register`, `csms_bulletin`,
    /// `usitc_hts`). Unknown kinds are dropped by the orchestrator.
    pub source_kind: String,
    /// Source-specific locator (URL, CSMS number, FR citation).
    pub locator: String,
    /// Why the agent believes the source is relevant.
    pub why_relevant: String,
    /// What the agent expects the document to contain.
    #[serde(default)]
    pub expected_contents: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_output_schema_is_strict_on_structure() {
        let good = r#"{
            "answer": {"in_scope": "yes", "program": "section_232_steel",
                       "hts": "9403.99.9045", "claim_codes": ["9903.81.91"],
                       "confidence": "high"},
            "citations": [{"document_id": "aa", "chunk_index": 0,
                           "quote": "q", "why_this_supports": "w"}]
        }"#;
        let parsed: ReaderOutput = serde_json::from_str(good).unwrap();
        assert_eq!(parsed.answer.in_scope, ScopeFinding::Yes);
        assert!(parsed.missing_info.is_empty());

        // A boolean in_scope is not the tri-valued enum.
        let bad = good.replace("\"yes\"", "true");
        assert!(serde_json::from_str::<ReaderOutput>(&bad).is_err());
    }

    #[test]
    fn validator_failures_default_to_empty() {
        let parsed: ValidatorOutput =
            serde_json::from_str(r#"{"verified": true, "confidence": "medium"}"#).unwrap();
        assert!(parsed.verified);
        assert!(parsed.failures.is_empty());
    }
}
