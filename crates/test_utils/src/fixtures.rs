// Path: crates/test_utils/src/fixtures.rs

//! Tier-A document and agent-response fixtures shared by pipeline tests.

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use scopegate_api::connector::TrustedConnector;
use scopegate_api::resolution::{ResolveRequest, Resolution, ScopeResolver, UnknownReason};
use scopegate_types::assertion::{
    AgentTranscripts, AssertionKey, AssertionKind, Material, VerifiedAssertion,
};
use scopegate_types::audit::LayerServed;
use scopegate_types::document::{ChunkUid, Document, DocumentId, SourceKind, Tier};
use scopegate_types::error::{ConnectorError, ResolveError};
use scopegate_types::evidence::EvidenceQuote;
use scopegate_types::hts::HtsCode;
use scopegate_types::program::{Chapter99Code, ProgramId};
use std::collections::HashMap;
use std::sync::Mutex;

/// Builds a document directly from text, the way a connector would after a
/// fetch. The raw bytes are the text bytes.
pub fn document_from_text(
    source_kind: SourceKind,
    tier: Tier,
    canonical_ref: &str,
    url: &str,
    effective_start: NaiveDate,
    text: &str,
) -> Document {
    let raw = text.as_bytes().to_vec();
    let sha256_raw = Document::hash_raw(&raw);
    Document {
        id: DocumentId::from_sha256(&sha256_raw),
        source_kind,
        tier,
        canonical_ref: canonical_ref.to_string(),
        url: url.to_string(),
        published_at: effective_start
            .and_hms_opt(9, 0, 0)
            .map(|dt| Utc.from_utc_datetime(&dt))
            .unwrap_or_else(Utc::now),
        effective_start,
        sha256_raw,
        raw,
        text: text.to_string(),
    }
}

/// A CSMS-shaped copper guidance bulletin covering HTS 8544.42.9090.
pub fn csms_copper_bulletin() -> Document {
    document_from_text(
        SourceKind::CsmsBulletin,
        Tier::A,
        "CSMS #65936570",
        "https://content.govdelivery.com/accounts/USDHSCBP/bulletins/65936570",
        NaiveDate::from_ymd_opt(2025, 8, 1).unwrap_or(NaiveDate::MIN),
        "GUIDANCE: Section 232 Copper Derivative Products.\n\n\
         Effective August 1, 2025, imports of copper derivative products \
         classified under subheading 8544.42.9090 are within the scope of \
         the Section 232 copper action and must be reported with claim \
         code 9903.78.01. The copper content of such articles is subject \
         to the additional ad valorem duty.\n\n\
         Filers disclaiming copper content on other entry lines must \
         report 9903.78.02 as provided in the Federal Register notice.",
    )
}

/// The verbatim quote inside [`csms_copper_bulletin`] that proves scope.
pub fn copper_quote() -> &'static str {
    "imports of copper derivative products classified under subheading \
     8544.42.9090 are within the scope of the Section 232 copper action"
}

/// A conforming reader output claiming in-scope with one citation.
pub fn reader_yes_json(
    document: &Document,
    chunk_index: u32,
    quote: &str,
    program: &str,
    hts: &str,
    claim_code: &str,
) -> String {
    serde_json::json!({
        "answer": {
            "in_scope": "yes",
            "program": program,
            "hts": hts,
            "claim_codes": [claim_code],
            "confidence": "high"
        },
        "citations": [{
            "document_id": document.id.to_string(),
            "chunk_index": chunk_index,
            "quote": quote,
            "why_this_supports": "names the subheading as within scope"
        }],
        "missing_info": [],
        "contradictions": []
    })
    .to_string()
}

/// A conforming reader output that found the chunks inconclusive.
pub fn reader_unknown_json(program: &str, hts: &str) -> String {
    serde_json::json!({
        "answer": {
            "in_scope": "unknown",
            "program": program,
            "hts": hts,
            "claim_codes": [],
            "confidence": "low"
        },
        "citations": [],
        "missing_info": ["no chunk states scope for this subheading"],
        "contradictions": []
    })
    .to_string()
}

/// A validator output confirming the reader.
pub fn validator_ok_json() -> String {
    r#"{"verified": true, "failures": [], "confidence": "high"}"#.to_string()
}

/// A validator output refusing one citation.
pub fn validator_fail_json(citation_index: usize, reason: &str) -> String {
    serde_json::json!({
        "verified": false,
        "failures": [{"citation_index": citation_index, "reason": reason}],
        "confidence": "high"
    })
    .to_string()
}

/// A discovery output naming one CSMS locator.
pub fn discovery_csms_json(locator: &str) -> String {
    serde_json::json!({
        "candidates": [{
            "source_kind": "csms_bulletin",
            "locator": locator,
            "why_relevant": "CBP filing guidance for the subheading",
            "expected_contents": ["claim codes", "effective date"]
        }]
    })
    .to_string()
}

/// Builds a verified in-scope assertion without running the pipeline, for
/// tests of downstream consumers.
pub fn in_scope_assertion(
    program: ProgramId,
    hts: &str,
    material: Option<Material>,
    claim_code: Option<&str>,
    effective_start: NaiveDate,
) -> Option<VerifiedAssertion> {
    let document_id = DocumentId([0x42; 16]);
    Some(VerifiedAssertion {
        key: AssertionKey {
            program,
            hts: HtsCode::parse(hts).ok()?,
            material,
            kind: AssertionKind::InScope,
        },
        claim_code: match claim_code {
            Some(raw) => Some(Chapter99Code::parse(raw).ok()?),
            None => None,
        },
        disclaim_code: None,
        rate: None,
        effective_start,
        effective_end: None,
        document_id,
        evidence: EvidenceQuote {
            chunk: ChunkUid {
                document_id,
                chunk_index: 0,
            },
            quote_text: "is within the scope".into(),
            char_start: 0,
            char_end: 19,
            sha256_normalized: [0u8; 32],
        },
        transcripts: AgentTranscripts::default(),
        promoted_at: Utc::now(),
    })
}

/// A resolver that answers from a fixed table, for stacking tests: any
/// request whose `(program, hts, material)` key is present resolves
/// `Known`; everything else is `Unknown`.
#[derive(Default)]
pub struct StaticResolver {
    answers: Mutex<HashMap<String, VerifiedAssertion>>,
}

impl StaticResolver {
    /// An empty table: every question resolves `Unknown`.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(program: &ProgramId, hts: &HtsCode, material: Option<Material>) -> String {
        format!(
            "{}/{}/{}",
            program,
            hts,
            material.map(|m| m.as_str()).unwrap_or("-")
        )
    }

    /// Registers a verified answer.
    pub fn insert(&self, assertion: VerifiedAssertion) {
        if let Ok(mut answers) = self.answers.lock() {
            answers.insert(
                Self::key(
                    &assertion.key.program,
                    &assertion.key.hts,
                    assertion.key.material,
                ),
                assertion,
            );
        }
    }
}

#[async_trait]
impl ScopeResolver for StaticResolver {
    async fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, ResolveError> {
        let answers = self
            .answers
            .lock()
            .map_err(|_| ResolveError::Timeout("fixture lock poisoned".into()))?;
        // Exact key, then the 8-digit parent, mirroring L1 semantics.
        let mut keys = vec![Self::key(&request.program, &request.hts, request.material)];
        if request.hts.is_ten_digit() {
            if let Ok(parent) = HtsCode::parse(request.hts.prefix(8)) {
                keys.push(Self::key(&request.program, &parent, request.material));
            }
        }
        for key in keys {
            if let Some(assertion) = answers.get(&key) {
                return Ok(Resolution::Known {
                    assertion: assertion.clone(),
                    layer: LayerServed::L1,
                });
            }
        }
        Ok(Resolution::Unknown {
            reason: UnknownReason::NoEvidence,
        })
    }
}

/// A connector that serves canned documents by locator, for discovery
/// tests. Tier and kind are fixed at construction like any connector.
pub struct StaticConnector {
    source_kind: SourceKind,
    tier: Tier,
    documents: Mutex<HashMap<String, Document>>,
}

impl StaticConnector {
    /// Builds the connector with its canned documents.
    pub fn new(source_kind: SourceKind, tier: Tier) -> Self {
        Self {
            source_kind,
            tier,
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a document under a locator.
    pub fn insert(&self, locator: &str, document: Document) {
        if let Ok(mut documents) = self.documents.lock() {
            documents.insert(locator.to_string(), document);
        }
    }
}

#[async_trait]
impl TrustedConnector for StaticConnector {
    fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    fn tier(&self) -> Tier {
        self.tier
    }

    async fn fetch(&self, locator: &str) -> Result<Document, ConnectorError> {
        self.documents
            .lock()
            .map_err(|_| ConnectorError::Transport("fixture lock poisoned".into()))?
            .get(locator)
            .cloned()
            .ok_or_else(|| ConnectorError::UnsupportedLocator(locator.to_string()))
    }
}
