// Path: crates/services/tests/resolution_e2e.rs

//! End-to-end resolution pipeline tests over in-memory stores and a
//! scripted inference runtime: L2 promotion, L1 cache hits, gate
//! rejections, discovery bootstrapping, and the no-ingest-storm property.

use scopegate_agents::{DiscoveryAgent, ReaderAgent, ValidatorAgent};
use scopegate_api::resolution::{ResolveRequest, Resolution, ScopeResolver, UnknownReason};
use scopegate_api::store::ReviewQueue;
use scopegate_index::HybridIndex;
use scopegate_services::{
    DiscoveryOrchestrator, IngestPipeline, ResolutionOrchestrator, WriteGate,
};
use scopegate_test_utils::fixtures::{
    csms_copper_bulletin, copper_quote, discovery_csms_json, reader_unknown_json,
    reader_yes_json, validator_fail_json, validator_ok_json, StaticConnector,
};
use scopegate_test_utils::{MemoryStore, ScriptedInference};
use scopegate_types::assertion::Material;
use scopegate_types::audit::LayerServed;
use scopegate_types::config::EngineConfig;
use scopegate_types::document::{SourceKind, Tier};
use scopegate_types::error::ResolveError;
use scopegate_types::hts::HtsCode;
use scopegate_types::program::ProgramId;
use std::sync::Arc;

const DIM: usize = 16;

struct Harness {
    store: Arc<MemoryStore>,
    runtime: Arc<ScriptedInference>,
    ingest: Arc<IngestPipeline>,
    resolver: ResolutionOrchestrator,
}

fn harness(responses: Vec<String>, connector: Option<Arc<StaticConnector>>) -> Harness {
    let mut config = EngineConfig::default();
    config.force_refresh.per_operator_per_hour = 1;

    let store = Arc::new(MemoryStore::new());
    let index = Arc::new(HybridIndex::new(config.retrieval.alpha_ten_thousandths).with_dimension(DIM));
    let runtime = Arc::new(ScriptedInference::new(responses, DIM));

    let ingest = Arc::new(IngestPipeline::new(
        store.clone(),
        index.clone(),
        Some(runtime.clone()),
    ));
    let discovery = connector.map(|c| {
        Arc::new(DiscoveryOrchestrator::new(
            DiscoveryAgent::new(runtime.clone(), config.agents.clone()),
            vec![c as Arc<dyn scopegate_api::connector::TrustedConnector>],
            ingest.clone(),
            config.discovery.clone(),
        ))
    });
    let gate = WriteGate::new(
        store.clone(),
        store.clone(),
        store.clone(),
        config.retrieval.hts_window_chars,
    );
    let resolver = ResolutionOrchestrator::new(
        store.clone(),
        index,
        runtime.clone(),
        ReaderAgent::new(runtime.clone(), config.agents.clone()),
        ValidatorAgent::new(runtime.clone(), config.agents.clone()),
        gate,
        discovery,
        store.clone(),
        store.clone(),
        config,
    );
    Harness {
        store,
        runtime,
        ingest,
        resolver,
    }
}

fn copper_request() -> ResolveRequest {
    ResolveRequest::new(
        ProgramId::section_232_copper(),
        HtsCode::parse("8544.42.9090").unwrap(),
        Some(Material::Copper),
    )
}

#[tokio::test]
async fn l2_promotes_and_second_call_is_an_l1_hit() {
    let doc = csms_copper_bulletin();
    let h = harness(
        vec![
            reader_yes_json(
                &doc,
                0,
                copper_quote(),
                "section_232_copper",
                "8544.42.9090",
                "9903.78.01",
            ),
            validator_ok_json(),
        ],
        None,
    );
    h.ingest.ingest(doc, None).await.unwrap();

    let first = h.resolver.resolve(&copper_request()).await.unwrap();
    match first {
        Resolution::Known { assertion, layer } => {
            assert_eq!(layer, LayerServed::L2);
            assert!(assertion.states_in_scope());
            assert_eq!(assertion.claim_code.clone().unwrap().as_str(), "9903.78.01");
            assert!(assertion.is_current());
            // Stored transcripts carry canonical-JSON fingerprints.
            assert_eq!(assertion.transcripts.reader_fingerprint.len(), 64);
            assert_eq!(assertion.transcripts.validator_fingerprint.len(), 64);
        }
        other => panic!("expected Known, got {other:?}"),
    }
    assert_eq!(h.store.assertion_rows(), 1);

    // The script is exhausted: an LLM call now would error, so a Known
    // answer proves the second call never left L1.
    let second = h.resolver.resolve(&copper_request()).await.unwrap();
    match second {
        Resolution::Known { layer, .. } => assert_eq!(layer, LayerServed::L1),
        other => panic!("expected L1 hit, got {other:?}"),
    }
}

#[tokio::test]
async fn paraphrased_quote_is_rejected_not_repaired() {
    let doc = csms_copper_bulletin();
    let paraphrase = "copper derivative products like 8544.42.9090 cabling fall in scope";
    let h = harness(
        vec![
            reader_yes_json(
                &doc,
                0,
                paraphrase,
                "section_232_copper",
                "8544.42.9090",
                "9903.78.01",
            ),
            validator_ok_json(),
        ],
        None,
    );
    h.ingest.ingest(doc, None).await.unwrap();

    let outcome = h.resolver.resolve(&copper_request()).await.unwrap();
    match outcome {
        Resolution::Unknown {
            reason: UnknownReason::GateRejected { reason_codes },
        } => {
            assert!(reason_codes.contains(&"QUOTE_NOT_SUBSTRING".to_string()));
        }
        other => panic!("expected gate rejection, got {other:?}"),
    }

    // The rejection is in the review queue with both transcripts; nothing
    // reached the truth store.
    let pending = h.store.list(true).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert!(!pending[0].transcripts.reader_output.is_empty());
    assert!(!pending[0].transcripts.validator_output.is_empty());
    assert_eq!(pending[0].transcripts.reader_fingerprint.len(), 64);
    assert_eq!(h.store.assertion_rows(), 0);
}

#[tokio::test]
async fn validator_refusal_blocks_promotion() {
    let doc = csms_copper_bulletin();
    let h = harness(
        vec![
            reader_yes_json(
                &doc,
                0,
                copper_quote(),
                "section_232_copper",
                "8544.42.9090",
                "9903.78.01",
            ),
            validator_fail_json(0, "quote does not mention the program"),
        ],
        None,
    );
    h.ingest.ingest(doc, None).await.unwrap();

    let outcome = h.resolver.resolve(&copper_request()).await.unwrap();
    match outcome {
        Resolution::Unknown {
            reason: UnknownReason::GateRejected { reason_codes },
        } => assert!(reason_codes.contains(&"VALIDATOR_FAILED".to_string())),
        other => panic!("expected gate rejection, got {other:?}"),
    }
    assert_eq!(h.store.assertion_rows(), 0);
}

#[tokio::test]
async fn inconclusive_chunks_return_unknown_without_discovery() {
    let doc = csms_copper_bulletin();
    // Two rounds of the same script: the repeated call must behave
    // identically instead of escalating.
    let unknown = reader_unknown_json("section_232_copper", "8544.42.9090");
    let h = harness(vec![unknown.clone(), unknown], None);
    h.ingest.ingest(doc, None).await.unwrap();

    for _ in 0..2 {
        let outcome = h.resolver.resolve(&copper_request()).await.unwrap();
        match outcome {
            Resolution::Unknown {
                reason: UnknownReason::ChunksInconclusive,
            } => {}
            other => panic!("expected inconclusive, got {other:?}"),
        }
    }
    // No ingest storm and no writes: repeated unprovable queries are calm.
    assert_eq!(h.store.assertion_rows(), 0);
}

#[tokio::test]
async fn discovery_bootstraps_an_empty_corpus() {
    let doc = csms_copper_bulletin();
    let connector = Arc::new(StaticConnector::new(SourceKind::CsmsBulletin, Tier::A));
    connector.insert("65936570", doc.clone());

    let h = harness(
        vec![
            discovery_csms_json("65936570"),
            reader_yes_json(
                &doc,
                0,
                copper_quote(),
                "section_232_copper",
                "8544.42.9090",
                "9903.78.01",
            ),
            validator_ok_json(),
        ],
        Some(connector),
    );

    let first = h.resolver.resolve(&copper_request()).await.unwrap();
    match first {
        Resolution::Known { layer, assertion } => {
            assert_eq!(layer, LayerServed::L3);
            assert!(assertion.states_in_scope());
        }
        other => panic!("expected discovery-assisted Known, got {other:?}"),
    }

    // Second resolve is an L1 hit; the exhausted script would fail any
    // further LLM call.
    let second = h.resolver.resolve(&copper_request()).await.unwrap();
    assert!(matches!(
        second,
        Resolution::Known {
            layer: LayerServed::L1,
            ..
        }
    ));
}

#[tokio::test]
async fn nonconforming_reader_exhausts_into_review_not_error() {
    let doc = csms_copper_bulletin();
    // Default config allows 2 retries: three prose responses exhaust them.
    let h = harness(
        vec![
            "it looks in scope to me".into(),
            "probably in scope".into(),
            "definitely".into(),
        ],
        None,
    );
    h.ingest.ingest(doc, None).await.unwrap();

    let outcome = h.resolver.resolve(&copper_request()).await.unwrap();
    match outcome {
        Resolution::Unknown {
            reason: UnknownReason::GateRejected { reason_codes },
        } => assert_eq!(reason_codes, vec!["SCHEMA_VIOLATION".to_string()]),
        other => panic!("expected schema-violation Unknown, got {other:?}"),
    }
    let pending = h.store.list(true).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(h.store.assertion_rows(), 0);
}

#[tokio::test]
async fn empty_corpus_without_discovery_is_no_evidence() {
    let h = harness(vec![], None);
    let outcome = h.resolver.resolve(&copper_request()).await.unwrap();
    assert!(matches!(
        outcome,
        Resolution::Unknown {
            reason: UnknownReason::NoEvidence
        }
    ));
}

#[tokio::test]
async fn force_reproof_confirms_without_duplicating_rows() {
    let doc = csms_copper_bulletin();
    let reader_json = reader_yes_json(
        &doc,
        0,
        copper_quote(),
        "section_232_copper",
        "8544.42.9090",
        "9903.78.01",
    );
    let h = harness(vec![reader_json.clone(), validator_ok_json()], None);
    h.ingest.ingest(doc, None).await.unwrap();

    h.resolver.resolve(&copper_request()).await.unwrap();
    assert_eq!(h.store.assertion_rows(), 1);

    // Force skips L1 and re-runs L2; identical evidence confirms the
    // standing row instead of writing a duplicate.
    h.runtime.push(reader_json);
    h.runtime.push(validator_ok_json());
    let mut request = copper_request();
    request.force = true;
    request.operator = Some("ops-7".into());
    let outcome = h.resolver.resolve(&request).await.unwrap();
    assert!(matches!(outcome, Resolution::Known { .. }));
    assert_eq!(h.store.assertion_rows(), 1);

    // The per-operator force budget is 1 in this harness; the next force
    // call is rate limited before any LLM work.
    let err = h.resolver.resolve(&request).await.unwrap_err();
    assert!(matches!(err, ResolveError::RateLimited(op) if op == "ops-7"));
}

#[tokio::test]
async fn ten_digit_query_hits_eight_digit_fact_at_l1() {
    // Prove the 8-digit fact first, then query the 10-digit child.
    let steel_doc = scopegate_test_utils::fixtures::document_from_text(
        SourceKind::CsmsBulletin,
        Tier::A,
        "CSMS #64018403",
        "https://content.govdelivery.com/accounts/USDHSCBP/bulletins/64018403",
        chrono::NaiveDate::from_ymd_opt(2025, 6, 23).unwrap(),
        "GUIDANCE: Section 232 Steel Derivatives.\n\nEffective June 23, 2025, \
         derivative steel articles classified under subheading 9403.99.90 are \
         within the scope of the Section 232 steel action; report claim code \
         9903.81.91 for the steel content.",
    );
    let h = harness(
        vec![
            reader_yes_json(
                &steel_doc,
                0,
                "derivative steel articles classified under subheading 9403.99.90 are \
                 within the scope of the Section 232 steel action",
                "section_232_steel",
                "9403.99.90",
                "9903.81.91",
            ),
            validator_ok_json(),
        ],
        None,
    );
    h.ingest.ingest(steel_doc, None).await.unwrap();

    let eight = ResolveRequest::new(
        ProgramId::section_232_steel(),
        HtsCode::parse("9403.99.90").unwrap(),
        Some(Material::Steel),
    );
    assert!(matches!(
        h.resolver.resolve(&eight).await.unwrap(),
        Resolution::Known { .. }
    ));

    let ten = ResolveRequest::new(
        ProgramId::section_232_steel(),
        HtsCode::parse("9403.99.9045").unwrap(),
        Some(Material::Steel),
    );
    match h.resolver.resolve(&ten).await.unwrap() {
        Resolution::Known { layer, assertion } => {
            assert_eq!(layer, LayerServed::L1);
            assert_eq!(assertion.key.hts.digits(), "94039990");
        }
        other => panic!("expected prefix L1 hit, got {other:?}"),
    }
}
