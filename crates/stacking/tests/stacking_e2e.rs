// Path: crates/stacking/tests/stacking_e2e.rs

//! End-to-end stacking scenarios: slice planning, chapter-99 stacks, and
//! duty math over a static resolver and the seeded catalogue.

use chrono::{NaiveDate, Utc};
use scopegate_stacking::{seed_catalog, StackingEngine, StackingInput};
use scopegate_test_utils::fixtures::{in_scope_assertion, StaticResolver};
use scopegate_test_utils::MemoryStore;
use scopegate_api::store::{ReviewQueue, TruthStore};
use scopegate_types::assertion::{AssertionKind, Material};
use scopegate_types::audit::{AuditLogEntry, AuditOutcome, BlockReason, LayerServed, UsageRecord};
use scopegate_types::country::CountryCode;
use scopegate_types::error::{InputError, StackingError};
use scopegate_types::hts::HtsCode;
use scopegate_types::money::{Cents, FixedRate};
use scopegate_types::program::{ProgramId, SliceKind};
use std::collections::BTreeMap;
use std::sync::Arc;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn input(hts: &str, cents: i64, qty: u32, materials: &[(Material, i64)]) -> StackingInput {
    StackingInput {
        hts: HtsCode::parse(hts).unwrap(),
        origin_country: CountryCode::new("CN").unwrap(),
        product_value: Cents(cents),
        material_values: materials
            .iter()
            .map(|(m, v)| (*m, Cents(*v)))
            .collect::<BTreeMap<_, _>>(),
        quantity: qty,
        as_of: date(2025, 9, 15),
    }
}

struct Rig {
    resolver: Arc<StaticResolver>,
    store: Arc<MemoryStore>,
    engine: StackingEngine,
}

fn rig() -> Rig {
    let resolver = Arc::new(StaticResolver::new());
    let store = Arc::new(MemoryStore::new());
    let engine = StackingEngine::new(resolver.clone(), store.clone(), seed_catalog())
        .with_review(store.clone());
    Rig {
        resolver,
        store,
        engine,
    }
}

fn mark_in_scope(rig: &Rig, program: ProgramId, hts: &str, material: Material, claim: &str) {
    rig.resolver.insert(
        in_scope_assertion(program, hts, Some(material), Some(claim), date(2025, 8, 1)).unwrap(),
    );
}

#[tokio::test]
async fn steel_and_aluminum_claim_fifty_fifty() {
    // HTS 9403.99.9045, CN, $123.12, qty 6, steel $61.56 + aluminum $61.56.
    let rig = rig();
    mark_in_scope(
        &rig,
        ProgramId::section_232_steel(),
        "9403999045",
        Material::Steel,
        "9903.81.91",
    );
    mark_in_scope(
        &rig,
        ProgramId::section_232_aluminum(),
        "9403999045",
        Material::Aluminum,
        "9903.85.08",
    );

    let result = rig
        .engine
        .stack(&input(
            "9403.99.9045",
            12_312,
            6,
            &[(Material::Steel, 6_156), (Material::Aluminum, 6_156)],
        ))
        .await
        .unwrap();

    assert_eq!(result.slices.len(), 2);
    let steel = &result.slices[0];
    let aluminum = &result.slices[1];
    assert_eq!(steel.kind, SliceKind::SteelSlice);
    assert_eq!(aluminum.kind, SliceKind::AluminumSlice);
    assert!(result.slices.iter().all(|s| s.quantity == 6));

    // The derivative steel claim code, never the primary.
    assert!(steel.stack.contains(&"9903.81.91".to_string()));
    assert!(!steel.stack.contains(&"9903.81.87".to_string()));
    // Steel and aluminum are omit-disclaim: no cross-metal codes.
    assert!(!steel.stack.contains(&"9903.85.08".to_string()));
    assert!(!aluminum.stack.contains(&"9903.81.91".to_string()));
    // Copper is not in scope for this HTS: no copper codes anywhere.
    for slice in &result.slices {
        assert!(!slice.stack.iter().any(|c| c.starts_with("9903.78")));
        assert_eq!(slice.stack.last().unwrap(), "9403.99.9045");
        // Metal slices ride the reciprocal metal-exempt variant.
        assert!(slice.stack.contains(&"9903.01.33".to_string()));
    }

    let total: Cents = result.slices.iter().map(|s| s.value).sum();
    assert_eq!(total, Cents(12_312));
    // 301 $30.78 + fentanyl $12.31 + steel $30.78 + aluminum $15.39.
    assert_eq!(result.total_duty, Cents(8_926));
}

#[tokio::test]
async fn copper_disclaim_spills_onto_other_slices() {
    // HTS 8544.42.9090, CN, $36.00, copper $18.00 + aluminum $18.00.
    let rig = rig();
    mark_in_scope(
        &rig,
        ProgramId::section_232_copper(),
        "8544429090",
        Material::Copper,
        "9903.78.01",
    );
    mark_in_scope(
        &rig,
        ProgramId::section_232_aluminum(),
        "8544429090",
        Material::Aluminum,
        "9903.85.08",
    );

    let result = rig
        .engine
        .stack(&input(
            "8544.42.9090",
            3_600,
            3,
            &[(Material::Copper, 1_800), (Material::Aluminum, 1_800)],
        ))
        .await
        .unwrap();

    assert_eq!(result.slices.len(), 2);
    let copper = &result.slices[0];
    let aluminum = &result.slices[1];
    assert_eq!(copper.kind, SliceKind::CopperSlice);

    // Copper's disclaim is `required`: the aluminum slice carries it.
    assert!(aluminum.stack.contains(&"9903.78.02".to_string()));
    assert!(copper.stack.contains(&"9903.78.01".to_string()));
    // Aluminum is `omit`: the copper slice carries no aluminum code.
    assert!(!copper.stack.iter().any(|c| c.starts_with("9903.85")));

    // $9.00 + $3.60 + $9.00 + $4.50.
    assert_eq!(result.total_duty, Cents(2_610));
}

#[tokio::test]
async fn residual_only_no_scope() {
    // HTS 8536.90.8585, CN, $174.00, no materials.
    let rig = rig();
    let result = rig
        .engine
        .stack(&input("8536.90.8585", 17_400, 3, &[]))
        .await
        .unwrap();

    assert_eq!(result.slices.len(), 1);
    let full = &result.slices[0];
    assert_eq!(full.kind, SliceKind::Full);
    assert_eq!(
        full.stack,
        vec![
            "9903.88.01".to_string(),
            "9903.01.24".to_string(),
            "9903.01.25".to_string(),
            "8536.90.8585".to_string(),
        ]
    );

    let duty_for = |program: ProgramId| {
        full.per_program_duties
            .iter()
            .find(|d| d.program == program)
            .map(|d| d.duty)
            .unwrap()
    };
    assert_eq!(duty_for(ProgramId::section_301()), Cents(4_350));
    assert_eq!(duty_for(ProgramId::ieepa_fentanyl()), Cents(1_740));
    assert_eq!(duty_for(ProgramId::ieepa_reciprocal()), Cents(1_740));
    assert_eq!(result.total_duty, Cents(7_830));
}

#[tokio::test]
async fn ieepa_unstacking_deducts_each_material_once() {
    // HTS 8544.42.9090, CN, $10,000, copper 3000 / steel 1000 / aluminum 1000.
    let rig = rig();
    for (program, material, claim) in [
        (ProgramId::section_232_copper(), Material::Copper, "9903.78.01"),
        (ProgramId::section_232_steel(), Material::Steel, "9903.81.91"),
        (
            ProgramId::section_232_aluminum(),
            Material::Aluminum,
            "9903.85.08",
        ),
    ] {
        mark_in_scope(&rig, program, "8544429090", material, claim);
    }

    let result = rig
        .engine
        .stack(&input(
            "8544.42.9090",
            1_000_000,
            1,
            &[
                (Material::Copper, 300_000),
                (Material::Steel, 100_000),
                (Material::Aluminum, 100_000),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(result.slices.len(), 4);
    let residual = result
        .slices
        .iter()
        .find(|s| s.kind == SliceKind::Residual)
        .unwrap();
    assert_eq!(residual.value, Cents(500_000));

    // The reciprocal base is $5,000: each claimed metal deducted exactly
    // once. $500, not $1,000.
    let reciprocal = residual
        .per_program_duties
        .iter()
        .find(|d| d.program == ProgramId::ieepa_reciprocal())
        .unwrap();
    assert_eq!(reciprocal.basis, Cents(500_000));
    assert_eq!(reciprocal.duty, Cents(50_000));

    assert_eq!(result.total_duty, Cents(625_000));
    assert_eq!(result.effective_rate, FixedRate(6_250));
    assert_eq!(result.effective_rate.as_fraction_string(), "0.6250");

    // Conservation: slice values sum to the product value exactly.
    let total: Cents = result.slices.iter().map(|s| s.value).sum();
    assert_eq!(total, Cents(1_000_000));
}

#[tokio::test]
async fn annex_ii_exemption_wins_and_is_surfaced() {
    // HTS 8473.30.5100, CN, $842.40, qty 27, aluminum $126.36.
    let rig = rig();
    mark_in_scope(
        &rig,
        ProgramId::section_232_aluminum(),
        "8473305100",
        Material::Aluminum,
        "9903.85.08",
    );

    let result = rig
        .engine
        .stack(&input(
            "8473.30.5100",
            84_240,
            27,
            &[(Material::Aluminum, 12_636)],
        ))
        .await
        .unwrap();

    assert_eq!(result.slices.len(), 2);
    for slice in &result.slices {
        // Section 301 files the inclusion-table code for this HTS.
        assert!(slice.stack.contains(&"9903.88.69".to_string()));
        assert!(!slice.stack.contains(&"9903.88.01".to_string()));
        // Annex II exemption on every slice; nothing pays reciprocal.
        assert!(slice.stack.contains(&"9903.01.32".to_string()));
        assert!(!slice.stack.contains(&"9903.01.25".to_string()));
    }
    assert!(result
        .slices
        .iter()
        .all(|s| s
            .per_program_duties
            .iter()
            .all(|d| d.program != ProgramId::ieepa_reciprocal())));

    // $210.60 + $84.24 + $31.59.
    assert_eq!(result.total_duty, Cents(32_643));

    // The aluminum slice matched both annex-II and metal exemptions; the
    // tie-break is applied by priority and surfaced for review.
    let pending = rig.store.list(true).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert!(matches!(
        pending[0].reasons.first(),
        Some(BlockReason::VariantTieBreak { .. })
    ));
}

#[tokio::test]
async fn rate_assertion_overrides_catalog_fallback() {
    // A proclamation raising aluminum to 50% flows through as a Rate
    // assertion on the 8-digit parent; no code changes.
    let rig = rig();
    mark_in_scope(
        &rig,
        ProgramId::section_232_aluminum(),
        "8544429090",
        Material::Aluminum,
        "9903.85.08",
    );

    let mut rate_row = in_scope_assertion(
        ProgramId::section_232_aluminum(),
        "85444290",
        None,
        None,
        date(2025, 9, 1),
    )
    .unwrap();
    rate_row.key.kind = AssertionKind::Rate;
    rate_row.rate = Some(FixedRate::from_percent(50));
    let audit = AuditLogEntry {
        id: uuid::Uuid::new_v4(),
        created_at: Utc::now(),
        query: "section_232_aluminum/85444290/rate".into(),
        layer_served: LayerServed::L2,
        latency_ms: 0,
        model: None,
        usage: UsageRecord::default(),
        outcome: AuditOutcome::Known,
    };
    rig.store.promote(rate_row, audit).await.unwrap();

    let result = rig
        .engine
        .stack(&input(
            "8544.42.9090",
            10_000,
            1,
            &[(Material::Aluminum, 4_000)],
        ))
        .await
        .unwrap();

    let aluminum_duty = result
        .slices
        .iter()
        .flat_map(|s| &s.per_program_duties)
        .find(|d| d.program == ProgramId::section_232_aluminum())
        .unwrap();
    assert_eq!(aluminum_duty.rate, FixedRate::from_percent(50));
    assert_eq!(aluminum_duty.duty, Cents(2_000));
}

#[tokio::test]
async fn over_allocation_fails_with_no_partial_output() {
    let rig = rig();
    let err = rig
        .engine
        .stack(&input(
            "8544.42.9090",
            1_000,
            1,
            &[(Material::Copper, 900), (Material::Steel, 200)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StackingError::Input(InputError::InvalidAllocation(_))
    ));
}

#[tokio::test]
async fn filing_lines_flatten_in_stack_order() {
    let rig = rig();
    let result = rig
        .engine
        .stack(&input("8536.90.8585", 17_400, 3, &[]))
        .await
        .unwrap();

    let lines = result.filing_lines();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0].code, "9903.88.01");
    assert_eq!(lines[3].code, "8536.90.8585");
    assert!(lines.iter().enumerate().all(|(i, l)| l.position == i as u32));
}

#[tokio::test]
async fn non_us_origin_skips_china_programs() {
    let rig = rig();
    let mut german = input("8536.90.8585", 17_400, 3, &[]);
    german.origin_country = CountryCode::new("DE").unwrap();
    let result = rig.engine.stack(&german).await.unwrap();

    let full = &result.slices[0];
    assert!(!full.stack.contains(&"9903.88.01".to_string()));
    assert!(!full.stack.contains(&"9903.01.24".to_string()));
    // Reciprocal still applies regardless of origin.
    assert!(full.stack.contains(&"9903.01.25".to_string()));
    assert_eq!(result.total_duty, Cents(1_740));
}
