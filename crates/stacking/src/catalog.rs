// Path: crates/stacking/src/catalog.rs

//! The seeded program catalogue: the Section 232 metal actions, Section
//! 301, IEEPA Fentanyl, and IEEPA Reciprocal, with the chapter-99 codes
//! and fallback rates in filing sequence.
//!
//! The catalogue is configuration, not evidence. Rates here are fallbacks;
//! a `Rate` assertion in the truth store overrides them, which is how a
//! proclamation raising a metal rate flows through without code changes.

use scopegate_types::assertion::Material;
use scopegate_types::country::CountryCode;
use scopegate_types::money::FixedRate;
use scopegate_types::program::{
    AnnexIiList, Chapter99Code, CodeRule, DisclaimBehavior, OriginScope, ProgramCatalog,
    ProgramConfig, ProgramId, ProgramKind, ReciprocalVariant,
};
use std::collections::{BTreeMap, BTreeSet};

fn china_only() -> OriginScope {
    let mut set = BTreeSet::new();
    if let Ok(cn) = CountryCode::new("CN") {
        set.insert(cn);
    }
    OriginScope::Only(set)
}

/// Builds the standard catalogue.
///
/// Seed literals are static; the well-formedness test below guards the
/// fallible parses, so a typo fails the suite rather than the process.
pub fn seed_catalog() -> ProgramCatalog {
    build_catalog().unwrap_or_else(|| ProgramCatalog::new(Vec::new(), AnnexIiList::default()))
}

fn build_catalog() -> Option<ProgramCatalog> {
    let code = |raw: &str| Chapter99Code::parse(raw).ok();
    let programs = vec![
        ProgramConfig {
            id: ProgramId::section_301(),
            kind: ProgramKind::Section301,
            sequence: 1,
            material: None,
            disclaim_behavior: DisclaimBehavior::None,
            origins: china_only(),
            code_rules: vec![
                // Inclusion-table carve-outs file their own code.
                CodeRule {
                    hts_prefix: Some("84733051".into()),
                    code: code("9903.88.69")?,
                },
                CodeRule {
                    hts_prefix: None,
                    code: code("9903.88.01")?,
                },
            ],
            disclaim_code: None,
            variant_codes: BTreeMap::new(),
            fallback_rate: FixedRate::from_percent(25),
        },
        ProgramConfig {
            id: ProgramId::ieepa_fentanyl(),
            kind: ProgramKind::IeepaFentanyl,
            sequence: 2,
            material: None,
            disclaim_behavior: DisclaimBehavior::None,
            origins: china_only(),
            code_rules: vec![CodeRule {
                hts_prefix: None,
                code: code("9903.01.24")?,
            }],
            disclaim_code: None,
            variant_codes: BTreeMap::new(),
            fallback_rate: FixedRate::from_percent(10),
        },
        ProgramConfig {
            id: ProgramId::section_232_copper(),
            kind: ProgramKind::Section232,
            sequence: 3,
            material: Some(Material::Copper),
            // Copper is the one metal action that files a disclaim code on
            // non-claiming slices.
            disclaim_behavior: DisclaimBehavior::Required,
            origins: OriginScope::Any,
            code_rules: vec![CodeRule {
                hts_prefix: None,
                code: code("9903.78.01")?,
            }],
            disclaim_code: Some(code("9903.78.02")?),
            variant_codes: BTreeMap::new(),
            fallback_rate: FixedRate::from_percent(50),
        },
        ProgramConfig {
            id: ProgramId::section_232_steel(),
            kind: ProgramKind::Section232,
            sequence: 4,
            material: Some(Material::Steel),
            disclaim_behavior: DisclaimBehavior::Omit,
            origins: OriginScope::Any,
            code_rules: vec![
                // Derivative steel articles outside chapter 73 claim the
                // derivative code, not the primary one.
                CodeRule {
                    hts_prefix: Some("94".into()),
                    code: code("9903.81.91")?,
                },
                CodeRule {
                    hts_prefix: Some("85".into()),
                    code: code("9903.81.91")?,
                },
                CodeRule {
                    hts_prefix: None,
                    code: code("9903.81.87")?,
                },
            ],
            disclaim_code: None,
            variant_codes: BTreeMap::new(),
            fallback_rate: FixedRate::from_percent(50),
        },
        ProgramConfig {
            id: ProgramId::section_232_aluminum(),
            kind: ProgramKind::Section232,
            sequence: 5,
            material: Some(Material::Aluminum),
            disclaim_behavior: DisclaimBehavior::Omit,
            origins: OriginScope::Any,
            code_rules: vec![
                CodeRule {
                    hts_prefix: Some("76".into()),
                    code: code("9903.85.02")?,
                },
                CodeRule {
                    hts_prefix: None,
                    code: code("9903.85.08")?,
                },
            ],
            disclaim_code: None,
            variant_codes: BTreeMap::new(),
            fallback_rate: FixedRate::from_percent(25),
        },
        ProgramConfig {
            id: ProgramId::ieepa_reciprocal(),
            kind: ProgramKind::IeepaReciprocal,
            sequence: 6,
            material: None,
            disclaim_behavior: DisclaimBehavior::None,
            origins: OriginScope::Any,
            code_rules: vec![],
            disclaim_code: None,
            variant_codes: BTreeMap::from([
                (ReciprocalVariant::Taxable, code("9903.01.25")?),
                (ReciprocalVariant::AnnexIiExempt, code("9903.01.32")?),
                (ReciprocalVariant::MetalExempt, code("9903.01.33")?),
                (ReciprocalVariant::UsContentExempt, code("9903.01.34")?),
            ]),
            fallback_rate: FixedRate::from_percent(10),
        },
    ];

    let annex_ii = AnnexIiList::from_prefixes(
        ["8471", "84733051", "854232", "3004", "490199"]
            .into_iter()
            .map(String::from),
    );

    Some(ProgramCatalog::new(programs, annex_ii))
}
