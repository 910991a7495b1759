// Path: crates/types/src/program.rs

//! The tariff program catalogue: filing sequence, disclaim policy, and the
//! chapter-99 code tables.
//!
//! The catalogue is configuration, not evidence. It is the only place where
//! the mapping from verified facts to *filing* codes lives; the stacking
//! engine walks it in filing-sequence order.

use crate::assertion::Material;
use crate::country::CountryCode;
use crate::error::InputError;
use crate::hts::HtsCode;
use crate::money::FixedRate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of a tariff program, e.g. `section_232_steel`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramId(pub String);

impl ProgramId {
    /// Section 232 copper action.
    pub fn section_232_copper() -> Self {
        Self("section_232_copper".into())
    }
    /// Section 232 steel action.
    pub fn section_232_steel() -> Self {
        Self("section_232_steel".into())
    }
    /// Section 232 aluminum action.
    pub fn section_232_aluminum() -> Self {
        Self("section_232_aluminum".into())
    }
    /// Section 301 China action.
    pub fn section_301() -> Self {
        Self("section_301".into())
    }
    /// IEEPA fentanyl emergency action.
    pub fn ieepa_fentanyl() -> Self {
        Self("ieepa_fentanyl".into())
    }
    /// IEEPA reciprocal action.
    pub fn ieepa_reciprocal() -> Self {
        Self("ieepa_reciprocal".into())
    }

    /// The raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The statutory family a program belongs to. Drives duty math and slice
/// disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramKind {
    /// A Section-232 metal action (copper, steel, aluminum).
    Section232,
    /// The Section-301 China action.
    Section301,
    /// The IEEPA fentanyl emergency action.
    IeepaFentanyl,
    /// The IEEPA reciprocal action with its variant codes.
    IeepaReciprocal,
}

/// Filing policy for slices where a program's material is in scope but the
/// slice is not that program's metal slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisclaimBehavior {
    /// File the disclaim code on every non-claiming slice (copper).
    Required,
    /// File nothing on non-claiming slices (steel, aluminum).
    Omit,
    /// Not applicable (non-232 programs).
    None,
}

/// The filing action a chapter-99 code encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chapter99Action {
    /// Claim a metal slice as subject.
    Claim,
    /// Disclaim a non-metal slice.
    Disclaim,
    /// Apply a country program to a slice.
    Apply,
    /// An exemption variant contributing zero duty.
    Exempt,
    /// The taxable reciprocal variant.
    Paid,
}

/// IEEPA Reciprocal variant codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReciprocalVariant {
    /// The paid (taxable) variant.
    Taxable,
    /// Exempt because the HTS appears in the Annex II exclusion list.
    AnnexIiExempt,
    /// Exempt because of qualifying US content.
    UsContentExempt,
    /// Exempt on a slice claimed under a Section-232 metal action.
    MetalExempt,
}

impl ReciprocalVariant {
    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReciprocalVariant::Taxable => "taxable",
            ReciprocalVariant::AnnexIiExempt => "annex_ii_exempt",
            ReciprocalVariant::UsContentExempt => "us_content_exempt",
            ReciprocalVariant::MetalExempt => "metal_exempt",
        }
    }
}

impl fmt::Display for ReciprocalVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of entry slice a stack is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceKind {
    /// The whole line item, when no metal is in scope.
    Full,
    /// The value remaining after claimed-metal slices.
    Residual,
    /// The claimed copper value.
    CopperSlice,
    /// The claimed steel value.
    SteelSlice,
    /// The claimed aluminum value.
    AluminumSlice,
}

impl SliceKind {
    /// The metal slice kind for a material.
    pub fn for_material(material: Material) -> Self {
        match material {
            Material::Copper => SliceKind::CopperSlice,
            Material::Steel => SliceKind::SteelSlice,
            Material::Aluminum => SliceKind::AluminumSlice,
        }
    }

    /// The material this slice claims, if it is a metal slice.
    pub fn material(&self) -> Option<Material> {
        match self {
            SliceKind::CopperSlice => Some(Material::Copper),
            SliceKind::SteelSlice => Some(Material::Steel),
            SliceKind::AluminumSlice => Some(Material::Aluminum),
            SliceKind::Full | SliceKind::Residual => None,
        }
    }

    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SliceKind::Full => "full",
            SliceKind::Residual => "residual",
            SliceKind::CopperSlice => "copper_slice",
            SliceKind::SteelSlice => "steel_slice",
            SliceKind::AluminumSlice => "aluminum_slice",
        }
    }
}

impl fmt::Display for SliceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated chapter-99 sub-code in `9903.xx.yy` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Chapter99Code(String);

impl Chapter99Code {
    /// Parses and validates the `9903.xx.yy` form.
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let parts: Vec<&str> = raw.split('.').collect();
        let valid = parts.len() == 3
            && parts[0] == "9903"
            && parts[1].len() == 2
            && parts[2].len() == 2
            && parts[1..].iter().all(|p| p.chars().all(|c| c.is_ascii_digit()));
        if !valid {
            return Err(InputError::InvalidChapter99(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// The dotted code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Chapter99Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Chapter99Code {
    type Error = InputError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Chapter99Code> for String {
    fn from(value: Chapter99Code) -> Self {
        value.0
    }
}

/// One row of an HTS-conditional code table. Codes can be HTS-specific
/// (primary vs. derivative steel); the first matching prefix wins, and a row
/// with no prefix is the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRule {
    /// Digits-only HTS prefix the rule applies to; `None` matches anything.
    pub hts_prefix: Option<String>,
    /// The code the rule emits.
    pub code: Chapter99Code,
}

/// Which origin countries a program applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OriginScope {
    /// Applies regardless of origin.
    Any,
    /// Applies only to the listed origins.
    Only(BTreeSet<CountryCode>),
}

impl OriginScope {
    /// Whether the program applies to goods of `origin`.
    pub fn applies_to(&self, origin: CountryCode) -> bool {
        match self {
            OriginScope::Any => true,
            OriginScope::Only(set) => set.contains(&origin),
        }
    }
}

/// Static configuration for one tariff program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramConfig {
    /// The program identifier.
    pub id: ProgramId,
    /// Statutory family.
    pub kind: ProgramKind,
    /// Position in the ACE filing sequence; lower files first.
    pub sequence: u32,
    /// The metal, for Section-232 programs.
    pub material: Option<Material>,
    /// Filing policy for unclaimed scope.
    pub disclaim_behavior: DisclaimBehavior,
    /// Origin applicability.
    pub origins: OriginScope,
    /// Claim (232) or apply (301/fentanyl) codes, HTS-conditional.
    pub code_rules: Vec<CodeRule>,
    /// The disclaim code, for programs with `DisclaimBehavior::Required`.
    pub disclaim_code: Option<Chapter99Code>,
    /// Variant codes, for IEEPA Reciprocal.
    pub variant_codes: BTreeMap<ReciprocalVariant, Chapter99Code>,
    /// The rate used when no `Rate` assertion overrides it.
    pub fallback_rate: FixedRate,
}

impl ProgramConfig {
    /// Resolves the claim/apply code for an HTS: first matching prefix rule
    /// wins, then the default row.
    pub fn code_for(&self, hts: &HtsCode) -> Option<&Chapter99Code> {
        self.code_rules
            .iter()
            .find(|r| {
                r.hts_prefix
                    .as_deref()
                    .is_some_and(|p| hts.digits().starts_with(p))
            })
            .or_else(|| self.code_rules.iter().find(|r| r.hts_prefix.is_none()))
            .map(|r| &r.code)
    }

    /// The variant code for an IEEPA Reciprocal disposition.
    pub fn variant_code(&self, variant: ReciprocalVariant) -> Option<&Chapter99Code> {
        self.variant_codes.get(&variant)
    }
}

/// The Annex II exclusion list, matched by HTS prefix at 10, 8, 6, then 4
/// digits; the first hit wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnexIiList {
    /// Digits-only prefixes, each 4, 6, 8 or 10 digits long.
    pub prefixes: BTreeSet<String>,
}

impl AnnexIiList {
    /// Builds a list from digit-string prefixes.
    pub fn from_prefixes<I: IntoIterator<Item = String>>(prefixes: I) -> Self {
        Self {
            prefixes: prefixes.into_iter().collect(),
        }
    }

    /// Returns the matched prefix for an HTS, trying 10/8/6/4 in order.
    pub fn matched_prefix(&self, hts: &HtsCode) -> Option<&str> {
        for len in [10usize, 8, 6, 4] {
            if len > hts.digit_count() {
                continue;
            }
            if let Some(p) = self.prefixes.get(hts.prefix(len)) {
                return Some(p.as_str());
            }
        }
        None
    }

    /// Whether the HTS is excluded under Annex II.
    pub fn contains(&self, hts: &HtsCode) -> bool {
        self.matched_prefix(hts).is_some()
    }
}

/// The full program catalogue the stacking engine walks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramCatalog {
    programs: Vec<ProgramConfig>,
    /// Annex II exclusions for the reciprocal program.
    pub annex_ii: AnnexIiList,
    /// Tie-break order when multiple reciprocal exemption variants could
    /// apply. Conventional order, per the catalogue seed; conflicts are
    /// surfaced to the review queue rather than silently resolved.
    pub reciprocal_variant_priority: Vec<ReciprocalVariant>,
}

impl ProgramCatalog {
    /// Builds a catalogue, sorting programs into filing sequence.
    pub fn new(mut programs: Vec<ProgramConfig>, annex_ii: AnnexIiList) -> Self {
        programs.sort_by_key(|p| p.sequence);
        Self {
            programs,
            annex_ii,
            reciprocal_variant_priority: vec![
                ReciprocalVariant::AnnexIiExempt,
                ReciprocalVariant::UsContentExempt,
                ReciprocalVariant::MetalExempt,
            ],
        }
    }

    /// All programs in filing-sequence order.
    pub fn in_filing_order(&self) -> &[ProgramConfig] {
        &self.programs
    }

    /// Looks up one program by id.
    pub fn get(&self, id: &ProgramId) -> Option<&ProgramConfig> {
        self.programs.iter().find(|p| &p.id == id)
    }

    /// The Section-232 programs, in filing order.
    pub fn section_232(&self) -> impl Iterator<Item = &ProgramConfig> {
        self.programs
            .iter()
            .filter(|p| p.kind == ProgramKind::Section232)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter99_format_is_validated() {
        assert!(Chapter99Code::parse("9903.88.01").is_ok());
        assert!(Chapter99Code::parse("9902.88.01").is_err());
        assert!(Chapter99Code::parse("9903.8.01").is_err());
        assert!(Chapter99Code::parse("9903.88.0a").is_err());
        assert!(Chapter99Code::parse("99038801").is_err());
    }

    #[test]
    fn hts_specific_code_rule_beats_default() {
        let cfg = ProgramConfig {
            id: ProgramId::section_232_steel(),
            kind: ProgramKind::Section232,
            sequence: 2,
            material: Some(Material::Steel),
            disclaim_behavior: DisclaimBehavior::Omit,
            origins: OriginScope::Any,
            code_rules: vec![
                CodeRule {
                    // Derivative steel articles of chapter 94.
                    hts_prefix: Some("9403".into()),
                    code: Chapter99Code::parse("9903.81.91").unwrap(),
                },
                CodeRule {
                    hts_prefix: None,
                    code: Chapter99Code::parse("9903.81.87").unwrap(),
                },
            ],
            disclaim_code: None,
            variant_codes: BTreeMap::new(),
            fallback_rate: FixedRate::from_percent(50),
        };
        let derivative = HtsCode::parse("9403.99.9045").unwrap();
        let primary = HtsCode::parse("7208.10.1500").unwrap();
        assert_eq!(cfg.code_for(&derivative).unwrap().as_str(), "9903.81.91");
        assert_eq!(cfg.code_for(&primary).unwrap().as_str(), "9903.81.87");
    }

    #[test]
    fn annex_ii_prefix_match_prefers_longest() {
        let list = AnnexIiList::from_prefixes(vec!["8473305100".into(), "847330".into(), "8471".into()]);
        // 10-digit hit wins over the 6-digit entry.
        let exact = HtsCode::parse("8473.30.5100").unwrap();
        assert_eq!(list.matched_prefix(&exact), Some("8473305100"));
        // Sibling code only matches the 6-digit entry.
        let sibling = HtsCode::parse("8473.30.9100").unwrap();
        assert_eq!(list.matched_prefix(&sibling), Some("847330"));
        // 4-digit fallback.
        let cousin = HtsCode::parse("8471.30.0100").unwrap();
        assert_eq!(list.matched_prefix(&cousin), Some("8471"));
        // No hit at any length.
        let other = HtsCode::parse("8536.90.8585").unwrap();
        assert!(!list.contains(&other));
    }

    #[test]
    fn catalog_sorts_into_filing_order() {
        let mk = |id: ProgramId, seq: u32| ProgramConfig {
            id,
            kind: ProgramKind::Section301,
            sequence: seq,
            material: None,
            disclaim_behavior: DisclaimBehavior::None,
            origins: OriginScope::Any,
            code_rules: vec![],
            disclaim_code: None,
            variant_codes: BTreeMap::new(),
            fallback_rate: FixedRate::ZERO,
        };
        let catalog = ProgramCatalog::new(
            vec![
                mk(ProgramId::ieepa_reciprocal(), 6),
                mk(ProgramId::section_232_copper(), 1),
                mk(ProgramId::section_301(), 4),
            ],
            AnnexIiList::default(),
        );
        let order: Vec<&str> = catalog
            .in_filing_order()
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(
            order,
            vec!["section_232_copper", "section_301", "ieepa_reciprocal"]
        );
    }
}
