// Path: crates/stacking/src/planner.rs

//! Entry-slice planning.
//!
//! One metal slice per in-scope material with declared value, a residual
//! slice for whatever remains, or a single full slice when no metal is in
//! scope. Slice values always sum to the product value exactly; quantities
//! are duplicated across slices, never divided.

use crate::types::StackingInput;
use scopegate_types::assertion::Material;
use scopegate_types::error::InputError;
use scopegate_types::money::Cents;
use scopegate_types::program::SliceKind;
use std::collections::BTreeSet;

/// One planned slice, before stack construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSlice {
    /// What the slice is.
    pub kind: SliceKind,
    /// The slice value.
    pub value: Cents,
}

impl PlannedSlice {
    /// The material this slice claims, if any.
    pub fn claimed_material(&self) -> Option<Material> {
        self.kind.material()
    }
}

/// Plans the slices for a validated input given the set of materials the
/// resolver proved in scope.
pub fn plan_slices(
    input: &StackingInput,
    in_scope: &BTreeSet<Material>,
) -> Result<Vec<PlannedSlice>, InputError> {
    input.validate()?;

    let mut slices = Vec::new();
    let mut claimed_total = Cents::ZERO;
    // Material order is fixed (copper, steel, aluminum) so planning is
    // deterministic regardless of map iteration details upstream.
    for material in [Material::Copper, Material::Steel, Material::Aluminum] {
        if !in_scope.contains(&material) {
            continue;
        }
        let Some(value) = input.material_values.get(&material).copied() else {
            continue;
        };
        if !value.is_positive() {
            continue;
        }
        claimed_total += value;
        slices.push(PlannedSlice {
            kind: SliceKind::for_material(material),
            value,
        });
    }

    if slices.is_empty() {
        // No claimed metal: the whole line is one full slice.
        return Ok(vec![PlannedSlice {
            kind: SliceKind::Full,
            value: input.product_value,
        }]);
    }

    let residual = input
        .product_value
        .checked_sub_to_zero(claimed_total)
        .ok_or_else(|| {
            InputError::InvalidAllocation(format!(
                "claimed metal {} exceeds product value {}",
                claimed_total, input.product_value
            ))
        })?;
    if residual.is_positive() {
        slices.push(PlannedSlice {
            kind: SliceKind::Residual,
            value: residual,
        });
    }

    Ok(slices)
}

/// The value remaining after claimed metals, the IEEPA-reciprocal base.
/// Each claimed material is deducted exactly once.
pub fn remaining_value(input: &StackingInput, slices: &[PlannedSlice]) -> Cents {
    let claimed: Cents = slices
        .iter()
        .filter(|s| s.claimed_material().is_some())
        .map(|s| s.value)
        .sum();
    input
        .product_value
        .checked_sub_to_zero(claimed)
        .unwrap_or(Cents::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use scopegate_types::country::CountryCode;
    use scopegate_types::hts::HtsCode;

    fn input(product: i64, materials: &[(Material, i64)]) -> StackingInput {
        StackingInput {
            hts: HtsCode::parse("8544.42.9090").unwrap(),
            origin_country: CountryCode::new("CN").unwrap(),
            product_value: Cents(product),
            material_values: materials.iter().map(|(m, v)| (*m, Cents(*v))).collect(),
            quantity: 3,
            as_of: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
        }
    }

    fn scope(materials: &[Material]) -> BTreeSet<Material> {
        materials.iter().copied().collect()
    }

    #[test]
    fn values_conserve_exactly() {
        let input = input(
            1_000_000,
            &[
                (Material::Copper, 300_000),
                (Material::Steel, 100_000),
                (Material::Aluminum, 100_000),
            ],
        );
        let slices = plan_slices(
            &input,
            &scope(&[Material::Copper, Material::Steel, Material::Aluminum]),
        )
        .unwrap();
        assert_eq!(slices.len(), 4);
        let total: Cents = slices.iter().map(|s| s.value).sum();
        assert_eq!(total, input.product_value);
        assert_eq!(remaining_value(&input, &slices), Cents(500_000));
    }

    #[test]
    fn out_of_scope_material_value_stays_residual() {
        let input = input(3_600, &[(Material::Copper, 1_800), (Material::Aluminum, 1_800)]);
        // Only aluminum proved in scope; copper's declared value is not
        // claimed and remains part of the residual.
        let slices = plan_slices(&input, &scope(&[Material::Aluminum])).unwrap();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].kind, SliceKind::AluminumSlice);
        assert_eq!(slices[0].value, Cents(1_800));
        assert_eq!(slices[1].kind, SliceKind::Residual);
        assert_eq!(slices[1].value, Cents(1_800));
    }

    #[test]
    fn single_material_at_full_value_leaves_no_residual() {
        let input = input(1_800, &[(Material::Copper, 1_800)]);
        let slices = plan_slices(&input, &scope(&[Material::Copper])).unwrap();
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].kind, SliceKind::CopperSlice);
        assert_eq!(slices[0].value, Cents(1_800));
        assert_eq!(remaining_value(&input, &slices), Cents::ZERO);
    }

    #[test]
    fn no_scope_yields_one_full_slice() {
        let input = input(17_400, &[]);
        let slices = plan_slices(&input, &scope(&[])).unwrap();
        assert_eq!(
            slices,
            vec![PlannedSlice {
                kind: SliceKind::Full,
                value: Cents(17_400),
            }]
        );
    }

    #[test]
    fn zero_value_with_materials_is_rejected() {
        let input = input(0, &[(Material::Steel, 0)]);
        assert!(plan_slices(&input, &scope(&[Material::Steel])).is_err());
    }
}
