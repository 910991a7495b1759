// Path: crates/stacking/src/types.rs

//! Input and result types for the public stacking API.

use chrono::NaiveDate;
use scopegate_types::assertion::Material;
use scopegate_types::country::CountryCode;
use scopegate_types::error::InputError;
use scopegate_types::hts::HtsCode;
use scopegate_types::money::{Cents, FixedRate};
use scopegate_types::program::{ProgramId, SliceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One line item to stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackingInput {
    /// The line item's HTS code.
    pub hts: HtsCode,
    /// Country of origin (ISO-2).
    pub origin_country: CountryCode,
    /// Entered value of the line, integer cents.
    pub product_value: Cents,
    /// Declared metal content value by material, integer cents.
    pub material_values: BTreeMap<Material, Cents>,
    /// Line quantity; duplicated onto every slice, never divided.
    pub quantity: u32,
    /// The date the filing is effective.
    pub as_of: NaiveDate,
}

impl StackingInput {
    /// Validates money shape: no negative values, materials must not
    /// exceed the product value, and a zero-value line cannot carry
    /// declared metal content.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.product_value.amount() < 0 {
            return Err(InputError::InvalidAllocation(
                "product value is negative".into(),
            ));
        }
        let mut material_total = Cents::ZERO;
        for (material, value) in &self.material_values {
            if value.amount() < 0 {
                return Err(InputError::InvalidAllocation(format!(
                    "{} value is negative",
                    material
                )));
            }
            material_total += *value;
        }
        if !self.material_values.is_empty() && self.product_value.amount() == 0 {
            return Err(InputError::InvalidAllocation(
                "zero product value with declared material content".into(),
            ));
        }
        if material_total > self.product_value {
            return Err(InputError::InvalidAllocation(format!(
                "material values {} exceed product value {}",
                material_total, self.product_value
            )));
        }
        Ok(())
    }
}

/// One program's duty contribution on one slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramDuty {
    /// The charging program.
    pub program: ProgramId,
    /// The chapter-99 code the charge rides on, where one applies.
    pub code: Option<String>,
    /// The rate applied.
    pub rate: FixedRate,
    /// The base the rate was applied to.
    pub basis: Cents,
    /// The resulting duty.
    pub duty: Cents,
}

/// One entry slice with its stack and duties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySlice {
    /// What the slice is.
    pub kind: SliceKind,
    /// The slice's value, integer cents.
    pub value: Cents,
    /// The line quantity, duplicated across slices.
    pub quantity: u32,
    /// The chapter-99 stack in ACE filing order, base HTS last.
    pub stack: Vec<String>,
    /// Per-program duties charged on this slice.
    pub per_program_duties: Vec<ProgramDuty>,
}

impl EntrySlice {
    /// Total duty on this slice.
    pub fn duty(&self) -> Cents {
        self.per_program_duties.iter().map(|d| d.duty).sum()
    }
}

/// One flattened ACE filing line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingLine {
    /// The slice the line belongs to.
    pub slice: SliceKind,
    /// Position of the code within the slice's stack.
    pub position: u32,
    /// The code reported on the line.
    pub code: String,
}

/// The full stacking result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackingResult {
    /// The planned slices, in filing order.
    pub slices: Vec<EntrySlice>,
    /// Sum of all per-slice duties.
    pub total_duty: Cents,
    /// `total_duty / product_value` as a four-decimal rate.
    pub effective_rate: FixedRate,
}

impl StackingResult {
    /// The flattened filing-lines view for ACE submission.
    pub fn filing_lines(&self) -> Vec<FilingLine> {
        let mut lines = Vec::new();
        for slice in &self.slices {
            for (position, code) in slice.stack.iter().enumerate() {
                lines.push(FilingLine {
                    slice: slice.kind,
                    position: position as u32,
                    code: code.clone(),
                });
            }
        }
        lines
    }
}
