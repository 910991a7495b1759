// Path: crates/types/src/hts.rs

//! HTS code canonicalization.
//!
//! The engine accepts HTS codes in the shapes seen in the wild (dotted
//! 10-digit, dotted 8-digit, undotted) and keys every lookup on a
//! digits-only canonical form. An 8-digit assertion covers all 10-digit
//! statistical suffixes under it; the reverse never holds.

use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A canonical HTS code: digits only, exactly 8 or 10 of them.
///
/// Serializes as the plain digit string so stored rows and agent payloads
/// stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HtsCode {
    digits: String,
}

impl HtsCode {
    /// Parses any commonly seen HTS shape into canonical form.
    ///
    /// Dots and whitespace are stripped; the remainder must be exactly 8 or
    /// 10 ASCII digits.
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let digits: String = raw.chars().filter(|c| !matches!(c, '.' | ' ')).collect();
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(InputError::InvalidHts(raw.to_string()));
        }
        match digits.len() {
            8 | 10 => Ok(Self { digits }),
            _ => Err(InputError::InvalidHts(raw.to_string())),
        }
    }

    /// The canonical digits-only form.
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// Number of digits in the original canonical form (8 or 10).
    pub fn digit_count(&self) -> usize {
        self.digits.len()
    }

    /// Whether this is a full 10-digit statistical code.
    pub fn is_ten_digit(&self) -> bool {
        self.digits.len() == 10
    }

    /// The dotted presentation form (`8544.42.9090` / `9403.99.90`).
    pub fn dotted(&self) -> String {
        let d = &self.digits;
        match d.len() {
            10 => format!("{}.{}.{}", &d[..4], &d[4..6], &d[6..]),
            _ => format!("{}.{}.{}", &d[..4], &d[4..6], &d[6..8]),
        }
    }

    /// The first `n` digits, for prefix matching. `n` is clamped to the
    /// available length.
    pub fn prefix(&self, n: usize) -> &str {
        let n = n.min(self.digits.len());
        &self.digits[..n]
    }

    /// Whether `self` (a stored assertion key) covers `query`.
    ///
    /// Exact digits match always covers. An 8-digit stored code covers a
    /// 10-digit query sharing its prefix; a 10-digit stored code never covers
    /// an 8-digit query.
    pub fn covers(&self, query: &HtsCode) -> bool {
        if self.digits == query.digits {
            return true;
        }
        self.digits.len() == 8 && query.digits.len() == 10 && query.digits.starts_with(&self.digits)
    }

    /// Both search spellings of this code: undotted and dotted.
    ///
    /// The corpus index treats the two as equivalent query terms because
    /// Federal Register text uses either form freely.
    pub fn search_terms(&self) -> [String; 2] {
        [self.digits.clone(), self.dotted()]
    }
}

impl fmt::Display for HtsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digits)
    }
}

impl TryFrom<String> for HtsCode {
    type Error = InputError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HtsCode> for String {
    fn from(value: HtsCode) -> Self {
        value.digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_and_undotted_shapes_are_identical() {
        let a = HtsCode::parse("8544.42.9090").unwrap();
        let b = HtsCode::parse("8544.42.90.90").unwrap();
        let c = HtsCode::parse("8544429090").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.digits(), "8544429090");
        assert_eq!(a.dotted(), "8544.42.9090");
    }

    #[test]
    fn eight_digit_form_round_trips() {
        let h = HtsCode::parse("9403.99.90").unwrap();
        assert_eq!(h.digits(), "94039990");
        assert_eq!(h.digit_count(), 8);
        assert_eq!(h.dotted(), "9403.99.90");
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!(HtsCode::parse("9403.99").is_err());
        assert!(HtsCode::parse("94039990456").is_err());
        assert!(HtsCode::parse("9403.99.90xx").is_err());
        assert!(HtsCode::parse("").is_err());
    }

    #[test]
    fn eight_digit_covers_ten_digit_but_not_reverse() {
        let stored8 = HtsCode::parse("85444290").unwrap();
        let query10 = HtsCode::parse("8544429090").unwrap();
        assert!(stored8.covers(&query10));
        assert!(!query10.covers(&stored8));
        assert!(stored8.covers(&stored8.clone()));

        let other10 = HtsCode::parse("8544421100").unwrap();
        assert!(!other10.covers(&query10));
    }
}
