// Path: crates/types/src/money.rs

//! Integer-cent money and four-decimal fixed-point rates.
//!
//! The duty path never touches floating point. Rates are stored as integer
//! ten-thousandths (so 25% = 2500) and applied by widening integer
//! multiplication with round-half-up at the cent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// A monetary amount in integer US cents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(pub i64);

impl Cents {
    /// Zero cents.
    pub const ZERO: Cents = Cents(0);

    /// Builds an amount from whole dollars.
    pub fn from_dollars(dollars: i64) -> Self {
        Cents(dollars * 100)
    }

    /// The raw cent count.
    pub fn amount(&self) -> i64 {
        self.0
    }

    /// Whether the amount is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checked subtraction; `None` on underflow below zero.
    pub fn checked_sub_to_zero(&self, rhs: Cents) -> Option<Cents> {
        let v = self.0 - rhs.0;
        (v >= 0).then_some(Cents(v))
    }
}

impl Add for Cents {
    type Output = Cents;
    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Cents) {
        self.0 += rhs.0;
    }
}

impl Sub for Cents {
    type Output = Cents;
    fn sub(self, rhs: Cents) -> Cents {
        Cents(self.0 - rhs.0)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Cents {
        iter.fold(Cents::ZERO, Add::add)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// An ad-valorem rate in integer ten-thousandths (four decimal places).
///
/// `FixedRate(2500)` is 25.00%; `FixedRate(500)` is 5.00%.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FixedRate(pub u32);

impl FixedRate {
    /// The zero rate.
    pub const ZERO: FixedRate = FixedRate(0);

    /// Builds a rate from whole percent.
    pub fn from_percent(pct: u32) -> Self {
        FixedRate(pct * 100)
    }

    /// Builds a rate from basis points (hundredths of a percent).
    pub fn from_basis_points(bps: u32) -> Self {
        FixedRate(bps)
    }

    /// The raw ten-thousandths value.
    pub fn ten_thousandths(&self) -> u32 {
        self.0
    }

    /// Applies the rate to an amount, rounding half-up to the nearest cent.
    pub fn apply(&self, value: Cents) -> Cents {
        let wide = value.0 as i128 * self.0 as i128;
        let denom: i128 = 10_000;
        // Round half away from zero; duty bases are non-negative in practice.
        let rounded = if wide >= 0 {
            (wide + denom / 2) / denom
        } else {
            (wide - denom / 2) / denom
        };
        Cents(rounded as i64)
    }

    /// Renders as a four-decimal fraction, e.g. `0.2500`.
    pub fn as_fraction_string(&self) -> String {
        format!("{}.{:04}", self.0 / 10_000, self.0 % 10_000)
    }
}

impl fmt::Display for FixedRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

/// Computes `numerator / denominator` as a four-decimal effective rate,
/// rounding half-up. Used to report `total_duty / product_value`.
pub fn effective_rate(numerator: Cents, denominator: Cents) -> FixedRate {
    if denominator.0 <= 0 {
        return FixedRate::ZERO;
    }
    let wide = numerator.0 as i128 * 10_000;
    let rounded = (wide + denominator.0 as i128 / 2) / denominator.0 as i128;
    FixedRate(rounded.max(0) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_application_rounds_half_up() {
        // 25% of $174.00 = $43.50 exactly.
        assert_eq!(
            FixedRate::from_percent(25).apply(Cents::from_dollars(174)),
            Cents(4350)
        );
        // 7.5% of $0.01 = 0.075 cents, rounds to 0.
        assert_eq!(FixedRate(750).apply(Cents(1)), Cents(0));
        // 50% of 3 cents = 1.5 cents, rounds up to 2.
        assert_eq!(FixedRate::from_percent(50).apply(Cents(3)), Cents(2));
    }

    #[test]
    fn effective_rate_reports_four_decimals() {
        // $6,250 duty on $10,000 value = 0.6250.
        let r = effective_rate(Cents::from_dollars(6250), Cents::from_dollars(10_000));
        assert_eq!(r, FixedRate(6250));
        assert_eq!(r.as_fraction_string(), "0.6250");
    }

    #[test]
    fn cents_display_and_sum() {
        let total: Cents = [Cents(6156), Cents(6156)].into_iter().sum();
        assert_eq!(total, Cents(12312));
        assert_eq!(total.to_string(), "$123.12");
        assert_eq!(Cents(-5).to_string(), "-$0.05");
    }

    #[test]
    fn zero_denominator_yields_zero_rate() {
        assert_eq!(effective_rate(Cents(100), Cents::ZERO), FixedRate::ZERO);
    }
}
