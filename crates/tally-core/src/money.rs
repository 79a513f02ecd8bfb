//! # Money Module
//!
//! Provides the `Money` type for every price, cost, discount and total.
//!
//! ## Representation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  STORE / MEMORY              WIRE (JSON, CSV)                           │
//! │                                                                         │
//! │  Money(1250)   ◄──parse──    12.5  |  "12.50"  |  12                    │
//! │  i64 cents     ──render──►   12.5                                       │
//! │                                                                         │
//! │  Arithmetic only ever happens on the integer cents.                     │
//! │  Decimal text is parsed digit by digit, never through f64 math.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! let price = Money::parse_decimal("10.99").unwrap();
//! assert_eq!(price.cents(), 1099);
//!
//! let line = price.multiply_quantity(3);
//! assert_eq!(line.cents(), 3297);
//! ```

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money Flows
/// ```text
/// Product.price ──► InvoiceItem.unit_price ──► InvoiceItem.total ──┐
///                                                                   │
///             subtotal ─► discount ─► + tax ─► Invoice.total ◄──────┘
///
/// Product.cost_price ◄── PurchaseItem.unit_cost (overwritten on purchase)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, TS)]
#[ts(export)]
pub struct Money(#[ts(type = "number")] i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole currency units.
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let unit_cost = Money::from_cents(6000);
    /// assert_eq!(unit_cost.multiply_quantity(3).cents(), 18000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Multiplies by a quantity, `None` on overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_sub(self, other: Money) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns `bps` basis points of this amount, rounded half up.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let subtotal = Money::from_cents(20000);
    /// assert_eq!(subtotal.percentage(1000).cents(), 2000); // 10%
    /// assert_eq!(Money::from_cents(999).percentage(1250).cents(), 125); // 124.875
    /// ```
    pub fn percentage(&self, bps: i64) -> Money {
        // i128 keeps large subtotals times large rates from overflowing
        let raw = self.0 as i128 * bps as i128;
        let rounded = if raw >= 0 {
            (raw + 5000) / 10000
        } else {
            (raw - 5000) / 10000
        };
        Money(rounded as i64)
    }

    /// Clamps the value into `[min, max]`.
    pub fn clamp_between(self, min: Money, max: Money) -> Money {
        if max < min {
            return min;
        }
        Money(self.0.clamp(min.0, max.0))
    }

    /// Returns the larger of `self` and zero.
    #[inline]
    pub fn non_negative(self) -> Money {
        Money(self.0.max(0))
    }

    /// Parses a decimal major-unit string into cents.
    ///
    /// Accepts an optional sign, digits, and an optional fraction. A third
    /// fraction digit rounds half away from zero; further digits are ignored.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("12").unwrap().cents(), 1200);
    /// assert_eq!(Money::parse_decimal("12.5").unwrap().cents(), 1250);
    /// assert_eq!(Money::parse_decimal("-0.125").unwrap().cents(), -13);
    /// assert!(Money::parse_decimal("12,50").is_err());
    /// ```
    pub fn parse_decimal(input: &str) -> Result<Money, ValidationError> {
        let invalid = || ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: format!("'{}' is not a decimal amount", input),
        };

        let text = input.trim();
        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };

        let (whole, fraction) = match unsigned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (unsigned, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole_cents = if whole.is_empty() {
            0i64
        } else {
            whole
                .parse::<i64>()
                .ok()
                .and_then(|w| w.checked_mul(100))
                .ok_or_else(invalid)?
        };

        let digits: Vec<i64> = fraction
            .bytes()
            .take(3)
            .map(|b| i64::from(b - b'0'))
            .collect();
        let tenths = digits.first().copied().unwrap_or(0);
        let hundredths = digits.get(1).copied().unwrap_or(0);
        let round_up = digits.get(2).is_some_and(|d| *d >= 5);

        let cents = whole_cents
            .checked_add(tenths * 10 + hundredths + i64::from(round_up))
            .ok_or_else(invalid)?;

        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Renders the value as a major-unit number for the wire.
    #[inline]
    pub fn as_major_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering, e.g. `12.50` or `-3.05`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Wire Format
// =============================================================================

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_major_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount as a number or string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        v.checked_mul(100)
            .map(Money)
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        i64::try_from(v)
            .map_err(|_| E::custom("amount out of range"))
            .and_then(|v| self.visit_i64(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        if !v.is_finite() {
            return Err(E::custom("amount must be finite"));
        }
        // Display for f64 yields the shortest round-trip digits, never an exponent
        Money::parse_decimal(&v.to_string()).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        Money::parse_decimal(v).map_err(E::custom)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_variants() {
        assert_eq!(Money::parse_decimal("0").unwrap().cents(), 0);
        assert_eq!(Money::parse_decimal("100").unwrap().cents(), 10000);
        assert_eq!(Money::parse_decimal("  7.05 ").unwrap().cents(), 705);
        assert_eq!(Money::parse_decimal(".5").unwrap().cents(), 50);
        assert_eq!(Money::parse_decimal("1.999").unwrap().cents(), 200);
        assert_eq!(Money::parse_decimal("+3").unwrap().cents(), 300);
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        assert!(Money::parse_decimal("").is_err());
        assert!(Money::parse_decimal(".").is_err());
        assert!(Money::parse_decimal("abc").is_err());
        assert!(Money::parse_decimal("1.2.3").is_err());
        assert!(Money::parse_decimal("1e5").is_err());
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        assert_eq!(Money::from_cents(20000).percentage(1000).cents(), 2000);
        assert_eq!(Money::from_cents(5).percentage(5000).cents(), 3); // 2.5 -> 3
        assert_eq!(Money::from_cents(-5).percentage(5000).cents(), -3);
    }

    #[test]
    fn test_clamp_between() {
        let cap = Money::from_cents(500);
        assert_eq!(Money::from_cents(900).clamp_between(Money::zero(), cap), cap);
        assert_eq!(Money::from_cents(-1).clamp_between(Money::zero(), cap), Money::zero());
        assert_eq!(Money::from_cents(10).clamp_between(Money::zero(), Money::from_cents(-5)), Money::zero());
    }

    #[test]
    fn test_sum_and_display() {
        let total: Money = [Money::from_cents(150), Money::from_cents(250)].into_iter().sum();
        assert_eq!(total.to_string(), "4.00");
        assert_eq!(Money::from_cents(-305).to_string(), "-3.05");
    }

    #[test]
    fn test_checked_arithmetic() {
        let huge = Money::parse_decimal("90000000000000000").unwrap();
        assert_eq!(huge.checked_multiply_quantity(2), None);
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
        assert_eq!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)), None);
        assert_eq!(
            Money::from_cents(250).checked_multiply_quantity(4),
            Some(Money::from_cents(1000))
        );
    }

    #[test]
    fn test_json_wire_format() {
        let price: Money = serde_json::from_str("100").unwrap();
        assert_eq!(price.cents(), 10000);

        let price: Money = serde_json::from_str("10.99").unwrap();
        assert_eq!(price.cents(), 1099);

        let price: Money = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(price.cents(), 1250);

        let json = serde_json::to_value(Money::from_cents(18000)).unwrap();
        assert_eq!(json.as_f64(), Some(180.0));
    }
}
