//! Fixed-precision decimal arithmetic for monetary and quantity values.
//!
//! Two scales are used across the engine: 4 fractional digits for price,
//! quantity and notional value; 8 for FX rates. Both newtypes wrap
//! [`rust_decimal::Decimal`] and parse exclusively from `&str` — there is
//! no `From<f64>` anywhere in this crate, so a caller cannot smuggle binary
//! floating point into a financial path by accident.
//!
//! Construction never silently truncates: a string with more fractional
//! digits than the type's scale is a parse error. Computed values (order
//! sizing, pro-rata splits) go through [`Decimal4::rounded`] with an
//! explicit [`Rounding`] mode instead.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

/// Fractional digits carried by [`Decimal4`] (price / quantity / notional value).
pub const PRICE_SCALE: u32 = 4;
/// Fractional digits carried by [`FxRate`].
pub const FX_SCALE: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    Parse { input: String, reason: String },
    TooPrecise { input: String, max_scale: u32 },
    NonPositive { input: String },
    Negative { input: String },
}

impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyError::Parse { input, reason } => {
                write!(f, "cannot parse '{input}' as a decimal: {reason}")
            }
            MoneyError::TooPrecise { input, max_scale } => {
                write!(f, "'{input}' carries more than {max_scale} fractional digits")
            }
            MoneyError::NonPositive { input } => {
                write!(f, "'{input}' must be strictly positive")
            }
            MoneyError::Negative { input } => write!(f, "'{input}' must not be negative"),
        }
    }
}

impl std::error::Error for MoneyError {}

/// Rounding direction for values produced by arithmetic rather than parsed
/// directly from an external string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Truncate toward zero. Used when sizing order quantities: never round
    /// an order up into more buying power than was actually available.
    Down,
    /// Round half to even. Used for monetary summations (commission splits,
    /// weighted-average cost), to avoid systematic upward bias.
    HalfEven,
}

impl Rounding {
    fn strategy(self) -> RoundingStrategy {
        match self {
            Rounding::Down => RoundingStrategy::ToZero,
            Rounding::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }
}

/// A decimal value fixed to [`PRICE_SCALE`] fractional digits. Used for
/// price, quantity and notional-value fields alike, matching how the
/// domain treats them as interchangeable magnitudes until a field name
/// gives them meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Decimal4(Decimal);

impl Decimal4 {
    pub const ZERO: Decimal4 = Decimal4(Decimal::ZERO);

    /// Parses a decimal string with at most [`PRICE_SCALE`] fractional
    /// digits. Rejects anything more precise rather than rounding it away.
    pub fn parse(input: &str) -> Result<Self, MoneyError> {
        let trimmed = input.trim();
        let raw = Decimal::from_str(trimmed).map_err(|e| MoneyError::Parse {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        if raw.scale() > PRICE_SCALE {
            return Err(MoneyError::TooPrecise {
                input: input.to_string(),
                max_scale: PRICE_SCALE,
            });
        }
        Ok(Decimal4(raw.round_dp(PRICE_SCALE)))
    }

    /// Parses and requires the value to be strictly positive (prices,
    /// order quantities).
    pub fn parse_positive(input: &str) -> Result<Self, MoneyError> {
        let v = Self::parse(input)?;
        if v.0 <= Decimal::ZERO {
            return Err(MoneyError::NonPositive {
                input: input.to_string(),
            });
        }
        Ok(v)
    }

    /// Parses and requires the value to be non-negative (commission, fees).
    pub fn parse_non_negative(input: &str) -> Result<Self, MoneyError> {
        let v = Self::parse(input)?;
        if v.0 < Decimal::ZERO {
            return Err(MoneyError::Negative {
                input: input.to_string(),
            });
        }
        Ok(v)
    }

    /// Builds a `Decimal4` directly from an already-scaled integer count of
    /// the smallest unit (1e-4). Used by arithmetic that works in scaled
    /// integers to avoid repeated string round-trips.
    pub fn from_scaled_i128(scaled: i128) -> Self {
        Decimal4(Decimal::from_i128_with_scale(scaled, PRICE_SCALE))
    }

    /// Rounds an arbitrary-precision decimal result down to [`PRICE_SCALE`]
    /// using the given rounding mode. This is the only way to produce a
    /// `Decimal4` from a computed (rather than parsed) value.
    pub fn rounded(value: Decimal, rounding: Rounding) -> Self {
        Decimal4(value.round_dp_with_strategy(PRICE_SCALE, rounding.strategy()))
    }

    pub fn raw(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn checked_add(&self, other: Decimal4) -> Option<Decimal4> {
        self.0.checked_add(other.0).map(Decimal4)
    }

    pub fn checked_sub(&self, other: Decimal4) -> Option<Decimal4> {
        self.0.checked_sub(other.0).map(Decimal4)
    }

    /// Multiplies two scale-4 quantities (e.g. price × quantity), rounding
    /// the full-precision product down to scale 4 with the given mode.
    pub fn checked_mul(&self, other: Decimal4, rounding: Rounding) -> Option<Decimal4> {
        self.0
            .checked_mul(other.0)
            .map(|p| Decimal4::rounded(p, rounding))
    }

    /// Multiplies by a raw integer quantity (share count), rounding the
    /// full-precision product down to scale 4. Avoids round-tripping the
    /// quantity through a `Decimal4` just to multiply a price by it.
    pub fn checked_mul_qty(&self, qty: i64, rounding: Rounding) -> Option<Decimal4> {
        let qty_dec = Decimal::from(qty);
        self.0
            .checked_mul(qty_dec)
            .map(|p| Decimal4::rounded(p, rounding))
    }

    pub fn checked_div(&self, other: Decimal4, rounding: Rounding) -> Option<Decimal4> {
        if other.0.is_zero() {
            return None;
        }
        self.0
            .checked_div(other.0)
            .map(|q| Decimal4::rounded(q, rounding))
    }

    pub fn abs(&self) -> Decimal4 {
        Decimal4(self.0.abs())
    }

    pub fn neg(&self) -> Decimal4 {
        Decimal4(-self.0)
    }
}

impl fmt::Display for Decimal4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.*}", PRICE_SCALE as usize, self.0)
    }
}

impl FromStr for Decimal4 {
    type Err = MoneyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal4::parse(s)
    }
}

impl TryFrom<String> for Decimal4 {
    type Error = MoneyError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Decimal4::parse(&value)
    }
}

impl From<Decimal4> for String {
    fn from(value: Decimal4) -> Self {
        value.to_string()
    }
}

impl PartialOrd for Decimal4 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal4 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Add for Decimal4 {
    type Output = Decimal4;
    fn add(self, rhs: Self) -> Self::Output {
        Decimal4(self.0 + rhs.0)
    }
}

impl Sub for Decimal4 {
    type Output = Decimal4;
    fn sub(self, rhs: Self) -> Self::Output {
        Decimal4(self.0 - rhs.0)
    }
}

impl Neg for Decimal4 {
    type Output = Decimal4;
    fn neg(self) -> Self::Output {
        Decimal4(-self.0)
    }
}

/// A foreign-exchange rate fixed to [`FX_SCALE`] fractional digits. Always
/// strictly positive — a zero or negative FX rate has no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FxRate(Decimal);

impl FxRate {
    pub fn parse(input: &str) -> Result<Self, MoneyError> {
        let trimmed = input.trim();
        let raw = Decimal::from_str(trimmed).map_err(|e| MoneyError::Parse {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        if raw.scale() > FX_SCALE {
            return Err(MoneyError::TooPrecise {
                input: input.to_string(),
                max_scale: FX_SCALE,
            });
        }
        if raw <= Decimal::ZERO {
            return Err(MoneyError::NonPositive {
                input: input.to_string(),
            });
        }
        Ok(FxRate(raw.round_dp(FX_SCALE)))
    }

    pub fn one_to_one() -> Self {
        FxRate(Decimal::ONE)
    }

    pub fn raw(&self) -> Decimal {
        self.0
    }

    /// Converts a native-currency value to AUD using this rate, rounding
    /// half-to-even at price scale.
    pub fn convert(&self, value: Decimal4) -> Decimal4 {
        Decimal4::rounded(value.raw() * self.0, Rounding::HalfEven)
    }
}

impl fmt::Display for FxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.*}", FX_SCALE as usize, self.0)
    }
}

impl TryFrom<String> for FxRate {
    type Error = MoneyError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        FxRate::parse(&value)
    }
}

impl From<FxRate> for String {
    fn from(value: FxRate) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_exact_scale() {
        let v = Decimal4::parse("100.0000").unwrap();
        assert_eq!(v.raw(), dec!(100.0000));
        assert_eq!(v.to_string(), "100.0000");
    }

    #[test]
    fn parses_and_pads_shorter_scale() {
        let v = Decimal4::parse("40").unwrap();
        assert_eq!(v.to_string(), "40.0000");
    }

    #[test]
    fn rejects_over_precise_input() {
        let err = Decimal4::parse("1.00005").unwrap_err();
        assert!(matches!(err, MoneyError::TooPrecise { .. }));
    }

    #[test]
    fn rejects_garbage() {
        assert!(Decimal4::parse("not-a-number").is_err());
    }

    #[test]
    fn parse_positive_rejects_zero_and_negative() {
        assert!(Decimal4::parse_positive("0").is_err());
        assert!(Decimal4::parse_positive("-1").is_err());
        assert!(Decimal4::parse_positive("0.0001").is_ok());
    }

    #[test]
    fn parse_non_negative_allows_zero() {
        assert!(Decimal4::parse_non_negative("0").is_ok());
        assert!(Decimal4::parse_non_negative("-0.0001").is_err());
    }

    #[test]
    fn addition_and_subtraction() {
        let a = Decimal4::parse("10.5000").unwrap();
        let b = Decimal4::parse("3.2500").unwrap();
        assert_eq!((a + b).to_string(), "13.7500");
        assert_eq!((a - b).to_string(), "7.2500");
    }

    #[test]
    fn mul_rounds_down_for_sizing() {
        // 10 / 3 = 3.333... -> rounded DOWN to scale 4
        let ten = Decimal4::parse("10").unwrap();
        let three = Decimal4::parse("3").unwrap();
        let q = ten.checked_div(three, Rounding::Down).unwrap();
        assert_eq!(q.to_string(), "3.3333");
    }

    #[test]
    fn half_even_rounding_ties_to_even() {
        // 0.00005 rounds to 0.0000 (round to even) under half-even at scale 4
        let v = Decimal4::rounded(dec!(0.00005), Rounding::HalfEven);
        assert_eq!(v.to_string(), "0.0000");
        let v2 = Decimal4::rounded(dec!(0.00015), Rounding::HalfEven);
        assert_eq!(v2.to_string(), "0.0002");
    }

    #[test]
    fn fx_rate_requires_positive() {
        assert!(FxRate::parse("0").is_err());
        assert!(FxRate::parse("-0.5").is_err());
        assert!(FxRate::parse("1.52340000").is_ok());
    }

    #[test]
    fn fx_rate_converts_with_half_even_rounding() {
        let rate = FxRate::parse("1.5").unwrap();
        let value = Decimal4::parse("100.0000").unwrap();
        assert_eq!(rate.convert(value).to_string(), "150.0000");
    }

    #[test]
    fn ordering_is_by_value() {
        let a = Decimal4::parse("1.0000").unwrap();
        let b = Decimal4::parse("2.0000").unwrap();
        assert!(a < b);
        assert!(b > a);
    }

    #[test]
    fn serde_round_trips_through_string() {
        let v = Decimal4::parse("1234.5600").unwrap();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"1234.5600\"");
        let back: Decimal4 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn checked_sub_detects_underflow_free_arithmetic() {
        // rust_decimal doesn't overflow at these magnitudes; this exercises
        // the Option-returning path used by callers that must not panic.
        let a = Decimal4::parse("1.0000").unwrap();
        let b = Decimal4::parse("2.0000").unwrap();
        assert_eq!((a - b).to_string(), "-1.0000");
        assert!(a.checked_sub(b).is_some());
    }

    #[test]
    fn mul_qty_computes_notional() {
        let price = Decimal4::parse("123.4567").unwrap();
        let notional = price.checked_mul_qty(10, Rounding::Down).unwrap();
        assert_eq!(notional.to_string(), "1234.5670");
    }

    #[test]
    fn abs_and_neg() {
        let a = Decimal4::parse("-5.2500").unwrap();
        assert_eq!(a.abs().to_string(), "5.2500");
        assert_eq!(a.neg().to_string(), "5.2500");
    }
}
