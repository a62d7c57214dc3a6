//! Fixed-point money types.
//!
//! Prices and cash balances are integer cent counts. The simulated market
//! quotes on a two-decimal grid, so `i64` cents keep every accounting
//! identity exact: no float drift in balances, conservation checks compare
//! with `==`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Number of cents in one currency unit.
pub const PRICE_SCALE: i64 = 100;

/// A non-negative price on the two-decimal grid.
///
/// Serialized as a decimal number of currency units (`10.25`), matching the
/// wire format; internally an integer cent count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(i64);

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Price::from_f64_round(f64::deserialize(deserializer)?))
    }
}

impl Price {
    pub const ZERO: Price = Price(0);
    /// Smallest representable price, 0.01. Generated prices never go below it.
    pub const MIN_TICK: Price = Price(1);

    pub const fn from_cents(cents: i64) -> Self {
        Price(cents)
    }

    pub const fn from_int(units: i64) -> Self {
        Price(units * PRICE_SCALE)
    }

    /// Convert a model-space price, rounding *up* to the next cent.
    ///
    /// `ceil(100 * x) / 100` is the rounding rule for every price the
    /// generator emits; a tiny epsilon guards against values like
    /// `2.0000000000000004` produced by float multiplication.
    pub fn from_f64_ceil(x: f64) -> Self {
        let cents = (x * PRICE_SCALE as f64 - 1e-9).ceil() as i64;
        Price(cents.max(0))
    }

    /// Convert a wire price, rounding to the nearest cent. This is the
    /// coercion applied to client-submitted order prices.
    pub fn from_f64_round(x: f64) -> Self {
        let cents = (x * PRICE_SCALE as f64).round() as i64;
        Price(cents.max(0))
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / PRICE_SCALE as f64
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Notional value of `qty` shares at this price.
    pub fn notional(&self, qty: u64) -> Cash {
        Cash((self.0 as i128 * qty as i128) as i64)
    }

    /// Scale by a float factor, rounding up to the next cent.
    pub fn scaled_ceil(&self, factor: f64) -> Price {
        Price::from_f64_ceil(self.as_f64() * factor)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / PRICE_SCALE, self.0 % PRICE_SCALE)
    }
}

impl Add for Price {
    type Output = Price;
    fn add(self, rhs: Self) -> Price {
        Price(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Price;
    fn sub(self, rhs: Self) -> Price {
        Price(self.0 - rhs.0)
    }
}

/// A signed cash amount in cents.
///
/// Signed because fill reports use the sign to carry direction: buy fills
/// cost positive cash, sell fills cost negative cash. Serialized as a
/// decimal number of currency units, like [`Price`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cash(i64);

impl Serialize for Cash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Cash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let units = f64::deserialize(deserializer)?;
        Ok(Cash((units * PRICE_SCALE as f64).round() as i64))
    }
}

impl Cash {
    pub const ZERO: Cash = Cash(0);

    pub const fn from_cents(cents: i64) -> Self {
        Cash(cents)
    }

    pub const fn from_int(units: i64) -> Self {
        Cash(units * PRICE_SCALE)
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / PRICE_SCALE as f64
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn abs(&self) -> Cash {
        Cash(self.0.abs())
    }
}

impl fmt::Display for Cash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{sign}{}.{:02}", abs / PRICE_SCALE, abs % PRICE_SCALE)
    }
}

impl Add for Cash {
    type Output = Cash;
    fn add(self, rhs: Self) -> Cash {
        Cash(self.0 + rhs.0)
    }
}

impl Sub for Cash {
    type Output = Cash;
    fn sub(self, rhs: Self) -> Cash {
        Cash(self.0 - rhs.0)
    }
}

impl AddAssign for Cash {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Cash {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Cash {
    type Output = Cash;
    fn neg(self) -> Cash {
        Cash(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceil_rounding() {
        assert_eq!(Price::from_f64_ceil(1.0), Price::from_cents(100));
        assert_eq!(Price::from_f64_ceil(1.001), Price::from_cents(101));
        assert_eq!(Price::from_f64_ceil(1.019), Price::from_cents(102));
        assert_eq!(Price::from_f64_ceil(0.0049), Price::from_cents(1));
    }

    #[test]
    fn test_ceil_rounding_float_noise() {
        // 2.0 may arrive as 2.0000000000000004 out of a float product
        assert_eq!(Price::from_f64_ceil(2.0000000000000004), Price::from_int(2));
        assert_eq!(Price::from_f64_ceil(0.1 + 0.2), Price::from_cents(30));
    }

    #[test]
    fn test_notional_is_exact() {
        let p = Price::from_cents(1_234_567);
        assert_eq!(p.notional(1000), Cash::from_cents(1_234_567_000));
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_cents(105).to_string(), "1.05");
        assert_eq!(Cash::from_cents(-105).to_string(), "-1.05");
        assert_eq!(Cash::from_cents(5).to_string(), "0.05");
    }
}
