use std::fmt;
use std::iter::Sum;

use serde::{Deserialize, Serialize};

/// Monetary amount in minor units (cents).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    const SCALE: i64 = 100;

    pub const ZERO: Amount = Amount(0);

    /// Convert a dollar figure (as the event data source emits it) to cents.
    ///
    /// `None` for NaN, infinities and figures too large to hold in cents.
    pub fn from_float(value: f64) -> Option<Self> {
        let cents = (value * Self::SCALE as f64).round();
        if !cents.is_finite() || cents.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Amount(cents as i64))
    }

    pub fn from_minor(value: i64) -> Self {
        Amount(value)
    }

    pub fn minor(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Price of `quantity` units at this unit price.
    pub fn times(self, quantity: u32) -> Self {
        Amount(self.0.saturating_mul(i64::from(quantity)))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let whole = abs / Self::SCALE;
        let frac = abs % Self::SCALE;
        write!(f, "{sign}{whole}.{frac:02}")
    }
}

impl std::ops::Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_float_converts_dollars_to_cents() {
        assert_eq!(Amount::from_float(75.0), Some(Amount::from_minor(7500)));
        assert_eq!(Amount::from_float(12.5), Some(Amount::from_minor(1250)));
        assert_eq!(Amount::from_float(0.01), Some(Amount::from_minor(1)));
    }

    #[test]
    fn from_float_rounds_to_nearest_cent() {
        assert_eq!(Amount::from_float(19.999), Some(Amount::from_minor(2000)));
        assert_eq!(Amount::from_float(0.1 + 0.2), Some(Amount::from_minor(30)));
    }

    #[test]
    fn from_float_rejects_non_finite_and_huge() {
        assert_eq!(Amount::from_float(f64::NAN), None);
        assert_eq!(Amount::from_float(f64::INFINITY), None);
        assert_eq!(Amount::from_float(f64::NEG_INFINITY), None);
        assert_eq!(Amount::from_float(1e30), None);
    }

    #[test]
    fn display_formats_cents() {
        assert_eq!(Amount::from_minor(7500).to_string(), "75.00");
        assert_eq!(Amount::from_minor(1205).to_string(), "12.05");
        assert_eq!(Amount::from_minor(0).to_string(), "0.00");
        assert_eq!(Amount::from_minor(-250).to_string(), "-2.50");
    }

    #[test]
    fn times_multiplies_by_quantity() {
        assert_eq!(Amount::from_minor(7500).times(2), Amount::from_minor(15_000));
        assert_eq!(Amount::from_minor(7500).times(0), Amount::ZERO);
    }

    #[test]
    fn arithmetic_saturates() {
        let max = Amount::from_minor(i64::MAX);
        assert_eq!(max.times(2), max);
        assert_eq!(max + Amount::from_minor(1), max);

        let mut total = max;
        total += max;
        assert_eq!(total, max);
    }

    #[test]
    fn sum_of_empty_is_zero() {
        let total: Amount = std::iter::empty().sum();
        assert_eq!(total, Amount::ZERO);
    }

    #[test]
    fn sum_adds_all() {
        let total: Amount = [100, 250, 5].into_iter().map(Amount::from_minor).sum();
        assert_eq!(total, Amount::from_minor(355));
    }

    #[test]
    fn negative_detection() {
        assert!(Amount::from_minor(-1).is_negative());
        assert!(!Amount::ZERO.is_negative());
    }
}
