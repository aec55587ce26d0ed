use crate::error::{EngineError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// A monetary value in the payroll currency.
///
/// Wraps `rust_decimal::Decimal` so salary and loan arithmetic never goes
/// through floating point. The currency has no subunits in practice, so
/// derived amounts are rounded to whole units with [`Money::round_half_up`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Rounds to the nearest whole unit, halves away from zero.
    pub fn round_half_up(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Sums `amounts`, or `None` if the total overflows.
    pub fn checked_sum<'a>(amounts: impl IntoIterator<Item = &'a Money>) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(*amount))
    }

    /// Rounds up to the next whole unit.
    pub fn ceil(self) -> Self {
        Self(self.0.ceil())
    }

    /// Applies `rate` to this amount and rounds the result to whole units.
    pub fn percent(self, rate: Rate) -> Self {
        Self(self.0 * rate.value()).round_half_up()
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// A fraction in `[0, 1]` applied to the base salary (`0.12` is 12%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Rate(Decimal);

impl Rate {
    pub fn new(value: Decimal) -> Result<Self> {
        if value >= Decimal::ZERO && value <= Decimal::ONE {
            Ok(Self(value))
        } else {
            Err(EngineError::InvalidComponentConfiguration(format!(
                "rate {value} is outside [0, 1]"
            )))
        }
    }

    /// Builds a rate without range checks, for literals known to be in range.
    pub(crate) const fn new_unchecked(value: Decimal) -> Self {
        Self(value)
    }

    /// Builds a rate from a percentage, so `12` becomes `0.12`.
    pub fn from_percent(percent: Decimal) -> Result<Self> {
        Self::new(percent / Decimal::ONE_HUNDRED)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Rate {
    type Error = EngineError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Rate> for Decimal {
    fn from(rate: Rate) -> Self {
        rate.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0 * Decimal::ONE_HUNDRED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_arithmetic() {
        let a = Money::new(dec!(100));
        let b = Money::new(dec!(40));
        assert_eq!(a + b, Money::new(dec!(140)));
        assert_eq!(a - b, Money::new(dec!(60)));
        assert!((b - a).is_negative());
    }

    #[test]
    fn test_checked_arithmetic() {
        let max = Money::new(Decimal::MAX);
        assert_eq!(max.checked_add(Money::from_units(1)), None);
        assert_eq!(Money::new(Decimal::MIN).checked_sub(Money::from_units(1)), None);
        assert_eq!(
            Money::checked_sum(&[Money::from_units(2), Money::from_units(3)]),
            Some(Money::from_units(5))
        );
        assert_eq!(Money::checked_sum(&[max, max]), None);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(
            Money::new(dec!(2.5)).round_half_up(),
            Money::new(dec!(3))
        );
        assert_eq!(
            Money::new(dec!(2.49)).round_half_up(),
            Money::new(dec!(2))
        );
        assert_eq!(
            Money::new(dec!(374.999)).round_half_up(),
            Money::new(dec!(375))
        );
    }

    #[test]
    fn test_ceil() {
        assert_eq!(
            Money::new(dec!(4166.0001)).ceil(),
            Money::new(dec!(4167))
        );
        assert_eq!(Money::new(dec!(4166)).ceil(), Money::new(dec!(4166)));
    }

    #[test]
    fn test_percent_of_amount() {
        let base = Money::from_units(50_000);
        let rate = Rate::new(dec!(0.0075)).unwrap();
        // 375.0 exactly
        assert_eq!(base.percent(rate), Money::from_units(375));

        let base = Money::from_units(33_333);
        let rate = Rate::new(dec!(0.12)).unwrap();
        // 3999.96 rounds up
        assert_eq!(base.percent(rate), Money::from_units(4_000));
    }

    #[test]
    fn test_rate_validation() {
        assert!(Rate::new(dec!(0)).is_ok());
        assert!(Rate::new(dec!(1)).is_ok());
        assert!(matches!(
            Rate::new(dec!(1.01)),
            Err(EngineError::InvalidComponentConfiguration(_))
        ));
        assert!(matches!(
            Rate::new(dec!(-0.1)),
            Err(EngineError::InvalidComponentConfiguration(_))
        ));
        assert_eq!(Rate::from_percent(dec!(12)).unwrap().value(), dec!(0.12));
    }

    #[test]
    fn test_rate_deserialization_is_validated() {
        let ok: Rate = serde_json::from_str("\"0.4\"").unwrap();
        assert_eq!(ok.value(), dec!(0.4));
        assert!(serde_json::from_str::<Rate>("\"1.5\"").is_err());
    }
}
