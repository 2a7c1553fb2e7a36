use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

pub const DEFAULT_DECIMAL_PLACES: u32 = 2;
pub const MAX_DECIMAL_PLACES: u32 = 4;

/// Rounding unit applied to every monthly money figure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rounding {
    pub decimal_places: u32,
}

impl Default for Rounding {
    fn default() -> Self {
        Self { decimal_places: DEFAULT_DECIMAL_PLACES }
    }
}

impl Rounding {
    pub fn new(decimal_places: u32) -> Self {
        Self { decimal_places: decimal_places.min(MAX_DECIMAL_PLACES) }
    }

    pub fn apply(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(self.decimal_places, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Rounds towards zero; used when splitting an amount so the remainder stays positive.
    pub fn truncate(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(self.decimal_places, RoundingStrategy::ToZero)
    }

    pub fn unit(&self) -> Decimal {
        Decimal::new(1, self.decimal_places)
    }
}

pub fn checked_add(left: Decimal, right: Decimal, context: &str) -> Result<Decimal, EngineError> {
    left.checked_add(right).ok_or_else(|| EngineError::overflow(context))
}

pub fn checked_sub(left: Decimal, right: Decimal, context: &str) -> Result<Decimal, EngineError> {
    left.checked_sub(right).ok_or_else(|| EngineError::overflow(context))
}

pub fn checked_mul(left: Decimal, right: Decimal, context: &str) -> Result<Decimal, EngineError> {
    left.checked_mul(right).ok_or_else(|| EngineError::overflow(context))
}

pub fn checked_div(left: Decimal, right: Decimal, context: &str) -> Result<Decimal, EngineError> {
    left.checked_div(right).ok_or_else(|| EngineError::overflow(context))
}

pub fn checked_sum<I>(values: I, context: &str) -> Result<Decimal, EngineError>
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().try_fold(Decimal::ZERO, |acc, value| checked_add(acc, value, context))
}

/// `value * percent / 100`, unrounded.
pub fn percent_of(value: Decimal, percent: Decimal, context: &str) -> Result<Decimal, EngineError> {
    let scaled = checked_mul(value, percent, context)?;
    checked_div(scaled, Decimal::ONE_HUNDRED, context)
}

pub fn clamp_non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{checked_mul, percent_of, Rounding};
    use crate::errors::EngineError;

    #[test]
    fn rounding_uses_midpoint_away_from_zero() {
        let rounding = Rounding::default();
        assert_eq!(rounding.apply(Decimal::new(12_345, 3)), Decimal::new(1235, 2));
        assert_eq!(rounding.apply(Decimal::new(-12_345, 3)), Decimal::new(-1235, 2));
        assert_eq!(rounding.truncate(Decimal::new(12_349, 3)), Decimal::new(1234, 2));
        assert_eq!(rounding.unit(), Decimal::new(1, 2));
    }

    #[test]
    fn rounding_caps_decimal_places() {
        assert_eq!(Rounding::new(9).decimal_places, 4);
    }

    #[test]
    fn overflow_maps_to_typed_error() {
        let error = checked_mul(Decimal::MAX, Decimal::TWO, "test multiply")
            .expect_err("multiplying max by two must overflow");
        assert!(matches!(
            error,
            EngineError::CalculationOverflow { ref context } if context == "test multiply"
        ));
    }

    #[test]
    fn percent_of_is_exact_before_rounding() {
        let value = percent_of(Decimal::new(40, 0), Decimal::new(125, 1), "percent")
            .expect("percent of small values");
        assert_eq!(value, Decimal::new(5, 0));
    }
}
