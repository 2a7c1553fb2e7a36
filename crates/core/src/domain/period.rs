use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{CoverageDefect, EngineError};

use super::TariffId;

/// Half-open month range `[start_month, end_month)` charged at a flat monthly price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePeriod {
    pub start_month: u32,
    pub end_month: u32,
    pub price: Decimal,
}

impl PricePeriod {
    pub fn new(start_month: u32, end_month: u32, price: Decimal) -> Self {
        Self { start_month, end_month, price }
    }

    pub fn months(&self) -> u32 {
        self.end_month.saturating_sub(self.start_month)
    }

    pub fn contains(&self, month: u32) -> bool {
        self.start_month <= month && month < self.end_month
    }
}

/// Checks that `periods` are contiguous, non-empty, non-overlapping and span `[0, duration)`.
pub fn check_coverage(periods: &[PricePeriod], duration: u32) -> Result<(), CoverageDefect> {
    let Some(first) = periods.first() else {
        return Err(CoverageDefect::Empty);
    };
    if first.start_month != 0 {
        return Err(CoverageDefect::LateStart { start_month: first.start_month });
    }

    let mut cursor = 0_u32;
    for period in periods {
        if period.end_month <= period.start_month {
            return Err(CoverageDefect::EmptyPeriod {
                start_month: period.start_month,
                end_month: period.end_month,
            });
        }
        if period.start_month > cursor {
            return Err(CoverageDefect::Gap { from_month: cursor, to_month: period.start_month });
        }
        if period.start_month < cursor {
            return Err(CoverageDefect::Overlap { month: period.start_month });
        }
        cursor = period.end_month;
    }

    if cursor != duration {
        return Err(CoverageDefect::LengthMismatch {
            covered_months: cursor,
            contract_months: duration,
        });
    }
    Ok(())
}

pub fn require_coverage(
    tariff_id: &TariffId,
    periods: &[PricePeriod],
    duration: u32,
) -> Result<(), EngineError> {
    check_coverage(periods, duration).map_err(|defect| EngineError::MissingPeriodCoverage {
        tariff_id: tariff_id.clone(),
        defect,
    })
}

/// Price charged in `month`, if any period covers it.
pub fn price_at(periods: &[PricePeriod], month: u32) -> Option<Decimal> {
    periods.iter().find(|period| period.contains(month)).map(|period| period.price)
}

/// Joins adjacent periods that charge the same price.
pub fn merge_adjacent(periods: Vec<PricePeriod>) -> Vec<PricePeriod> {
    let mut merged: Vec<PricePeriod> = Vec::with_capacity(periods.len());
    for period in periods {
        match merged.last_mut() {
            Some(last) if last.end_month == period.start_month && last.price == period.price => {
                last.end_month = period.end_month;
            }
            _ => merged.push(period),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{check_coverage, merge_adjacent, price_at, PricePeriod};
    use crate::errors::CoverageDefect;

    fn period(start: u32, end: u32, price: i64) -> PricePeriod {
        PricePeriod::new(start, end, Decimal::new(price, 0))
    }

    #[test]
    fn accepts_contiguous_timeline() {
        let periods = vec![period(0, 6, 20), period(6, 24, 40)];
        assert_eq!(check_coverage(&periods, 24), Ok(()));
        assert_eq!(price_at(&periods, 5), Some(Decimal::new(20, 0)));
        assert_eq!(price_at(&periods, 6), Some(Decimal::new(40, 0)));
        assert_eq!(price_at(&periods, 24), None);
    }

    #[test]
    fn reports_each_coverage_defect() {
        assert_eq!(check_coverage(&[], 24), Err(CoverageDefect::Empty));
        assert_eq!(
            check_coverage(&[period(1, 24, 40)], 24),
            Err(CoverageDefect::LateStart { start_month: 1 })
        );
        assert_eq!(
            check_coverage(&[period(0, 6, 20), period(8, 24, 40)], 24),
            Err(CoverageDefect::Gap { from_month: 6, to_month: 8 })
        );
        assert_eq!(
            check_coverage(&[period(0, 6, 20), period(4, 24, 40)], 24),
            Err(CoverageDefect::Overlap { month: 4 })
        );
        assert_eq!(
            check_coverage(&[period(0, 0, 20), period(0, 24, 40)], 24),
            Err(CoverageDefect::EmptyPeriod { start_month: 0, end_month: 0 })
        );
        assert_eq!(
            check_coverage(&[period(0, 12, 40)], 24),
            Err(CoverageDefect::LengthMismatch { covered_months: 12, contract_months: 24 })
        );
    }

    #[test]
    fn merges_only_adjacent_equal_prices() {
        let merged = merge_adjacent(vec![period(0, 3, 20), period(3, 6, 20), period(6, 24, 40)]);
        assert_eq!(merged, vec![period(0, 6, 20), period(6, 24, 40)]);
    }
}
