use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

use super::money::{checked_add, checked_div, checked_mul, checked_sub, Rounding};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginFigures {
    pub revenue: Decimal,
    pub cost: Decimal,
    pub provision: Decimal,
    pub margin: Decimal,
    pub margin_percent: Decimal,
}

impl MarginFigures {
    /// Derives margin as `revenue - cost - provision` and its share of revenue.
    pub fn new(revenue: Decimal, cost: Decimal, provision: Decimal) -> Result<Self, EngineError> {
        let margin = checked_sub(checked_sub(revenue, cost, "margin")?, provision, "margin")?;
        let margin_percent = margin_percent(margin, revenue)?;
        Ok(Self { revenue, cost, provision, margin, margin_percent })
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn scaled(&self, months: u32) -> Result<Self, EngineError> {
        let factor = Decimal::from(months);
        Self::new(
            checked_mul(self.revenue, factor, "period revenue")?,
            checked_mul(self.cost, factor, "period cost")?,
            checked_mul(self.provision, factor, "period provision")?,
        )
    }

    pub fn plus(&self, other: &Self) -> Result<Self, EngineError> {
        Self::new(
            checked_add(self.revenue, other.revenue, "sum revenue")?,
            checked_add(self.cost, other.cost, "sum cost")?,
            checked_add(self.provision, other.provision, "sum provision")?,
        )
    }

    fn same_amounts(&self, other: &Self) -> bool {
        self.revenue == other.revenue
            && self.cost == other.cost
            && self.provision == other.provision
    }
}

fn margin_percent(margin: Decimal, revenue: Decimal) -> Result<Decimal, EngineError> {
    if revenue.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let ratio = checked_div(margin, revenue, "margin percent")?;
    let percent = checked_mul(ratio, Decimal::ONE_HUNDRED, "margin percent")?;
    Ok(Rounding::new(2).apply(percent))
}

/// Consecutive months sharing identical monthly figures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginPeriod {
    pub start_month: u32,
    pub end_month: u32,
    pub monthly: MarginFigures,
    pub total: MarginFigures,
}

impl MarginPeriod {
    pub fn months(&self) -> u32 {
        self.end_month - self.start_month
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginBreakdown {
    pub duration_months: u32,
    pub periods: Vec<MarginPeriod>,
    pub totals: MarginFigures,
}

impl MarginBreakdown {
    /// Compresses per-month figures into periods and sums the totals.
    pub fn from_monthly(monthly: &[MarginFigures]) -> Result<Self, EngineError> {
        let mut runs: Vec<(u32, u32, &MarginFigures)> = Vec::new();
        for (month, figures) in monthly.iter().enumerate() {
            let month = u32::try_from(month).map_err(|_| EngineError::overflow("month index"))?;
            match runs.last_mut() {
                Some((_, end, last)) if last.same_amounts(figures) => *end = month + 1,
                _ => runs.push((month, month + 1, figures)),
            }
        }

        let mut periods = Vec::with_capacity(runs.len());
        let mut totals = MarginFigures::zero();
        for (start_month, end_month, figures) in runs {
            let total = figures.scaled(end_month - start_month)?;
            totals = totals.plus(&total)?;
            periods.push(MarginPeriod { start_month, end_month, monthly: figures.clone(), total });
        }

        let duration_months = periods.last().map_or(0, |period| period.end_month);
        Ok(Self { duration_months, periods, totals })
    }

    /// Expands periods back into one entry per month.
    pub fn monthly_figures(&self) -> Vec<MarginFigures> {
        self.periods
            .iter()
            .flat_map(|period| (0..period.months()).map(move |_| period.monthly.clone()))
            .collect()
    }

    pub fn figures_at(&self, month: u32) -> MarginFigures {
        self.periods
            .iter()
            .find(|period| period.start_month <= month && month < period.end_month)
            .map(|period| period.monthly.clone())
            .unwrap_or_default()
    }

    pub fn is_reconciled(&self) -> bool {
        let balanced = |figures: &MarginFigures| {
            figures.revenue - figures.cost - figures.provision == figures.margin
        };
        self.periods.iter().all(|period| balanced(&period.monthly) && balanced(&period.total))
            && balanced(&self.totals)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A discounted price fell below zero and was clamped.
    ClampedPrice,
    /// Revenue in the period does not cover cost and provision.
    NegativeMargin,
}

/// Non-fatal signal attached to a breakdown; computation continues with clamped values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeMarginWarning {
    pub kind: WarningKind,
    pub start_month: u32,
    pub end_month: u32,
    /// Value before clamping, or the negative monthly margin.
    pub amount: Decimal,
    pub source: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitabilityStatus {
    Positive,
    Warning,
    Critical,
}

impl ProfitabilityStatus {
    /// Classifies total margin per line against `threshold`.
    pub fn classify(total_margin: Decimal, lines: u32, threshold: Decimal) -> Self {
        let per_line = if lines == 0 {
            total_margin
        } else {
            total_margin.checked_div(Decimal::from(lines)).unwrap_or(total_margin)
        };
        if per_line > threshold {
            Self::Positive
        } else if per_line >= Decimal::ZERO {
            Self::Warning
        } else {
            Self::Critical
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{MarginBreakdown, MarginFigures, ProfitabilityStatus};

    fn month(revenue: i64, cost: i64, provision: i64) -> MarginFigures {
        MarginFigures::new(
            Decimal::new(revenue, 0),
            Decimal::new(cost, 0),
            Decimal::new(provision, 0),
        )
        .expect("small figures")
    }

    #[test]
    fn compresses_identical_months_and_reconciles() {
        let mut monthly = vec![month(20, 10, 2); 6];
        monthly.extend(vec![month(40, 10, 4); 18]);

        let breakdown = MarginBreakdown::from_monthly(&monthly).expect("breakdown");

        assert_eq!(breakdown.duration_months, 24);
        assert_eq!(breakdown.periods.len(), 2);
        assert_eq!(breakdown.periods[0].total.revenue, Decimal::new(120, 0));
        assert_eq!(breakdown.totals.revenue, Decimal::new(840, 0));
        assert_eq!(breakdown.totals.margin, Decimal::new(840 - 240 - 84, 0));
        assert!(breakdown.is_reconciled());
        assert_eq!(breakdown.monthly_figures(), monthly);
    }

    #[test]
    fn margin_percent_is_zero_without_revenue() {
        let figures = month(0, 10, 0);
        assert_eq!(figures.margin, Decimal::new(-10, 0));
        assert_eq!(figures.margin_percent, Decimal::ZERO);
        assert_eq!(month(3, 2, 0).margin_percent, Decimal::new(3333, 2));
    }

    #[test]
    fn margin_percent_holds_for_margins_near_the_decimal_limit() {
        let revenue = Decimal::from_i128_with_scale(10_i128.pow(27), 0);
        let figures = MarginFigures::new(revenue, Decimal::ZERO, Decimal::ZERO).expect("figures");
        assert_eq!(figures.margin, revenue);
        assert_eq!(figures.margin_percent, Decimal::ONE_HUNDRED);

        let half = MarginFigures::new(revenue, revenue / Decimal::TWO, Decimal::ZERO)
            .expect("figures");
        assert_eq!(half.margin_percent, Decimal::new(50, 0));
    }

    #[test]
    fn profitability_uses_margin_per_line() {
        let threshold = Decimal::new(50, 0);
        let classify = |margin: i64, lines: u32| {
            ProfitabilityStatus::classify(Decimal::new(margin, 0), lines, threshold)
        };
        assert_eq!(classify(120, 2), ProfitabilityStatus::Positive);
        assert_eq!(classify(100, 2), ProfitabilityStatus::Warning);
        assert_eq!(classify(-1, 1), ProfitabilityStatus::Critical);
    }
}
