//! Offer-level aggregation across basket items.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::waterfall::ItemBreakdown;
use crate::domain::breakdown::{MarginBreakdown, MarginFigures, ProfitabilityStatus};
use crate::domain::money::{checked_add, checked_sub};
use crate::domain::{CatalogVersion, LineId, OfferId};
use crate::errors::EngineError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Priced(Box<ItemBreakdown>),
    Failed { line_id: LineId, error: EngineError },
}

impl ItemOutcome {
    pub fn line_id(&self) -> &LineId {
        match self {
            Self::Priced(item) => &item.line_id,
            Self::Failed { line_id, .. } => line_id,
        }
    }

    pub fn priced(&self) -> Option<&ItemBreakdown> {
        match self {
            Self::Priced(item) => Some(item),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&EngineError> {
        match self {
            Self::Priced(_) => None,
            Self::Failed { error, .. } => Some(error),
        }
    }
}

/// Stable, serializable result handed to storage and rendering collaborators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferBreakdown {
    pub offer_id: OfferId,
    pub catalog_version: CatalogVersion,
    pub duration_months: u32,
    pub items: Vec<ItemOutcome>,
    pub aggregate: MarginBreakdown,
    pub status: ProfitabilityStatus,
    pub priced_lines: u32,
    pub upfront_payment: Decimal,
}

impl OfferBreakdown {
    pub fn priced_items(&self) -> impl Iterator<Item = &ItemBreakdown> {
        self.items.iter().filter_map(ItemOutcome::priced)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&LineId, &EngineError)> {
        self.items.iter().filter_map(|outcome| outcome.error().map(|e| (outcome.line_id(), e)))
    }

    pub fn total_margin(&self) -> Decimal {
        self.aggregate.totals.margin
    }
}

/// Running offer totals; items are folded in one at a time.
#[derive(Clone, Debug, Default)]
struct OfferTotals {
    revenue: Vec<Decimal>,
    cost: Vec<Decimal>,
    provision: Vec<Decimal>,
    upfront_payment: Decimal,
    aggregate: MarginBreakdown,
}

impl OfferTotals {
    /// Totals with `item` added, or the overflow that keeps it out of the offer.
    fn with_item(&self, item: &ItemBreakdown) -> Result<Self, EngineError> {
        let mut next = self.clone();
        let months = next.revenue.len().max(item.breakdown.duration_months as usize);
        next.revenue.resize(months, Decimal::ZERO);
        next.cost.resize(months, Decimal::ZERO);
        next.provision.resize(months, Decimal::ZERO);

        for (month, figures) in item.breakdown.monthly_figures().into_iter().enumerate() {
            next.revenue[month] =
                checked_add(next.revenue[month], figures.revenue, "offer revenue")?;
            next.cost[month] = checked_add(next.cost[month], figures.cost, "offer cost")?;
            next.provision[month] =
                checked_add(next.provision[month], figures.provision, "offer provision")?;
        }
        next.upfront_payment = checked_add(
            next.upfront_payment,
            item.pricing.hardware.upfront_payment,
            "offer upfront",
        )?;
        next.aggregate = monthly_breakdown(&next.revenue, &next.cost, &next.provision)?;
        Ok(next)
    }
}

fn monthly_breakdown(
    revenue: &[Decimal],
    cost: &[Decimal],
    provision: &[Decimal],
) -> Result<MarginBreakdown, EngineError> {
    let monthly: Vec<MarginFigures> = revenue
        .iter()
        .zip(cost)
        .zip(provision)
        .map(|((revenue, cost), provision)| MarginFigures::new(*revenue, *cost, *provision))
        .collect::<Result<_, _>>()?;
    MarginBreakdown::from_monthly(&monthly)
}

/// Sums priced items month by month; shorter timelines are padded with zeros.
///
/// An item whose contribution would overflow the offer totals is turned into a
/// failed outcome and left out, so the remaining items still aggregate.
pub fn aggregate(items: &mut [ItemOutcome]) -> (MarginBreakdown, Decimal) {
    let mut totals = OfferTotals::default();
    for outcome in items.iter_mut() {
        let ItemOutcome::Priced(item) = outcome else {
            continue;
        };
        match totals.with_item(item) {
            Ok(next) => totals = next,
            Err(error) => {
                let line_id = item.line_id.clone();
                warn!(
                    event_name = "engine.offer.item_overflow",
                    line_id = %line_id,
                    error = %error,
                    "basket item excluded from offer totals"
                );
                *outcome = ItemOutcome::Failed { line_id, error };
            }
        }
    }
    (totals.aggregate, totals.upfront_payment)
}

pub fn bridge(
    offer_id: OfferId,
    catalog_version: CatalogVersion,
    mut items: Vec<ItemOutcome>,
    profitability_threshold: Decimal,
) -> OfferBreakdown {
    let (aggregate, upfront_payment) = aggregate(&mut items);
    let priced_lines = items
        .iter()
        .filter_map(ItemOutcome::priced)
        .map(|item| item.pricing.quantity)
        .fold(0_u32, u32::saturating_add);
    let status = ProfitabilityStatus::classify(
        aggregate.totals.margin,
        priced_lines,
        profitability_threshold,
    );

    OfferBreakdown {
        offer_id,
        catalog_version,
        duration_months: aggregate.duration_months,
        items,
        aggregate,
        status,
        priced_lines,
        upfront_payment,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonWinner {
    First,
    Second,
    Tie,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferComparison {
    pub first: OfferId,
    pub second: OfferId,
    /// `first - second` total margin.
    pub margin_difference: Decimal,
    pub revenue_difference: Decimal,
    pub winner: ComparisonWinner,
}

pub fn compare_offers(
    first: &OfferBreakdown,
    second: &OfferBreakdown,
) -> Result<OfferComparison, EngineError> {
    let margin_difference =
        checked_sub(first.total_margin(), second.total_margin(), "margin comparison")?;
    let revenue_difference = checked_sub(
        first.aggregate.totals.revenue,
        second.aggregate.totals.revenue,
        "revenue comparison",
    )?;
    let winner = match margin_difference.cmp(&Decimal::ZERO) {
        Ordering::Greater => ComparisonWinner::First,
        Ordering::Less => ComparisonWinner::Second,
        Ordering::Equal => ComparisonWinner::Tie,
    };
    Ok(OfferComparison {
        first: first.offer_id.clone(),
        second: second.offer_id.clone(),
        margin_difference,
        revenue_difference,
        winner,
    })
}
