//! Price timeline resolution.
//!
//! The contract is cut at every base-period and promotion boundary. Each resulting segment
//! takes the effect of the highest-priority promotion covering it.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::breakdown::{NegativeMarginWarning, WarningKind};
use crate::domain::money::{checked_sub, percent_of, Rounding};
use crate::domain::period::{merge_adjacent, price_at, require_coverage, PricePeriod};
use crate::domain::promotion::{PromoEffect, Promotion};
use crate::domain::tariff::TariffDefinition;
use crate::domain::PromoId;
use crate::errors::{CoverageDefect, EngineError, PROMO_PRIORITY_TIE};

/// Months in which a promotion actually set the price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedPromotion {
    pub promo_id: PromoId,
    pub label: String,
    pub start_month: u32,
    pub end_month: u32,
    pub customer_visible: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTimeline {
    pub periods: Vec<PricePeriod>,
    pub applied: Vec<AppliedPromotion>,
    pub warnings: Vec<NegativeMarginWarning>,
}

pub fn resolve_periods(
    tariff: &TariffDefinition,
    promotions: &[&Promotion],
    rounding: Rounding,
) -> Result<ResolvedTimeline, EngineError> {
    let duration = tariff.contract_months;
    require_coverage(&tariff.id, &tariff.base_schedule, duration)?;

    let windows: Vec<(&Promotion, (u32, u32))> = promotions
        .iter()
        .filter_map(|promotion| promotion.window(duration).map(|window| (*promotion, window)))
        .collect();

    let mut boundaries: BTreeSet<u32> = BTreeSet::from([0, duration]);
    boundaries.extend(tariff.base_schedule.iter().flat_map(|p| [p.start_month, p.end_month]));
    boundaries.extend(windows.iter().flat_map(|(_, (start, end))| [*start, *end]));
    let boundaries: Vec<u32> = boundaries.into_iter().filter(|month| *month <= duration).collect();

    let mut periods = Vec::with_capacity(boundaries.len());
    let mut applied: Vec<AppliedPromotion> = Vec::new();
    let mut warnings = Vec::new();

    for segment in boundaries.windows(2) {
        let (start, end) = (segment[0], segment[1]);
        let base = price_at(&tariff.base_schedule, start).ok_or_else(|| {
            EngineError::MissingPeriodCoverage {
                tariff_id: tariff.id.clone(),
                defect: CoverageDefect::Gap { from_month: start, to_month: end },
            }
        })?;

        let covering: Vec<&Promotion> = windows
            .iter()
            .filter(|(_, (from, until))| *from <= start && end <= *until)
            .map(|(promotion, _)| *promotion)
            .collect();
        check_priority_ties(&covering, start, end)?;

        let Some(winner) = covering.iter().max_by_key(|promotion| promotion.priority) else {
            periods.push(PricePeriod::new(start, end, base));
            continue;
        };

        let promoted = apply_effect(&winner.effect, base, rounding)?;
        let price = if promoted.is_sign_negative() {
            warnings.push(NegativeMarginWarning {
                kind: WarningKind::ClampedPrice,
                start_month: start,
                end_month: end,
                amount: promoted,
                source: winner.id.to_string(),
            });
            Decimal::ZERO
        } else {
            promoted
        };
        periods.push(PricePeriod::new(start, end, price));
        record_application(&mut applied, winner, start, end);
    }

    let periods = merge_adjacent(periods);
    require_coverage(&tariff.id, &periods, duration)?;
    Ok(ResolvedTimeline { periods, applied, warnings })
}

fn check_priority_ties(covering: &[&Promotion], start: u32, end: u32) -> Result<(), EngineError> {
    let mut seen: BTreeSet<u32> = BTreeSet::new();
    for promotion in covering {
        if !seen.insert(promotion.priority) {
            let rivals: Vec<String> = covering
                .iter()
                .filter(|other| other.priority == promotion.priority)
                .map(|other| other.id.to_string())
                .collect();
            return Err(EngineError::validation(
                PROMO_PRIORITY_TIE,
                format!(
                    "promotions {} share priority {} over months [{start}, {end})",
                    rivals.join(", "),
                    promotion.priority
                ),
            ));
        }
    }
    Ok(())
}

pub fn apply_effect(
    effect: &PromoEffect,
    base: Decimal,
    rounding: Rounding,
) -> Result<Decimal, EngineError> {
    match effect {
        PromoEffect::IntroPrice { price } => Ok(*price),
        PromoEffect::PercentOffBase { percent } => {
            let reduction = rounding.apply(percent_of(base, *percent, "promotion percent")?);
            checked_sub(base, reduction, "promotion percent")
        }
        PromoEffect::AbsoluteOffBase { amount } => checked_sub(base, *amount, "promotion amount"),
    }
}

fn record_application(
    applied: &mut Vec<AppliedPromotion>,
    winner: &Promotion,
    start: u32,
    end: u32,
) {
    if let Some(last) = applied
        .iter_mut()
        .rev()
        .find(|entry| entry.promo_id == winner.id && entry.end_month == start)
    {
        last.end_month = end;
        return;
    }
    applied.push(AppliedPromotion {
        promo_id: winner.id.clone(),
        label: winner.label.clone(),
        start_month: start,
        end_month: end,
        customer_visible: winner.customer_visible,
    });
}
