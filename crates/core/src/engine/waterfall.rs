//! Provision and per-item margin breakdown.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::tariff::PricedItem;
use crate::domain::breakdown::{MarginBreakdown, MarginFigures, NegativeMarginWarning, WarningKind};
use crate::domain::commission::{CommissionRule, EmployeeOptions};
use crate::domain::money::{
    checked_add, checked_mul, checked_sub, clamp_non_negative, percent_of, Rounding,
};
use crate::domain::{CommissionRuleId, LineId, PromoId, TariffId};
use crate::errors::EngineError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemBreakdown {
    pub line_id: LineId,
    pub pricing: PricedItem,
    #[serde(default)]
    pub commission_rule: Option<CommissionRuleId>,
    pub breakdown: MarginBreakdown,
    pub warnings: Vec<NegativeMarginWarning>,
}

/// Rule with the highest specificity for the selection; ties go to the smallest id.
pub fn select_commission_rule<'a>(
    rules: &'a [CommissionRule],
    tariff_ids: &[&TariffId],
    categories: &BTreeSet<String>,
    promotions: &[PromoId],
) -> Option<&'a CommissionRule> {
    rules
        .iter()
        .filter_map(|rule| {
            tariff_ids
                .iter()
                .filter_map(|id| rule.specificity(id, categories, promotions))
                .max()
                .map(|rank| (rank, rule))
        })
        .min_by(|(rank_a, a), (rank_b, b)| rank_b.cmp(rank_a).then_with(|| a.id.cmp(&b.id)))
        .map(|(_, rule)| rule)
}

/// Monthly provision; zero in any month without revenue and never negative.
///
/// Activation, hardware and employee bonuses are paid in month 0. The rule's
/// clawback is taken from the rule provision before bonuses are added.
pub fn provision_schedule(
    rule: Option<&CommissionRule>,
    employee: Option<&EmployeeOptions>,
    priced: &PricedItem,
    rounding: Rounding,
) -> Result<Vec<Decimal>, EngineError> {
    let quantity = Decimal::from(priced.quantity);
    let one_time = match rule {
        Some(rule) => {
            let activation =
                checked_mul(rule.activation_amount, quantity, "activation provision")?;
            let hardware = rounding.apply(percent_of(
                priced.hardware.total_subsidy,
                rule.hardware_percent,
                "hardware provision",
            )?);
            checked_add(activation, hardware, "hardware provision")?
        }
        None => Decimal::ZERO,
    };
    let bonus = match employee {
        Some(options) => checked_mul(
            checked_add(options.push_bonus, options.quantity_bonus, "employee bonus")?,
            quantity,
            "employee bonus",
        )?,
        None => Decimal::ZERO,
    };

    priced
        .monthly_revenue
        .iter()
        .zip(&priced.monthly_recurring)
        .enumerate()
        .map(|(month, (revenue, recurring))| {
            if revenue.is_zero() {
                return Ok(Decimal::ZERO);
            }
            let mut provision = Decimal::ZERO;
            if let Some(rule) = rule {
                let airtime = percent_of(*recurring, rule.airtime_percent, "airtime provision")?;
                provision = rounding.apply(airtime);
                if month == 0 {
                    provision = checked_add(provision, one_time, "activation provision")?;
                }
                let clawback =
                    rounding.apply(percent_of(provision, rule.deduction_percent, "clawback")?);
                provision = clamp_non_negative(checked_sub(provision, clawback, "clawback")?);
            }
            if month == 0 {
                provision = checked_add(provision, bonus, "employee bonus")?;
            }
            Ok(clamp_non_negative(provision))
        })
        .collect()
}

/// Builds the reconciled breakdown from monthly revenue, cost and provision.
pub fn build_breakdown(
    revenue: &[Decimal],
    cost: &[Decimal],
    provision: &[Decimal],
) -> Result<(MarginBreakdown, Vec<NegativeMarginWarning>), EngineError> {
    let monthly: Vec<MarginFigures> = revenue
        .iter()
        .zip(cost)
        .zip(provision)
        .map(|((revenue, cost), provision)| MarginFigures::new(*revenue, *cost, *provision))
        .collect::<Result<_, _>>()?;

    let breakdown = MarginBreakdown::from_monthly(&monthly)?;
    let warnings = breakdown
        .periods
        .iter()
        .filter(|period| period.monthly.margin.is_sign_negative())
        .map(|period| NegativeMarginWarning {
            kind: WarningKind::NegativeMargin,
            start_month: period.start_month,
            end_month: period.end_month,
            amount: period.monthly.margin,
            source: "margin".to_owned(),
        })
        .collect();
    Ok((breakdown, warnings))
}

pub fn margin_waterfall(
    priced: PricedItem,
    commissions: &[CommissionRule],
    employee: Option<&EmployeeOptions>,
    rounding: Rounding,
) -> Result<ItemBreakdown, EngineError> {
    let rule = select_commission_rule(
        commissions,
        &[&priced.tariff_id, &priced.base_tariff],
        &priced.categories,
        priced.resolved_promotions(),
    );
    if rule.is_none() && priced.quantity > 0 {
        warn!(
            event_name = "engine.provision.no_rule",
            line_id = %priced.line_id,
            tariff_id = %priced.tariff_id,
            "no commission rule matches; provision is zero"
        );
    }

    let provision = provision_schedule(rule, employee, &priced, rounding)?;
    let (breakdown, margin_warnings) =
        build_breakdown(&priced.monthly_revenue, &priced.monthly_cost, &provision)?;

    let mut warnings = priced.warnings.clone();
    warnings.extend(margin_warnings);

    Ok(ItemBreakdown {
        line_id: priced.line_id.clone(),
        commission_rule: rule.map(|rule| rule.id.clone()),
        breakdown,
        warnings,
        pricing: priced,
    })
}
