//! Discount stacking.
//!
//! Rules run in ascending priority. Percentages compound on the running price, fixed amounts
//! subtract, tiered rules pick their tier from the selection quantity. A negative result is
//! clamped to zero once, after the last rule.

use rust_decimal::Decimal;

use crate::catalog::CatalogSnapshot;
use crate::domain::basket::BasketItem;
use crate::domain::breakdown::{NegativeMarginWarning, WarningKind};
use crate::domain::discount::{AppliedDiscount, DiscountKind, DiscountRule, DiscountTier};
use crate::domain::money::{checked_sub, percent_of, Rounding};
use crate::domain::period::PricePeriod;
use crate::domain::tariff::TariffDefinition;
use crate::domain::PromoId;
use crate::errors::EngineError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscountOutcome {
    pub periods: Vec<PricePeriod>,
    pub applied: Vec<AppliedDiscount>,
    pub warnings: Vec<NegativeMarginWarning>,
}

/// Rules whose condition holds for the item, in stacking order.
pub fn applicable_rules<'a>(
    catalog: &'a CatalogSnapshot,
    tariff: &TariffDefinition,
    item: &BasketItem,
    promotions: &[PromoId],
) -> Vec<&'a DiscountRule> {
    catalog
        .discount_rules()
        .iter()
        .filter(|rule| condition_holds(rule, tariff, item, promotions))
        .collect()
}

fn condition_holds(
    rule: &DiscountRule,
    tariff: &TariffDefinition,
    item: &BasketItem,
    promotions: &[PromoId],
) -> bool {
    let condition = &rule.condition;
    tariff.matches_any_category(&condition.categories)
        && (condition.segments.is_empty() || condition.segments.contains(&tariff.segment))
        && item.customer.has_all_flags(&condition.required_flags)
        && item.selection_lines() >= condition.min_quantity
        && condition.requires_promo.as_ref().map_or(true, |promo| promotions.contains(promo))
}

/// Applies `rules` to every period. `selection_lines` is fixed for the whole resolution.
pub fn apply_discounts(
    rules: &[&DiscountRule],
    periods: &[PricePeriod],
    selection_lines: u32,
    rounding: Rounding,
) -> Result<DiscountOutcome, EngineError> {
    let mut running: Vec<Decimal> = periods.iter().map(|period| period.price).collect();
    let mut applied = Vec::new();

    let mut ordered: Vec<&DiscountRule> = rules.to_vec();
    ordered.sort_by_key(|rule| rule.priority);

    for rule in ordered {
        let (percent, tier_quantity) = match &rule.kind {
            DiscountKind::Percentage { percent } => (Some(*percent), None),
            DiscountKind::FixedAmount { .. } => (None, None),
            DiscountKind::TieredByQuantity { .. } => match rule.tier_for(selection_lines) {
                Some(tier) => (Some(tier.percent), Some(selection_lines)),
                None => continue,
            },
        };

        let mut reductions = Vec::with_capacity(running.len());
        for price in &mut running {
            let reduction = match (&rule.kind, percent) {
                (DiscountKind::FixedAmount { amount }, _) => *amount,
                (_, Some(percent)) => rounding.apply(percent_of(*price, percent, "discount")?),
                (_, None) => Decimal::ZERO,
            };
            *price = checked_sub(*price, reduction, "discount")?;
            reductions.push(reduction);
        }

        applied.push(AppliedDiscount {
            rule_id: rule.id.clone(),
            label: rule.label.clone(),
            kind: rule.kind.label().to_owned(),
            priority: rule.priority,
            reductions,
            tier_quantity,
            percent,
        });
    }

    let mut warnings = Vec::new();
    let periods = periods
        .iter()
        .zip(running)
        .map(|(period, price)| {
            if price.is_sign_negative() {
                warnings.push(NegativeMarginWarning {
                    kind: WarningKind::ClampedPrice,
                    start_month: period.start_month,
                    end_month: period.end_month,
                    amount: price,
                    source: "discounts".to_owned(),
                });
                PricePeriod::new(period.start_month, period.end_month, Decimal::ZERO)
            } else {
                PricePeriod::new(period.start_month, period.end_month, price)
            }
        })
        .collect();

    Ok(DiscountOutcome { periods, applied, warnings })
}

/// The next tier a larger selection would reach, for upsell hints.
pub fn next_tier(rule: &DiscountRule, quantity: u32) -> Option<&DiscountTier> {
    match &rule.kind {
        DiscountKind::TieredByQuantity { tiers } => {
            let current = rule.tier_for(quantity).map_or(Decimal::ZERO, |tier| tier.percent);
            tiers.iter().find(|tier| tier.min_quantity > quantity && tier.percent > current)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{applicable_rules, apply_discounts, next_tier};
    use crate::catalog::CatalogSnapshot;
    use crate::domain::breakdown::WarningKind;
    use crate::domain::discount::{DiscountCondition, DiscountKind, DiscountRule};
    use crate::domain::money::Rounding;
    use crate::domain::period::PricePeriod;
    use crate::domain::{DiscountRuleId, TariffId};
    use crate::fixtures;

    fn team_rule() -> DiscountRule {
        rule("team", DiscountKind::TieredByQuantity { tiers: fixtures::team_deal_tiers() }, 1)
    }

    fn rule(id: &str, kind: DiscountKind, priority: u32) -> DiscountRule {
        DiscountRule {
            id: DiscountRuleId::from(id),
            label: id.to_owned(),
            kind,
            condition: DiscountCondition::default(),
            priority,
        }
    }

    fn whole(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    #[test]
    fn percentages_compound_and_fixed_subtracts_in_priority_order() {
        let ten = rule("ten", DiscountKind::Percentage { percent: whole(10) }, 1);
        let fixed = rule("five-off", DiscountKind::FixedAmount { amount: whole(5) }, 2);
        let again = rule("ten-again", DiscountKind::Percentage { percent: whole(10) }, 3);
        let periods = vec![PricePeriod::new(0, 24, whole(40))];

        // Supplied out of order; the engine sorts by priority.
        let outcome =
            apply_discounts(&[&again, &ten, &fixed], &periods, 1, Rounding::default())
                .expect("discounts");

        // 40 -> 36 -> 31 -> 27.90
        assert_eq!(outcome.periods[0].price, Decimal::new(2790, 2));
        let order: Vec<&str> = outcome.applied.iter().map(|a| a.rule_id.as_str()).collect();
        assert_eq!(order, vec!["ten", "five-off", "ten-again"]);
        assert_eq!(outcome.applied[2].reductions, vec![Decimal::new(310, 2)]);
    }

    #[test]
    fn tier_uses_selection_quantity() {
        let team = team_rule();
        let periods = vec![PricePeriod::new(0, 24, whole(40))];

        let three = apply_discounts(&[&team], &periods, 3, Rounding::default()).expect("tier");
        assert_eq!(three.periods[0].price, whole(38));
        assert_eq!(three.applied[0].tier_quantity, Some(3));
        assert_eq!(three.applied[0].percent, Some(whole(5)));

        let twenty = apply_discounts(&[&team], &periods, 25, Rounding::default()).expect("tier");
        assert_eq!(twenty.periods[0].price, whole(32));

        let none = apply_discounts(&[&team], &periods, 0, Rounding::default()).expect("tier");
        assert!(none.applied.is_empty());
    }

    #[test]
    fn negative_prices_clamp_with_warning() {
        let big = rule("big", DiscountKind::FixedAmount { amount: whole(50) }, 1);
        let periods = vec![PricePeriod::new(0, 6, whole(20)), PricePeriod::new(6, 24, whole(60))];

        let outcome = apply_discounts(&[&big], &periods, 1, Rounding::default()).expect("clamp");

        assert_eq!(outcome.periods[0].price, Decimal::ZERO);
        assert_eq!(outcome.periods[1].price, whole(10));
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, WarningKind::ClampedPrice);
        assert_eq!(outcome.warnings[0].amount, whole(-30));
    }

    #[test]
    fn next_tier_points_at_the_following_step() {
        let team = team_rule();
        assert_eq!(next_tier(&team, 1).map(|tier| tier.min_quantity), Some(2));
        assert_eq!(next_tier(&team, 4).map(|tier| tier.min_quantity), Some(5));
        assert!(next_tier(&team, 20).is_none());
    }

    #[test]
    fn conditions_filter_rules() {
        let catalog =
            CatalogSnapshot::from_records(fixtures::catalog_2025_10()).expect("fixture catalog");
        let tariff = catalog.tariff(&TariffId::from("mobile-m")).expect("tariff");
        let mut item = fixtures::item("line-1", "mobile-m", 2);

        let ids = |rules: Vec<&DiscountRule>| -> Vec<String> {
            rules.iter().map(|rule| rule.id.to_string()).collect()
        };
        assert_eq!(ids(applicable_rules(&catalog, tariff, &item, &[])), vec!["team-deal"]);

        item.customer.flags.insert("soho".to_owned());
        item.customer.flags.insert("fixed_net".to_owned());
        assert_eq!(
            ids(applicable_rules(&catalog, tariff, &item, &[])),
            vec!["team-deal", "soho", "fixed-combo"]
        );

        let fiber = catalog.tariff(&TariffId::from("fixed-250")).expect("tariff");
        assert_eq!(ids(applicable_rules(&catalog, fiber, &item, &[])), vec!["soho"]);
    }
}
