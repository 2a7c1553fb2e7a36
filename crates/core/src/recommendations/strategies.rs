use rust_decimal::Decimal;

use super::scoring::{balanced_score, ratio_score, AdvisorWeights};
use super::types::{Recommendation, RecommendationContext, RecommendationKind};
use crate::catalog::CatalogSnapshot;
use crate::domain::basket::BasketItem;
use crate::domain::breakdown::ProfitabilityStatus;
use crate::domain::discount::DiscountRule;
use crate::domain::money::checked_sub;
use crate::domain::tariff::TariffDefinition;
use crate::domain::PromoId;
use crate::engine::discounts::{applicable_rules, next_tier};
use crate::engine::promos::check_eligibility;
use crate::engine::waterfall::ItemBreakdown;
use crate::engine::OfferCalculator;
use crate::errors::EngineError;

const HIGH: f64 = 0.9;
const MEDIUM: f64 = 0.7;
const LOW: f64 = 0.5;

/// One way of proposing changes to a calculated offer.
pub trait RecommendationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn recommend(
        &self,
        context: &RecommendationContext<'_>,
    ) -> Result<Vec<Recommendation>, EngineError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Delta {
    margin: Decimal,
    price: Decimal,
}

impl Delta {
    fn between(current: &ItemBreakdown, alternative: &ItemBreakdown) -> Result<Self, EngineError> {
        let current = &current.breakdown.totals;
        let alternative = &alternative.breakdown.totals;
        Ok(Self {
            margin: checked_sub(alternative.margin, current.margin, "recommendation margin delta")?,
            price: checked_sub(alternative.revenue, current.revenue, "recommendation price delta")?,
        })
    }
}

/// Candidate pricing failures just mean "not an option".
fn reprice(context: &RecommendationContext<'_>, item: &BasketItem) -> Option<ItemBreakdown> {
    OfferCalculator::new(context.settings).price_item(context.catalog, item).ok()
}

/// The item moved to `tariff`, keeping only promotions that still apply.
fn switch_tariff(
    catalog: &CatalogSnapshot,
    item: &BasketItem,
    tariff: &TariffDefinition,
) -> BasketItem {
    let mut switched = item.clone();
    switched.tariff_id = tariff.id.clone();
    switched.promotions.retain(|promo_id| {
        catalog
            .promotion(promo_id)
            .is_ok_and(|promotion| check_eligibility(promotion, tariff, &item.customer).is_ok())
    });
    switched
}

fn same_segment_alternatives<'a>(
    catalog: &'a CatalogSnapshot,
    current: &'a TariffDefinition,
) -> impl Iterator<Item = &'a TariffDefinition> + 'a {
    catalog
        .tariffs()
        .filter(move |tariff| tariff.segment == current.segment && tariff.id != current.id)
}

fn recommendation_id(strategy: &str, item: &BasketItem, target: &str) -> String {
    format!("{strategy}:{}:{target}", item.line_id)
}

/// Re-prices each item with every other tariff of its segment and keeps margin gains.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarginUplift;

impl RecommendationStrategy for MarginUplift {
    fn name(&self) -> &'static str {
        "margin_uplift"
    }

    fn recommend(
        &self,
        context: &RecommendationContext<'_>,
    ) -> Result<Vec<Recommendation>, EngineError> {
        let mut recommendations = Vec::new();
        for (item, current) in context.priced_pairs() {
            let base = context.catalog.tariff(&current.pricing.base_tariff)?;
            for candidate in same_segment_alternatives(context.catalog, base) {
                let switched = switch_tariff(context.catalog, item, candidate);
                let Some(alternative) = reprice(context, &switched) else {
                    continue;
                };
                let delta = Delta::between(current, &alternative)?;
                if delta.margin <= Decimal::ZERO {
                    continue;
                }

                recommendations.push(Recommendation {
                    id: recommendation_id(self.name(), item, candidate.id.as_str()),
                    kind: RecommendationKind::TariffChange,
                    strategy: self.name().to_owned(),
                    title: format!("Switch {} to {}", item.line_id, candidate.name),
                    line_id: Some(item.line_id.clone()),
                    score: ratio_score(delta.margin, current.breakdown.totals.revenue),
                    margin_delta: delta.margin,
                    price_delta: delta.price,
                    reasoning: vec![format!(
                        "Margin improves by {} over {} months.",
                        delta.margin, alternative.breakdown.duration_months
                    )],
                });
            }
        }
        Ok(recommendations)
    }
}

/// Next tier in the family, next volume step, SIM-only rescue and unclaimed rebates.
#[derive(Clone, Copy, Debug, Default)]
pub struct Upsell;

impl Upsell {
    fn tariff_upgrade(
        &self,
        context: &RecommendationContext<'_>,
        item: &BasketItem,
        current: &ItemBreakdown,
        base: &TariffDefinition,
    ) -> Result<Option<Recommendation>, EngineError> {
        let Some(rank) = base.tier.map(|tier| tier.rank()) else {
            return Ok(None);
        };
        let next = context.catalog.tariffs().find(|tariff| {
            tariff.family == base.family
                && tariff.segment == base.segment
                && tariff.tier.is_some_and(|tier| tier.rank() == rank + 1)
        });
        let Some(next) = next else {
            return Ok(None);
        };
        let Some(alternative) = reprice(context, &switch_tariff(context.catalog, item, next))
        else {
            return Ok(None);
        };
        let delta = Delta::between(current, &alternative)?;
        if delta.margin < Decimal::ZERO {
            return Ok(None);
        }

        Ok(Some(Recommendation {
            id: recommendation_id(self.name(), item, next.id.as_str()),
            kind: RecommendationKind::TariffUpgrade,
            strategy: self.name().to_owned(),
            title: format!("Upgrade {} to {}", item.line_id, next.name),
            line_id: Some(item.line_id.clone()),
            score: if delta.margin > Decimal::ZERO { HIGH } else { LOW },
            margin_delta: delta.margin,
            price_delta: delta.price,
            reasoning: vec![format!(
                "{} is the next size in the {} family.",
                next.name, base.family
            )],
        }))
    }

    fn volume_tiers(
        &self,
        context: &RecommendationContext<'_>,
        item: &BasketItem,
        current: &ItemBreakdown,
        base: &TariffDefinition,
    ) -> Result<Vec<Recommendation>, EngineError> {
        let lines = item.selection_lines();
        let mut recommendations = Vec::new();
        let rules =
            applicable_rules(context.catalog, base, item, current.pricing.resolved_promotions());
        for rule in rules {
            let Some(tier) = next_tier(rule, lines) else {
                continue;
            };
            let mut grown = item.clone();
            match grown.customer.line_count {
                Some(_) => grown.customer.line_count = Some(tier.min_quantity),
                None => grown.quantity = tier.min_quantity,
            }
            let delta = match reprice(context, &grown) {
                Some(alternative) => Delta::between(current, &alternative)?,
                None => Delta { margin: Decimal::ZERO, price: Decimal::ZERO },
            };
            let missing = tier.min_quantity - lines;

            recommendations.push(Recommendation {
                id: recommendation_id(self.name(), item, rule.id.as_str()),
                kind: RecommendationKind::VolumeTier,
                strategy: self.name().to_owned(),
                title: format!("Add {missing} line(s) to reach {}% {}", tier.percent, rule.label),
                line_id: Some(item.line_id.clone()),
                score: MEDIUM,
                margin_delta: delta.margin,
                price_delta: delta.price,
                reasoning: vec![format!(
                    "{} lines today, the next tier starts at {}.",
                    lines, tier.min_quantity
                )],
            });
        }
        Ok(recommendations)
    }

    fn sim_only(
        &self,
        context: &RecommendationContext<'_>,
        item: &BasketItem,
        current: &ItemBreakdown,
    ) -> Result<Option<Recommendation>, EngineError> {
        if context.offer.status != ProfitabilityStatus::Critical {
            return Ok(None);
        }
        let Some(hardware_id) = item.hardware_id.as_ref() else {
            return Ok(None);
        };
        let mut sim_only = item.clone();
        sim_only.hardware_id = None;
        let Some(alternative) = reprice(context, &sim_only) else {
            return Ok(None);
        };
        let delta = Delta::between(current, &alternative)?;
        if delta.margin <= Decimal::ZERO {
            return Ok(None);
        }

        Ok(Some(Recommendation {
            id: recommendation_id(self.name(), item, "sim-only"),
            kind: RecommendationKind::SimOnly,
            strategy: self.name().to_owned(),
            title: format!("Offer {} without {}", item.line_id, hardware_id),
            line_id: Some(item.line_id.clone()),
            score: HIGH,
            margin_delta: delta.margin,
            price_delta: delta.price,
            reasoning: vec!["The offer margin is critical and the device subsidy drives cost."
                .to_owned()],
        }))
    }

    fn rebates(
        &self,
        context: &RecommendationContext<'_>,
        item: &BasketItem,
        current: &ItemBreakdown,
        base: &TariffDefinition,
    ) -> Result<Vec<Recommendation>, EngineError> {
        let promotions = current.pricing.resolved_promotions();
        let mut recommendations = Vec::new();
        for rule in context.catalog.discount_rules() {
            let missing: Vec<&String> = rule
                .condition
                .required_flags
                .iter()
                .filter(|flag| !item.customer.has_flag(flag))
                .collect();
            if missing.is_empty() {
                continue;
            }
            let mut flagged = item.clone();
            flagged.customer.flags.extend(missing.iter().map(|flag| (*flag).clone()));
            if !rule_applies(context.catalog, base, &flagged, promotions, rule) {
                continue;
            }
            let delta = match reprice(context, &flagged) {
                Some(alternative) => Delta::between(current, &alternative)?,
                None => Delta { margin: Decimal::ZERO, price: Decimal::ZERO },
            };
            let flags = missing.iter().map(|flag| flag.as_str()).collect::<Vec<_>>().join(", ");

            recommendations.push(Recommendation {
                id: recommendation_id(self.name(), item, rule.id.as_str()),
                kind: RecommendationKind::Rebate,
                strategy: self.name().to_owned(),
                title: format!("Check {flags} for {}", rule.label),
                line_id: Some(item.line_id.clone()),
                score: LOW,
                margin_delta: delta.margin,
                price_delta: delta.price,
                reasoning: vec![format!("{} applies once {flags} is confirmed.", rule.label)],
            });
        }
        Ok(recommendations)
    }
}

fn rule_applies(
    catalog: &CatalogSnapshot,
    tariff: &TariffDefinition,
    item: &BasketItem,
    promotions: &[PromoId],
    rule: &DiscountRule,
) -> bool {
    applicable_rules(catalog, tariff, item, promotions)
        .iter()
        .any(|candidate| candidate.id == rule.id)
}

impl RecommendationStrategy for Upsell {
    fn name(&self) -> &'static str {
        "upsell"
    }

    fn recommend(
        &self,
        context: &RecommendationContext<'_>,
    ) -> Result<Vec<Recommendation>, EngineError> {
        let mut recommendations = Vec::new();
        for (item, current) in context.priced_pairs() {
            let base = context.catalog.tariff(&current.pricing.base_tariff)?;
            recommendations.extend(self.tariff_upgrade(context, item, current, base)?);
            recommendations.extend(self.volume_tiers(context, item, current, base)?);
            recommendations.extend(self.sim_only(context, item, current)?);
            recommendations.extend(self.rebates(context, item, current, base)?);
        }
        Ok(recommendations)
    }
}

/// Balances margin against what the customer pays.
#[derive(Clone, Copy, Debug, Default)]
pub struct Advisor {
    weights: AdvisorWeights,
}

impl Advisor {
    pub fn new(weights: AdvisorWeights) -> Self {
        Self { weights }
    }
}

impl RecommendationStrategy for Advisor {
    fn name(&self) -> &'static str {
        "advisor"
    }

    fn recommend(
        &self,
        context: &RecommendationContext<'_>,
    ) -> Result<Vec<Recommendation>, EngineError> {
        let mut recommendations = Vec::new();
        for (item, current) in context.priced_pairs() {
            let base = context.catalog.tariff(&current.pricing.base_tariff)?;
            let revenue = current.breakdown.totals.revenue;
            for candidate in same_segment_alternatives(context.catalog, base) {
                let switched = switch_tariff(context.catalog, item, candidate);
                let Some(alternative) = reprice(context, &switched) else {
                    continue;
                };
                let delta = Delta::between(current, &alternative)?;
                let margin_score = ratio_score(delta.margin, revenue);
                let price_score = ratio_score(-delta.price, revenue);
                let score = balanced_score(self.weights, margin_score, price_score);
                // 0.5 is "no better than today"
                if score <= LOW {
                    continue;
                }

                recommendations.push(Recommendation {
                    id: recommendation_id(self.name(), item, candidate.id.as_str()),
                    kind: RecommendationKind::TariffChange,
                    strategy: self.name().to_owned(),
                    title: format!("Consider {} for {}", candidate.name, item.line_id),
                    line_id: Some(item.line_id.clone()),
                    score,
                    margin_delta: delta.margin,
                    price_delta: delta.price,
                    reasoning: vec![format!(
                        "Margin score {margin_score:.2}, customer price score {price_score:.2}."
                    )],
                });
            }
        }
        Ok(recommendations)
    }
}
