//! Per-item pricing: sub-variant inference, then promotions, discounts and hardware.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::discounts::{applicable_rules, apply_discounts};
use super::hardware::hardware_allocation;
use super::periods::{resolve_periods, AppliedPromotion};
use super::promos::resolve_promotions;
use crate::catalog::CatalogSnapshot;
use crate::domain::basket::BasketItem;
use crate::domain::breakdown::NegativeMarginWarning;
use crate::domain::discount::AppliedDiscount;
use crate::domain::hardware::HardwareAllocation;
use crate::domain::money::{checked_add, checked_mul, clamp_non_negative, Rounding};
use crate::domain::period::{price_at, PricePeriod};
use crate::domain::tariff::{derived_tariff_id, SubVariant, SubVariantRule, TariffDefinition};
use crate::domain::{LineId, PromoId, SubVariantRuleId, TariffId};
use crate::errors::EngineError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubVariantSummary {
    pub rule_id: SubVariantRuleId,
    pub label: String,
    pub base_tariff: TariffId,
    pub derived_tariff: TariffId,
}

impl From<&SubVariant> for SubVariantSummary {
    fn from(value: &SubVariant) -> Self {
        Self {
            rule_id: value.rule_id.clone(),
            label: value.label.clone(),
            base_tariff: value.base_tariff.clone(),
            derived_tariff: value.derived.id.clone(),
        }
    }
}

/// Everything the pricing stages decided for one basket item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedItem {
    pub line_id: LineId,
    pub base_tariff: TariffId,
    pub tariff_id: TariffId,
    pub quantity: u32,
    pub contract_months: u32,
    #[serde(default)]
    pub sub_variant: Option<SubVariantSummary>,
    pub promotions: Vec<AppliedPromotion>,
    pub discounts: Vec<AppliedDiscount>,
    /// Final per-line monthly price after promotions and discounts.
    pub price_periods: Vec<PricePeriod>,
    pub hardware: HardwareAllocation,
    pub monthly_revenue: Vec<Decimal>,
    /// Revenue without one-time fees, the base for airtime provision.
    pub monthly_recurring: Vec<Decimal>,
    pub monthly_cost: Vec<Decimal>,
    pub warnings: Vec<NegativeMarginWarning>,
    #[serde(skip)]
    pub(crate) resolved_promotions: Vec<PromoId>,
    #[serde(skip)]
    pub(crate) categories: BTreeSet<String>,
}

impl PricedItem {
    pub fn resolved_promotions(&self) -> &[PromoId] {
        &self.resolved_promotions
    }
}

/// Picks the sub-variant rule for the selection, if any.
///
/// The rule with the highest `min_lines` wins; equal thresholds fall back to the smallest id.
pub fn infer_sub_variant(
    rules: &[SubVariantRule],
    tariff: &TariffDefinition,
    item: &BasketItem,
) -> Result<Option<SubVariant>, EngineError> {
    let lines = item.selection_lines();
    let Some(rule) = rules
        .iter()
        .filter(|rule| rule.applies_to(tariff))
        .filter(|rule| lines >= rule.min_lines)
        .filter(|rule| item.customer.has_all_flags(&rule.required_flags))
        .min_by(|a, b| b.min_lines.cmp(&a.min_lines).then_with(|| a.id.cmp(&b.id)))
    else {
        return Ok(None);
    };

    let mut derived = tariff.clone();
    derived.id = derived_tariff_id(&tariff.id, &rule.id);
    derived.name = format!("{} {}", tariff.name, rule.label);
    derived.categories.extend(rule.added_categories.iter().cloned());
    for period in &mut derived.base_schedule {
        let adjusted = checked_add(period.price, rule.monthly_delta, "sub-variant price")?;
        period.price = clamp_non_negative(adjusted);
    }

    Ok(Some(SubVariant {
        rule_id: rule.id.clone(),
        label: rule.label.clone(),
        base_tariff: tariff.id.clone(),
        derived,
    }))
}

pub fn price_item(
    catalog: &CatalogSnapshot,
    item: &BasketItem,
    rounding: Rounding,
) -> Result<PricedItem, EngineError> {
    let base = catalog.tariff(&item.tariff_id)?;
    let sub_variant = infer_sub_variant(catalog.sub_variant_rules(), base, item)?;
    let tariff = sub_variant.as_ref().map_or(base, |variant| &variant.derived);
    if let Some(variant) = &sub_variant {
        debug!(
            event_name = "engine.sub_variant.inferred",
            line_id = %item.line_id,
            base_tariff = %base.id,
            rule_id = %variant.rule_id,
            "sub-variant substituted for base tariff"
        );
    }

    let promotions = resolve_promotions(catalog, tariff, &item.promotions, &item.customer)?;
    let timeline = resolve_periods(tariff, &promotions, rounding)?;
    let promo_ids: Vec<PromoId> = promotions.iter().map(|promotion| promotion.id.clone()).collect();

    let rules = applicable_rules(catalog, tariff, item, &promo_ids);
    let discounted = apply_discounts(&rules, &timeline.periods, item.selection_lines(), rounding)?;

    let hardware = item.hardware_id.as_ref().map(|id| catalog.hardware(id)).transpose()?;
    let allocation = hardware_allocation(hardware, tariff, item.quantity, rounding)?;

    let quantity = Decimal::from(item.quantity);
    let fee = checked_mul(tariff.one_time_fee, quantity, "activation fee")?;
    let line_cost = checked_mul(tariff.monthly_cost, quantity, "network cost")?;

    let months = tariff.contract_months as usize;
    let mut monthly_recurring = Vec::with_capacity(months);
    let mut monthly_revenue = Vec::with_capacity(months);
    let mut monthly_cost = Vec::with_capacity(months);
    for month in 0..tariff.contract_months {
        let price = price_at(&discounted.periods, month).unwrap_or_default();
        let recurring = checked_mul(price, quantity, "monthly revenue")?;
        let revenue =
            if month == 0 { checked_add(recurring, fee, "monthly revenue")? } else { recurring };
        monthly_recurring.push(recurring);
        monthly_revenue.push(revenue);
        monthly_cost.push(checked_add(line_cost, allocation.at(month), "monthly cost")?);
    }

    let mut warnings = timeline.warnings;
    warnings.extend(discounted.warnings);

    Ok(PricedItem {
        line_id: item.line_id.clone(),
        base_tariff: base.id.clone(),
        tariff_id: tariff.id.clone(),
        quantity: item.quantity,
        contract_months: tariff.contract_months,
        sub_variant: sub_variant.as_ref().map(SubVariantSummary::from),
        promotions: timeline.applied,
        discounts: discounted.applied,
        price_periods: discounted.periods,
        hardware: allocation,
        monthly_revenue,
        monthly_recurring,
        monthly_cost,
        warnings,
        resolved_promotions: promo_ids,
        categories: tariff.categories.clone(),
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{infer_sub_variant, price_item};
    use crate::catalog::CatalogSnapshot;
    use crate::domain::money::Rounding;
    use crate::domain::TariffId;
    use crate::fixtures;

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot::from_records(fixtures::catalog_2025_10()).expect("fixture catalog")
    }

    fn whole(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    #[test]
    fn scenario_item_prices_each_month() {
        let catalog = snapshot();
        let priced =
            price_item(&catalog, &fixtures::scenario_item(), Rounding::default()).expect("priced");

        assert_eq!(priced.monthly_revenue[0], whole(20));
        assert_eq!(priced.monthly_revenue[6], whole(40));
        assert_eq!(priced.monthly_revenue.iter().copied().sum::<Decimal>(), whole(840));
        assert_eq!(priced.monthly_cost[0], whole(20));
        assert_eq!(priced.hardware.total_subsidy, whole(240));
        assert!(priced.sub_variant.is_none());
    }

    #[test]
    fn sub_variant_prefers_highest_line_threshold() {
        let catalog = snapshot();
        let tariff = catalog.tariff(&TariffId::from("mobile-m")).expect("tariff");

        let pair = fixtures::item("line-1", "mobile-m", 2);
        let variant = infer_sub_variant(catalog.sub_variant_rules(), tariff, &pair)
            .expect("inference")
            .expect("family");
        assert_eq!(variant.rule_id.as_str(), "family-2");
        assert_eq!(variant.derived.id.as_str(), "mobile-m~family-2");
        assert_eq!(variant.derived.base_schedule[0].price, whole(35));
        assert!(variant.derived.has_category("family"));

        let mut bundle = fixtures::item("line-1", "mobile-m", 1);
        bundle.customer.line_count = Some(6);
        let variant = infer_sub_variant(catalog.sub_variant_rules(), tariff, &bundle)
            .expect("inference")
            .expect("xl");
        assert_eq!(variant.rule_id.as_str(), "family-5");

        let single = fixtures::item("line-1", "mobile-m", 1);
        let none =
            infer_sub_variant(catalog.sub_variant_rules(), tariff, &single).expect("inference");
        assert!(none.is_none());
    }

    #[test]
    fn sub_variant_inference_is_deterministic() {
        let catalog = snapshot();
        let item = fixtures::item("line-1", "mobile-l", 5);
        let first = price_item(&catalog, &item, Rounding::default()).expect("priced");
        let second = price_item(&catalog, &item, Rounding::default()).expect("priced");
        assert_eq!(first, second);
        assert_eq!(first.tariff_id.as_str(), "mobile-l~family-5");
    }

    #[test]
    fn activation_fee_lands_in_month_zero() {
        let catalog = snapshot();
        let fiber = fixtures::item("line-fiber", "fixed-250", 2);
        let priced = price_item(&catalog, &fiber, Rounding::default()).expect("priced");

        assert_eq!(priced.monthly_revenue[0], Decimal::new(18998, 2));
        assert_eq!(priced.monthly_recurring[0], whole(90));
        assert_eq!(priced.monthly_revenue[1], whole(90));
        assert_eq!(priced.monthly_cost[1], whole(40));
    }

    #[test]
    fn zero_quantity_prices_to_zero() {
        let catalog = snapshot();
        let mut item = fixtures::scenario_item();
        item.quantity = 0;
        let priced = price_item(&catalog, &item, Rounding::default()).expect("priced");

        assert!(priced.monthly_revenue.iter().all(Decimal::is_zero));
        assert!(priced.monthly_cost.iter().all(Decimal::is_zero));
    }
}
