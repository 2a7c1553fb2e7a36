use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{period::PricePeriod, SubVariantRuleId, TariffId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Mobile,
    FixedNet,
    Business,
}

/// Size ladder used by upsell to find the next tariff in a family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TariffTier {
    Xs,
    S,
    M,
    L,
    Xl,
}

impl TariffTier {
    pub fn rank(self) -> u8 {
        match self {
            Self::Xs => 0,
            Self::S => 1,
            Self::M => 2,
            Self::L => 3,
            Self::Xl => 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffDefinition {
    pub id: TariffId,
    pub name: String,
    pub segment: Segment,
    /// Product family, e.g. `prime`; tiers are compared within a family.
    pub family: String,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub tier: Option<TariffTier>,
    pub contract_months: u32,
    pub base_schedule: Vec<PricePeriod>,
    /// Network cost per line and month.
    #[serde(default)]
    pub monthly_cost: Decimal,
    /// Activation fee per line, booked in month 0.
    #[serde(default)]
    pub one_time_fee: Decimal,
    #[serde(default)]
    pub subsidy_level: Option<u8>,
}

impl TariffDefinition {
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.contains(category)
    }

    pub fn matches_any_category(&self, categories: &BTreeSet<String>) -> bool {
        categories.is_empty() || categories.iter().any(|category| self.has_category(category))
    }

    /// Base monthly price of month 0, used for ordering alternatives.
    pub fn headline_price(&self) -> Decimal {
        self.base_schedule.first().map(|period| period.price).unwrap_or_default()
    }
}

/// Rule deriving a tariff variant from a base tariff and the selection context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubVariantRule {
    pub id: SubVariantRuleId,
    pub label: String,
    #[serde(default)]
    pub base_tariff: Option<TariffId>,
    #[serde(default)]
    pub base_category: Option<String>,
    #[serde(default)]
    pub min_lines: u32,
    #[serde(default)]
    pub required_flags: BTreeSet<String>,
    /// Added to every base period price; negative values are rebates.
    #[serde(default)]
    pub monthly_delta: Decimal,
    #[serde(default)]
    pub added_categories: BTreeSet<String>,
}

impl SubVariantRule {
    pub fn applies_to(&self, tariff: &TariffDefinition) -> bool {
        let tariff_match = self.base_tariff.as_ref().map_or(true, |id| *id == tariff.id);
        let category_match =
            self.base_category.as_ref().map_or(true, |category| tariff.has_category(category));
        tariff_match && category_match
    }
}

/// Tariff variant inferred during resolution; never stored in a catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubVariant {
    pub rule_id: SubVariantRuleId,
    pub label: String,
    pub base_tariff: TariffId,
    pub derived: TariffDefinition,
}

pub fn derived_tariff_id(base: &TariffId, rule: &SubVariantRuleId) -> TariffId {
    TariffId(format!("{base}~{rule}"))
}
