use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{tariff::Segment, DiscountRuleId, PromoId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountTier {
    pub min_quantity: u32,
    #[serde(default)]
    pub max_quantity: Option<u32>,
    pub percent: Decimal,
}

impl DiscountTier {
    pub fn contains(&self, quantity: u32) -> bool {
        quantity >= self.min_quantity && self.max_quantity.map_or(true, |max| quantity <= max)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountKind {
    Percentage { percent: Decimal },
    FixedAmount { amount: Decimal },
    TieredByQuantity { tiers: Vec<DiscountTier> },
}

impl DiscountKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Percentage { .. } => "percentage",
            Self::FixedAmount { .. } => "fixed_amount",
            Self::TieredByQuantity { .. } => "tiered_by_quantity",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCondition {
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub segments: BTreeSet<Segment>,
    #[serde(default)]
    pub required_flags: BTreeSet<String>,
    #[serde(default)]
    pub min_quantity: u32,
    #[serde(default)]
    pub requires_promo: Option<PromoId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRule {
    pub id: DiscountRuleId,
    pub label: String,
    pub kind: DiscountKind,
    #[serde(default)]
    pub condition: DiscountCondition,
    /// Stacking ordinal; lower applies first. Unique per catalog.
    pub priority: u32,
}

impl DiscountRule {
    pub fn tier_for(&self, quantity: u32) -> Option<&DiscountTier> {
        match &self.kind {
            DiscountKind::TieredByQuantity { tiers } => {
                tiers.iter().find(|tier| tier.contains(quantity))
            }
            _ => None,
        }
    }
}

/// One rule as it was applied to a basket item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub rule_id: DiscountRuleId,
    pub label: String,
    pub kind: String,
    pub priority: u32,
    /// Amount removed from the monthly price, per affected period.
    pub reductions: Vec<Decimal>,
    #[serde(default)]
    pub tier_quantity: Option<u32>,
    #[serde(default)]
    pub percent: Option<Decimal>,
}
