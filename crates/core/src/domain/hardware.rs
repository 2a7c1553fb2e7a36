use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{tariff::TariffDefinition, HardwareId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// Equal monthly share across the contract.
    StraightLine,
    /// Whole subsidy booked in month 0.
    FrontLoaded,
    /// Straight-line across the first `months` months.
    Deferred { months: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsidyRule {
    pub id: String,
    #[serde(default)]
    pub tariff_categories: BTreeSet<String>,
    #[serde(default)]
    pub contract_months: Option<u32>,
    #[serde(default)]
    pub subsidy_level: Option<u8>,
    /// Subsidy per device.
    pub amount: Decimal,
    pub allocation: AllocationStrategy,
}

impl SubsidyRule {
    pub fn matches(&self, tariff: &TariffDefinition) -> bool {
        tariff.matches_any_category(&self.tariff_categories)
            && self.contract_months.map_or(true, |months| months == tariff.contract_months)
            && self.subsidy_level.map_or(true, |level| tariff.subsidy_level == Some(level))
    }

    /// Higher is more specific.
    pub fn specificity(&self) -> u8 {
        u8::from(self.subsidy_level.is_some()) * 4
            + u8::from(self.contract_months.is_some()) * 2
            + u8::from(!self.tariff_categories.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareItem {
    pub id: HardwareId,
    pub name: String,
    pub category: String,
    pub retail_price: Decimal,
    #[serde(default)]
    pub subsidy_rules: Vec<SubsidyRule>,
}

/// Per-month cost booked for the device plus what the customer pays upfront.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareAllocation {
    #[serde(default)]
    pub hardware_id: Option<HardwareId>,
    #[serde(default)]
    pub subsidy_rule: Option<String>,
    pub total_subsidy: Decimal,
    pub upfront_payment: Decimal,
    pub monthly: Vec<Decimal>,
}

impl HardwareAllocation {
    pub fn none(contract_months: u32) -> Self {
        Self { monthly: vec![Decimal::ZERO; contract_months as usize], ..Self::default() }
    }

    pub fn at(&self, month: u32) -> Decimal {
        self.monthly.get(month as usize).copied().unwrap_or_default()
    }
}
