use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{tariff::TariffDefinition, PromoId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromoEffect {
    /// Replaces the base price inside the promo window.
    IntroPrice { price: Decimal },
    PercentOffBase { percent: Decimal },
    AbsoluteOffBase { amount: Decimal },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub id: PromoId,
    pub label: String,
    /// Tariff categories the promotion applies to; empty means any tariff.
    #[serde(default)]
    pub categories: BTreeSet<String>,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub effect: PromoEffect,
    #[serde(default)]
    pub start_month: u32,
    /// `0` runs until contract end.
    #[serde(default)]
    pub duration_months: u32,
    pub priority: u32,
    #[serde(default)]
    pub excludes: BTreeSet<PromoId>,
    #[serde(default)]
    pub exclusive_group: Option<String>,
    #[serde(default)]
    pub requires_eligibility: bool,
    #[serde(default = "default_true")]
    pub customer_visible: bool,
}

fn default_true() -> bool {
    true
}

impl Promotion {
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.valid_from <= date && date <= self.valid_until
    }

    pub fn applies_to(&self, tariff: &TariffDefinition) -> bool {
        tariff.matches_any_category(&self.categories)
    }

    /// Month window clipped to the contract, `None` when it starts after the contract ends.
    pub fn window(&self, contract_months: u32) -> Option<(u32, u32)> {
        if self.start_month >= contract_months {
            return None;
        }
        let end = if self.duration_months == 0 {
            contract_months
        } else {
            self.start_month.saturating_add(self.duration_months).min(contract_months)
        };
        Some((self.start_month, end))
    }
}
