use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CommissionRuleId, PromoId, TariffId};

/// Provision paid to the dealer for a tariff, optionally bound to a promotion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRule {
    pub id: CommissionRuleId,
    #[serde(default)]
    pub tariff_id: Option<TariffId>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub promo_id: Option<PromoId>,
    /// Percent of monthly recurring revenue.
    #[serde(default)]
    pub airtime_percent: Decimal,
    /// Paid once per line in month 0.
    #[serde(default)]
    pub activation_amount: Decimal,
    /// Percent of the subsidised hardware amount, paid in month 0.
    #[serde(default)]
    pub hardware_percent: Decimal,
    /// Clawback withheld from each month's provision; the remainder never drops below zero.
    #[serde(default)]
    pub deduction_percent: Decimal,
}

/// Bonuses paid on top of the rule's provision for the selling employee.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeOptions {
    /// Per line, for tariffs currently pushed by the operator.
    #[serde(default)]
    pub push_bonus: Decimal,
    /// Per line, from the cross-selling quantity tier the customer reached.
    #[serde(default)]
    pub quantity_bonus: Decimal,
}

impl EmployeeOptions {
    pub fn has_negative_bonus(&self) -> bool {
        self.push_bonus.is_sign_negative() || self.quantity_bonus.is_sign_negative()
    }
}

impl CommissionRule {
    /// Ranks tariff+promo > tariff > category+promo > category.
    /// `None` when the rule does not match.
    pub fn specificity(
        &self,
        tariff_id: &TariffId,
        categories: &BTreeSet<String>,
        promos: &[PromoId],
    ) -> Option<u8> {
        let promo_bound = match &self.promo_id {
            Some(promo) if promos.contains(promo) => true,
            Some(_) => return None,
            None => false,
        };
        let rank = match (&self.tariff_id, &self.category) {
            (Some(id), _) if id == tariff_id => 2,
            (Some(_), _) => return None,
            (None, Some(category)) if categories.contains(category) => 0,
            (None, Some(_)) => return None,
            (None, None) => return None,
        };
        Some(rank * 2 + u8::from(promo_bound))
    }
}
