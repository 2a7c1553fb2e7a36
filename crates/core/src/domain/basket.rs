use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::commission::EmployeeOptions;
use super::{CatalogVersion, HardwareId, LineId, OfferId, PromoId, TariffId};

/// Selection context the engine reads but never changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContext {
    /// Date promotion validity windows are checked against.
    pub as_of: NaiveDate,
    #[serde(default)]
    pub flags: BTreeSet<String>,
    /// Lines in the customer's bundle when it differs from the item quantity.
    #[serde(default)]
    pub line_count: Option<u32>,
    #[serde(default)]
    pub has_eligibility: bool,
    /// Month-0 bonuses for the selling employee.
    #[serde(default)]
    pub employee: Option<EmployeeOptions>,
}

impl CustomerContext {
    pub fn on(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            flags: BTreeSet::new(),
            line_count: None,
            has_eligibility: false,
            employee: None,
        }
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    pub fn has_all_flags(&self, flags: &BTreeSet<String>) -> bool {
        flags.iter().all(|flag| self.has_flag(flag))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketItem {
    pub line_id: LineId,
    pub tariff_id: TariffId,
    #[serde(default)]
    pub hardware_id: Option<HardwareId>,
    pub quantity: u32,
    #[serde(default)]
    pub promotions: Vec<PromoId>,
    pub customer: CustomerContext,
}

impl BasketItem {
    /// Quantity used for tier and sub-variant selection.
    pub fn selection_lines(&self) -> u32 {
        self.customer.line_count.unwrap_or(self.quantity)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basket {
    pub offer_id: OfferId,
    pub catalog_version: CatalogVersion,
    #[serde(default)]
    pub items: Vec<BasketItem>,
}

impl Basket {
    pub fn total_lines(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).fold(0_u32, u32::saturating_add)
    }
}
