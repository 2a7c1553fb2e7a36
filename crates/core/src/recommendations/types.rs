use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogSnapshot;
use crate::domain::basket::{Basket, BasketItem};
use crate::domain::LineId;
use crate::engine::bridge::OfferBreakdown;
use crate::engine::waterfall::ItemBreakdown;
use crate::engine::EngineSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// Different tariff in the same segment.
    TariffChange,
    /// Next size up in the same tariff family.
    TariffUpgrade,
    /// More lines to reach the next volume discount tier.
    VolumeTier,
    /// Drop the device to rescue a critical margin.
    SimOnly,
    /// A rebate the customer qualifies for once a flag is confirmed.
    Rebate,
}

impl RecommendationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TariffChange => "tariff_change",
            Self::TariffUpgrade => "tariff_upgrade",
            Self::VolumeTier => "volume_tier",
            Self::SimOnly => "sim_only",
            Self::Rebate => "rebate",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub kind: RecommendationKind,
    pub strategy: String,
    pub title: String,
    #[serde(default)]
    pub line_id: Option<LineId>,
    /// 0.0 ..= 1.0
    pub score: f64,
    /// Change of the item's total margin if accepted.
    pub margin_delta: Decimal,
    /// Change of what the customer pays over the contract.
    pub price_delta: Decimal,
    pub reasoning: Vec<String>,
}

/// Read-only inputs shared by every strategy.
#[derive(Clone, Copy)]
pub struct RecommendationContext<'a> {
    pub catalog: &'a CatalogSnapshot,
    pub basket: &'a Basket,
    pub offer: &'a OfferBreakdown,
    pub settings: EngineSettings,
}

impl<'a> RecommendationContext<'a> {
    /// Priced items paired with the basket item they came from.
    pub fn priced_pairs(&self) -> impl Iterator<Item = (&'a BasketItem, &'a ItemBreakdown)> + 'a {
        let basket = self.basket;
        self.offer.priced_items().filter_map(move |priced| {
            basket
                .items
                .iter()
                .find(|item| item.line_id == priced.line_id)
                .map(|item| (item, priced))
        })
    }
}
