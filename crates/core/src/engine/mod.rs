pub mod bridge;
pub mod cache;
pub mod discounts;
pub mod hardware;
pub mod periods;
pub mod promos;
pub mod tariff;
pub mod waterfall;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use self::bridge::{bridge, ItemOutcome, OfferBreakdown};
use self::cache::{cache_key, BreakdownCache};
use self::waterfall::{margin_waterfall, ItemBreakdown};
use crate::catalog::{CatalogRepository, CatalogSnapshot};
use crate::config::EngineConfig;
use crate::domain::basket::{Basket, BasketItem};
use crate::domain::commission::EmployeeOptions;
use crate::domain::money::Rounding;
use crate::errors::{EngineError, CATALOG_VERSION_MISMATCH, NEGATIVE_AMOUNT};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    pub rounding: Rounding,
    pub profitability_threshold: Decimal,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self { rounding: Rounding::default(), profitability_threshold: Decimal::new(50, 0) }
    }
}

impl From<&EngineConfig> for EngineSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            rounding: Rounding::new(config.rounding_decimal_places),
            profitability_threshold: config.profitability_threshold,
        }
    }
}

/// Entry point: a basket plus an explicit catalog snapshot in, an offer breakdown out.
pub trait OfferEngine: Send + Sync {
    fn calculate(
        &self,
        catalog: &CatalogSnapshot,
        basket: &Basket,
    ) -> Result<OfferBreakdown, EngineError>;

    fn settings(&self) -> EngineSettings;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OfferCalculator {
    settings: EngineSettings,
}

impl OfferCalculator {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    /// Runs the full pipeline for one item. Errors affect only this item.
    pub fn price_item(
        &self,
        catalog: &CatalogSnapshot,
        item: &BasketItem,
    ) -> Result<ItemBreakdown, EngineError> {
        let employee = item.customer.employee.as_ref();
        if employee.is_some_and(EmployeeOptions::has_negative_bonus) {
            return Err(EngineError::validation(
                NEGATIVE_AMOUNT,
                format!("line `{}` carries a negative employee bonus", item.line_id),
            ));
        }
        let priced = tariff::price_item(catalog, item, self.settings.rounding)?;
        margin_waterfall(priced, catalog.commission_rules(), employee, self.settings.rounding)
    }
}

impl OfferEngine for OfferCalculator {
    fn calculate(
        &self,
        catalog: &CatalogSnapshot,
        basket: &Basket,
    ) -> Result<OfferBreakdown, EngineError> {
        if catalog.version() != &basket.catalog_version {
            return Err(EngineError::validation(
                CATALOG_VERSION_MISMATCH,
                format!(
                    "basket `{}` targets catalog `{}` but snapshot `{}` was supplied",
                    basket.offer_id,
                    basket.catalog_version,
                    catalog.version()
                ),
            ));
        }

        let items = basket
            .items
            .iter()
            .map(|item| match self.price_item(catalog, item) {
                Ok(breakdown) => {
                    debug!(
                        event_name = "engine.item.priced",
                        offer_id = %basket.offer_id,
                        line_id = %item.line_id,
                        tariff_id = %breakdown.pricing.tariff_id,
                        margin = %breakdown.breakdown.totals.margin,
                        "basket item priced"
                    );
                    ItemOutcome::Priced(Box::new(breakdown))
                }
                Err(error) => {
                    warn!(
                        event_name = "engine.item.failed",
                        offer_id = %basket.offer_id,
                        line_id = %item.line_id,
                        error_class = error.class(),
                        error = %error,
                        "basket item could not be priced"
                    );
                    ItemOutcome::Failed { line_id: item.line_id.clone(), error }
                }
            })
            .collect();

        let offer = bridge(
            basket.offer_id.clone(),
            basket.catalog_version.clone(),
            items,
            self.settings.profitability_threshold,
        );
        info!(
            event_name = "engine.offer.calculated",
            offer_id = %offer.offer_id,
            catalog_version = %offer.catalog_version,
            items = offer.items.len(),
            margin = %offer.total_margin(),
            status = ?offer.status,
            "offer breakdown calculated"
        );
        Ok(offer)
    }

    fn settings(&self) -> EngineSettings {
        self.settings
    }
}

/// Memoizing wrapper; a hit returns a clone of the stored breakdown.
#[derive(Debug)]
pub struct CachedOfferEngine<E> {
    inner: E,
    cache: BreakdownCache,
}

impl<E> CachedOfferEngine<E> {
    pub fn new(inner: E, capacity: usize) -> Self {
        Self { inner, cache: BreakdownCache::new(capacity) }
    }

    pub fn cache(&self) -> &BreakdownCache {
        &self.cache
    }
}

impl<E: OfferEngine> OfferEngine for CachedOfferEngine<E> {
    fn calculate(
        &self,
        catalog: &CatalogSnapshot,
        basket: &Basket,
    ) -> Result<OfferBreakdown, EngineError> {
        let key = cache_key(catalog.version(), basket);
        if let Some(hit) = key.as_deref().and_then(|key| self.cache.get(key)) {
            debug!(
                event_name = "engine.cache.hit",
                offer_id = %basket.offer_id,
                "breakdown cache hit"
            );
            return Ok(hit);
        }

        let offer = self.inner.calculate(catalog, basket)?;
        if let Some(key) = key {
            self.cache.insert(key, offer.clone());
        }
        Ok(offer)
    }

    fn settings(&self) -> EngineSettings {
        self.inner.settings()
    }
}

/// Looks up the basket's catalog version and calculates against it.
pub fn calculate_offer<E: OfferEngine + ?Sized>(
    engine: &E,
    repository: &CatalogRepository,
    basket: &Basket,
) -> Result<OfferBreakdown, EngineError> {
    let catalog = repository.get(&basket.catalog_version)?;
    engine.calculate(&catalog, basket)
}
