pub mod catalog;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;
pub mod recommendations;

pub use catalog::{CatalogRecords, CatalogRepository, CatalogSnapshot, CatalogSummary};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::basket::{Basket, BasketItem, CustomerContext};
pub use domain::breakdown::{
    MarginBreakdown, MarginFigures, MarginPeriod, NegativeMarginWarning, ProfitabilityStatus,
};
pub use domain::commission::EmployeeOptions;
pub use domain::money::Rounding;
pub use domain::{CatalogVersion, HardwareId, LineId, OfferId, PromoId, TariffId};
pub use engine::bridge::{compare_offers, ItemOutcome, OfferBreakdown, OfferComparison};
pub use engine::{calculate_offer, CachedOfferEngine, EngineSettings, OfferCalculator, OfferEngine};
pub use errors::{
    ApplicationError, CatalogIntegrityError, EngineError, InterfaceError, ValidationError,
};
pub use recommendations::{
    Recommendation, RecommendationContext, RecommendationEngine, RecommendationKind,
    RecommendationStrategy,
};
