use tracing::{debug, warn};

use super::scoring::filter_and_diversify;
use super::strategies::{Advisor, MarginUplift, RecommendationStrategy, Upsell};
use super::types::{Recommendation, RecommendationContext};
use super::{DEFAULT_MAX_RECOMMENDATIONS, DEFAULT_MIN_SCORE, MAX_PER_KIND};
use crate::config::EngineConfig;

pub struct RecommendationEngine {
    strategies: Vec<Box<dyn RecommendationStrategy>>,
    min_score: f64,
    max_recommendations: usize,
    max_per_kind: usize,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SCORE, DEFAULT_MAX_RECOMMENDATIONS)
    }
}

impl RecommendationEngine {
    /// Engine with the margin uplift, upsell and advisor strategies.
    pub fn new(min_score: f64, max_recommendations: usize) -> Self {
        Self::empty(min_score, max_recommendations)
            .with_strategy(MarginUplift)
            .with_strategy(Upsell)
            .with_strategy(Advisor::default())
    }

    pub fn empty(min_score: f64, max_recommendations: usize) -> Self {
        Self {
            strategies: Vec::new(),
            min_score,
            max_recommendations,
            max_per_kind: MAX_PER_KIND,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.min_recommendation_score, config.max_recommendations)
    }

    pub fn with_strategy(mut self, strategy: impl RecommendationStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn with_max_per_kind(mut self, max_per_kind: usize) -> Self {
        self.max_per_kind = max_per_kind;
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|strategy| strategy.name()).collect()
    }

    /// Ranked recommendations; an empty list is a normal outcome.
    pub fn recommend(&self, context: &RecommendationContext<'_>) -> Vec<Recommendation> {
        let mut candidates = Vec::new();
        for strategy in &self.strategies {
            match strategy.recommend(context) {
                Ok(found) => {
                    debug!(
                        event_name = "recommendations.strategy.completed",
                        strategy = strategy.name(),
                        offer_id = %context.offer.offer_id,
                        candidates = found.len(),
                        "recommendation strategy completed"
                    );
                    candidates.extend(found);
                }
                Err(error) => {
                    warn!(
                        event_name = "recommendations.strategy.failed",
                        strategy = strategy.name(),
                        offer_id = %context.offer.offer_id,
                        error_class = error.class(),
                        error = %error,
                        "recommendation strategy failed; skipping"
                    );
                }
            }
        }

        filter_and_diversify(
            candidates,
            self.min_score,
            self.max_recommendations,
            self.max_per_kind,
        )
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::RecommendationEngine;
    use crate::catalog::CatalogSnapshot;
    use crate::domain::breakdown::ProfitabilityStatus;
    use crate::domain::TariffId;
    use crate::engine::{EngineSettings, OfferCalculator, OfferEngine};
    use crate::errors::{EngineError, UNKNOWN_TARIFF};
    use crate::fixtures;
    use crate::recommendations::{
        MarginUplift, Recommendation, RecommendationContext, RecommendationKind,
        RecommendationStrategy, Upsell,
    };

    struct Broken;

    impl RecommendationStrategy for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn recommend(
            &self,
            _context: &RecommendationContext<'_>,
        ) -> Result<Vec<Recommendation>, EngineError> {
            Err(EngineError::validation(UNKNOWN_TARIFF, "broken strategy"))
        }
    }

    fn catalog() -> CatalogSnapshot {
        CatalogSnapshot::from_records(fixtures::catalog_2025_10()).expect("fixture catalog")
    }

    #[test]
    fn margin_uplift_suggests_the_larger_prime_tariff() {
        let catalog = catalog();
        let basket = fixtures::scenario_basket();
        let settings = EngineSettings::default();
        let offer = OfferCalculator::new(settings).calculate(&catalog, &basket).expect("offer");
        let context =
            RecommendationContext { catalog: &catalog, basket: &basket, offer: &offer, settings };

        let found = MarginUplift.recommend(&context).expect("uplift");

        assert!(found.iter().any(|r| r.id == "margin_uplift:line-1:mobile-l"));
        assert!(found.iter().all(|r| r.margin_delta > Decimal::ZERO));
        assert!(found.iter().all(|r| r.id != "margin_uplift:line-1:business-pro"));
    }

    #[test]
    fn upsell_finds_upgrade_volume_step_and_rebates() {
        let catalog = catalog();
        let basket = fixtures::scenario_basket();
        let settings = EngineSettings::default();
        let offer = OfferCalculator::new(settings).calculate(&catalog, &basket).expect("offer");
        let context =
            RecommendationContext { catalog: &catalog, basket: &basket, offer: &offer, settings };

        let found = Upsell.recommend(&context).expect("upsell");
        let kinds: Vec<RecommendationKind> = found.iter().map(|r| r.kind).collect();

        assert!(kinds.contains(&RecommendationKind::TariffUpgrade));
        assert!(kinds.contains(&RecommendationKind::VolumeTier));
        assert!(kinds.contains(&RecommendationKind::Rebate));
        assert!(!kinds.contains(&RecommendationKind::SimOnly));
        assert!(found.iter().any(|r| r.id == "upsell:line-1:soho"));
    }

    #[test]
    fn sim_only_appears_when_margin_is_critical() {
        let catalog = catalog();
        let basket = fixtures::scenario_basket();
        let settings = EngineSettings::default();
        let mut offer =
            OfferCalculator::new(settings).calculate(&catalog, &basket).expect("offer");
        offer.status = ProfitabilityStatus::Critical;
        let context =
            RecommendationContext { catalog: &catalog, basket: &basket, offer: &offer, settings };

        let found = Upsell.recommend(&context).expect("upsell");
        let sim_only = found
            .iter()
            .find(|r| r.kind == RecommendationKind::SimOnly)
            .expect("sim-only suggestion");
        assert!(sim_only.margin_delta > Decimal::ZERO);
    }

    #[test]
    fn failing_strategy_is_skipped() {
        let catalog = catalog();
        let basket = fixtures::scenario_basket();
        let settings = EngineSettings::default();
        let offer = OfferCalculator::new(settings).calculate(&catalog, &basket).expect("offer");
        let context =
            RecommendationContext { catalog: &catalog, basket: &basket, offer: &offer, settings };

        let engine = RecommendationEngine::empty(0.0, 10).with_strategy(Broken);
        assert!(engine.recommend(&context).is_empty());

        let engine =
            RecommendationEngine::empty(0.0, 10).with_strategy(Broken).with_strategy(Upsell);
        assert!(!engine.recommend(&context).is_empty());
    }

    #[test]
    fn ranked_output_is_sorted_capped_and_deterministic() {
        let catalog = catalog();
        let basket = fixtures::family_basket();
        let settings = EngineSettings::default();
        let offer = OfferCalculator::new(settings).calculate(&catalog, &basket).expect("offer");
        let context =
            RecommendationContext { catalog: &catalog, basket: &basket, offer: &offer, settings };
        let engine = RecommendationEngine::new(0.1, 4);

        let first = engine.recommend(&context);
        let second = engine.recommend(&context);

        assert_eq!(first, second);
        assert!(first.len() <= 4);
        assert!(first.windows(2).all(|pair| pair[0].score >= pair[1].score));
        for kind in first.iter().map(|r| r.kind) {
            assert!(first.iter().filter(|r| r.kind == kind).count() <= 2);
        }
        assert_eq!(engine.strategy_names(), vec!["margin_uplift", "upsell", "advisor"]);
    }

    #[test]
    fn failed_items_produce_no_recommendations() {
        let catalog = catalog();
        let mut basket = fixtures::scenario_basket();
        basket.items[0].tariff_id = TariffId::from("unknown");
        let settings = EngineSettings::default();
        let offer = OfferCalculator::new(settings).calculate(&catalog, &basket).expect("offer");
        let context =
            RecommendationContext { catalog: &catalog, basket: &basket, offer: &offer, settings };

        assert!(RecommendationEngine::default().recommend(&context).is_empty());
    }
}
