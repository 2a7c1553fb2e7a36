use offerdesk_core::catalog::CatalogRepository;
use offerdesk_core::domain::breakdown::ProfitabilityStatus;
use offerdesk_core::engine::cache::RecomputeTracker;
use offerdesk_core::errors::{EngineError, PROMO_ELIGIBILITY_MISSING};
use offerdesk_core::{
    calculate_offer, fixtures, CachedOfferEngine, EngineSettings, ItemOutcome, OfferCalculator,
    OfferEngine, PromoId, RecommendationContext, RecommendationEngine,
};
use rust_decimal::Decimal;

fn repository() -> Result<CatalogRepository, String> {
    let mut repository = CatalogRepository::new();
    repository.load(fixtures::catalog_2025_09()).map_err(|error| error.to_string())?;
    repository.load(fixtures::catalog_2025_10()).map_err(|error| error.to_string())?;
    Ok(repository)
}

fn ensure(condition: bool, message: impl Into<String>) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(message.into())
    }
}

#[test]
fn intro_promo_with_subsidised_phone_yields_expected_totals() -> Result<(), String> {
    let repository = repository()?;
    let engine = OfferCalculator::new(EngineSettings::default());

    let offer = calculate_offer(&engine, &repository, &fixtures::scenario_basket())
        .map_err(|error| error.to_string())?;

    let item = offer.priced_items().next().ok_or("scenario item must price")?;
    let prices: Vec<(u32, u32, Decimal)> = item
        .pricing
        .price_periods
        .iter()
        .map(|period| (period.start_month, period.end_month, period.price))
        .collect();
    ensure(
        prices == vec![(0, 6, Decimal::new(20, 0)), (6, 24, Decimal::new(40, 0))],
        format!("unexpected price periods {prices:?}"),
    )?;
    ensure(
        offer.aggregate.totals.revenue == Decimal::new(840, 0),
        format!("revenue was {}", offer.aggregate.totals.revenue),
    )?;
    ensure(
        offer.aggregate.totals.cost == Decimal::new(480, 0),
        format!("cost was {}", offer.aggregate.totals.cost),
    )?;
    ensure(offer.aggregate.is_reconciled(), "aggregate must reconcile")?;
    ensure(offer.status == ProfitabilityStatus::Positive, "scenario margin should be positive")?;
    ensure(offer.upfront_payment == Decimal::new(259, 0), "upfront should be 499 - 240")
}

#[test]
fn incompatible_promotions_fail_the_item_without_touching_prior_results() -> Result<(), String> {
    let repository = repository()?;
    let engine = CachedOfferEngine::new(OfferCalculator::default(), 8);
    let tracker = RecomputeTracker::new();
    let basket = fixtures::scenario_basket();

    let first_generation = tracker.begin(&basket.offer_id);
    let prior = calculate_offer(&engine, &repository, &basket).map_err(|error| error.to_string())?;
    let prior = tracker
        .accept(&basket.offer_id, first_generation, prior)
        .ok_or("first generation must be current")?;

    let mut conflicting = basket.clone();
    conflicting.items[0].promotions.push(PromoId::from("loyalty-10"));
    conflicting.items[0].customer.has_eligibility = true;
    let second_generation = tracker.begin(&basket.offer_id);
    let rejected =
        calculate_offer(&engine, &repository, &conflicting).map_err(|error| error.to_string())?;

    let error = rejected.items[0].error().ok_or("conflicting item must fail")?;
    ensure(
        *error
            == EngineError::IncompatiblePromo {
                first: PromoId::from("intro-6"),
                second: PromoId::from("loyalty-10"),
            },
        format!("unexpected error {error}"),
    )?;
    ensure(tracker.is_current(&basket.offer_id, second_generation), "latest generation")?;
    ensure(!tracker.is_current(&basket.offer_id, first_generation), "stale generation")?;

    let again = calculate_offer(&engine, &repository, &basket).map_err(|error| error.to_string())?;
    ensure(again == prior, "prior breakdown must be unchanged")?;
    ensure(engine.cache().len() == 2, "both baskets are cached separately")
}

#[test]
fn eligibility_is_checked_before_exclusions() -> Result<(), String> {
    let repository = repository()?;
    let mut basket = fixtures::scenario_basket();
    basket.items[0].promotions.push(PromoId::from("loyalty-10"));

    let offer = calculate_offer(&OfferCalculator::default(), &repository, &basket)
        .map_err(|error| error.to_string())?;

    match &offer.items[0] {
        ItemOutcome::Failed { error: EngineError::Validation(validation), .. } => ensure(
            validation.code == PROMO_ELIGIBILITY_MISSING,
            format!("unexpected code {}", validation.code),
        ),
        other => Err(format!("expected an eligibility failure, got {other:?}")),
    }
}

#[test]
fn family_basket_infers_sub_variant_and_recommends() -> Result<(), String> {
    let repository = repository()?;
    let basket = fixtures::family_basket();
    let catalog = repository.get(&basket.catalog_version).map_err(|error| error.to_string())?;
    let engine = OfferCalculator::default();

    let offer = engine.calculate(&catalog, &basket).map_err(|error| error.to_string())?;

    let family = offer
        .priced_items()
        .find(|item| item.line_id.as_str() == "line-family")
        .ok_or("family line must price")?;
    let variant = family.pricing.sub_variant.as_ref().ok_or("family-2 should apply")?;
    ensure(variant.derived_tariff.as_str() == "mobile-m~family-2", "derived tariff id")?;
    ensure(offer.priced_items().count() == 2, "both lines priced")?;

    let context = RecommendationContext {
        catalog: &catalog,
        basket: &basket,
        offer: &offer,
        settings: engine.settings(),
    };
    let recommendations = RecommendationEngine::default().recommend(&context);
    ensure(recommendations.len() <= 5, "default maximum is five")?;
    ensure(
        recommendations.iter().all(|recommendation| recommendation.score >= 0.1),
        "minimum score is applied",
    )
}
