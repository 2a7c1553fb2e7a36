use std::path::{Path, PathBuf};

use offerdesk_core::config::LoadOptions;
use offerdesk_core::{
    calculate_offer, EngineSettings, OfferCalculator, RecommendationContext, RecommendationEngine,
};

use crate::commands::{
    engine_failure, load_basket, load_config, load_repository, to_data, CommandResult,
};

const COMMAND: &str = "recommend";

pub fn run(options: &LoadOptions, catalogs: &[PathBuf], basket_path: &Path) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let repository = match load_repository(COMMAND, catalogs, &config) {
        Ok(repository) => repository,
        Err(failure) => return failure,
    };
    let basket = match load_basket(COMMAND, basket_path) {
        Ok(basket) => basket,
        Err(failure) => return failure,
    };

    let settings = EngineSettings::from(&config.engine);
    let offer = match calculate_offer(&OfferCalculator::new(settings), &repository, &basket) {
        Ok(offer) => offer,
        Err(error) => return engine_failure(COMMAND, error, &basket),
    };
    let catalog = match repository.get(&basket.catalog_version) {
        Ok(catalog) => catalog,
        Err(error) => return engine_failure(COMMAND, error, &basket),
    };

    let context =
        RecommendationContext { catalog: &catalog, basket: &basket, offer: &offer, settings };
    let recommendations = RecommendationEngine::from_config(&config.engine).recommend(&context);
    CommandResult::success_with_data(
        COMMAND,
        format!("{} recommendation(s) for offer {}", recommendations.len(), offer.offer_id),
        to_data(&recommendations),
    )
}
