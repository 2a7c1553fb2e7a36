use std::path::{Path, PathBuf};

use offerdesk_core::config::LoadOptions;
use offerdesk_core::{calculate_offer, CachedOfferEngine, EngineSettings, OfferCalculator};

use crate::commands::{
    engine_failure, load_basket, load_config, load_repository, to_data, CommandResult,
};

const COMMAND: &str = "calculate";

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

    let engine = CachedOfferEngine::new(
        OfferCalculator::new(EngineSettings::from(&config.engine)),
        config.engine.cache_capacity,
    );
    match calculate_offer(&engine, &repository, &basket) {
        Ok(offer) => {
            let failed = offer.failures().count();
            CommandResult::success_with_data(
                COMMAND,
                format!(
                    "offer {} calculated: margin {} ({:?}), {} item(s) failed",
                    offer.offer_id,
                    offer.total_margin(),
                    offer.status,
                    failed
                ),
                to_data(&offer),
            )
        }
        Err(error) => engine_failure(COMMAND, error, &basket),
    }
}
