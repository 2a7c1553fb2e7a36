use std::path::Path;

use offerdesk_core::config::LoadOptions;
use offerdesk_core::{CatalogRecords, CatalogSnapshot};

use crate::commands::{
    input_failure, load_config, read_document, to_data, CommandResult, EXIT_INPUT,
};

const COMMAND: &str = "check-catalog";

pub fn run(options: &LoadOptions, path: &Path) -> CommandResult {
    if let Err(failure) = load_config(COMMAND, options) {
        return failure;
    }

    let records: CatalogRecords = match read_document(path) {
        Ok(records) => records,
        Err(error) => return input_failure(COMMAND, error),
    };

    match CatalogSnapshot::from_records(records) {
        Ok(snapshot) => {
            let summary = snapshot.summary();
            CommandResult::success_with_data(
                COMMAND,
                format!(
                    "catalog {} is valid: {} tariffs, {} hardware items, {} promotions",
                    summary.version, summary.tariffs, summary.hardware, summary.promotions
                ),
                to_data(&summary),
            )
        }
        Err(error) => CommandResult::failure_with_data(
            COMMAND,
            "catalog_integrity",
            error.to_string(),
            EXIT_INPUT,
            to_data(&error.defects),
        ),
    }
}
