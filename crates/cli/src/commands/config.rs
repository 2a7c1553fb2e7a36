use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use offerdesk_core::config::{ConfigOverrides, LoadOptions};
use serde_json::json;
use toml::Value;

use crate::commands::{load_config, to_data, CommandResult};

const COMMAND: &str = "config";

/// Config keys with their primary and legacy environment variables.
const FIELDS: [(&str, &[&str]); 8] = [
    ("engine.rounding_decimal_places", &["OFFERDESK_ENGINE_ROUNDING_DECIMAL_PLACES"]),
    ("engine.profitability_threshold", &["OFFERDESK_ENGINE_PROFITABILITY_THRESHOLD"]),
    ("engine.cache_capacity", &["OFFERDESK_ENGINE_CACHE_CAPACITY"]),
    ("engine.max_recommendations", &["OFFERDESK_ENGINE_MAX_RECOMMENDATIONS"]),
    ("engine.min_recommendation_score", &["OFFERDESK_ENGINE_MIN_RECOMMENDATION_SCORE"]),
    ("catalog.paths", &["OFFERDESK_CATALOG_PATHS"]),
    ("logging.level", &["OFFERDESK_LOGGING_LEVEL", "OFFERDESK_LOG_LEVEL"]),
    ("logging.format", &["OFFERDESK_LOGGING_FORMAT", "OFFERDESK_LOG_FORMAT"]),
];

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let sources: BTreeMap<&str, String> = FIELDS
        .iter()
        .map(|(key_path, env_keys)| {
            let source = field_source(
                key_path,
                env_keys,
                &options.overrides,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            );
            (*key_path, source)
        })
        .collect();

    CommandResult::success_with_data(
        COMMAND,
        "effective config (source precedence: flag > env > file > default)",
        Some(json!({ "values": to_data(&config), "sources": sources })),
    )
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("offerdesk.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/offerdesk.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    overrides: &ConfigOverrides,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if is_overridden(key_path, overrides) {
        return "flag".to_string();
    }

    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn is_overridden(key_path: &str, overrides: &ConfigOverrides) -> bool {
    match key_path {
        "logging.level" => overrides.log_level.is_some(),
        "logging.format" => overrides.log_format.is_some(),
        "engine.rounding_decimal_places" => overrides.rounding_decimal_places.is_some(),
        "engine.profitability_threshold" => overrides.profitability_threshold.is_some(),
        "engine.max_recommendations" => overrides.max_recommendations.is_some(),
        "catalog.paths" => overrides.catalog_paths.is_some(),
        _ => false,
    }
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
