pub mod calculate;
pub mod check_catalog;
pub mod config;
pub mod recommend;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use offerdesk_core::config::{AppConfig, LoadOptions};
use offerdesk_core::{ApplicationError, Basket, CatalogRecords, CatalogRepository, EngineError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub const EXIT_OK: u8 = 0;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INPUT: u8 = 3;
pub const EXIT_ENGINE: u8 = 4;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: EXIT_OK, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::failure_with_data(command, error_class, message, exit_code, None)
    }

    pub fn failure_with_data(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string_pretty(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn to_data<T: Serialize>(value: &T) -> Option<Value> {
    serde_json::to_value(value).ok()
}

pub(crate) fn load_config(
    command: &str,
    options: &LoadOptions,
) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options.clone()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

/// Reads TOML or JSON depending on the file extension.
pub(crate) fn read_document<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read `{}`", path.display()))?;
    match path.extension().and_then(|extension| extension.to_str()) {
        Some("toml") => {
            toml::from_str(&raw).with_context(|| format!("could not parse `{}`", path.display()))
        }
        Some("json") => serde_json::from_str(&raw)
            .with_context(|| format!("could not parse `{}`", path.display())),
        _ => bail!("unsupported file type `{}` (expected .toml or .json)", path.display()),
    }
}

pub(crate) fn input_failure(command: &str, error: anyhow::Error) -> CommandResult {
    CommandResult::failure(command, "input", format!("{error:#}"), EXIT_INPUT)
}

/// Loads every catalog file; explicit paths win over configured ones.
pub(crate) fn load_repository(
    command: &str,
    explicit: &[PathBuf],
    config: &AppConfig,
) -> Result<CatalogRepository, CommandResult> {
    let paths = if explicit.is_empty() { config.catalog.paths.as_slice() } else { explicit };
    if paths.is_empty() {
        return Err(CommandResult::failure(
            command,
            "input",
            "no catalog given (use --catalog or configure catalog.paths)",
            EXIT_INPUT,
        ));
    }

    let mut repository = CatalogRepository::new();
    for path in paths {
        let records: CatalogRecords =
            read_document(path).map_err(|error| input_failure(command, error))?;
        repository.load(records).map_err(|error| {
            CommandResult::failure_with_data(
                command,
                "catalog_integrity",
                error.to_string(),
                EXIT_INPUT,
                to_data(&error.defects),
            )
        })?;
    }
    Ok(repository)
}

pub(crate) fn load_basket(command: &str, path: &Path) -> Result<Basket, CommandResult> {
    read_document(path).map_err(|error| input_failure(command, error))
}

/// Maps an engine failure onto the interface error contract; the offer id is the correlation id.
pub(crate) fn engine_failure(command: &str, error: EngineError, basket: &Basket) -> CommandResult {
    let class = error.class();
    let detail = error.to_string();
    let interface = ApplicationError::from(error).into_interface(basket.offer_id.as_str());
    CommandResult::failure_with_data(
        command,
        class,
        detail,
        EXIT_ENGINE,
        Some(serde_json::json!({
            "correlation_id": interface.correlation_id(),
            "user_message": interface.user_message(),
        })),
    )
}
