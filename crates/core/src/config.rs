use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::money::MAX_DECIMAL_PLACES;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EngineConfig {
    pub rounding_decimal_places: u32,
    /// Margin per line above which an offer counts as profitable.
    pub profitability_threshold: Decimal,
    pub cache_capacity: usize,
    pub max_recommendations: usize,
    pub min_recommendation_score: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CatalogConfig {
    pub paths: Vec<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub rounding_decimal_places: Option<u32>,
    pub profitability_threshold: Option<Decimal>,
    pub max_recommendations: Option<usize>,
    pub catalog_paths: Option<Vec<PathBuf>>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig {
                rounding_decimal_places: 2,
                profitability_threshold: Decimal::new(50, 0),
                cache_capacity: 256,
                max_recommendations: 5,
                min_recommendation_score: 0.1,
            },
            catalog: CatalogConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("offerdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(engine) = patch.engine {
            if let Some(places) = engine.rounding_decimal_places {
                self.engine.rounding_decimal_places = places;
            }
            if let Some(threshold) = engine.profitability_threshold {
                self.engine.profitability_threshold = threshold;
            }
            if let Some(capacity) = engine.cache_capacity {
                self.engine.cache_capacity = capacity;
            }
            if let Some(max) = engine.max_recommendations {
                self.engine.max_recommendations = max;
            }
            if let Some(score) = engine.min_recommendation_score {
                self.engine.min_recommendation_score = score;
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(paths) = catalog.paths {
                self.catalog.paths = paths;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("OFFERDESK_ENGINE_ROUNDING_DECIMAL_PLACES") {
            self.engine.rounding_decimal_places =
                parse_value("OFFERDESK_ENGINE_ROUNDING_DECIMAL_PLACES", &value)?;
        }
        if let Some(value) = read_env("OFFERDESK_ENGINE_PROFITABILITY_THRESHOLD") {
            self.engine.profitability_threshold =
                parse_value("OFFERDESK_ENGINE_PROFITABILITY_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("OFFERDESK_ENGINE_CACHE_CAPACITY") {
            self.engine.cache_capacity = parse_value("OFFERDESK_ENGINE_CACHE_CAPACITY", &value)?;
        }
        if let Some(value) = read_env("OFFERDESK_ENGINE_MAX_RECOMMENDATIONS") {
            self.engine.max_recommendations =
                parse_value("OFFERDESK_ENGINE_MAX_RECOMMENDATIONS", &value)?;
        }
        if let Some(value) = read_env("OFFERDESK_ENGINE_MIN_RECOMMENDATION_SCORE") {
            self.engine.min_recommendation_score =
                parse_value("OFFERDESK_ENGINE_MIN_RECOMMENDATION_SCORE", &value)?;
        }

        if let Some(value) = read_env("OFFERDESK_CATALOG_PATHS") {
            self.catalog.paths = value
                .split(',')
                .map(str::trim)
                .filter(|path| !path.is_empty())
                .map(PathBuf::from)
                .collect();
        }

        let log_level =
            read_env("OFFERDESK_LOGGING_LEVEL").or_else(|| read_env("OFFERDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("OFFERDESK_LOGGING_FORMAT").or_else(|| read_env("OFFERDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(places) = overrides.rounding_decimal_places {
            self.engine.rounding_decimal_places = places;
        }
        if let Some(threshold) = overrides.profitability_threshold {
            self.engine.profitability_threshold = threshold;
        }
        if let Some(max) = overrides.max_recommendations {
            self.engine.max_recommendations = max;
        }
        if let Some(paths) = overrides.catalog_paths {
            self.catalog.paths = paths;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_engine(&self.engine)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("offerdesk.toml"), PathBuf::from("config/offerdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_engine(engine: &EngineConfig) -> Result<(), ConfigError> {
    if engine.rounding_decimal_places > MAX_DECIMAL_PLACES {
        return Err(ConfigError::Validation(format!(
            "engine.rounding_decimal_places must be in range 0..={MAX_DECIMAL_PLACES}"
        )));
    }

    if engine.profitability_threshold.is_sign_negative() {
        return Err(ConfigError::Validation(
            "engine.profitability_threshold must not be negative".to_string(),
        ));
    }

    if engine.cache_capacity == 0 {
        return Err(ConfigError::Validation(
            "engine.cache_capacity must be greater than zero".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&engine.min_recommendation_score) {
        return Err(ConfigError::Validation(
            "engine.min_recommendation_score must be in range 0.0..=1.0".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    engine: Option<EnginePatch>,
    catalog: Option<CatalogPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct EnginePatch {
    rounding_decimal_places: Option<u32>,
    profitability_threshold: Option<Decimal>,
    cache_capacity: Option<usize>,
    max_recommendations: Option<usize>,
    min_recommendation_score: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    paths: Option<Vec<PathBuf>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid() -> Result<(), String> {
        let config = AppConfig::default();
        config.validate().map_err(|err| err.to_string())?;
        ensure(config.engine.rounding_decimal_places == 2, "default rounding is cents")?;
        ensure(
            config.engine.profitability_threshold == Decimal::new(50, 0),
            "default threshold is 50 per line",
        )?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logs by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_OFFERDESK_CATALOG", "catalogs/2025-10.toml");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("offerdesk.toml");
            fs::write(
                &path,
                r#"
[catalog]
paths = ["${TEST_OFFERDESK_CATALOG}"]

[engine]
profitability_threshold = "75.5"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.catalog.paths == vec![PathBuf::from("catalogs/2025-10.toml")],
                "catalog path should be interpolated from environment",
            )?;
            ensure(
                config.engine.profitability_threshold == Decimal::new(755, 1),
                "threshold should be read from file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_OFFERDESK_CATALOG"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OFFERDESK_LOG_LEVEL", "warn");
        env::set_var("OFFERDESK_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["OFFERDESK_LOG_LEVEL", "OFFERDESK_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OFFERDESK_ENGINE_MAX_RECOMMENDATIONS", "7");
        env::set_var("OFFERDESK_ENGINE_CACHE_CAPACITY", "32");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("offerdesk.toml");
            fs::write(
                &path,
                r#"
[engine]
max_recommendations = 3
cache_capacity = 8
rounding_decimal_places = 3

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    max_recommendations: Some(2),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.engine.max_recommendations == 2, "override should win over env")?;
            ensure(config.engine.cache_capacity == 32, "env should win over file")?;
            ensure(config.engine.rounding_decimal_places == 3, "file should win over defaults")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            Ok(())
        })();

        clear_vars(&["OFFERDESK_ENGINE_MAX_RECOMMENDATIONS", "OFFERDESK_ENGINE_CACHE_CAPACITY"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OFFERDESK_ENGINE_ROUNDING_DECIMAL_PLACES", "9");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("rounding_decimal_places")
            );
            ensure(has_message, "validation failure should mention rounding_decimal_places")
        })();

        clear_vars(&["OFFERDESK_ENGINE_ROUNDING_DECIMAL_PLACES"]);
        result
    }

    #[test]
    fn malformed_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OFFERDESK_ENGINE_PROFITABILITY_THRESHOLD", "lots");

        let result = (|| -> Result<(), String> {
            let error = AppConfig::load(LoadOptions::default())
                .err()
                .ok_or_else(|| "expected invalid override to fail".to_string())?;
            ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. }
                    if key == "OFFERDESK_ENGINE_PROFITABILITY_THRESHOLD"),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["OFFERDESK_ENGINE_PROFITABILITY_THRESHOLD"]);
        result
    }

    #[test]
    fn missing_required_file_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/offerdesk.toml")),
            require_file: true,
            ..LoadOptions::default()
        })
        .err()
        .ok_or_else(|| "expected missing file to fail".to_string())?;

        ensure(matches!(error, ConfigError::MissingConfigFile(_)), "missing file error expected")
    }
}
