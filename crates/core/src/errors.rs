use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CatalogVersion, PromoId, TariffId};

pub const UNKNOWN_CATALOG_VERSION: &str = "UNKNOWN_CATALOG_VERSION";
pub const CATALOG_VERSION_MISMATCH: &str = "CATALOG_VERSION_MISMATCH";
pub const UNKNOWN_TARIFF: &str = "UNKNOWN_TARIFF";
pub const UNKNOWN_HARDWARE: &str = "UNKNOWN_HARDWARE";
pub const UNKNOWN_PROMOTION: &str = "UNKNOWN_PROMOTION";
pub const PROMO_OUT_OF_WINDOW: &str = "PROMO_OUT_OF_WINDOW";
pub const PROMO_NOT_APPLICABLE: &str = "PROMO_NOT_APPLICABLE";
pub const PROMO_ELIGIBILITY_MISSING: &str = "PROMO_ELIGIBILITY_MISSING";
pub const PROMO_PRIORITY_TIE: &str = "PROMO_PRIORITY_TIE";
pub const DUPLICATE_ID: &str = "DUPLICATE_ID";
pub const INVALID_SCHEDULE: &str = "INVALID_SCHEDULE";
pub const INVALID_CONTRACT: &str = "INVALID_CONTRACT";
pub const NEGATIVE_AMOUNT: &str = "NEGATIVE_AMOUNT";
pub const INVALID_PERCENT: &str = "INVALID_PERCENT";
pub const INVALID_WINDOW: &str = "INVALID_WINDOW";
pub const ASYMMETRIC_EXCLUSION: &str = "ASYMMETRIC_EXCLUSION";
pub const UNKNOWN_EXCLUSION: &str = "UNKNOWN_EXCLUSION";
pub const DUPLICATE_PRIORITY: &str = "DUPLICATE_PRIORITY";
pub const INVALID_TIERS: &str = "INVALID_TIERS";
pub const UNKNOWN_REFERENCE: &str = "UNKNOWN_REFERENCE";

/// Malformed or ineligible catalog/basket data, identified by a stable code.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ValidationError {
    pub code: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self { code: code.to_owned(), message: message.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "defect", rename_all = "snake_case")]
pub enum CoverageDefect {
    #[error("timeline is empty")]
    Empty,
    #[error("timeline starts at month {start_month} instead of 0")]
    LateStart { start_month: u32 },
    #[error("gap between month {from_month} and {to_month}")]
    Gap { from_month: u32, to_month: u32 },
    #[error("periods overlap at month {month}")]
    Overlap { month: u32 },
    #[error("period [{start_month}, {end_month}) is empty")]
    EmptyPeriod { start_month: u32, end_month: u32 },
    #[error("timeline covers {covered_months} months but the contract runs {contract_months}")]
    LengthMismatch { covered_months: u32, contract_months: u32 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineError {
    #[error(transparent)]
    Validation(ValidationError),
    #[error("promotions {first} and {second} cannot be combined")]
    IncompatiblePromo { first: PromoId, second: PromoId },
    #[error("price timeline of tariff {tariff_id} is incomplete: {defect}")]
    MissingPeriodCoverage { tariff_id: TariffId, defect: CoverageDefect },
    #[error("numeric bounds exceeded in {context}")]
    CalculationOverflow { context: String },
}

impl EngineError {
    pub fn validation(code: &str, message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(code, message))
    }

    pub fn overflow(context: &str) -> Self {
        Self::CalculationOverflow { context: context.to_owned() }
    }

    /// Builds the conflict with the pair in sorted order, so `{A, B}` and `{B, A}` match.
    pub fn incompatible(a: &PromoId, b: &PromoId) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self::IncompatiblePromo { first: first.clone(), second: second.clone() }
    }

    /// Stable class name used in logs and interface payloads.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::IncompatiblePromo { .. } => "incompatible_promo",
            Self::MissingPeriodCoverage { .. } => "missing_period_coverage",
            Self::CalculationOverflow { .. } => "calculation_overflow",
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Defects found while loading a catalog snapshot; the snapshot is rejected as a whole.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("catalog {version} failed integrity checks with {} defect(s)", defects.len())]
pub struct CatalogIntegrityError {
    pub version: CatalogVersion,
    pub defects: Vec<ValidationError>,
}

impl CatalogIntegrityError {
    pub fn has_code(&self, code: &str) -> bool {
        self.defects.iter().any(|defect| defect.code == code)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Catalog(#[from] CatalogIntegrityError),
    #[error("input failure: {0}")]
    Input(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The offer could not be calculated. Check the selection and try again."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. } | Self::Internal { correlation_id, .. } => {
                correlation_id
            }
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = "unassigned".to_owned();
        match value {
            ApplicationError::Engine(EngineError::CalculationOverflow { context }) => {
                Self::Internal { message: context, correlation_id: unassigned }
            }
            ApplicationError::Engine(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id: unassigned }
            }
            ApplicationError::Catalog(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id: unassigned }
            }
            ApplicationError::Input(message) => {
                Self::BadRequest { message, correlation_id: unassigned }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: unassigned }
            }
        }
    }
}
