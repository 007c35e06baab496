//! Error types for entregas

use serde::Serialize;
use thiserror::Error;

use crate::types::{Action, EntityKind, LicenseClass, VehicleCategory};

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{kind} not found: {key}")]
    NotFound { kind: EntityKind, key: String },

    #[error("Constraint violation on {kind}: {detail}")]
    ConstraintViolation { kind: EntityKind, detail: String },

    #[error(
        "Capacity exceeded on route {route}: {used} used + {required} required exceeds {max}"
    )]
    CapacityExceeded {
        route: String,
        used: u32,
        required: u32,
        max: u32,
    },

    #[error("License class {license} cannot operate a {category}")]
    IncompatibleLicense {
        license: LicenseClass,
        category: VehicleCategory,
    },

    #[error("Delivery {delivery} is already attached to route {route}")]
    AlreadyAttached { delivery: String, route: String },

    #[error("Delivery {delivery} is not attached to route {route}")]
    NotAttached { delivery: String, route: String },

    #[error("Driver {driver} already operates vehicle {vehicle}")]
    DriverAlreadyAssigned { driver: String, vehicle: String },

    #[error("Forbidden: cannot {action} {kind}")]
    Forbidden { action: Action, kind: EntityKind },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    pub fn not_found(kind: EntityKind, key: impl ToString) -> Self {
        Error::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub fn constraint(kind: EntityKind, detail: impl Into<String>) -> Self {
        Error::ConstraintViolation {
            kind,
            detail: detail.into(),
        }
    }

    /// Name of the violated rule
    pub fn rule(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not-found",
            Error::ConstraintViolation { .. } => "constraint-violation",
            Error::CapacityExceeded { .. } => "capacity-exceeded",
            Error::IncompatibleLicense { .. } => "incompatible-license",
            Error::AlreadyAttached { .. } => "already-attached",
            Error::NotAttached { .. } => "not-attached",
            Error::DriverAlreadyAssigned { .. } => "driver-already-assigned",
            Error::Forbidden { .. } => "forbidden",
            Error::Unauthenticated => "unauthenticated",
            Error::Validation(_) => "validation-error",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Config(_) => "config",
        }
    }

    /// Business-rule and access rejections, as opposed to plumbing faults
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Error::Io(_) | Error::Json(_) | Error::Config(_))
    }

    /// The value that caused the rejection, when there is a single one
    pub fn offending_value(&self) -> Option<String> {
        match self {
            Error::NotFound { key, .. } => Some(key.clone()),
            Error::CapacityExceeded { required, .. } => Some(required.to_string()),
            Error::IncompatibleLicense { license, .. } => Some(license.to_string()),
            Error::AlreadyAttached { delivery, .. }
            | Error::NotAttached { delivery, .. } => Some(delivery.clone()),
            Error::DriverAlreadyAssigned { driver, .. } => Some(driver.clone()),
            Error::Forbidden { kind, .. } => Some(kind.to_string()),
            _ => None,
        }
    }
}

/// Structured rejection reported at the request boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub rule: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl From<&Error> for Rejection {
    fn from(err: &Error) -> Self {
        Self {
            rule: err.rule(),
            message: err.to_string(),
            value: err.offending_value(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
