//! Driver records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use entregas_types::{DriverStatus, Entity, EntityKind, LicenseClass, Result};

use super::{require, require_tax_id};

/// A driver, keyed by tax id.
///
/// The vehicle a driver operates is not stored here; it is the vehicle whose
/// `active_driver` points back at this driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub tax_id: String,
    pub name: String,
    pub phone: String,
    pub registered_on: NaiveDate,
    pub license_class: LicenseClass,
    #[serde(default)]
    pub status: DriverStatus,
}

impl Driver {
    pub fn new(
        tax_id: impl Into<String>,
        name: impl Into<String>,
        license_class: LicenseClass,
        registered_on: NaiveDate,
    ) -> Self {
        Self {
            tax_id: tax_id.into(),
            name: name.into(),
            phone: String::new(),
            registered_on,
            license_class,
            status: DriverStatus::default(),
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }
}

impl Entity for Driver {
    const KIND: EntityKind = EntityKind::Driver;
    type Key = String;

    fn key(&self) -> String {
        self.tax_id.clone()
    }

    fn validate(&self) -> Result<()> {
        require_tax_id("driver tax id", &self.tax_id)?;
        require("driver name", &self.name)
    }
}
