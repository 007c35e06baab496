//! Vehicle records

use serde::{Deserialize, Serialize};

use entregas_types::{
    Entity, EntityKind, Error, OnDelete, Reference, Result, UniqueKey, VehicleCategory,
    VehicleStatus,
};

use super::{require, require_max_len};

/// A vehicle, keyed by plate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub plate: String,
    pub model: String,
    pub category: VehicleCategory,
    /// Capacity units the vehicle can carry on one route
    pub max_capacity: u32,
    #[serde(default)]
    pub odometer_km: u32,
    #[serde(default)]
    pub status: VehicleStatus,
    /// Driver currently operating the vehicle; a driver operates at most one
    #[serde(default)]
    pub active_driver: Option<String>,
}

impl Vehicle {
    pub fn new(
        plate: impl Into<String>,
        model: impl Into<String>,
        category: VehicleCategory,
        max_capacity: u32,
    ) -> Self {
        Self {
            plate: plate.into(),
            model: model.into(),
            category,
            max_capacity,
            odometer_km: 0,
            status: VehicleStatus::default(),
            active_driver: None,
        }
    }
}

impl Entity for Vehicle {
    const KIND: EntityKind = EntityKind::Vehicle;
    type Key = String;

    fn key(&self) -> String {
        self.plate.clone()
    }

    fn references(&self) -> Vec<Reference> {
        self.active_driver
            .iter()
            .map(|d| Reference::new("active_driver", EntityKind::Driver, d, OnDelete::SetNull))
            .collect()
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        self.active_driver
            .iter()
            .map(|d| UniqueKey::new("active_driver", d))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        require_max_len("vehicle plate", &self.plate, 8)?;
        require("vehicle model", &self.model)?;
        if self.max_capacity == 0 {
            return Err(Error::Validation(format!(
                "vehicle {} max capacity must be positive",
                self.plate
            )));
        }
        Ok(())
    }
}
