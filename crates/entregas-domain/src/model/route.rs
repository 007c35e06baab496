//! Route records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use entregas_types::{Entity, EntityKind, OnDelete, Reference, Result, RouteId, RouteStatus};

use super::require;

/// A planned set of deliveries for one driver and one vehicle on a date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub driver: String,
    pub vehicle: String,
    pub scheduled_on: NaiveDate,
    #[serde(default)]
    pub estimated_distance_km: u32,
    #[serde(default)]
    pub estimated_duration_min: u32,
    #[serde(default)]
    pub status: RouteStatus,
    /// Sum of `capacity_required` over attached deliveries; owned by the
    /// capacity ledger
    #[serde(default)]
    pub used_capacity: u32,
    /// Customers served on this route
    #[serde(default)]
    pub customers: Vec<String>,
}

impl Route {
    pub fn new(
        id: RouteId,
        name: impl Into<String>,
        driver: impl Into<String>,
        vehicle: impl Into<String>,
        scheduled_on: NaiveDate,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            driver: driver.into(),
            vehicle: vehicle.into(),
            scheduled_on,
            estimated_distance_km: 0,
            estimated_duration_min: 0,
            status: RouteStatus::default(),
            used_capacity: 0,
            customers: Vec::new(),
        }
    }
}

impl Entity for Route {
    const KIND: EntityKind = EntityKind::Route;
    type Key = RouteId;

    fn key(&self) -> RouteId {
        self.id
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = vec![
            Reference::new("driver", EntityKind::Driver, &self.driver, OnDelete::Restrict),
            Reference::new("vehicle", EntityKind::Vehicle, &self.vehicle, OnDelete::Restrict),
        ];
        refs.extend(
            self.customers
                .iter()
                .map(|c| Reference::new("customers", EntityKind::Customer, c, OnDelete::Pull)),
        );
        refs
    }

    fn validate(&self) -> Result<()> {
        require("route name", &self.name)?;
        require("route driver", &self.driver)?;
        require("route vehicle", &self.vehicle)
    }
}
