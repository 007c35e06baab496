//! Delivery records

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use entregas_types::{
    DeliveryStatus, Entity, EntityKind, Error, OnDelete, Reference, Result, RouteId,
};

use super::{require, require_max_len};

/// A delivery, keyed by its public tracking code.
///
/// `driver` is independent of the route's driver; a delivery may exist
/// without a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub tracking_code: String,
    pub customer: String,
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub route: Option<RouteId>,
    pub capacity_required: u32,
    pub origin: String,
    pub destination: String,
    pub requested_on: NaiveDate,
    pub promised_on: NaiveDate,
    #[serde(default)]
    pub delivered_on: Option<NaiveDate>,
    /// Freight charged, in cents
    #[serde(default)]
    pub freight_cents: u64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: DeliveryStatus,
}

impl Delivery {
    pub fn new(
        tracking_code: impl Into<String>,
        customer: impl Into<String>,
        capacity_required: u32,
        requested_on: NaiveDate,
        promised_on: NaiveDate,
    ) -> Self {
        Self {
            tracking_code: tracking_code.into(),
            customer: customer.into(),
            driver: None,
            route: None,
            capacity_required,
            origin: String::new(),
            destination: String::new(),
            requested_on,
            promised_on,
            delivered_on: None,
            freight_cents: 0,
            notes: None,
            status: DeliveryStatus::default(),
        }
    }

    pub fn with_addresses(mut self, origin: impl Into<String>, destination: impl Into<String>) -> Self {
        self.origin = origin.into();
        self.destination = destination.into();
        self
    }

    pub fn is_attached_to(&self, route: RouteId) -> bool {
        self.route == Some(route)
    }
}

impl Entity for Delivery {
    const KIND: EntityKind = EntityKind::Delivery;
    type Key = String;

    fn key(&self) -> String {
        self.tracking_code.clone()
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = vec![Reference::new(
            "customer",
            EntityKind::Customer,
            &self.customer,
            OnDelete::Restrict,
        )];
        if let Some(driver) = &self.driver {
            refs.push(Reference::new("driver", EntityKind::Driver, driver, OnDelete::SetNull));
        }
        if let Some(route) = self.route {
            refs.push(Reference::new("route", EntityKind::Route, route, OnDelete::SetNull));
        }
        refs
    }

    fn validate(&self) -> Result<()> {
        require_max_len("tracking code", &self.tracking_code, 11)?;
        require("delivery customer", &self.customer)?;
        if self.capacity_required == 0 {
            return Err(Error::Validation(format!(
                "delivery {} required capacity must be positive",
                self.tracking_code
            )));
        }
        if self.promised_on < self.requested_on {
            return Err(Error::Validation(format!(
                "delivery {} promised date {} is before requested date {}",
                self.tracking_code, self.promised_on, self.requested_on
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let delivery = Delivery::new("BR1", "100", 0, date(1), date(2));
        assert!(matches!(delivery.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_promise_before_request() {
        let delivery = Delivery::new("BR1", "100", 5, date(5), date(2));
        assert!(matches!(delivery.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_references_include_optional_links() {
        let mut delivery = Delivery::new("BR1", "100", 5, date(1), date(2));
        assert_eq!(delivery.references().len(), 1);
        delivery.driver = Some("200".to_string());
        delivery.route = Some(RouteId(3));
        let refs = delivery.references();
        assert_eq!(refs.len(), 3);
        assert!(refs.iter().any(|r| r.target == EntityKind::Route && r.key == "3"));
    }
}
