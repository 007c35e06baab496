//! Composed read views: route dashboard and public tracking lookup

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use entregas_domain::model::{Customer, Delivery, Driver, Route, Vehicle};
use entregas_domain::service::{capacity_ledger, AccessScope, Caller};
use entregas_store::{EntityStore, Records};
use entregas_types::{
    Action, DeliveryStatus, DriverStatus, EntityKind, LicenseClass, Result, RouteId,
    RouteStatus, VehicleCategory, VehicleStatus,
};

use super::LogisticsService;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverSummary {
    pub tax_id: String,
    pub name: String,
    pub phone: String,
    pub license_class: LicenseClass,
    pub status: DriverStatus,
}

impl From<Driver> for DriverSummary {
    fn from(driver: Driver) -> Self {
        Self {
            tax_id: driver.tax_id,
            name: driver.name,
            phone: driver.phone,
            license_class: driver.license_class,
            status: driver.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleSummary {
    pub plate: String,
    pub model: String,
    pub category: VehicleCategory,
    pub max_capacity: u32,
    pub status: VehicleStatus,
}

impl From<Vehicle> for VehicleSummary {
    fn from(vehicle: Vehicle) -> Self {
        Self {
            plate: vehicle.plate,
            model: vehicle.model,
            category: vehicle.category,
            max_capacity: vehicle.max_capacity,
            status: vehicle.status,
        }
    }
}

/// One delivery on a route dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryLine {
    pub tracking_code: String,
    pub customer_name: String,
    pub origin: String,
    pub destination: String,
    pub capacity_required: u32,
    pub status: DeliveryStatus,
    pub requested_on: NaiveDate,
    pub promised_on: NaiveDate,
    pub delivered_on: Option<NaiveDate>,
    pub freight_cents: u64,
    pub notes: Option<String>,
}

/// A route with its operator, vehicle and load.
///
/// `driver` and `vehicle` are `None` when the caller may not read them;
/// `deliveries` holds only the deliveries the caller may read, while the
/// capacity figures always cover the whole route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDashboard {
    pub id: RouteId,
    pub name: String,
    pub description: String,
    pub scheduled_on: NaiveDate,
    pub status: RouteStatus,
    pub estimated_distance_km: u32,
    pub estimated_duration_min: u32,
    pub driver: Option<DriverSummary>,
    pub vehicle: Option<VehicleSummary>,
    pub deliveries: Vec<DeliveryLine>,
    pub used_capacity: u32,
    pub max_capacity: u32,
    pub available_capacity: u32,
}

/// What anyone holding a tracking code may see
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingInfo {
    pub tracking_code: String,
    pub status: DeliveryStatus,
    pub requested_on: NaiveDate,
    pub promised_on: NaiveDate,
    pub delivered_on: Option<NaiveDate>,
    pub destination: String,
}

impl From<Delivery> for TrackingInfo {
    fn from(delivery: Delivery) -> Self {
        Self {
            tracking_code: delivery.tracking_code,
            status: delivery.status,
            requested_on: delivery.requested_on,
            promised_on: delivery.promised_on,
            delivered_on: delivery.delivered_on,
            destination: delivery.destination,
        }
    }
}

fn delivery_line<R: Records>(tx: &R, delivery: Delivery) -> Result<DeliveryLine> {
    let customer_name = tx
        .find::<Customer>(&delivery.customer)?
        .map(|c| c.name)
        .unwrap_or_default();
    Ok(DeliveryLine {
        tracking_code: delivery.tracking_code,
        customer_name,
        origin: delivery.origin,
        destination: delivery.destination,
        capacity_required: delivery.capacity_required,
        status: delivery.status,
        requested_on: delivery.requested_on,
        promised_on: delivery.promised_on,
        delivered_on: delivery.delivered_on,
        freight_cents: delivery.freight_cents,
        notes: delivery.notes,
    })
}

fn build_dashboard<R: Records>(
    tx: &R,
    access: &AccessScope,
    route: Route,
) -> Result<RouteDashboard> {
    let load = capacity_ledger::load(tx, route.id)?;

    let driver = tx
        .find::<Driver>(&route.driver)?
        .filter(|d| access.can_read(d))
        .map(DriverSummary::from);
    let vehicle = tx
        .find::<Vehicle>(&route.vehicle)?
        .filter(|v| access.can_read(v))
        .map(VehicleSummary::from);

    let deliveries = access
        .visible(capacity_ledger::attached(tx, route.id)?)
        .into_iter()
        .map(|d| delivery_line(tx, d))
        .collect::<Result<Vec<_>>>()?;

    Ok(RouteDashboard {
        id: route.id,
        name: route.name,
        description: route.description,
        scheduled_on: route.scheduled_on,
        status: route.status,
        estimated_distance_km: route.estimated_distance_km,
        estimated_duration_min: route.estimated_duration_min,
        driver,
        vehicle,
        deliveries,
        used_capacity: load.used,
        max_capacity: load.max,
        available_capacity: load.available(),
    })
}

impl<S: EntityStore> LogisticsService<S> {
    pub fn dashboard(&self, caller: &Caller, route_id: RouteId) -> Result<RouteDashboard> {
        self.read_as(caller, |tx, access| {
            let route: Route = tx.get(route_id)?;
            access.authorize(Action::Read, &route)?;
            build_dashboard(tx, access, route)
        })
    }

    /// Dashboards of every route the caller may read, in id order
    pub fn dashboards(&self, caller: &Caller) -> Result<Vec<RouteDashboard>> {
        self.read_as(caller, |tx, access| {
            access.authorize_list(EntityKind::Route)?;
            access
                .visible(tx.all::<Route>()?)
                .into_iter()
                .map(|route| build_dashboard(tx, access, route))
                .collect()
        })
    }

    /// Public lookup by tracking code. Knowing the code is what grants it, so
    /// every caller is checked with the anonymous tracking scope.
    pub fn track(&self, caller: &Caller, tracking_code: &str) -> Result<TrackingInfo> {
        debug!(caller = %caller, delivery = tracking_code, "tracking lookup");
        self.store().read(|tx| {
            let access = AccessScope::resolve(tx, &Caller::Anonymous, self.policy())?
                .with_tracking_code(tracking_code);
            let delivery: Delivery = tx.get(tracking_code)?;
            access.authorize(Action::Read, &delivery)?;
            Ok(TrackingInfo::from(delivery))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_tracking_info_keeps_public_fields_only() {
        let mut delivery = Delivery::new("BR1", "900", 5, date(1), date(3))
            .with_addresses("Depot", "Rua A");
        delivery.freight_cents = 1_000;
        delivery.notes = Some("gate code 12".to_string());

        let info = TrackingInfo::from(delivery);
        assert_eq!(info.destination, "Rua A");
        assert_eq!(info.promised_on, date(3));

        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("notes").is_none());
        assert!(json.get("freight_cents").is_none());
        assert!(json.get("customer").is_none());
    }
}
