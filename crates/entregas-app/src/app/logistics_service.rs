//! Logistics Service - use cases over the entity store
//!
//! Every use case runs in one store transaction:
//! 1. Resolve the caller's access scope
//! 2. Load the records involved (missing ones report `NotFound`)
//! 3. Authorize the action on each record touched
//! 4. Apply the capacity ledger / eligibility rules and write
//!
//! A rejection at any step leaves the store unchanged.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use entregas_domain::model::{Customer, Delivery, Driver, Route, Vehicle};
use entregas_domain::service::{
    capacity_ledger, eligibility, AccessPolicy, AccessScope, Caller, Detached, Drift, Reconciled,
    RouteLoad, Scoped,
};
use entregas_store::{EntityStore, Records};
use entregas_types::{Action, EntityKind, Result, RouteId, RouteStatus};

/// Fields of a new route; id and capacity bookkeeping are assigned by the service
#[derive(Debug, Clone, Deserialize)]
pub struct RouteDraft {
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
}

impl RouteDraft {
    pub fn new(
        name: impl Into<String>,
        driver: impl Into<String>,
        vehicle: impl Into<String>,
        scheduled_on: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            driver: driver.into(),
            vehicle: vehicle.into(),
            scheduled_on,
            estimated_distance_km: 0,
            estimated_duration_min: 0,
            status: RouteStatus::default(),
        }
    }
}

pub struct LogisticsService<S: EntityStore> {
    store: S,
    policy: AccessPolicy,
}

fn resolve<R: Records>(tx: &R, caller: &Caller, policy: AccessPolicy) -> Result<AccessScope> {
    AccessScope::resolve(tx, caller, policy)
}

impl<S: EntityStore> LogisticsService<S> {
    pub fn new(store: S, policy: AccessPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }

    /// Run a read-only use case with the caller's resolved scope
    pub(crate) fn read_as<T, F>(&self, caller: &Caller, f: F) -> Result<T>
    where
        F: FnOnce(&S::Tx, &AccessScope) -> Result<T>,
    {
        self.store.read(|tx| {
            let access = resolve(tx, caller, self.policy)?;
            f(tx, &access)
        })
    }

    /// Run a writing use case with the caller's resolved scope
    fn write_as<T, F>(&self, caller: &Caller, f: F) -> Result<T>
    where
        F: FnOnce(&mut S::Tx, &AccessScope) -> Result<T>,
    {
        self.store.transaction(|tx| {
            let access = resolve(tx, caller, self.policy)?;
            f(tx, &access)
        })
    }

    // ---- generic record access ----

    /// Records of one kind visible to the caller, in key order
    pub fn list<E: Scoped>(&self, caller: &Caller) -> Result<Vec<E>> {
        self.read_as(caller, |tx, access| {
            access.authorize_list(E::KIND)?;
            Ok(access.visible(tx.all::<E>()?))
        })
    }

    pub fn get<E: Scoped>(&self, caller: &Caller, key: &str) -> Result<E> {
        self.read_as(caller, |tx, access| {
            let record: E = tx.get(key)?;
            access.authorize(Action::Read, &record)?;
            Ok(record)
        })
    }

    /// Delete a record; deliveries leave their route first and drivers leave
    /// their vehicle first
    pub fn delete<E: Scoped>(&self, caller: &Caller, key: &str) -> Result<()> {
        self.write_as(caller, |tx, access| {
            let record: E = tx.get(key)?;
            access.authorize(Action::Delete, &record)?;

            match E::KIND {
                EntityKind::Delivery => {
                    capacity_ledger::release(tx, key)?;
                }
                EntityKind::Driver => {
                    if let Some(vehicle) = eligibility::operated_by(tx, key)? {
                        eligibility::unlink(tx, &vehicle.plate)?;
                    }
                }
                _ => {}
            }

            tx.delete::<E>(key)?;
            info!(kind = %E::KIND, key, "deleted record");
            Ok(())
        })
    }

    // ---- drivers ----

    pub fn create_driver(&self, caller: &Caller, driver: Driver) -> Result<Driver> {
        self.write_as(caller, |tx, access| {
            access.authorize(Action::Create, &driver)?;
            tx.create(driver)
        })
    }

    /// Replace a driver; a license change must still fit the operated vehicle
    pub fn update_driver(&self, caller: &Caller, driver: Driver) -> Result<Driver> {
        self.write_as(caller, |tx, access| {
            let existing: Driver = tx.get(&driver.tax_id)?;
            access.authorize(Action::Update, &existing)?;

            if existing.license_class != driver.license_class {
                if let Some(vehicle) = eligibility::operated_by(tx, &driver.tax_id)? {
                    eligibility::check(&vehicle, &driver)?;
                }
            }
            tx.update(&driver)?;
            Ok(driver)
        })
    }

    // ---- customers ----

    pub fn create_customer(&self, caller: &Caller, customer: Customer) -> Result<Customer> {
        self.write_as(caller, |tx, access| {
            access.authorize(Action::Create, &customer)?;
            tx.create(customer)
        })
    }

    pub fn update_customer(&self, caller: &Caller, customer: Customer) -> Result<Customer> {
        self.write_as(caller, |tx, access| {
            let existing: Customer = tx.get(&customer.tax_id)?;
            access.authorize(Action::Update, &existing)?;
            tx.update(&customer)?;
            Ok(customer)
        })
    }

    // ---- vehicles ----

    /// Create a vehicle; an `active_driver` given here is linked through the
    /// eligibility rules
    pub fn create_vehicle(&self, caller: &Caller, mut vehicle: Vehicle) -> Result<Vehicle> {
        self.write_as(caller, |tx, access| {
            access.authorize(Action::Create, &vehicle)?;
            let driver = vehicle.active_driver.take();
            let plate = vehicle.plate.clone();
            let vehicle = tx.create(vehicle)?;

            match driver {
                Some(driver) => eligibility::link(tx, &plate, &driver),
                None => Ok(vehicle),
            }
        })
    }

    /// Replace a vehicle's fields. The active driver only changes through
    /// `link` / `unlink`; shrinking capacity below a route's load is refused.
    pub fn update_vehicle(&self, caller: &Caller, mut vehicle: Vehicle) -> Result<Vehicle> {
        self.write_as(caller, |tx, access| {
            let existing: Vehicle = tx.get(&vehicle.plate)?;
            access.authorize(Action::Update, &existing)?;

            vehicle.active_driver = existing.active_driver.clone();
            if vehicle.max_capacity != existing.max_capacity {
                capacity_ledger::check_vehicle_capacity(tx, &vehicle.plate, vehicle.max_capacity)?;
            }
            if vehicle.category != existing.category {
                if let Some(driver) = &vehicle.active_driver {
                    eligibility::check(&vehicle, &tx.get::<Driver>(driver)?)?;
                }
            }
            tx.update(&vehicle)?;
            Ok(vehicle)
        })
    }

    pub fn link(&self, caller: &Caller, plate: &str, driver: &str) -> Result<Vehicle> {
        self.write_as(caller, |tx, access| {
            let vehicle: Vehicle = tx.get(plate)?;
            tx.get::<Driver>(driver)?;
            access.authorize(Action::Update, &vehicle)?;
            eligibility::link(tx, plate, driver)
        })
    }

    pub fn unlink(&self, caller: &Caller, plate: &str) -> Result<Vehicle> {
        self.write_as(caller, |tx, access| {
            let vehicle: Vehicle = tx.get(plate)?;
            access.authorize(Action::Update, &vehicle)?;
            eligibility::unlink(tx, plate)
        })
    }

    /// The vehicle a driver operates, if the caller may see it
    pub fn operated_by(&self, caller: &Caller, driver: &str) -> Result<Option<Vehicle>> {
        self.read_as(caller, |tx, access| {
            let record: Driver = tx.get(driver)?;
            access.authorize(Action::Read, &record)?;
            Ok(eligibility::operated_by(tx, driver)?.filter(|v| access.can_read(v)))
        })
    }

    // ---- routes ----

    pub fn create_route(&self, caller: &Caller, draft: RouteDraft) -> Result<Route> {
        self.write_as(caller, |tx, access| {
            let id = RouteId(tx.next_id(EntityKind::Route));
            let mut route = Route::new(id, draft.name, draft.driver, draft.vehicle, draft.scheduled_on);
            route.description = draft.description;
            route.estimated_distance_km = draft.estimated_distance_km;
            route.estimated_duration_min = draft.estimated_duration_min;
            route.status = draft.status;

            access.authorize(Action::Create, &route)?;
            tx.get::<Driver>(&route.driver)?;
            tx.get::<Vehicle>(&route.vehicle)?;
            let route = tx.create(route)?;
            info!(route = %route.id, name = %route.name, "created route");
            Ok(route)
        })
    }

    /// Replace a route's fields. `used_capacity` and `customers` stay owned by
    /// the capacity ledger; moving to a vehicle too small for the load is
    /// refused.
    pub fn update_route(&self, caller: &Caller, mut route: Route) -> Result<Route> {
        self.write_as(caller, |tx, access| {
            let existing: Route = tx.get(route.id)?;
            access.authorize(Action::Update, &existing)?;

            route.used_capacity = existing.used_capacity;
            route.customers = existing.customers.clone();
            if route.vehicle != existing.vehicle {
                capacity_ledger::check_route_vehicle(tx, &existing, &route.vehicle)?;
            }
            tx.update(&route)?;
            Ok(route)
        })
    }

    // ---- deliveries ----

    /// Create a delivery; a `route` given here is attached through the
    /// capacity ledger and needs update rights on that route
    pub fn create_delivery(&self, caller: &Caller, mut delivery: Delivery) -> Result<Delivery> {
        self.write_as(caller, |tx, access| {
            access.authorize(Action::Create, &delivery)?;
            let target = delivery.route.take();
            let code = delivery.tracking_code.clone();

            if let Some(route_id) = target {
                let route: Route = tx.get(route_id)?;
                access.authorize(Action::Update, &route)?;
            }

            let created = tx.create(delivery)?;
            match target {
                Some(route_id) => {
                    capacity_ledger::attach(tx, route_id, &code)?;
                    tx.get(&code)
                }
                None => Ok(created),
            }
        })
    }

    /// Replace a delivery's fields. Route and capacity changes go through the
    /// capacity ledger and need update rights on the routes involved.
    pub fn update_delivery(&self, caller: &Caller, delivery: Delivery) -> Result<Delivery> {
        self.write_as(caller, |tx, access| {
            let code = delivery.tracking_code.clone();
            let existing: Delivery = tx.get(&code)?;
            access.authorize(Action::Update, &existing)?;
            access.authorize(Action::Update, &delivery)?;

            let route_changed = delivery.route != existing.route;
            let resized = delivery.capacity_required != existing.capacity_required;
            if route_changed || resized {
                for route_id in existing.route.iter().chain(delivery.route.iter()) {
                    let route: Route = tx.get(*route_id)?;
                    access.authorize(Action::Update, &route)?;
                }
            }

            // Plain fields first; the ledger owns route and capacity
            let mut staged = delivery.clone();
            staged.route = existing.route;
            staged.capacity_required = existing.capacity_required;
            tx.update(&staged)?;

            if route_changed {
                capacity_ledger::reassign(tx, &code, None)?;
            }
            if resized {
                capacity_ledger::resize(tx, &code, delivery.capacity_required)?;
            }
            if route_changed {
                if let Some(route_id) = delivery.route {
                    capacity_ledger::attach(tx, route_id, &code)?;
                }
            }
            tx.get(&code)
        })
    }

    // ---- capacity ledger ----

    fn authorize_ledger<R: Records>(
        tx: &R,
        access: &AccessScope,
        route_id: Option<RouteId>,
        code: &str,
    ) -> Result<()> {
        let delivery: Delivery = tx.get(code)?;
        let route: Option<Route> = route_id.map(|id| tx.get(id)).transpose()?;
        access.authorize(Action::Update, &delivery)?;
        if let Some(route) = &route {
            access.authorize(Action::Update, route)?;
        }
        Ok(())
    }

    pub fn attach(&self, caller: &Caller, route_id: RouteId, code: &str) -> Result<RouteLoad> {
        self.write_as(caller, |tx, access| {
            Self::authorize_ledger(tx, access, Some(route_id), code)?;
            capacity_ledger::attach(tx, route_id, code)
        })
    }

    pub fn detach(&self, caller: &Caller, route_id: RouteId, code: &str) -> Result<Detached> {
        self.write_as(caller, |tx, access| {
            Self::authorize_ledger(tx, access, Some(route_id), code)?;
            capacity_ledger::detach(tx, route_id, code)
        })
    }

    /// Move a delivery to another route, or off its route with `None`
    pub fn reassign(
        &self,
        caller: &Caller,
        code: &str,
        target: Option<RouteId>,
    ) -> Result<Option<RouteLoad>> {
        self.write_as(caller, |tx, access| {
            let current = tx.get::<Delivery>(code)?.route;
            Self::authorize_ledger(tx, access, current, code)?;
            Self::authorize_ledger(tx, access, target, code)?;
            capacity_ledger::reassign(tx, code, target)
        })
    }

    pub fn resize(&self, caller: &Caller, code: &str, capacity: u32) -> Result<Option<RouteLoad>> {
        self.write_as(caller, |tx, access| {
            let current = tx.get::<Delivery>(code)?.route;
            Self::authorize_ledger(tx, access, current, code)?;
            capacity_ledger::resize(tx, code, capacity)
        })
    }

    pub fn recompute(&self, caller: &Caller, route_id: RouteId) -> Result<Reconciled> {
        self.write_as(caller, |tx, access| {
            let route: Route = tx.get(route_id)?;
            access.authorize(Action::Update, &route)?;
            capacity_ledger::recompute(tx, route_id)
        })
    }

    /// Recompute every route the caller may update
    pub fn recompute_all(&self, caller: &Caller) -> Result<Vec<Reconciled>> {
        self.write_as(caller, |tx, access| {
            access.authorize_kind(Action::Update, EntityKind::Route)?;
            let routes: Vec<Route> = tx.all()?;
            let mut reconciled = Vec::new();
            for route in routes.iter().filter(|r| access.permits(Action::Update, *r)) {
                reconciled.push(capacity_ledger::recompute(tx, route.id)?);
            }
            Ok(reconciled)
        })
    }

    /// Drifted or overloaded routes among those visible to the caller
    pub fn audit(&self, caller: &Caller) -> Result<Vec<Drift>> {
        self.read_as(caller, |tx, access| {
            access.authorize_list(EntityKind::Route)?;
            let mut drifts = Vec::new();
            for drift in capacity_ledger::audit(tx)? {
                if access.can_read(&tx.get::<Route>(drift.route)?) {
                    drifts.push(drift);
                }
            }
            Ok(drifts)
        })
    }

    pub fn available(&self, caller: &Caller, route_id: RouteId) -> Result<RouteLoad> {
        self.read_as(caller, |tx, access| {
            let route: Route = tx.get(route_id)?;
            access.authorize(Action::Read, &route)?;
            capacity_ledger::load(tx, route_id)
        })
    }

    /// Bulk import writes every kind of record; only staff may run it
    pub fn authorize_import(&self, caller: &Caller) -> Result<()> {
        self.read_as(caller, |_, access| {
            for kind in EntityKind::ALL {
                access.authorize_kind(Action::Create, kind)?;
                access.authorize_kind(Action::Update, kind)?;
            }
            Ok(())
        })
    }

    /// Refuse callers that are not allowed a given action at all
    pub fn require(&self, caller: &Caller, action: Action, kind: EntityKind) -> Result<()> {
        self.read_as(caller, |_, access| access.authorize_kind(action, kind))
    }
}

impl<S: EntityStore> std::fmt::Debug for LogisticsService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogisticsService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

