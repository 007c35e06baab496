//! Route capacity ledger
//!
//! Keeps `Route::used_capacity` equal to the sum of `capacity_required` over
//! the deliveries attached to the route, and never above the route vehicle's
//! `max_capacity`. Attaching, detaching, reassigning and resizing deliveries
//! all go through here.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use entregas_store::Records;
use entregas_types::{Error, Result, RouteId};

use crate::model::{Delivery, Route, Vehicle};

/// Capacity figures of one route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteLoad {
    pub route: RouteId,
    pub used: u32,
    pub max: u32,
}

impl RouteLoad {
    /// Remaining capacity, zero when the route is full (or over)
    pub fn available(&self) -> u32 {
        self.max.saturating_sub(self.used)
    }
}

/// Outcome of a detach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Detached {
    pub load: RouteLoad,
    /// How far below zero the counter would have gone; `Some` means the
    /// stored counter was already inconsistent
    pub underflow: Option<u32>,
}

/// Outcome of a recompute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reconciled {
    pub load: RouteLoad,
    /// Counter value before the recompute
    pub previous: u32,
}

impl Reconciled {
    pub fn drifted(&self) -> bool {
        self.previous != self.load.used
    }
}

/// A route whose stored counter disagrees with its attached deliveries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Drift {
    pub route: RouteId,
    pub stored: u32,
    pub actual: u64,
    pub max: u32,
}

impl Drift {
    pub fn over_capacity(&self) -> bool {
        self.actual > u64::from(self.max)
    }
}

/// New total if `required` more units fit on top of `used`
pub fn check_capacity(route: RouteId, used: u32, required: u32, max: u32) -> Result<u32> {
    match used.checked_add(required) {
        Some(total) if total <= max => Ok(total),
        _ => Err(Error::CapacityExceeded {
            route: route.to_string(),
            used,
            required,
            max,
        }),
    }
}

fn load_of<R: Records>(tx: &R, route: &Route) -> Result<RouteLoad> {
    let vehicle: Vehicle = tx.get(&route.vehicle)?;
    Ok(RouteLoad {
        route: route.id,
        used: route.used_capacity,
        max: vehicle.max_capacity,
    })
}

/// Current capacity figures of a route
pub fn load<R: Records>(tx: &R, route_id: RouteId) -> Result<RouteLoad> {
    let route: Route = tx.get(route_id)?;
    load_of(tx, &route)
}

/// `max_capacity - used_capacity` of a route
pub fn available<R: Records>(tx: &R, route_id: RouteId) -> Result<u32> {
    Ok(load(tx, route_id)?.available())
}

/// Deliveries currently attached to a route
pub fn attached<R: Records>(tx: &R, route_id: RouteId) -> Result<Vec<Delivery>> {
    tx.filter(|d: &Delivery| d.is_attached_to(route_id))
}

fn attached_sum<R: Records>(tx: &R, route_id: RouteId) -> Result<u64> {
    Ok(attached(tx, route_id)?
        .iter()
        .map(|d| u64::from(d.capacity_required))
        .sum())
}

/// Attach a delivery to a route.
///
/// Fails with `CapacityExceeded` when the delivery does not fit in the
/// remaining capacity (including a delivery larger than the vehicle itself)
/// and `AlreadyAttached` when it sits on another route. Attaching to the
/// route it is already on changes nothing.
pub fn attach<R: Records>(tx: &mut R, route_id: RouteId, tracking_code: &str) -> Result<RouteLoad> {
    let mut route: Route = tx.get(route_id)?;
    let mut delivery: Delivery = tx.get(tracking_code)?;
    let vehicle: Vehicle = tx.get(&route.vehicle)?;

    match delivery.route {
        Some(current) if current == route_id => {
            debug!(route = %route_id, delivery = tracking_code, "delivery already on route");
            return load_of(tx, &route);
        }
        Some(current) => {
            return Err(Error::AlreadyAttached {
                delivery: delivery.tracking_code,
                route: current.to_string(),
            });
        }
        None => {}
    }

    let used = check_capacity(
        route_id,
        route.used_capacity,
        delivery.capacity_required,
        vehicle.max_capacity,
    )?;

    delivery.route = Some(route_id);
    route.used_capacity = used;
    if !route.customers.contains(&delivery.customer) {
        route.customers.push(delivery.customer.clone());
    }

    tx.update(&delivery)?;
    tx.update(&route)?;

    info!(
        route = %route_id,
        delivery = tracking_code,
        used,
        max = vehicle.max_capacity,
        "attached delivery"
    );
    Ok(RouteLoad {
        route: route_id,
        used,
        max: vehicle.max_capacity,
    })
}

/// Detach a delivery from a route; `NotAttached` if it is not on that route
pub fn detach<R: Records>(tx: &mut R, route_id: RouteId, tracking_code: &str) -> Result<Detached> {
    let mut route: Route = tx.get(route_id)?;
    let mut delivery: Delivery = tx.get(tracking_code)?;

    if !delivery.is_attached_to(route_id) {
        return Err(Error::NotAttached {
            delivery: delivery.tracking_code,
            route: route_id.to_string(),
        });
    }

    let required = delivery.capacity_required;
    let (used, underflow) = match route.used_capacity.checked_sub(required) {
        Some(used) => (used, None),
        None => {
            let short = required - route.used_capacity;
            warn!(
                route = %route_id,
                delivery = tracking_code,
                stored = route.used_capacity,
                required,
                "route capacity counter below attached delivery; clamping at zero"
            );
            (0, Some(short))
        }
    };

    delivery.route = None;
    route.used_capacity = used;

    tx.update(&delivery)?;
    tx.update(&route)?;

    info!(route = %route_id, delivery = tracking_code, used, "detached delivery");
    let load = load_of(tx, &route)?;
    Ok(Detached { load, underflow })
}

/// Move a delivery to `target` (or off any route when `None`).
///
/// Run inside one transaction: if the attach fails the detach is discarded
/// with it.
pub fn reassign<R: Records>(
    tx: &mut R,
    tracking_code: &str,
    target: Option<RouteId>,
) -> Result<Option<RouteLoad>> {
    let delivery: Delivery = tx.get(tracking_code)?;
    if delivery.route == target {
        return target.map(|route_id| load(tx, route_id)).transpose();
    }

    if let Some(current) = delivery.route {
        detach(tx, current, tracking_code)?;
    }

    match target {
        Some(route_id) => attach(tx, route_id, tracking_code).map(Some),
        None => Ok(None),
    }
}

/// Change the capacity a delivery requires, re-validating its route
pub fn resize<R: Records>(
    tx: &mut R,
    tracking_code: &str,
    capacity_required: u32,
) -> Result<Option<RouteLoad>> {
    let mut delivery: Delivery = tx.get(tracking_code)?;
    if delivery.capacity_required == capacity_required {
        return delivery.route.map(|route_id| load(tx, route_id)).transpose();
    }

    let Some(route_id) = delivery.route else {
        delivery.capacity_required = capacity_required;
        tx.update(&delivery)?;
        return Ok(None);
    };

    let mut route: Route = tx.get(route_id)?;
    let vehicle: Vehicle = tx.get(&route.vehicle)?;
    let base = route.used_capacity.saturating_sub(delivery.capacity_required);
    let used = check_capacity(route_id, base, capacity_required, vehicle.max_capacity)?;

    delivery.capacity_required = capacity_required;
    route.used_capacity = used;
    tx.update(&delivery)?;
    tx.update(&route)?;

    info!(route = %route_id, delivery = tracking_code, used, "resized delivery");
    Ok(Some(RouteLoad {
        route: route_id,
        used,
        max: vehicle.max_capacity,
    }))
}

/// Recalculate a route's counter from its attached deliveries
pub fn recompute<R: Records>(tx: &mut R, route_id: RouteId) -> Result<Reconciled> {
    let mut route: Route = tx.get(route_id)?;
    let previous = route.used_capacity;
    let sum = attached_sum(tx, route_id)?;
    let used = u32::try_from(sum).unwrap_or(u32::MAX);

    if used != previous {
        warn!(route = %route_id, previous, used, "route capacity counter drifted");
        route.used_capacity = used;
        tx.update(&route)?;
    }

    let load = load_of(tx, &route)?;
    if load.used > load.max {
        warn!(route = %route_id, used, max = load.max, "route is over vehicle capacity");
    }
    Ok(Reconciled { load, previous })
}

/// Routes whose counter disagrees with their deliveries or exceeds the vehicle
pub fn audit<R: Records>(tx: &R) -> Result<Vec<Drift>> {
    let mut sums: BTreeMap<RouteId, u64> = BTreeMap::new();
    for delivery in tx.all::<Delivery>()? {
        if let Some(route_id) = delivery.route {
            *sums.entry(route_id).or_default() += u64::from(delivery.capacity_required);
        }
    }

    let mut drifts = Vec::new();
    for route in tx.all::<Route>()? {
        let actual = sums.get(&route.id).copied().unwrap_or(0);
        let max = load_of(tx, &route)?.max;
        let drift = Drift {
            route: route.id,
            stored: route.used_capacity,
            actual,
            max,
        };
        if u64::from(drift.stored) != actual || drift.over_capacity() {
            drifts.push(drift);
        }
    }
    Ok(drifts)
}

/// Refuse a capacity change of `plate` that would leave one of its routes
/// over capacity
pub fn check_vehicle_capacity<R: Records>(tx: &R, plate: &str, max_capacity: u32) -> Result<()> {
    for route in tx.filter(|r: &Route| r.vehicle == plate)? {
        check_capacity(route.id, route.used_capacity, 0, max_capacity)?;
    }
    Ok(())
}

/// Refuse moving a route onto a vehicle too small for its current load
pub fn check_route_vehicle<R: Records>(tx: &R, route: &Route, plate: &str) -> Result<()> {
    let vehicle: Vehicle = tx.get(plate)?;
    check_capacity(route.id, route.used_capacity, 0, vehicle.max_capacity).map(|_| ())
}

/// Detach a delivery from whatever route it is on, before it is deleted
pub fn release<R: Records>(tx: &mut R, tracking_code: &str) -> Result<Option<Detached>> {
    let delivery: Delivery = tx.get(tracking_code)?;
    delivery
        .route
        .map(|route_id| detach(tx, route_id, tracking_code))
        .transpose()
}
