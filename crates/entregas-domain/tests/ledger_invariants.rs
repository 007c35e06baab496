//! Property tests for the capacity ledger
//!
//! After any sequence of attach / detach / reassign / resize operations,
//! accepted or rejected, every route's counter equals the sum of its
//! attached deliveries and never exceeds its vehicle capacity.

use chrono::NaiveDate;
use proptest::prelude::*;
use tempfile::tempdir;

use entregas_domain::model::{Customer, Delivery, Driver, Route, Vehicle};
use entregas_domain::service::capacity_ledger;
use entregas_store::{EntityStore, JsonStore, Records};
use entregas_types::{Error, LicenseClass, RouteId, VehicleCategory};

const ROUTES: [(u64, u32); 3] = [(1, 50), (2, 80), (3, 120)];
const DELIVERIES: usize = 8;

#[derive(Debug, Clone)]
enum Op {
    Attach { route: usize, delivery: usize },
    Detach { delivery: usize },
    Reassign { delivery: usize, route: Option<usize> },
    Resize { delivery: usize, capacity: u32 },
}

fn op() -> impl Strategy<Value = Op> {
    let delivery = 0..DELIVERIES;
    let route = 0..ROUTES.len();
    prop_oneof![
        (route.clone(), delivery.clone()).prop_map(|(route, delivery)| Op::Attach { route, delivery }),
        delivery.clone().prop_map(|delivery| Op::Detach { delivery }),
        (delivery.clone(), proptest::option::of(route))
            .prop_map(|(delivery, route)| Op::Reassign { delivery, route }),
        (delivery, 1u32..=60).prop_map(|(delivery, capacity)| Op::Resize { delivery, capacity }),
    ]
}

fn code(index: usize) -> String {
    format!("BR{:03}", index)
}

fn route_id(index: usize) -> RouteId {
    RouteId(ROUTES[index].0)
}

fn seeded(capacities: &[u32]) -> JsonStore {
    let store = JsonStore::in_memory();
    seed(&store, capacities);
    store
}

fn seed(store: &JsonStore, capacities: &[u32]) {
    let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    store
        .transaction(|tx| {
            tx.create(Customer::new("900", "Loja Azul"))?;
            for (id, max) in ROUTES {
                let tax_id = format!("10{}", id);
                let plate = format!("TRK{:04}", id);
                tx.create(Driver::new(tax_id.as_str(), "driver", LicenseClass::E, day))?;
                tx.create(Vehicle::new(plate.as_str(), "Atego", VehicleCategory::Truck, max))?;
                tx.create(Route::new(RouteId(id), format!("route {}", id), tax_id, plate, day))?;
            }
            for (index, capacity) in capacities.iter().enumerate() {
                tx.create(Delivery::new(code(index), "900", *capacity, day, day))?;
            }
            Ok(())
        })
        .unwrap();
}

fn apply(store: &JsonStore, op: &Op) {
    let result = store.transaction(|tx| match op {
        Op::Attach { route, delivery } => {
            capacity_ledger::attach(tx, route_id(*route), &code(*delivery)).map(|_| ())
        }
        Op::Detach { delivery } => {
            let current: Delivery = tx.get(code(*delivery))?;
            match current.route {
                Some(route) => capacity_ledger::detach(tx, route, &code(*delivery)).map(|_| ()),
                None => Ok(()),
            }
        }
        Op::Reassign { delivery, route } => {
            capacity_ledger::reassign(tx, &code(*delivery), (*route).map(route_id)).map(|_| ())
        }
        Op::Resize { delivery, capacity } => {
            capacity_ledger::resize(tx, &code(*delivery), *capacity).map(|_| ())
        }
    });
    if let Err(err) = result {
        assert!(err.is_rejection(), "unexpected failure: {}", err);
    }
}

fn check_counters(store: &JsonStore) -> Result<(), TestCaseError> {
    let (routes, deliveries, vehicles) = store
        .read(|tx| Ok((tx.all::<Route>()?, tx.all::<Delivery>()?, tx.all::<Vehicle>()?)))
        .unwrap();

    for route in routes {
        let sum: u32 = deliveries
            .iter()
            .filter(|d| d.is_attached_to(route.id))
            .map(|d| d.capacity_required)
            .sum();
        let max = vehicles
            .iter()
            .find(|v| v.plate == route.vehicle)
            .map(|v| v.max_capacity)
            .unwrap();
        prop_assert_eq!(route.used_capacity, sum, "route {}", route.id);
        prop_assert!(route.used_capacity <= max, "route {} over capacity", route.id);
    }
    Ok(())
}

proptest! {
    #[test]
    fn counters_match_attached_deliveries(
        capacities in proptest::collection::vec(1u32..=60, DELIVERIES),
        ops in proptest::collection::vec(op(), 1..40),
    ) {
        let store = seeded(&capacities);
        for op in &ops {
            apply(&store, op);
            check_counters(&store)?;
        }

        let drifts = store.read(|tx| capacity_ledger::audit(tx)).unwrap();
        prop_assert!(drifts.is_empty(), "drift after {:?}: {:?}", ops, drifts);
    }

    #[test]
    fn recompute_is_idempotent(
        capacities in proptest::collection::vec(1u32..=60, DELIVERIES),
        ops in proptest::collection::vec(op(), 1..20),
    ) {
        let store = seeded(&capacities);
        for op in &ops {
            apply(&store, op);
        }

        for index in 0..ROUTES.len() {
            let first = store
                .transaction(|tx| capacity_ledger::recompute(tx, route_id(index)))
                .unwrap();
            let second = store
                .transaction(|tx| capacity_ledger::recompute(tx, route_id(index)))
                .unwrap();
            prop_assert!(!first.drifted());
            prop_assert_eq!(first.load, second.load);
        }
    }

    #[test]
    fn detach_then_attach_restores_counter(
        capacities in proptest::collection::vec(1u32..=30, DELIVERIES),
        target in 0..ROUTES.len(),
        pick in 0..DELIVERIES,
    ) {
        let store = seeded(&capacities);
        for index in 0..DELIVERIES {
            apply(&store, &Op::Attach { route: target, delivery: index });
        }

        let attached = store
            .read(|tx| tx.get::<Delivery>(code(pick)))
            .unwrap()
            .is_attached_to(route_id(target));
        prop_assume!(attached);

        let before = store.read(|tx| capacity_ledger::load(tx, route_id(target))).unwrap();
        store
            .transaction(|tx| capacity_ledger::detach(tx, route_id(target), &code(pick)))
            .unwrap();
        let after = store
            .transaction(|tx| capacity_ledger::attach(tx, route_id(target), &code(pick)))
            .unwrap();
        prop_assert_eq!(before, after);
    }
}

#[test]
fn test_separate_handles_share_one_capacity_budget() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let first = JsonStore::open(temp_dir.path().to_path_buf()).unwrap();
    seed(&first, &[40, 30]);
    let second = JsonStore::open(temp_dir.path().to_path_buf()).unwrap();

    // Route 1 holds 50
    first
        .transaction(|tx| capacity_ledger::attach(tx, route_id(0), &code(0)))
        .unwrap();
    let err = second
        .transaction(|tx| capacity_ledger::attach(tx, route_id(0), &code(1)))
        .unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded { used: 40, required: 30, max: 50, .. }));

    let reopened = JsonStore::open(temp_dir.path().to_path_buf()).unwrap();
    let (load, kept) = reopened
        .read(|tx| Ok((capacity_ledger::load(tx, route_id(0))?, tx.get::<Delivery>(code(0))?)))
        .unwrap();
    assert_eq!(load.used, 40);
    assert!(kept.is_attached_to(route_id(0)));
}

#[test]
fn test_concurrent_attaches_stay_within_capacity() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let dir = temp_dir.path().to_path_buf();
    seed(&JsonStore::open(dir.clone()).unwrap(), &[30; DELIVERIES]);

    // Route 3 holds 120: four of the eight deliveries fit
    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let dir = dir.clone();
            std::thread::spawn(move || {
                let store = JsonStore::open(dir).unwrap();
                let mut accepted = 0u32;
                for delivery in [worker * 2, worker * 2 + 1] {
                    match store.transaction(|tx| capacity_ledger::attach(tx, route_id(2), &code(delivery))) {
                        Ok(_) => accepted += 1,
                        Err(err) => assert!(matches!(err, Error::CapacityExceeded { .. }), "{}", err),
                    }
                }
                accepted
            })
        })
        .collect();
    let accepted: u32 = workers.into_iter().map(|w| w.join().unwrap()).sum();
    assert_eq!(accepted, 4);

    let store = JsonStore::open(dir).unwrap();
    check_counters(&store).unwrap();
    let load = store.read(|tx| capacity_ledger::load(tx, route_id(2))).unwrap();
    assert_eq!(load.used, 120);
}
