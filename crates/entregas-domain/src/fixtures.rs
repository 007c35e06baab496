//! Seeded stores for unit tests

use chrono::NaiveDate;

use entregas_store::{EntityStore, JsonStore, Records};
use entregas_types::{EntityKind, LicenseClass, RouteId, VehicleCategory};

use crate::model::{Customer, Delivery, Driver, Route, Vehicle};

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

pub fn delivery(code: &str, customer: &str, capacity: u32) -> Delivery {
    Delivery::new(code, customer, capacity, date(1), date(5)).with_addresses("Depot", "Centro")
}

/// One driver, one vehicle, one customer and one route on that vehicle
pub struct Fixture {
    pub store: JsonStore,
    pub route: RouteId,
    pub plate: String,
    pub driver: String,
    pub customer: String,
}

impl Fixture {
    pub fn new(max_capacity: u32) -> Self {
        let store = JsonStore::in_memory();
        let route = store
            .transaction(|tx| {
                tx.create(Driver::new("100", "Ana", LicenseClass::E, date(1)))?;
                tx.create(Vehicle::new("ABC1234", "Sprinter", VehicleCategory::Van, max_capacity))?;
                tx.create(Customer::new("900", "Loja Azul"))?;
                let id = RouteId(tx.next_id(EntityKind::Route));
                tx.create(Route::new(id, "centro", "100", "ABC1234", date(2)))?;
                Ok(id)
            })
            .unwrap();

        Self {
            store,
            route,
            plate: "ABC1234".to_string(),
            driver: "100".to_string(),
            customer: "900".to_string(),
        }
    }

    /// Another route with its own driver and a vehicle of capacity 100
    pub fn add_route(&self, name: &str) -> RouteId {
        self.store
            .transaction(|tx| {
                let id = RouteId(tx.next_id(EntityKind::Route));
                let driver = format!("2{}", id.0);
                let plate = format!("XYZ{:04}", id.0);
                tx.create(Driver::new(driver.as_str(), "Bruno", LicenseClass::E, date(1)))?;
                tx.create(Vehicle::new(plate.as_str(), "Daily", VehicleCategory::Truck, 100))?;
                tx.create(Route::new(id, name, driver, plate, date(2)))?;
                Ok(id)
            })
            .unwrap()
    }

    pub fn add_delivery(&self, code: &str, capacity: u32) {
        self.store
            .transaction(|tx| tx.create(delivery(code, &self.customer, capacity)))
            .unwrap();
    }

    pub fn used(&self) -> u32 {
        self.store
            .read(|tx| tx.get::<Route>(self.route))
            .unwrap()
            .used_capacity
    }

    /// Overwrite the stored counter without touching deliveries
    pub fn corrupt_counter(&self, used: u32) {
        self.store
            .transaction(|tx| {
                let mut route: Route = tx.get(self.route)?;
                route.used_capacity = used;
                tx.update(&route)
            })
            .unwrap();
    }
}
