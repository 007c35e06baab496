//! Row layouts of the five import files and how each row lands in the store
//!
//! Headers use the field names of the domain model; the Portuguese column
//! names of the legacy exports are accepted as aliases.

use serde::Deserialize;

use entregas_domain::model::{Customer, Delivery, Driver, Route, Vehicle};
use entregas_domain::service::{capacity_ledger, eligibility};
use entregas_store::Records;
use entregas_types::{Entity, EntityKind, Error, LicenseClass, Result, RouteId, VehicleStatus};

use super::fields::{
    optional, parse_cents, parse_coded, parse_count, parse_date, parse_minutes,
    parse_optional_date, required, split_keys,
};

/// What a row did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
}

#[derive(Debug, Deserialize)]
pub struct CustomerRow {
    #[serde(alias = "cpf_cliente", alias = "cpf")]
    pub tax_id: String,
    #[serde(alias = "nome_cliente")]
    pub name: String,
    #[serde(default, alias = "endereco")]
    pub address: String,
    #[serde(default, alias = "bairro")]
    pub district: String,
    #[serde(default, alias = "cidade")]
    pub city: String,
    #[serde(default, alias = "estado")]
    pub state: String,
    #[serde(default, alias = "cep")]
    pub postal_code: String,
    #[serde(default, alias = "telefone")]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

impl CustomerRow {
    pub fn apply<R: Records>(self, tx: &mut R) -> Result<Outcome> {
        let tax_id = required("tax_id", &self.tax_id)?.to_string();
        let mut customer = Customer::new(tax_id, self.name.trim());
        customer.address = self.address;
        customer.district = self.district;
        customer.city = self.city;
        customer.state = self.state;
        customer.postal_code = self.postal_code;
        customer.phone = self.phone;
        customer.email = self.email;

        upsert(tx, customer)
    }
}

#[derive(Debug, Deserialize)]
pub struct DriverRow {
    #[serde(alias = "cpf")]
    pub tax_id: String,
    #[serde(alias = "nome_motorista")]
    pub name: String,
    #[serde(default, alias = "telefone")]
    pub phone: String,
    #[serde(alias = "data_cadastro")]
    pub registered_on: String,
    #[serde(alias = "cnh")]
    pub license_class: String,
    #[serde(default, alias = "status_motorista")]
    pub status: String,
}

impl DriverRow {
    pub fn apply<R: Records>(self, tx: &mut R) -> Result<Outcome> {
        let tax_id = required("tax_id", &self.tax_id)?.to_string();
        let license_class: LicenseClass = required("license_class", &self.license_class)?.parse()?;
        let registered_on = parse_date("registered_on", &self.registered_on)?;

        let mut driver = Driver::new(tax_id, self.name.trim(), license_class, registered_on)
            .with_phone(self.phone.trim());
        driver.status = parse_coded(&self.status)?;

        // A new license class must still fit the vehicle the driver operates
        if let Some(vehicle) = eligibility::operated_by(tx, &driver.tax_id)? {
            eligibility::check(&vehicle, &driver)?;
        }

        upsert(tx, driver)
    }
}

#[derive(Debug, Deserialize)]
pub struct VehicleRow {
    #[serde(alias = "placa")]
    pub plate: String,
    #[serde(alias = "modelo")]
    pub model: String,
    #[serde(default, alias = "tipo")]
    pub category: String,
    #[serde(alias = "capacidade_maxima")]
    pub max_capacity: String,
    #[serde(default, alias = "km_atual")]
    pub odometer_km: String,
    #[serde(default, alias = "status_veiculo")]
    pub status: String,
    #[serde(default, alias = "motorista_ativo")]
    pub active_driver: String,
}

impl VehicleRow {
    pub fn apply<R: Records>(self, tx: &mut R) -> Result<Outcome> {
        let plate = required("plate", &self.plate)?.to_string();
        let max_capacity = parse_count("max_capacity", &self.max_capacity, 0)?;
        let mut vehicle = Vehicle::new(
            plate.as_str(),
            self.model.trim(),
            parse_coded(&self.category)?,
            max_capacity,
        );
        vehicle.odometer_km = parse_count("odometer_km", &self.odometer_km, 0)?;
        vehicle.status = parse_coded(&self.status)?;
        let incoming_driver = optional(&self.active_driver);

        let outcome = match tx.find::<Vehicle>(&plate)? {
            Some(existing) => {
                if existing.max_capacity != max_capacity {
                    capacity_ledger::check_vehicle_capacity(tx, &plate, max_capacity)?;
                }
                // The row's driver column replaces the stored driver; the new
                // category is only checked against the driver the row names
                if existing.active_driver.is_some()
                    && incoming_driver.is_none()
                    && vehicle.status == VehicleStatus::InUse
                {
                    vehicle.status = VehicleStatus::Available;
                }
                tx.update(&vehicle)?;
                Outcome::Updated
            }
            None => {
                tx.create(vehicle)?;
                Outcome::Created
            }
        };

        if let Some(driver) = incoming_driver {
            eligibility::link(tx, &plate, driver)?;
        }
        Ok(outcome)
    }
}

#[derive(Debug, Deserialize)]
pub struct RouteRow {
    #[serde(alias = "nome_rota")]
    pub name: String,
    #[serde(default, alias = "descricao")]
    pub description: String,
    #[serde(alias = "motorista")]
    pub driver: String,
    #[serde(alias = "veiculo")]
    pub vehicle: String,
    #[serde(alias = "data_rota")]
    pub scheduled_on: String,
    #[serde(default, alias = "km_total_estimado")]
    pub estimated_distance_km: String,
    #[serde(default, alias = "tempo_estimado")]
    pub estimated_duration: String,
    #[serde(default, alias = "status_rota")]
    pub status: String,
    #[serde(default, alias = "clientes")]
    pub customers: String,
}

/// Routes have no natural key in the store; the importer matches them by name
pub fn route_by_name<R: Records>(tx: &R, name: &str) -> Result<Option<Route>> {
    Ok(tx.filter(|r: &Route| r.name == name)?.into_iter().next())
}

impl RouteRow {
    pub fn apply<R: Records>(self, tx: &mut R) -> Result<Outcome> {
        let name = required("name", &self.name)?.to_string();
        let driver = required("driver", &self.driver)?.to_string();
        let vehicle = required("vehicle", &self.vehicle)?.to_string();
        let scheduled_on = parse_date("scheduled_on", &self.scheduled_on)?;

        tx.get::<Driver>(&driver)?;
        tx.get::<Vehicle>(&vehicle)?;
        let customers = split_keys(&self.customers);
        for customer in &customers {
            tx.get::<Customer>(customer)?;
        }

        let (mut route, outcome) = match route_by_name(tx, &name)? {
            Some(existing) => {
                if existing.vehicle != vehicle {
                    capacity_ledger::check_route_vehicle(tx, &existing, &vehicle)?;
                }
                let mut route = existing;
                route.driver = driver;
                route.vehicle = vehicle;
                route.scheduled_on = scheduled_on;
                (route, Outcome::Updated)
            }
            None => {
                let id = RouteId(tx.next_id(EntityKind::Route));
                (Route::new(id, name, driver, vehicle, scheduled_on), Outcome::Created)
            }
        };

        route.description = self.description.trim().to_string();
        route.estimated_distance_km = parse_count("estimated_distance_km", &self.estimated_distance_km, 0)?;
        route.estimated_duration_min = parse_minutes("estimated_duration", &self.estimated_duration)?;
        route.status = parse_coded(&self.status)?;
        for customer in customers {
            if !route.customers.contains(&customer) {
                route.customers.push(customer);
            }
        }

        match outcome {
            Outcome::Created => {
                tx.create(route)?;
            }
            Outcome::Updated => tx.update(&route)?,
        }
        Ok(outcome)
    }
}

#[derive(Debug, Deserialize)]
pub struct DeliveryRow {
    #[serde(alias = "codigo_rastreio")]
    pub tracking_code: String,
    #[serde(alias = "cliente")]
    pub customer: String,
    #[serde(default, alias = "rota")]
    pub route: String,
    #[serde(default, alias = "motorista")]
    pub driver: String,
    #[serde(alias = "capacidade_necessaria")]
    pub capacity_required: String,
    #[serde(default, alias = "endereco_origem")]
    pub origin: String,
    #[serde(default, alias = "endereco_destino")]
    pub destination: String,
    #[serde(alias = "data_solicitacao")]
    pub requested_on: String,
    #[serde(default, alias = "data_entrega_prevista")]
    pub promised_on: String,
    #[serde(default, alias = "data_entrega_real")]
    pub delivered_on: String,
    #[serde(default, alias = "valor_frete")]
    pub freight: String,
    #[serde(default, alias = "observacoes")]
    pub notes: String,
    #[serde(default)]
    pub status: String,
}

impl DeliveryRow {
    pub fn apply<R: Records>(self, tx: &mut R) -> Result<Outcome> {
        let code = required("tracking_code", &self.tracking_code)?.to_string();
        let customer = required("customer", &self.customer)?.to_string();
        tx.get::<Customer>(&customer)?;

        let target = match optional(&self.route) {
            Some(name) => Some(
                route_by_name(tx, name)?
                    .ok_or_else(|| Error::not_found(EntityKind::Route, name))?
                    .id,
            ),
            None => None,
        };

        let capacity = parse_count("capacity_required", &self.capacity_required, 0)?;
        let requested_on = parse_date("requested_on", &self.requested_on)?;
        let promised_on = parse_optional_date("promised_on", &self.promised_on)?.unwrap_or(requested_on);

        let mut delivery = Delivery::new(code.as_str(), customer, capacity, requested_on, promised_on)
            .with_addresses(self.origin.trim(), self.destination.trim());
        delivery.driver = optional(&self.driver).map(str::to_string);
        delivery.delivered_on = parse_optional_date("delivered_on", &self.delivered_on)?;
        delivery.freight_cents = parse_cents("freight", &self.freight)?;
        delivery.notes = optional(&self.notes).map(str::to_string);
        delivery.status = parse_coded(&self.status)?;

        // Re-imports detach first so the ledger sees the new capacity
        let outcome = if tx.find::<Delivery>(&code)?.is_some() {
            capacity_ledger::release(tx, &code)?;
            tx.update(&delivery)?;
            Outcome::Updated
        } else {
            tx.create(delivery)?;
            Outcome::Created
        };

        if let Some(route) = target {
            capacity_ledger::attach(tx, route, &code)?;
        }
        Ok(outcome)
    }
}

fn upsert<R: Records, E: Entity>(tx: &mut R, entity: E) -> Result<Outcome> {
    if tx.find::<E>(entity.key())?.is_some() {
        tx.update(&entity)?;
        Ok(Outcome::Updated)
    } else {
        tx.create(entity)?;
        Ok(Outcome::Created)
    }
}
