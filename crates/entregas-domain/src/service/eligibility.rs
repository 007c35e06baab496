//! Driver license vs vehicle category eligibility
//!
//! | category | accepted license classes |
//! |----------|--------------------------|
//! | car      | B, C, D, E               |
//! | van      | D, E                     |
//! | truck    | C, E                     |

use tracing::{debug, info};

use entregas_store::Records;
use entregas_types::{Error, LicenseClass, Result, VehicleCategory, VehicleStatus};

use crate::model::{Driver, Vehicle};

/// License classes allowed to operate a vehicle category
pub const fn accepted_classes(category: VehicleCategory) -> &'static [LicenseClass] {
    use LicenseClass::*;
    match category {
        VehicleCategory::Car => &[B, C, D, E],
        VehicleCategory::Van => &[D, E],
        VehicleCategory::Truck => &[C, E],
    }
}

pub fn accepts(category: VehicleCategory, class: LicenseClass) -> bool {
    accepted_classes(category).contains(&class)
}

/// `IncompatibleLicense` unless the driver may operate the vehicle
pub fn check(vehicle: &Vehicle, driver: &Driver) -> Result<()> {
    if accepts(vehicle.category, driver.license_class) {
        Ok(())
    } else {
        Err(Error::IncompatibleLicense {
            license: driver.license_class,
            category: vehicle.category,
        })
    }
}

/// Vehicle a driver currently operates
pub fn operated_by<R: Records>(tx: &R, driver: &str) -> Result<Option<Vehicle>> {
    Ok(tx
        .filter(|v: &Vehicle| v.active_driver.as_deref() == Some(driver))?
        .into_iter()
        .next())
}

/// Make `driver` the active driver of the vehicle `plate`.
///
/// Replaces any previous driver. A driver already operating another vehicle
/// is refused with `DriverAlreadyAssigned`.
pub fn link<R: Records>(tx: &mut R, plate: &str, driver: &str) -> Result<Vehicle> {
    let mut vehicle: Vehicle = tx.get(plate)?;
    let driver: Driver = tx.get(driver)?;
    check(&vehicle, &driver)?;

    if let Some(current) = operated_by(tx, &driver.tax_id)? {
        if current.plate != vehicle.plate {
            return Err(Error::DriverAlreadyAssigned {
                driver: driver.tax_id,
                vehicle: current.plate,
            });
        }
        debug!(vehicle = plate, driver = %driver.tax_id, "driver already linked");
        return Ok(vehicle);
    }

    if let Some(previous) = &vehicle.active_driver {
        info!(vehicle = plate, previous = %previous, "replacing active driver");
    }
    vehicle.active_driver = Some(driver.tax_id.clone());
    if vehicle.status == VehicleStatus::Available {
        vehicle.status = VehicleStatus::InUse;
    }
    tx.update(&vehicle)?;

    info!(vehicle = plate, driver = %driver.tax_id, "linked driver to vehicle");
    Ok(vehicle)
}

/// Clear the active driver of `plate`; unlinking a free vehicle changes nothing
pub fn unlink<R: Records>(tx: &mut R, plate: &str) -> Result<Vehicle> {
    let mut vehicle: Vehicle = tx.get(plate)?;
    let Some(previous) = vehicle.active_driver.take() else {
        return Ok(vehicle);
    };

    vehicle.status = VehicleStatus::Available;
    tx.update(&vehicle)?;
    info!(vehicle = plate, driver = %previous, "unlinked driver from vehicle");
    Ok(vehicle)
}
