//! Bulk import against an in-memory store with CSV fixtures on disk

use std::fs;
use std::path::Path;

use tempfile::tempdir;

use entregas_domain::model::{Customer, Delivery, Driver, Route, Vehicle};
use entregas_infra::{import_all, import_stage, ImportError, Stage};
use entregas_store::{EntityStore, JsonStore, Records};
use entregas_types::{DriverStatus, EntityKind, LicenseClass, VehicleCategory, VehicleStatus};

const CUSTOMERS: &str = "\
tax_id,name,city,email
900,Loja Azul,Campinas,azul@example.com
901,Mercado Sol,Campinas,sol@example.com
";

// Legacy column names
const DRIVERS: &str = "\
cpf,nome_motorista,telefone,data_cadastro,cnh,status_motorista
100,Ana,19990001,2024-01-10,E,A
200,Bruno,19990002,10/01/2024,B,D
";

const VEHICLES: &str = "\
plate,model,category,max_capacity,odometer_km,status,active_driver
VAN0001,Master,van,100,1200,D,100
TRK0001,Atego,3,200,0,D,200
CAR0001,Uno,1,10,0,D,
";

const ROUTES: &str = "\
name,description,driver,vehicle,scheduled_on,estimated_distance_km,estimated_duration,status,customers
norte,Zona norte,100,VAN0001,2024-03-01,35,01:30:00,P,900|901
sul,Zona sul,100,GHOST01,2024-03-01,10,45,P,
";

const DELIVERIES: &str = "\
tracking_code,customer,route,capacity_required,origin,destination,requested_on,promised_on,freight,notes,status
BR001,900,norte,60,Depot,Rua A,2024-03-01,2024-03-02,\"150,50\",,P
BR002,901,norte,30,Depot,Rua B,2024-03-01,2024-03-03,80,fragile,P
BR003,901,norte,20,Depot,Rua C,2024-03-01,2024-03-03,80,,P
BR004,999,,5,Depot,Rua D,2024-03-01,2024-03-03,10,,P
BR005,900,leste,5,Depot,Rua E,2024-03-01,2024-03-03,10,,P
";

fn write_fixture(dir: &Path) {
    fs::write(dir.join("customers.csv"), CUSTOMERS).unwrap();
    fs::write(dir.join("drivers.csv"), DRIVERS).unwrap();
    fs::write(dir.join("vehicles.csv"), VEHICLES).unwrap();
    fs::write(dir.join("routes.csv"), ROUTES).unwrap();
    fs::write(dir.join("deliveries.csv"), DELIVERIES).unwrap();
}

#[test]
fn test_import_all_loads_valid_rows_and_skips_bad_ones() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_fixture(temp_dir.path());
    let store = JsonStore::in_memory();

    let report = import_all(&store, temp_dir.path()).unwrap();
    assert_eq!(report.files.len(), 5);
    assert_eq!(report.missing_files().count(), 0);

    let counts = store.counts().unwrap();
    assert_eq!(counts[&EntityKind::Customer], 2);
    assert_eq!(counts[&EntityKind::Driver], 2);
    assert_eq!(counts[&EntityKind::Vehicle], 2);
    assert_eq!(counts[&EntityKind::Route], 1);
    assert_eq!(counts[&EntityKind::Delivery], 2);

    let skipped: Vec<(&str, u64, &str)> = report
        .diagnostics()
        .map(|d| (d.file.as_str(), d.line, d.rule))
        .collect();
    assert_eq!(
        skipped,
        vec![
            ("vehicles.csv", 3, "incompatible-license"),
            ("routes.csv", 3, "not-found"),
            ("deliveries.csv", 4, "capacity-exceeded"),
            ("deliveries.csv", 5, "not-found"),
            ("deliveries.csv", 6, "not-found"),
        ]
    );
}

#[test]
fn test_imported_records_go_through_domain_rules() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_fixture(temp_dir.path());
    let store = JsonStore::in_memory();
    import_all(&store, temp_dir.path()).unwrap();

    store
        .read(|tx| {
            let ana: Driver = tx.get("100")?;
            assert_eq!(ana.license_class, LicenseClass::E);
            assert_eq!(ana.status, DriverStatus::Active);

            let van: Vehicle = tx.get("VAN0001")?;
            assert_eq!(van.category, VehicleCategory::Van);
            assert_eq!(van.active_driver.as_deref(), Some("100"));
            assert_eq!(van.status, VehicleStatus::InUse);

            let car: Vehicle = tx.get("CAR0001")?;
            assert_eq!(car.active_driver, None);

            let routes: Vec<Route> = tx.all()?;
            let norte = &routes[0];
            assert_eq!(norte.name, "norte");
            assert_eq!(norte.used_capacity, 90);
            assert_eq!(norte.estimated_duration_min, 90);
            assert_eq!(norte.customers, vec!["900".to_string(), "901".to_string()]);

            let br001: Delivery = tx.get("BR001")?;
            assert_eq!(br001.route, Some(norte.id));
            assert_eq!(br001.freight_cents, 15_050);
            let br002: Delivery = tx.get("BR002")?;
            assert_eq!(br002.notes.as_deref(), Some("fragile"));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_reimport_updates_in_place() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_fixture(temp_dir.path());
    let store = JsonStore::in_memory();
    import_all(&store, temp_dir.path()).unwrap();

    let second = import_all(&store, temp_dir.path()).unwrap();
    assert_eq!(second.created(), 0);
    assert_eq!(second.updated(), 9);

    let counts = store.counts().unwrap();
    assert_eq!(counts[&EntityKind::Route], 1);
    assert_eq!(counts[&EntityKind::Delivery], 2);
    let routes: Vec<Route> = store.read(|tx| tx.all()).unwrap();
    assert_eq!(routes[0].used_capacity, 90);
}

#[test]
fn test_missing_files_are_reported_and_skipped() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join("customers.csv"), CUSTOMERS).unwrap();
    let store = JsonStore::in_memory();

    let report = import_all(&store, temp_dir.path()).unwrap();
    let missing: Vec<Stage> = report.missing_files().map(|f| f.stage).collect();
    assert_eq!(
        missing,
        vec![Stage::Drivers, Stage::Vehicles, Stage::Routes, Stage::Deliveries]
    );
    assert_eq!(report.created(), 2);
}

#[test]
fn test_windows_1252_file_is_decoded() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let mut bytes = b"tax_id,name,city\n900,Loja Azul,S".to_vec();
    bytes.push(0xE3); // a-tilde in Windows-1252
    bytes.extend_from_slice(b"o Paulo\n");
    fs::write(temp_dir.path().join("customers.csv"), bytes).unwrap();
    let store = JsonStore::in_memory();

    let report = import_stage(&store, temp_dir.path(), Stage::Customers).unwrap();
    assert_eq!(report.encoding, "windows-1252");
    let customer: Customer = store.read(|tx| tx.get("900")).unwrap();
    assert_eq!(customer.city, "São Paulo");
}

#[test]
fn test_missing_required_column_fails_the_file() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    fs::write(temp_dir.path().join("vehicles.csv"), "plate,model\nVAN0001,Master\n").unwrap();
    let store = JsonStore::in_memory();

    let err = import_stage(&store, temp_dir.path(), Stage::Vehicles).unwrap_err();
    assert!(matches!(err, ImportError::MissingColumn { ref column, .. } if column == "max_capacity"));
}

#[test]
fn test_import_requires_directory() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let store = JsonStore::in_memory();
    let err = import_all(&store, &temp_dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, ImportError::NoDirectory(_)));
}

#[test]
fn test_vehicle_row_checks_category_against_its_own_driver() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_fixture(temp_dir.path());
    let store = JsonStore::in_memory();
    import_all(&store, temp_dir.path()).unwrap();

    let vehicles = temp_dir.path().join("vehicles.csv");
    fs::write(
        &vehicles,
        "plate,model,category,max_capacity,odometer_km,status,active_driver\nCAR0001,Uno,1,10,0,D,200\n",
    )
    .unwrap();
    let linked = import_stage(&store, temp_dir.path(), Stage::Vehicles).unwrap();
    assert!(linked.skipped.is_empty());

    // Bruno (B) cannot drive a van, Ana (E) can: the row swaps both at once
    fs::write(
        &vehicles,
        "plate,model,category,max_capacity,odometer_km,status,active_driver\n\
         VAN0001,Master,van,100,1200,D,\n\
         CAR0001,Sprinter,van,10,0,D,100\n",
    )
    .unwrap();
    let report = import_stage(&store, temp_dir.path(), Stage::Vehicles).unwrap();
    assert!(report.skipped.is_empty(), "{:?}", report.skipped);
    assert_eq!(report.updated, 2);

    store
        .read(|tx| {
            let converted: Vehicle = tx.get("CAR0001")?;
            assert_eq!(converted.category, VehicleCategory::Van);
            assert_eq!(converted.active_driver.as_deref(), Some("100"));
            assert_eq!(converted.status, VehicleStatus::InUse);

            let van: Vehicle = tx.get("VAN0001")?;
            assert_eq!(van.active_driver, None);
            assert_eq!(van.status, VehicleStatus::Available);
            Ok(())
        })
        .unwrap();
}
