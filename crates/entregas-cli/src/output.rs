//! Output formatting module

use serde::Serialize;

use entregas_app::app::{RouteDashboard, TrackingInfo};
use entregas_domain::model::{Customer, Delivery, Driver, Route, Vehicle};
use entregas_domain::service::{Detached, Drift, Reconciled, RouteLoad};
use entregas_infra::ImportReport;
use entregas_types::{Error, OutputFormat, Rejection, Result};

/// Records printable as one table row
pub trait Tabular {
    const HEADERS: &'static [&'static str];

    fn row(&self) -> Vec<String>;
}

impl Tabular for Driver {
    const HEADERS: &'static [&'static str] = &["TAX ID", "NAME", "PHONE", "LICENSE", "STATUS"];

    fn row(&self) -> Vec<String> {
        vec![
            self.tax_id.clone(),
            self.name.clone(),
            self.phone.clone(),
            self.license_class.to_string(),
            self.status.to_string(),
        ]
    }
}

impl Tabular for Vehicle {
    const HEADERS: &'static [&'static str] =
        &["PLATE", "MODEL", "CATEGORY", "MAX", "STATUS", "DRIVER"];

    fn row(&self) -> Vec<String> {
        vec![
            self.plate.clone(),
            self.model.clone(),
            self.category.to_string(),
            self.max_capacity.to_string(),
            self.status.to_string(),
            self.active_driver.clone().unwrap_or_else(|| "-".to_string()),
        ]
    }
}

impl Tabular for Customer {
    const HEADERS: &'static [&'static str] = &["TAX ID", "NAME", "CITY", "PHONE", "EMAIL"];

    fn row(&self) -> Vec<String> {
        vec![
            self.tax_id.clone(),
            self.name.clone(),
            self.city.clone(),
            self.phone.clone(),
            self.email.clone(),
        ]
    }
}

impl Tabular for Route {
    const HEADERS: &'static [&'static str] =
        &["ID", "NAME", "DATE", "DRIVER", "VEHICLE", "USED", "STATUS"];

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.scheduled_on.to_string(),
            self.driver.clone(),
            self.vehicle.clone(),
            self.used_capacity.to_string(),
            self.status.to_string(),
        ]
    }
}

impl Tabular for Delivery {
    const HEADERS: &'static [&'static str] =
        &["CODE", "CUSTOMER", "ROUTE", "CAPACITY", "PROMISED", "STATUS"];

    fn row(&self) -> Vec<String> {
        vec![
            self.tracking_code.clone(),
            self.customer.clone(),
            self.route.map_or_else(|| "-".to_string(), |r| r.to_string()),
            self.capacity_required.to_string(),
            self.promised_on.to_string(),
            self.status.to_string(),
        ]
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    println!("{}", padded.join("  ").trim_end());
}

fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    print_line(headers.iter().copied(), &widths);
    for row in rows {
        print_line(row.iter().map(String::as_str), &widths);
    }
}

pub fn output_records<E: Tabular + Serialize>(output_format: OutputFormat, records: &[E]) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(records);
    }
    if records.is_empty() {
        println!("No records.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = records.iter().map(E::row).collect();
    print_table(E::HEADERS, &rows);
    Ok(())
}

pub fn output_record<E: Tabular + Serialize>(output_format: OutputFormat, record: &E) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(record);
    }
    for (header, cell) in E::HEADERS.iter().zip(record.row()) {
        println!("{:<10} {}", format!("{}:", header), cell);
    }
    Ok(())
}

pub fn output_load(output_format: OutputFormat, load: &RouteLoad) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(load);
    }
    println!(
        "Route {}: {} used / {} max ({} available)",
        load.route,
        load.used,
        load.max,
        load.available()
    );
    Ok(())
}

/// Load after a reassign or resize; `None` when the delivery is on no route
pub fn output_moved(
    output_format: OutputFormat,
    tracking_code: &str,
    load: Option<&RouteLoad>,
) -> Result<()> {
    match load {
        Some(load) => output_load(output_format, load),
        None if output_format == OutputFormat::Json => print_json(&load),
        None => {
            println!("Delivery {} is not on any route", tracking_code);
            Ok(())
        }
    }
}

pub fn output_detached(output_format: OutputFormat, detached: &Detached) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(detached);
    }
    output_load(output_format, &detached.load)?;
    if let Some(underflow) = detached.underflow {
        println!("Warning: counter was {} below the detached capacity; clamped to 0", underflow);
    }
    Ok(())
}

pub fn output_reconciled(output_format: OutputFormat, reconciled: &[Reconciled]) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(reconciled);
    }
    let rows: Vec<Vec<String>> = reconciled
        .iter()
        .map(|r| {
            vec![
                r.load.route.to_string(),
                r.previous.to_string(),
                r.load.used.to_string(),
                r.load.max.to_string(),
                if r.drifted() { "fixed" } else { "ok" }.to_string(),
            ]
        })
        .collect();
    print_table(&["ROUTE", "BEFORE", "USED", "MAX", "STATE"], &rows);
    Ok(())
}

pub fn output_drifts(output_format: OutputFormat, drifts: &[Drift]) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(drifts);
    }
    if drifts.is_empty() {
        println!("All route counters match their deliveries.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = drifts
        .iter()
        .map(|d| {
            vec![
                d.route.to_string(),
                d.stored.to_string(),
                d.actual.to_string(),
                d.max.to_string(),
                if d.over_capacity() { "over capacity" } else { "drift" }.to_string(),
            ]
        })
        .collect();
    print_table(&["ROUTE", "STORED", "ACTUAL", "MAX", "PROBLEM"], &rows);
    Ok(())
}

pub fn output_dashboards(output_format: OutputFormat, dashboards: &[RouteDashboard]) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(dashboards);
    }
    for (i, dashboard) in dashboards.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print_dashboard(dashboard);
    }
    Ok(())
}

fn print_dashboard(dashboard: &RouteDashboard) {
    let title = format!("Route {} - {}", dashboard.id, dashboard.name);
    println!("\n{}", title);
    println!("{}", "=".repeat(title.chars().count()));
    if !dashboard.description.is_empty() {
        println!("{}", dashboard.description);
    }
    println!("Date:        {}", dashboard.scheduled_on);
    println!("Status:      {}", dashboard.status);
    println!(
        "Estimate:    {} km, {} min",
        dashboard.estimated_distance_km, dashboard.estimated_duration_min
    );
    if let Some(driver) = &dashboard.driver {
        println!(
            "Driver:      {} ({}, license {})",
            driver.name, driver.tax_id, driver.license_class
        );
    }
    if let Some(vehicle) = &dashboard.vehicle {
        println!(
            "Vehicle:     {} {} ({}, max {})",
            vehicle.plate, vehicle.model, vehicle.category, vehicle.max_capacity
        );
    }
    println!(
        "Capacity:    {} used / {} max ({} available)",
        dashboard.used_capacity, dashboard.max_capacity, dashboard.available_capacity
    );

    if dashboard.deliveries.is_empty() {
        return;
    }
    println!("\n--- Deliveries ---");
    let rows: Vec<Vec<String>> = dashboard
        .deliveries
        .iter()
        .map(|d| {
            vec![
                d.tracking_code.clone(),
                d.customer_name.clone(),
                d.destination.clone(),
                d.capacity_required.to_string(),
                d.promised_on.to_string(),
                d.status.to_string(),
            ]
        })
        .collect();
    print_table(&["CODE", "CUSTOMER", "DESTINATION", "CAPACITY", "PROMISED", "STATUS"], &rows);
}

pub fn output_tracking(output_format: OutputFormat, info: &TrackingInfo) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(info);
    }
    println!("Tracking:    {}", info.tracking_code);
    println!("Status:      {}", info.status);
    println!("Requested:   {}", info.requested_on);
    println!("Promised:    {}", info.promised_on);
    if let Some(delivered) = info.delivered_on {
        println!("Delivered:   {}", delivered);
    }
    println!("Destination: {}", info.destination);
    Ok(())
}

pub fn output_import(output_format: OutputFormat, report: &ImportReport) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(report);
    }
    let rows: Vec<Vec<String>> = report
        .files
        .iter()
        .map(|f| {
            if f.missing {
                vec![f.stage.to_string(), "-".into(), "-".into(), "-".into(), "missing".into()]
            } else {
                vec![
                    f.stage.to_string(),
                    f.created.to_string(),
                    f.updated.to_string(),
                    f.skipped.len().to_string(),
                    f.encoding.to_string(),
                ]
            }
        })
        .collect();
    print_table(&["FILE", "CREATED", "UPDATED", "SKIPPED", "ENCODING"], &rows);

    let diagnostics: Vec<_> = report.diagnostics().collect();
    if !diagnostics.is_empty() {
        println!("\nSkipped rows:");
        for diagnostic in diagnostics {
            println!("  {} [{}]", diagnostic, diagnostic.rule);
        }
    }
    Ok(())
}

/// Print a failed command to stderr; rejections carry their rule name
pub fn output_error(output_format: Option<OutputFormat>, err: &Error) {
    if !err.is_rejection() {
        eprintln!("Error: {}", err);
        return;
    }

    let rejection = Rejection::from(err);
    if output_format == Some(OutputFormat::Json) {
        if let Ok(content) = serde_json::to_string_pretty(&rejection) {
            eprintln!("{}", content);
            return;
        }
    }
    eprintln!("Error: {}", rejection.message);
    eprintln!("  rule:  {}", rejection.rule);
    if let Some(value) = &rejection.value {
        eprintln!("  value: {}", value);
    }
}
