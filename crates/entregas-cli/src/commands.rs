//! Command handlers

use std::fs;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use entregas_app::app::{LogisticsService, RouteDraft};
use entregas_app::config::Config;
use entregas_app::repository::{open_service, open_service_at};
use entregas_domain::model::{Customer, Delivery, Driver, Route, Vehicle};
use entregas_domain::service::{Caller, Scoped};
use entregas_infra::{import_stage, ImportError, ImportReport, Stage};
use entregas_store::JsonStore;
use entregas_types::{EntityKind, Error, OutputFormat, Result};

use crate::cli::{Cli, Commands};
use crate::output::{
    output_dashboards, output_detached, output_drifts, output_import, output_load, output_moved,
    output_reconciled, output_record, output_records, output_tracking, Tabular,
};

type Service = LogisticsService<JsonStore>;

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    if let Commands::Config { show, set, reset } = &cli.command {
        return cmd_config(*show, set, *reset);
    }

    let config = Config::load()?;
    let output_format = cli.format.unwrap_or(config.output_format);
    let service = match &cli.store {
        Some(dir) => open_service_at(&config, dir.clone())?,
        None => open_service(&config)?,
    };
    if let Some(path) = service.store().path() {
        debug!(store = %path.display(), caller = %cli.caller, "opened store");
    }
    let caller = &cli.caller;

    match &cli.command {
        Commands::Import { dir } => {
            let dir = dir
                .clone()
                .or_else(|| config.import_dir.clone())
                .ok_or_else(|| {
                    Error::Validation(
                        "no import directory given and import_dir is not configured".to_string(),
                    )
                })?;
            cmd_import(&service, caller, &dir, output_format)
        }

        Commands::List { kind } => match kind {
            EntityKind::Driver => cmd_list::<Driver>(&service, caller, output_format),
            EntityKind::Vehicle => cmd_list::<Vehicle>(&service, caller, output_format),
            EntityKind::Customer => cmd_list::<Customer>(&service, caller, output_format),
            EntityKind::Route => cmd_list::<Route>(&service, caller, output_format),
            EntityKind::Delivery => cmd_list::<Delivery>(&service, caller, output_format),
        },

        Commands::Show { kind, key } => match kind {
            EntityKind::Driver => cmd_show::<Driver>(&service, caller, key, output_format),
            EntityKind::Vehicle => cmd_show::<Vehicle>(&service, caller, key, output_format),
            EntityKind::Customer => cmd_show::<Customer>(&service, caller, key, output_format),
            EntityKind::Route => cmd_show::<Route>(&service, caller, key, output_format),
            EntityKind::Delivery => cmd_show::<Delivery>(&service, caller, key, output_format),
        },

        Commands::Create { kind, file } => cmd_create(&service, caller, *kind, file, output_format),

        Commands::Update { kind, file } => cmd_update(&service, caller, *kind, file, output_format),

        Commands::Delete { kind, key } => {
            match kind {
                EntityKind::Driver => service.delete::<Driver>(caller, key)?,
                EntityKind::Vehicle => service.delete::<Vehicle>(caller, key)?,
                EntityKind::Customer => service.delete::<Customer>(caller, key)?,
                EntityKind::Route => service.delete::<Route>(caller, key)?,
                EntityKind::Delivery => service.delete::<Delivery>(caller, key)?,
            }
            println!("Deleted {} {}", kind, key);
            Ok(())
        }

        Commands::Attach {
            route,
            tracking_code,
        } => {
            let load = service.attach(caller, *route, tracking_code)?;
            output_load(output_format, &load)
        }

        Commands::Detach {
            route,
            tracking_code,
        } => {
            let detached = service.detach(caller, *route, tracking_code)?;
            output_detached(output_format, &detached)
        }

        Commands::Reassign { tracking_code, to } => {
            let load = service.reassign(caller, tracking_code, *to)?;
            output_moved(output_format, tracking_code, load.as_ref())
        }

        Commands::Resize {
            tracking_code,
            capacity,
        } => {
            let load = service.resize(caller, tracking_code, *capacity)?;
            output_moved(output_format, tracking_code, load.as_ref())
        }

        Commands::Recompute { route } => {
            let reconciled = match route {
                Some(route) => vec![service.recompute(caller, *route)?],
                None => service.recompute_all(caller)?,
            };
            output_reconciled(output_format, &reconciled)
        }

        Commands::Audit => output_drifts(output_format, &service.audit(caller)?),

        Commands::Available { route } => {
            output_load(output_format, &service.available(caller, *route)?)
        }

        Commands::Link { plate, driver } => {
            let vehicle = service.link(caller, plate, driver)?;
            output_record(output_format, &vehicle)
        }

        Commands::Unlink { plate } => {
            let vehicle = service.unlink(caller, plate)?;
            output_record(output_format, &vehicle)
        }

        Commands::Dashboard { route } => {
            let dashboards = match route {
                Some(route) => vec![service.dashboard(caller, *route)?],
                None => service.dashboards(caller)?,
            };
            output_dashboards(output_format, &dashboards)
        }

        Commands::Track { tracking_code } => {
            output_tracking(output_format, &service.track(caller, tracking_code)?)
        }

        Commands::Config { .. } => Ok(()),
    }
}

fn cmd_list<E>(service: &Service, caller: &Caller, output_format: OutputFormat) -> Result<()>
where
    E: Scoped + Tabular + Serialize,
{
    let records = service.list::<E>(caller)?;
    output_records(output_format, &records)
}

fn cmd_show<E>(service: &Service, caller: &Caller, key: &str, output_format: OutputFormat) -> Result<()>
where
    E: Scoped + Tabular + Serialize,
{
    let record = service.get::<E>(caller, key)?;
    output_record(output_format, &record)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn cmd_create(
    service: &Service,
    caller: &Caller,
    kind: EntityKind,
    file: &Path,
    output_format: OutputFormat,
) -> Result<()> {
    match kind {
        EntityKind::Driver => {
            let driver = service.create_driver(caller, read_json(file)?)?;
            output_record(output_format, &driver)
        }
        EntityKind::Vehicle => {
            let vehicle = service.create_vehicle(caller, read_json(file)?)?;
            output_record(output_format, &vehicle)
        }
        EntityKind::Customer => {
            let customer = service.create_customer(caller, read_json(file)?)?;
            output_record(output_format, &customer)
        }
        EntityKind::Route => {
            let draft: RouteDraft = read_json(file)?;
            let route = service.create_route(caller, draft)?;
            output_record(output_format, &route)
        }
        EntityKind::Delivery => {
            let delivery = service.create_delivery(caller, read_json(file)?)?;
            output_record(output_format, &delivery)
        }
    }
}

fn cmd_update(
    service: &Service,
    caller: &Caller,
    kind: EntityKind,
    file: &Path,
    output_format: OutputFormat,
) -> Result<()> {
    match kind {
        EntityKind::Driver => {
            let driver = service.update_driver(caller, read_json(file)?)?;
            output_record(output_format, &driver)
        }
        EntityKind::Vehicle => {
            let vehicle = service.update_vehicle(caller, read_json(file)?)?;
            output_record(output_format, &vehicle)
        }
        EntityKind::Customer => {
            let customer = service.update_customer(caller, read_json(file)?)?;
            output_record(output_format, &customer)
        }
        EntityKind::Route => {
            let route = service.update_route(caller, read_json(file)?)?;
            output_record(output_format, &route)
        }
        EntityKind::Delivery => {
            let delivery = service.update_delivery(caller, read_json(file)?)?;
            output_record(output_format, &delivery)
        }
    }
}

fn cmd_import(service: &Service, caller: &Caller, dir: &Path, output_format: OutputFormat) -> Result<()> {
    service.authorize_import(caller)?;
    if !dir.is_dir() {
        return Err(ImportError::NoDirectory(dir.to_path_buf()).into());
    }

    let pb = ProgressBar::new(Stage::ALL.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut report = ImportReport::default();
    for stage in Stage::ALL {
        pb.set_message(stage.file_name());
        let file = import_stage(service.store(), dir, stage);
        match file {
            Ok(file) => report.files.push(file),
            Err(e) => {
                pb.abandon();
                return Err(e.into());
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    output_import(output_format, &report)
}

fn cmd_config(show: bool, set: &[String], reset: bool) -> Result<()> {
    if reset {
        let config = Config::default();
        config.save()?;
        println!("Configuration reset to defaults");
        println!("\n{}", config);
        return Ok(());
    }

    let mut config = Config::load()?;
    let mut modified = false;

    for assignment in set {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            Error::Validation(format!("expected KEY=VALUE, got '{}'", assignment))
        })?;
        config.set(key.trim(), value)?;
        modified = true;
    }

    if modified {
        config.save()?;
        println!("Configuration saved");
    }

    if show || !modified {
        println!("\n{}", config);
    }

    Ok(())
}

