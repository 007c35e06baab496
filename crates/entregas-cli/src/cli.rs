//! CLI definition using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use entregas_domain::service::Caller;
use entregas_types::{EntityKind, OutputFormat, RouteId};

#[derive(Parser)]
#[command(name = "entregas")]
#[command(version)]
#[command(about = "Delivery logistics: route capacity, driver eligibility and scoped access")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store directory. Uses config value if not specified.
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Caller identity: anonymous, staff, driver:<tax id>, customer:<tax id>,
    /// or a comma-joined combination
    #[arg(long = "as", global = true, default_value = "staff")]
    pub caller: Caller,

    /// Output format (json, table). Uses config value if not specified.
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bulk import CSV files (customers, drivers, vehicles, routes, deliveries)
    Import {
        /// Directory holding the CSV files. Uses config value if not specified.
        dir: Option<PathBuf>,
    },

    /// List records visible to the caller
    List {
        #[arg(value_enum)]
        kind: EntityKind,
    },

    /// Show one record
    Show {
        #[arg(value_enum)]
        kind: EntityKind,
        key: String,
    },

    /// Create a record from a JSON file
    Create {
        #[arg(value_enum)]
        kind: EntityKind,
        /// JSON file with the record fields
        file: PathBuf,
    },

    /// Replace a record from a JSON file
    Update {
        #[arg(value_enum)]
        kind: EntityKind,
        /// JSON file with the record fields
        file: PathBuf,
    },

    /// Delete a record
    Delete {
        #[arg(value_enum)]
        kind: EntityKind,
        key: String,
    },

    /// Attach a delivery to a route
    Attach { route: RouteId, tracking_code: String },

    /// Detach a delivery from a route
    Detach { route: RouteId, tracking_code: String },

    /// Move a delivery to another route
    Reassign {
        tracking_code: String,

        /// Target route; omit to take the delivery off its route
        #[arg(long)]
        to: Option<RouteId>,
    },

    /// Change the capacity a delivery requires
    Resize { tracking_code: String, capacity: u32 },

    /// Recalculate route counters from attached deliveries
    Recompute {
        /// Route to recompute; all routes if not specified
        route: Option<RouteId>,
    },

    /// Report routes whose counter drifted or exceeds the vehicle
    Audit,

    /// Show used and available capacity of a route
    Available { route: RouteId },

    /// Make a driver the active driver of a vehicle
    Link { plate: String, driver: String },

    /// Clear the active driver of a vehicle
    Unlink { plate: String },

    /// Route dashboard: driver, vehicle, deliveries and load
    Dashboard {
        /// Route to show; all visible routes if not specified
        route: Option<RouteId>,
    },

    /// Public tracking lookup
    Track { tracking_code: String },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set a value (KEY=VALUE); may be repeated
        #[arg(long, value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Reset to defaults
        #[arg(long)]
        reset: bool,
    },
}
