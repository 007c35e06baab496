//! Entregas - delivery logistics on the command line
//!
//! Tracks route capacity, checks driver license eligibility and scopes every
//! read and write to the calling staff member, driver or customer.

mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

use entregas_app::config::Config;

/// Logs go to stderr: `RUST_LOG` if set, else `debug` with `--verbose`, else
/// the configured filter, else `info`
fn setup_tracing(verbose: bool) {
    let configured = Config::load().ok().and_then(|c| c.log_filter);
    let fallback = if verbose {
        "debug"
    } else {
        configured.as_deref().unwrap_or("info")
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let format = cli.format;
    if let Err(e) = commands::execute(cli) {
        output::output_error(format, &e);
        std::process::exit(1);
    }
}
