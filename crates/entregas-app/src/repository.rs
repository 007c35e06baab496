//! Store and service construction from configuration

use std::path::PathBuf;

use entregas_store::JsonStore;
use entregas_types::Result;

use crate::app::LogisticsService;
use crate::config::Config;

/// Open the entity store in the configured directory
pub fn open_store(config: &Config) -> Result<JsonStore> {
    let store_dir = config.store_dir()?;
    JsonStore::open(store_dir)
}

/// Open the entity store at a custom directory
pub fn open_store_at(store_dir: PathBuf) -> Result<JsonStore> {
    JsonStore::open(store_dir)
}

/// Service over the configured store, with the configured access policy
pub fn open_service(config: &Config) -> Result<LogisticsService<JsonStore>> {
    Ok(LogisticsService::new(open_store(config)?, config.policy()))
}

/// Service over a store at a custom directory
pub fn open_service_at(config: &Config, store_dir: PathBuf) -> Result<LogisticsService<JsonStore>> {
    Ok(LogisticsService::new(open_store_at(store_dir)?, config.policy()))
}
