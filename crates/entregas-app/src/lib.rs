//! Application service layer - use cases, config, store opening

pub mod app;
pub mod config;
pub mod repository;
