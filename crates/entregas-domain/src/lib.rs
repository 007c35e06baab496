//! Domain models and services for delivery logistics

pub mod model;
pub mod service;

#[cfg(test)]
pub(crate) mod fixtures;
