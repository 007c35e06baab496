//! Use cases exposed to the CLI

pub mod dashboard;
pub mod logistics_service;

pub use dashboard::{DeliveryLine, DriverSummary, RouteDashboard, TrackingInfo, VehicleSummary};
pub use logistics_service::{LogisticsService, RouteDraft};
