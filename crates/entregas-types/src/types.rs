//! Enumerations shared across the workspace

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Enum with a kebab-case label and the single-letter code used by legacy data
pub trait Coded: Copy + Sized + 'static {
    const ALL: &'static [Self];

    /// Storage code (e.g. `'T'` for in-transit)
    fn code(&self) -> char;

    /// Human-readable kebab-case label
    fn label(&self) -> &'static str;
}

/// Parse either the label (case-insensitive, `_` and `-` interchangeable) or the code
pub fn parse_coded<T: Coded>(value: &str, what: &str) -> Result<T, Error> {
    let trimmed = value.trim();
    let normalized = trimmed.to_ascii_lowercase().replace('_', "-");

    let mut chars = trimmed.chars();
    let single = match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c.to_ascii_uppercase()),
        _ => None,
    };

    T::ALL
        .iter()
        .copied()
        .find(|v| v.label() == normalized || single == Some(v.code()))
        .ok_or_else(|| Error::Validation(format!("invalid {}: '{}'", what, value)))
}

/// Driver's license class, ordered B < C < D < E
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LicenseClass {
    B,
    C,
    D,
    E,
}

impl Coded for LicenseClass {
    const ALL: &'static [Self] = &[Self::B, Self::C, Self::D, Self::E];

    fn code(&self) -> char {
        match self {
            LicenseClass::B => 'B',
            LicenseClass::C => 'C',
            LicenseClass::D => 'D',
            LicenseClass::E => 'E',
        }
    }

    fn label(&self) -> &'static str {
        match self {
            LicenseClass::B => "b",
            LicenseClass::C => "c",
            LicenseClass::D => "d",
            LicenseClass::E => "e",
        }
    }
}

impl fmt::Display for LicenseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for LicenseClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_coded(s, "license class")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverStatus {
    Active,
    Inactive,
    OnRoute,
    #[default]
    Available,
}

impl Coded for DriverStatus {
    const ALL: &'static [Self] = &[Self::Active, Self::Inactive, Self::OnRoute, Self::Available];

    fn code(&self) -> char {
        match self {
            DriverStatus::Active => 'A',
            DriverStatus::Inactive => 'I',
            DriverStatus::OnRoute => 'R',
            DriverStatus::Available => 'D',
        }
    }

    fn label(&self) -> &'static str {
        match self {
            DriverStatus::Active => "active",
            DriverStatus::Inactive => "inactive",
            DriverStatus::OnRoute => "on-route",
            DriverStatus::Available => "available",
        }
    }
}

/// Vehicle category, decides which license classes may operate it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VehicleCategory {
    #[default]
    Car,
    Van,
    Truck,
}

impl Coded for VehicleCategory {
    const ALL: &'static [Self] = &[Self::Car, Self::Van, Self::Truck];

    fn code(&self) -> char {
        match self {
            VehicleCategory::Car => '1',
            VehicleCategory::Van => '2',
            VehicleCategory::Truck => '3',
        }
    }

    fn label(&self) -> &'static str {
        match self {
            VehicleCategory::Car => "car",
            VehicleCategory::Van => "van",
            VehicleCategory::Truck => "truck",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VehicleStatus {
    #[default]
    Available,
    InUse,
    Maintenance,
}

impl Coded for VehicleStatus {
    const ALL: &'static [Self] = &[Self::Available, Self::InUse, Self::Maintenance];

    fn code(&self) -> char {
        match self {
            VehicleStatus::Available => 'D',
            VehicleStatus::InUse => 'U',
            VehicleStatus::Maintenance => 'M',
        }
    }

    fn label(&self) -> &'static str {
        match self {
            VehicleStatus::Available => "available",
            VehicleStatus::InUse => "in-use",
            VehicleStatus::Maintenance => "maintenance",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
}

impl Coded for RouteStatus {
    const ALL: &'static [Self] = &[Self::Planned, Self::InProgress, Self::Completed];

    fn code(&self) -> char {
        match self {
            RouteStatus::Planned => 'P',
            RouteStatus::InProgress => 'A',
            RouteStatus::Completed => 'C',
        }
    }

    fn label(&self) -> &'static str {
        match self {
            RouteStatus::Planned => "planned",
            RouteStatus::InProgress => "in-progress",
            RouteStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    InTransit,
    Delivered,
    Cancelled,
    Rescheduled,
}

impl Coded for DeliveryStatus {
    const ALL: &'static [Self] = &[
        Self::Pending,
        Self::InTransit,
        Self::Delivered,
        Self::Cancelled,
        Self::Rescheduled,
    ];

    fn code(&self) -> char {
        match self {
            DeliveryStatus::Pending => 'P',
            DeliveryStatus::InTransit => 'T',
            DeliveryStatus::Delivered => 'E',
            DeliveryStatus::Cancelled => 'C',
            DeliveryStatus::Rescheduled => 'R',
        }
    }

    fn label(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::InTransit => "in-transit",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Cancelled => "cancelled",
            DeliveryStatus::Rescheduled => "rescheduled",
        }
    }
}

macro_rules! display_and_parse {
    ($($ty:ty => $what:literal),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.label())
                }
            }

            impl FromStr for $ty {
                type Err = Error;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    parse_coded(s, $what)
                }
            }
        )*
    };
}

display_and_parse! {
    DriverStatus => "driver status",
    VehicleCategory => "vehicle category",
    VehicleStatus => "vehicle status",
    RouteStatus => "route status",
    DeliveryStatus => "delivery status",
}

/// The five stored entity types
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Driver,
    Vehicle,
    Customer,
    Route,
    Delivery,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Driver,
        EntityKind::Vehicle,
        EntityKind::Customer,
        EntityKind::Route,
        EntityKind::Delivery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Driver => "driver",
            EntityKind::Vehicle => "vehicle",
            EntityKind::Customer => "customer",
            EntityKind::Route => "route",
            EntityKind::Delivery => "delivery",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation a caller wants to perform on a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Read => write!(f, "read"),
            Action::Create => write!(f, "create"),
            Action::Update => write!(f, "update"),
            Action::Delete => write!(f, "delete"),
        }
    }
}

/// Store-allocated route identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(pub u64);

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RouteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse()
            .map(RouteId)
            .map_err(|_| Error::Validation(format!("invalid route id: '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_by_label_and_code() {
        assert_eq!("in-transit".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::InTransit);
        assert_eq!("IN_TRANSIT".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::InTransit);
        assert_eq!("T".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::InTransit);
        assert_eq!("3".parse::<VehicleCategory>().unwrap(), VehicleCategory::Truck);
        assert_eq!("van".parse::<VehicleCategory>().unwrap(), VehicleCategory::Van);
        assert_eq!("d".parse::<DriverStatus>().unwrap(), DriverStatus::Available);
        assert_eq!("u".parse::<VehicleStatus>().unwrap(), VehicleStatus::InUse);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "boat".parse::<VehicleCategory>().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!("X".parse::<LicenseClass>().is_err());
    }

    #[test]
    fn test_license_class_ordering() {
        assert!(LicenseClass::B < LicenseClass::C);
        assert!(LicenseClass::D < LicenseClass::E);
        assert_eq!("e".parse::<LicenseClass>().unwrap(), LicenseClass::E);
    }

    #[test]
    fn test_serde_uses_kebab_labels() {
        let json = serde_json::to_string(&RouteStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        let id: RouteId = serde_json::from_str("42").unwrap();
        assert_eq!(id, RouteId(42));
    }
}
