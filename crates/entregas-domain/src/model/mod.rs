//! Domain model types

pub mod customer;
pub mod delivery;
pub mod driver;
pub mod route;
pub mod vehicle;

pub use customer::Customer;
pub use delivery::Delivery;
pub use driver::Driver;
pub use route::Route;
pub use vehicle::Vehicle;

use entregas_types::{Error, Result};

/// Reject empty text fields
pub(crate) fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Tax ids are 1 to 11 ASCII digits
pub(crate) fn require_tax_id(field: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.len() > 11 || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::Validation(format!(
            "{} must be 1 to 11 digits, got '{}'",
            field, value
        )));
    }
    Ok(())
}

pub(crate) fn require_max_len(field: &str, value: &str, max: usize) -> Result<()> {
    require(field, value)?;
    if value.chars().count() > max {
        return Err(Error::Validation(format!(
            "{} must be at most {} characters, got '{}'",
            field, max, value
        )));
    }
    Ok(())
}
