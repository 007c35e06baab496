//! Customer records

use serde::{Deserialize, Serialize};

use entregas_types::{Entity, EntityKind, Error, Result};

use super::{require, require_tax_id};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub tax_id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

impl Customer {
    pub fn new(tax_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tax_id: tax_id.into(),
            name: name.into(),
            address: String::new(),
            district: String::new(),
            city: String::new(),
            state: String::new(),
            postal_code: String::new(),
            phone: String::new(),
            email: String::new(),
        }
    }
}

impl Entity for Customer {
    const KIND: EntityKind = EntityKind::Customer;
    type Key = String;

    fn key(&self) -> String {
        self.tax_id.clone()
    }

    fn validate(&self) -> Result<()> {
        require_tax_id("customer tax id", &self.tax_id)?;
        require("customer name", &self.name)?;
        if !self.email.is_empty() && !self.email.contains('@') {
            return Err(Error::Validation(format!(
                "customer email is malformed: '{}'",
                self.email
            )));
        }
        if !self.postal_code.is_empty() && !self.postal_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::Validation(format!(
                "customer postal code must be digits: '{}'",
                self.postal_code
            )));
        }
        Ok(())
    }
}
