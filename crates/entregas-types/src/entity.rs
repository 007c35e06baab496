//! Storage contract implemented by every persisted record

use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::EntityKind;

/// What the store does to a referencing row when its target is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnDelete {
    /// Refuse the delete
    Restrict,
    /// Null out the referencing field
    SetNull,
    /// Remove the key from the referencing array field
    Pull,
}

/// Foreign key held by a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Serialized field name holding the key
    pub field: String,
    pub target: EntityKind,
    pub key: String,
    pub on_delete: OnDelete,
}

impl Reference {
    pub fn new(field: &str, target: EntityKind, key: impl ToString, on_delete: OnDelete) -> Self {
        Self {
            field: field.to_string(),
            target,
            key: key.to_string(),
            on_delete,
        }
    }
}

/// Secondary field whose value must be unique among records of one kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueKey {
    pub field: String,
    pub value: String,
}

impl UniqueKey {
    pub fn new(field: &str, value: impl ToString) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

/// A record the entity store can persist
pub trait Entity: Serialize + DeserializeOwned + Clone {
    const KIND: EntityKind;

    type Key: Display + Clone;

    /// Primary (natural) key
    fn key(&self) -> Self::Key;

    /// Foreign keys this record holds
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }

    /// Secondary uniqueness constraints
    fn unique_keys(&self) -> Vec<UniqueKey> {
        Vec::new()
    }

    /// Field-level validation, run by the store on create and update
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}
