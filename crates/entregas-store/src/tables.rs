//! In-memory tables with integrity checks

use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use entregas_types::{Entity, EntityKind, Error, OnDelete, Reference, Result, UniqueKey};

use crate::Records;

/// Stored record plus the integrity metadata computed when it was written
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Row {
    value: Value,
    #[serde(default)]
    references: Vec<Reference>,
    #[serde(default)]
    unique_keys: Vec<UniqueKey>,
}

/// All record tables of a store
///
/// A transaction works on a clone of this value, so a failed transaction
/// simply drops its copy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    rows: BTreeMap<EntityKind, BTreeMap<String, Row>>,
    #[serde(default)]
    sequences: BTreeMap<EntityKind, u64>,
}

impl Tables {
    /// Number of records per entity type
    pub fn counts(&self) -> BTreeMap<EntityKind, usize> {
        EntityKind::ALL
            .iter()
            .map(|kind| (*kind, self.rows.get(kind).map_or(0, BTreeMap::len)))
            .collect()
    }

    fn contains(&self, kind: EntityKind, key: &str) -> bool {
        self.rows
            .get(&kind)
            .map(|table| table.contains_key(key))
            .unwrap_or(false)
    }

    /// Validate a record against the current tables and build its row
    fn checked_row<E: Entity>(&self, entity: &E, key: &str) -> Result<Row> {
        entity.validate()?;

        let unique_keys = entity.unique_keys();
        if let Some(table) = self.rows.get(&E::KIND) {
            for unique in &unique_keys {
                let clash = table
                    .iter()
                    .find(|(other, row)| other.as_str() != key && row.unique_keys.contains(unique));
                if let Some((other, _)) = clash {
                    return Err(Error::constraint(
                        E::KIND,
                        format!(
                            "{} '{}' is already used by {} {}",
                            unique.field,
                            unique.value,
                            E::KIND,
                            other
                        ),
                    ));
                }
            }
        }

        let references = entity.references();
        for reference in &references {
            if !self.contains(reference.target, &reference.key) {
                return Err(Error::constraint(
                    E::KIND,
                    format!(
                        "{} references missing {} {}",
                        reference.field, reference.target, reference.key
                    ),
                ));
            }
        }

        Ok(Row {
            value: serde_json::to_value(entity)?,
            references,
            unique_keys,
        })
    }

    fn decode<E: Entity>(row: &Row) -> Result<E> {
        Ok(serde_json::from_value(row.value.clone())?)
    }

    /// Rows (other than the deleted one) holding a reference to `(kind, key)`
    fn referrers(&self, kind: EntityKind, key: &str) -> Vec<(EntityKind, String, Reference)> {
        let mut found = Vec::new();
        for (row_kind, table) in &self.rows {
            for (row_key, row) in table {
                if *row_kind == kind && row_key == key {
                    continue;
                }
                for reference in &row.references {
                    if reference.target == kind && reference.key == key {
                        found.push((*row_kind, row_key.clone(), reference.clone()));
                    }
                }
            }
        }
        found
    }

    fn release(&mut self, kind: EntityKind, key: &str, reference: &Reference) {
        let Some(row) = self.rows.get_mut(&kind).and_then(|t| t.get_mut(key)) else {
            return;
        };

        if let Some(object) = row.value.as_object_mut() {
            match reference.on_delete {
                OnDelete::SetNull => {
                    object.insert(reference.field.clone(), Value::Null);
                    row.unique_keys.retain(|u| u.field != reference.field);
                }
                OnDelete::Pull => {
                    if let Some(Value::Array(items)) = object.get_mut(&reference.field) {
                        items.retain(|item| value_key(item) != reference.key);
                    }
                }
                OnDelete::Restrict => return,
            }
        }
        row.references.retain(|r| r != reference);
    }
}

/// Key text of a JSON scalar as stored in a reference
fn value_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Records for Tables {
    fn create<E: Entity>(&mut self, entity: E) -> Result<E> {
        let key = entity.key().to_string();
        if self.contains(E::KIND, &key) {
            return Err(Error::constraint(
                E::KIND,
                format!("duplicate key {}", key),
            ));
        }

        let row = self.checked_row(&entity, &key)?;
        self.rows.entry(E::KIND).or_default().insert(key, row);
        Ok(entity)
    }

    fn get<E: Entity>(&self, key: impl Display) -> Result<E> {
        let key = key.to_string();
        self.find::<E>(&key)?
            .ok_or_else(|| Error::not_found(E::KIND, key))
    }

    fn find<E: Entity>(&self, key: impl Display) -> Result<Option<E>> {
        self.rows
            .get(&E::KIND)
            .and_then(|table| table.get(&key.to_string()))
            .map(|row| Self::decode::<E>(row))
            .transpose()
    }

    fn filter<E: Entity, P>(&self, predicate: P) -> Result<Vec<E>>
    where
        P: Fn(&E) -> bool,
    {
        let Some(table) = self.rows.get(&E::KIND) else {
            return Ok(Vec::new());
        };

        let mut matched = Vec::new();
        for row in table.values() {
            let entity: E = Self::decode(row)?;
            if predicate(&entity) {
                matched.push(entity);
            }
        }
        Ok(matched)
    }

    fn update<E: Entity>(&mut self, entity: &E) -> Result<()> {
        let key = entity.key().to_string();
        if !self.contains(E::KIND, &key) {
            return Err(Error::not_found(E::KIND, key));
        }

        let row = self.checked_row(entity, &key)?;
        self.rows.entry(E::KIND).or_default().insert(key, row);
        Ok(())
    }

    fn delete<E: Entity>(&mut self, key: impl Display) -> Result<()> {
        let key = key.to_string();
        if !self.contains(E::KIND, &key) {
            return Err(Error::not_found(E::KIND, key));
        }

        let referrers = self.referrers(E::KIND, &key);
        if let Some((kind, other, reference)) = referrers
            .iter()
            .find(|(_, _, r)| r.on_delete == OnDelete::Restrict)
        {
            return Err(Error::constraint(
                E::KIND,
                format!(
                    "{} {} is still referenced by {} {} ({})",
                    E::KIND,
                    key,
                    kind,
                    other,
                    reference.field
                ),
            ));
        }

        for (kind, other, reference) in &referrers {
            self.release(*kind, other, reference);
        }

        if let Some(table) = self.rows.get_mut(&E::KIND) {
            table.remove(&key);
        }
        Ok(())
    }

    fn next_id(&mut self, kind: EntityKind) -> u64 {
        let next = self.sequences.entry(kind).or_insert(0);
        *next += 1;
        *next
    }
}
