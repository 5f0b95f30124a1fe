//! In-process store keyed by table name. Integer primary keys are assigned on create when absent.

use crate::config::{AssociationDescriptor, AssociationKind, ModelDescriptor};
use crate::error::StoreError;
use crate::store::{id_to_string, loose_eq, Attributes, FindOptions, Instance, Store};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Table {
    rows: Vec<Attributes>,
    last_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a table's rows in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Attributes> {
        self.read()
            .map(|tables| tables.get(table).map(|t| t.rows.clone()).unwrap_or_default())
            .unwrap_or_default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Table>>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Rejected("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Table>>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Rejected("memory store lock poisoned".into()))
    }
}

fn matches(row: &Attributes, filters: &[(String, Value)]) -> bool {
    filters
        .iter()
        .all(|(col, want)| loose_eq(row.get(col).unwrap_or(&Value::Null), want))
}

fn hydrate(tables: &HashMap<String, Table>, model: &ModelDescriptor, row: &Attributes, options: &FindOptions) -> Instance {
    let mut instance = Instance::new(row.clone());
    let own_id = row.get(&model.primary_key).cloned().unwrap_or(Value::Null);
    for eager in &options.include {
        let projection = eager.attributes.first().map(String::as_str).unwrap_or("id");
        let ids = tables
            .get(&eager.table)
            .map(|t| {
                t.rows
                    .iter()
                    .filter(|child| !own_id.is_null() && loose_eq(child.get(&eager.foreign_key).unwrap_or(&Value::Null), &own_id))
                    .map(|child| child.get(projection).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .unwrap_or_default();
        instance.associated.insert(eager.name.clone(), ids);
    }
    instance
}

fn missing(model: &ModelDescriptor, id: &Value) -> StoreError {
    StoreError::Missing {
        table: model.table.clone(),
        id: id_to_string(id),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find(&self, model: &ModelDescriptor, options: &FindOptions) -> Result<Option<Instance>, StoreError> {
        let tables = self.read()?;
        let found = tables
            .get(&model.table)
            .and_then(|t| t.rows.iter().find(|row| matches(row, &options.filters)))
            .map(|row| hydrate(&tables, model, row, options));
        Ok(found)
    }

    async fn find_all(&self, model: &ModelDescriptor, options: &FindOptions) -> Result<Vec<Instance>, StoreError> {
        let tables = self.read()?;
        let Some(table) = tables.get(&model.table) else {
            return Ok(Vec::new());
        };
        Ok(table
            .rows
            .iter()
            .filter(|row| matches(row, &options.filters))
            .map(|row| hydrate(&tables, model, row, options))
            .collect())
    }

    async fn create(&self, model: &ModelDescriptor, attributes: &Attributes) -> Result<Instance, StoreError> {
        let mut row: Attributes = attributes
            .iter()
            .filter(|(k, _)| model.has_column(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for c in &model.columns {
            if c.name == model.primary_key || c.nullable || c.has_default {
                continue;
            }
            if row.get(&c.name).map_or(true, Value::is_null) {
                return Err(StoreError::Rejected(format!(
                    "null value in column \"{}\" of \"{}\" violates not-null constraint",
                    c.name, model.table
                )));
            }
        }
        for c in &model.columns {
            row.entry(c.name.clone()).or_insert(Value::Null);
        }

        let mut tables = self.write()?;
        let table = tables.entry(model.table.clone()).or_default();
        match row.get(&model.primary_key).filter(|v| !v.is_null()) {
            Some(id) => {
                if table.rows.iter().any(|r| r.get(&model.primary_key).is_some_and(|v| loose_eq(v, id))) {
                    return Err(StoreError::Rejected(format!(
                        "duplicate key {}/{}",
                        model.table,
                        id_to_string(id)
                    )));
                }
                if let Some(n) = id.as_i64() {
                    table.last_id = table.last_id.max(n);
                }
            }
            None => {
                table.last_id += 1;
                row.insert(model.primary_key.clone(), Value::from(table.last_id));
            }
        }
        table.rows.push(row.clone());
        Ok(Instance::new(row))
    }

    async fn update_attributes(
        &self,
        model: &ModelDescriptor,
        id: &Value,
        attributes: &Attributes,
    ) -> Result<Instance, StoreError> {
        let mut tables = self.write()?;
        let row = tables
            .get_mut(&model.table)
            .and_then(|t| {
                t.rows
                    .iter_mut()
                    .find(|r| r.get(&model.primary_key).is_some_and(|v| loose_eq(v, id)))
            })
            .ok_or_else(|| missing(model, id))?;
        for (k, v) in attributes {
            if *k != model.primary_key && model.has_column(k) {
                row.insert(k.clone(), v.clone());
            }
        }
        Ok(Instance::new(row.clone()))
    }

    async fn set_association(
        &self,
        model: &ModelDescriptor,
        id: &Value,
        association: &AssociationDescriptor,
        target: &ModelDescriptor,
        ids: &[Value],
    ) -> Result<(), StoreError> {
        let AssociationKind::HasMany { foreign_key, .. } = &association.kind else {
            return Err(StoreError::Rejected(format!(
                "{}.{} is not a has-many association",
                model.name, association.name
            )));
        };
        let mut tables = self.write()?;
        let Some(children) = tables.get_mut(&target.table) else {
            return Ok(());
        };
        for child in children.rows.iter_mut() {
            let child_id = child.get(&target.primary_key).cloned().unwrap_or(Value::Null);
            if ids.iter().any(|i| loose_eq(i, &child_id)) {
                child.insert(foreign_key.clone(), id.clone());
            } else if child.get(foreign_key).is_some_and(|fk| loose_eq(fk, id)) {
                child.insert(foreign_key.clone(), Value::Null);
            }
        }
        Ok(())
    }

    async fn destroy(&self, model: &ModelDescriptor, id: &Value) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let table = tables.get_mut(&model.table).ok_or_else(|| missing(model, id))?;
        let before = table.rows.len();
        table
            .rows
            .retain(|r| !r.get(&model.primary_key).is_some_and(|v| loose_eq(v, id)));
        if table.rows.len() == before {
            return Err(missing(model, id));
        }
        Ok(())
    }
}
