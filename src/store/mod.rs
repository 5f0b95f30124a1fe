//! Storage seam: the operations the CRUD executor needs from the underlying engine.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

use crate::config::{AssociationDescriptor, EagerLoad, ModelDescriptor};
use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub type Attributes = Map<String, Value>;

/// A stored record plus its eager-loaded has-many id lists.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Instance {
    pub attributes: Attributes,
    /// Child ids keyed by association name; only associations that were eager-loaded appear here.
    pub associated: BTreeMap<String, Vec<Value>>,
}

impl Instance {
    pub fn new(attributes: Attributes) -> Self {
        Instance {
            attributes,
            associated: BTreeMap::new(),
        }
    }

    pub fn id(&self, model: &ModelDescriptor) -> Option<&Value> {
        self.attributes.get(&model.primary_key)
    }
}

/// Equality filters plus eager loads for `find`/`find_all`.
#[derive(Clone, Debug, Default)]
pub struct FindOptions {
    pub filters: Vec<(String, Value)>,
    pub include: Vec<EagerLoad>,
}

impl FindOptions {
    /// Filter by primary key, no eager loads.
    pub fn by_id(model: &ModelDescriptor, id: &Value) -> Self {
        FindOptions {
            filters: vec![(model.primary_key.clone(), id.clone())],
            include: Vec::new(),
        }
    }

    /// Attach every has-many id list of `model`.
    pub fn with_includes(mut self, model: &ModelDescriptor) -> Self {
        self.include = model.eager_loads();
        self
    }

    pub fn filter(mut self, column: impl Into<String>, value: Value) -> Self {
        self.filters.push((column.into(), value));
        self
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find(&self, model: &ModelDescriptor, options: &FindOptions) -> Result<Option<Instance>, StoreError>;

    async fn find_all(&self, model: &ModelDescriptor, options: &FindOptions) -> Result<Vec<Instance>, StoreError>;

    async fn create(&self, model: &ModelDescriptor, attributes: &Attributes) -> Result<Instance, StoreError>;

    async fn update_attributes(
        &self,
        model: &ModelDescriptor,
        id: &Value,
        attributes: &Attributes,
    ) -> Result<Instance, StoreError>;

    /// Replace the full set of children of `model`/`id` for a has-many `association` with `ids`.
    async fn set_association(
        &self,
        model: &ModelDescriptor,
        id: &Value,
        association: &AssociationDescriptor,
        target: &ModelDescriptor,
        ids: &[Value],
    ) -> Result<(), StoreError>;

    async fn destroy(&self, model: &ModelDescriptor, id: &Value) -> Result<(), StoreError>;

    async fn reload(&self, model: &ModelDescriptor, id: &Value, options: &FindOptions) -> Result<Instance, StoreError> {
        let options = FindOptions {
            filters: vec![(model.primary_key.clone(), id.clone())],
            include: options.include.clone(),
        };
        self.find(model, &options).await?.ok_or_else(|| StoreError::Missing {
            table: model.table.clone(),
            id: id_to_string(id),
        })
    }

    /// Readiness probe.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Path-style rendering of an id value ("7", not "\"7\"").
pub fn id_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Equality that treats 7 and "7" alike, for ids that arrive from paths as strings.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => match (n.as_i64(), m.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => n.as_f64() == m.as_f64(),
        },
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => n.to_string() == *s,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_loose_eq() {
        assert!(loose_eq(&json!(7), &json!(7)));
        assert!(loose_eq(&json!(7), &json!("7")));
        assert!(loose_eq(&json!("7"), &json!(7)));
        assert!(!loose_eq(&json!(7), &json!(8)));
        assert!(!loose_eq(&json!(null), &json!(0)));
        assert!(loose_eq(&json!("a"), &json!("a")));
    }

    #[test]
    fn test_id_to_string() {
        assert_eq!("7", id_to_string(&json!(7)));
        assert_eq!("abc", id_to_string(&json!("abc")));
    }
}
