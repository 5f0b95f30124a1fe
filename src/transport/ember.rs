//! Ember RESTAdapter flavored output: belongs-to keys stay scalar, has-many lists are inlined as id arrays.

use crate::config::{AssociationKind, ModelDescriptor};
use crate::store::Instance;
use crate::transport::{LinkBase, Transport};
use serde_json::Value;

pub struct EmberRest;

impl Transport for EmberRest {
    fn serialize_one(&self, _links: &LinkBase, model: &ModelDescriptor, instance: &Instance) -> Value {
        let mut values = instance.attributes.clone();
        for assoc in &model.associations {
            if let AssociationKind::HasMany { .. } = assoc.kind {
                if let Some(ids) = instance.associated.get(&assoc.name) {
                    values.insert(assoc.name.clone(), Value::Array(ids.clone()));
                }
            }
        }
        Value::Object(values)
    }
}
