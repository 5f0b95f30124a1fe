//! JSON-API flavored output: associations move out of the attributes into `links`.

use crate::config::{AssociationKind, ModelDescriptor};
use crate::store::{id_to_string, Instance};
use crate::transport::{LinkBase, Transport};
use serde_json::{json, Map, Value};

pub struct JsonApi;

impl Transport for JsonApi {
    fn serialize_one(&self, links: &LinkBase, model: &ModelDescriptor, instance: &Instance) -> Value {
        let mut values = instance.attributes.clone();
        if model.associations.is_empty() {
            return Value::Object(values);
        }

        let own_id = values.get(&model.primary_key).map(id_to_string).unwrap_or_default();
        let mut link_map = Map::new();
        for assoc in &model.associations {
            match &assoc.kind {
                AssociationKind::BelongsTo { foreign_key } => {
                    let Some(fk) = values.remove(foreign_key) else { continue };
                    let href = if fk.is_null() {
                        Value::Null
                    } else {
                        Value::String(links.href(&[&assoc.target, &id_to_string(&fk)]))
                    };
                    link_map.insert(
                        foreign_key.clone(),
                        json!({ "href": href, "ids": fk, "type": assoc.target }),
                    );
                }
                AssociationKind::HasMany { .. } => {
                    let Some(ids) = instance.associated.get(&assoc.name) else { continue };
                    // A column of the same name would otherwise shadow the link.
                    values.remove(&assoc.name);
                    link_map.insert(
                        assoc.name.clone(),
                        json!({
                            "href": links.href(&[&model.name, &own_id, &assoc.target]),
                            "ids": ids,
                            "type": assoc.target,
                        }),
                    );
                }
            }
        }
        values.insert("links".into(), Value::Object(link_map));
        Value::Object(values)
    }
}
