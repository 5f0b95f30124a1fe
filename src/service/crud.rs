//! Generic CRUD execution against any [`Store`].

use crate::config::{ModelDescriptor, ModelIndex};
use crate::error::AppError;
use crate::store::{id_to_string, Attributes, FindOptions, Instance, Store};
use serde_json::Value;

/// Borrowed view of the store and index for one request.
pub struct CrudExecutor<'a> {
    store: &'a dyn Store,
    index: &'a ModelIndex,
}

fn does_not_exist(model: &ModelDescriptor, id: &Value) -> AppError {
    AppError::ResourceDoesNotExist {
        route: model.plural.clone(),
        id: id_to_string(id),
    }
}

impl<'a> CrudExecutor<'a> {
    pub fn new(store: &'a dyn Store, index: &'a ModelIndex) -> Self {
        CrudExecutor { store, index }
    }

    pub async fn list(&self, model: &ModelDescriptor) -> Result<Vec<Instance>, AppError> {
        let options = FindOptions::default().with_includes(model);
        Ok(self.store.find_all(model, &options).await?)
    }

    /// Children of `child` whose `foreign_key` equals `parent_id`. The parent itself is not looked up.
    pub async fn list_nested(
        &self,
        child: &ModelDescriptor,
        foreign_key: &str,
        parent_id: &Value,
    ) -> Result<Vec<Instance>, AppError> {
        let options = FindOptions::default()
            .filter(foreign_key, parent_id.clone())
            .with_includes(child);
        Ok(self.store.find_all(child, &options).await?)
    }

    pub async fn read(&self, model: &ModelDescriptor, id: &Value) -> Result<Instance, AppError> {
        let options = FindOptions::by_id(model, id).with_includes(model);
        self.store
            .find(model, &options)
            .await?
            .ok_or_else(|| does_not_exist(model, id))
    }

    /// Insert, then reload with eager loads so has-many lists are present (possibly empty).
    pub async fn create(&self, model: &ModelDescriptor, mut attributes: Attributes) -> Result<Instance, AppError> {
        for (assoc, _) in model.has_many() {
            attributes.remove(&assoc.name);
        }
        let created = self.store.create(model, &attributes).await?;
        let Some(id) = created.id(model).filter(|v| !v.is_null()).cloned() else {
            return Ok(created);
        };
        let options = FindOptions::default().with_includes(model);
        Ok(self.store.reload(model, &id, &options).await?)
    }

    /// Replace has-many sets named in `attributes`, then update the remaining scalars and reload.
    /// Steps run in order and stop at the first failure; earlier writes are not undone.
    pub async fn update(&self, model: &ModelDescriptor, id: &Value, mut attributes: Attributes) -> Result<Instance, AppError> {
        let options = FindOptions::by_id(model, id).with_includes(model);
        let instance = self
            .store
            .find(model, &options)
            .await?
            .ok_or_else(|| does_not_exist(model, id))?;
        let own_id = instance.id(model).cloned().unwrap_or_else(|| id.clone());

        for (assoc, _) in model.has_many() {
            let requested = match attributes.remove(&assoc.name) {
                None | Some(Value::Null) => continue,
                Some(Value::Array(ids)) => ids,
                Some(other) => {
                    return Err(AppError::InvalidPayload(format!(
                        "'{}' must be an array of ids, got {}",
                        assoc.name, other
                    )))
                }
            };
            let target = self.index.model(&assoc.target).ok_or_else(|| {
                AppError::InvalidPayload(format!("association target '{}' is not registered", assoc.target))
            })?;
            let mut resolved = Vec::with_capacity(requested.len());
            for child_id in &requested {
                let found = self.store.find(target, &FindOptions::by_id(target, child_id)).await?;
                match found.and_then(|c| c.id(target).cloned()) {
                    Some(v) => resolved.push(v),
                    None => tracing::debug!(association = %assoc.name, id = %child_id, "dropping unknown association id"),
                }
            }
            self.store.set_association(model, &own_id, assoc, target, &resolved).await?;
        }

        attributes.remove(&model.primary_key);
        if !attributes.is_empty() {
            self.store.update_attributes(model, &own_id, &attributes).await?;
        }
        Ok(self.store.reload(model, &own_id, &options).await?)
    }

    pub async fn delete(&self, model: &ModelDescriptor, id: &Value) -> Result<(), AppError> {
        let found = self.store.find(model, &FindOptions::by_id(model, id)).await?;
        let Some(instance) = found else {
            return Err(does_not_exist(model, id));
        };
        let own_id = instance.id(model).cloned().unwrap_or_else(|| id.clone());
        self.store.destroy(model, &own_id).await?;
        Ok(())
    }
}
