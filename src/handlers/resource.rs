//! Resource handlers: list, create, read, update, delete, nested list.

use crate::error::AppError;
use crate::extractors::{ItemTarget, NestedTarget, ResourceTarget};
use crate::response::{success_created, success_many, success_one};
use crate::service::CrudExecutor;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;

fn body_value(body: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    body.map(|Json(v)| v).map_err(|e| AppError::InvalidPayload(e.body_text()))
}

pub async fn list(State(state): State<AppState>, target: ResourceTarget) -> Result<impl IntoResponse, AppError> {
    let model = &target.model;
    let instances = CrudExecutor::new(state.store.as_ref(), &state.index).list(model).await?;
    let wires = instances
        .iter()
        .map(|i| state.transport.serialize_one(&target.links, model, i))
        .collect();
    Ok(success_many(&model.plural, wires))
}

pub async fn create(
    State(state): State<AppState>,
    target: ResourceTarget,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let model = &target.model;
    let attributes = state.transport.deserialize(model, body_value(body)?)?;
    let created = CrudExecutor::new(state.store.as_ref(), &state.index)
        .create(model, attributes)
        .await?;
    Ok(success_created(
        &model.plural,
        state.transport.serialize_one(&target.links, model, &created),
    ))
}

pub async fn read(State(state): State<AppState>, target: ItemTarget) -> Result<impl IntoResponse, AppError> {
    if target.is_batch() {
        return Err(AppError::NotYetImplemented("Reading"));
    }
    let model = &target.model;
    let instance = CrudExecutor::new(state.store.as_ref(), &state.index)
        .read(model, &target.id)
        .await?;
    Ok(success_one(
        &model.plural,
        state.transport.serialize_one(&target.links, model, &instance),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    target: ItemTarget,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    if target.is_batch() {
        return Err(AppError::NotYetImplemented("Updating"));
    }
    let model = &target.model;
    let attributes = state.transport.deserialize(model, body_value(body)?)?;
    let instance = CrudExecutor::new(state.store.as_ref(), &state.index)
        .update(model, &target.id, attributes)
        .await?;
    Ok(success_one(
        &model.plural,
        state.transport.serialize_one(&target.links, model, &instance),
    ))
}

pub async fn delete(State(state): State<AppState>, target: ItemTarget) -> Result<StatusCode, AppError> {
    if target.is_batch() {
        return Err(AppError::NotYetImplemented("Deleting"));
    }
    CrudExecutor::new(state.store.as_ref(), &state.index)
        .delete(&target.model, &target.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_nested(State(state): State<AppState>, target: NestedTarget) -> Result<impl IntoResponse, AppError> {
    let child = &target.child;
    let instances = CrudExecutor::new(state.store.as_ref(), &state.index)
        .list_nested(child, &target.foreign_key, &target.parent_id)
        .await?;
    let wires = instances
        .iter()
        .map(|i| state.transport.serialize_one(&target.links, child, i))
        .collect();
    Ok(success_many(&child.plural, wires))
}
