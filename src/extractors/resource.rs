//! Resolve path segments to allowed models and validated ids before a handler runs.

use crate::config::ModelDescriptor;
use crate::error::AppError;
use crate::state::AppState;
use crate::transport::LinkBase;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path},
    http::{header, request::Parts},
};
use serde_json::Value;

/// Typed id: an integer when the segment parses as `i64`, otherwise the raw string.
pub fn parse_id(raw: &str) -> Value {
    match raw.parse::<i64>() {
        Ok(n) => Value::Number(n.into()),
        Err(_) => Value::String(raw.to_string()),
    }
}

fn link_base(parts: &Parts, state: &AppState) -> LinkBase {
    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .unwrap_or("localhost");
    LinkBase::new(host, state.options.endpoint())
}

fn unmatched(parts: &Parts) -> AppError {
    AppError::RouteDoesNotExist(parts.uri.path().trim_start_matches('/').to_string())
}

fn allowed(state: &AppState, name: &str) -> Result<ModelDescriptor, AppError> {
    state
        .index
        .resource(name)
        .cloned()
        .ok_or_else(|| AppError::RouteDoesNotExist(name.to_string()))
}

fn validated(state: &AppState, raw: String) -> Result<String, AppError> {
    if state.options.is_valid_id(&raw) {
        Ok(raw)
    } else {
        Err(AppError::InvalidResourceId(raw))
    }
}

/// `/{resource}`
#[derive(Clone, Debug)]
pub struct ResourceTarget {
    pub model: ModelDescriptor,
    pub links: LinkBase,
}

#[async_trait]
impl FromRequestParts<AppState> for ResourceTarget {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Path(resource) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| unmatched(parts))?;
        Ok(ResourceTarget {
            model: allowed(state, &resource)?,
            links: link_base(parts, state),
        })
    }
}

/// `/{resource}/{id}`
#[derive(Clone, Debug)]
pub struct ItemTarget {
    pub model: ModelDescriptor,
    /// Path segment as received, after validation.
    pub raw_id: String,
    pub id: Value,
    pub links: LinkBase,
}

impl ItemTarget {
    /// Comma-separated ids address several resources at once.
    pub fn is_batch(&self) -> bool {
        self.raw_id.contains(',')
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ItemTarget {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Path((resource, raw_id)) = Path::<(String, String)>::from_request_parts(parts, state)
            .await
            .map_err(|_| unmatched(parts))?;
        let model = allowed(state, &resource)?;
        let raw_id = validated(state, raw_id)?;
        Ok(ItemTarget {
            model,
            id: parse_id(&raw_id),
            raw_id,
            links: link_base(parts, state),
        })
    }
}

/// `/{resource}/{id}/{collection}`: children of one parent, filtered through the child's belongs-to key.
#[derive(Clone, Debug)]
pub struct NestedTarget {
    pub parent: ModelDescriptor,
    pub parent_id: Value,
    pub child: ModelDescriptor,
    pub foreign_key: String,
    pub links: LinkBase,
}

#[async_trait]
impl FromRequestParts<AppState> for NestedTarget {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Path((resource, raw_id, collection)) = Path::<(String, String, String)>::from_request_parts(parts, state)
            .await
            .map_err(|_| unmatched(parts))?;
        let parent = allowed(state, &resource)?;
        let child = allowed(state, &collection)?;
        let foreign_key = state
            .index
            .nested_foreign_key(&parent.name, &child.name)
            .map(str::to_string)
            .ok_or_else(|| AppError::RouteDoesNotExist(format!("{}/{}/{}", resource, raw_id, collection)))?;
        let raw_id = validated(state, raw_id)?;
        Ok(NestedTarget {
            parent,
            parent_id: parse_id(&raw_id),
            child,
            foreign_key,
            links: link_base(parts, state),
        })
    }
}
