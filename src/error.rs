//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown model '{0}'")]
    UnknownModel(String),
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate model: {0}")]
    DuplicateModel(String),
    #[error("invalid primary key: model {model} column {column}")]
    InvalidPrimaryKey { model: String, column: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Failures reported by a [`crate::store::Store`] implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("record {table}/{id} is missing")]
    Missing { table: String, id: String },
    #[error("rejected: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("The resource id '{0}' is invalid.")]
    InvalidResourceId(String),
    #[error("The resource /{route}/{id} does not exist.")]
    ResourceDoesNotExist { route: String, id: String },
    #[error("The route /{0} does not exist.")]
    RouteDoesNotExist(String),
    #[error("{0} multiple resources is not yet implemented.")]
    NotYetImplemented(&'static str),
    #[error("{0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl AppError {
    pub fn title(&self) -> &'static str {
        match self {
            AppError::InvalidResourceId(_) => "Invalid resource id",
            AppError::ResourceDoesNotExist { .. } => "Resource does not exist",
            AppError::RouteDoesNotExist(_) => "Route does not exist",
            AppError::NotYetImplemented(_) => "Not yet implemented",
            AppError::InvalidPayload(_) => "Invalid payload",
            AppError::Storage(_) => "Storage error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidResourceId(_) | AppError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            AppError::ResourceDoesNotExist { .. } | AppError::RouteDoesNotExist(_) => StatusCode::NOT_FOUND,
            AppError::NotYetImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub errors: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub title: String,
    pub description: String,
}

/// Marker extension on responses produced from an [`AppError`], read by the status policy layer.
#[derive(Clone, Copy, Debug)]
pub struct ErrorMarker;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Storage(e) = &self {
            tracing::warn!(error = %e, "storage failure");
        }
        let body = ErrorBody {
            errors: ErrorDetail {
                title: self.title().to_string(),
                description: self.to_string(),
            },
        };
        let mut response = (self.status(), Json(body)).into_response();
        response.extensions_mut().insert(ErrorMarker);
        response
    }
}
