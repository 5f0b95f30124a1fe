//! Resource routes. Paths are parameterized; handlers resolve the model through the extractors.

use crate::handlers::resource::{create, delete, list, list_nested, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn resource_routes(state: AppState) -> Router {
    Router::new()
        .route("/:resource", get(list).post(create))
        .route("/:resource/:id", get(read).put(update).delete(delete))
        .route("/:resource/:id/:collection", get(list_nested))
        .with_state(state)
}
