//! Router assembly: resource routes under the endpoint prefix, ambient routes at the root.

mod common;
mod resource;

pub use common::common_routes;
pub use resource::resource_routes;

use crate::config::{ApiOptions, StatusPolicy};
use crate::error::{AppError, ConfigError, ErrorMarker};
use crate::state::AppState;
use axum::{
    extract::OriginalUri,
    http::{header::HeaderName, HeaderValue, Method, StatusCode},
    middleware::map_response,
    response::Response,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

const ALLOWED_HEADERS: [&str; 5] = [
    "x-requested-with",
    "x-authentication",
    "x-ip",
    "content-type",
    "authorization",
];

async fn route_not_found(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::RouteDoesNotExist(uri.path().trim_start_matches('/').to_string())
}

/// Legacy clients expect every response, errors included, with status 200.
async fn legacy_status(mut response: Response) -> Response {
    if response.extensions().get::<ErrorMarker>().is_some() {
        *response.status_mut() = StatusCode::OK;
    }
    response
}

fn cors_layer(options: &ApiOptions) -> Result<CorsLayer, ConfigError> {
    let origin = HeaderValue::from_str(&options.config.allow_origin)
        .map_err(|_| ConfigError::Validation(format!("invalid allow_origin '{}'", options.config.allow_origin)))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(ALLOWED_HEADERS.map(HeaderName::from_static)))
}

/// Full application router for `state`: resource routes under the configured endpoint,
/// ambient routes, CORS, body limit, request tracing and the error status policy.
pub fn api_router(state: AppState) -> Result<Router, ConfigError> {
    let options = state.options.clone();
    for route in state.index.routes() {
        let ops: Vec<String> = route.supported_operations.iter().map(|o| o.to_string()).collect();
        tracing::info!(
            path = %format!("{}{}", options.endpoint(), route.resource_path),
            model = %route.target_model,
            operations = %ops.join(","),
            "route"
        );
    }

    let resources = resource_routes(state.clone());
    let mut router = match options.endpoint() {
        "" => common_routes(state).merge(resources),
        prefix if prefix.starts_with('/') => common_routes(state).nest(prefix, resources),
        prefix => return Err(ConfigError::Validation(format!("endpoint '{}' must start with '/'", prefix))),
    };
    router = router.fallback(route_not_found);
    if options.config.status_codes == StatusPolicy::Legacy {
        router = router.layer(map_response(legacy_status));
    }
    Ok(router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyLimitLayer::new(options.config.body_limit))
            .layer(cors_layer(&options)?),
    ))
}
