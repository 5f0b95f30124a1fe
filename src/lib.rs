//! Model API: association-aware REST backend derived from a model registry.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod inflect;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;
pub mod transport;

#[cfg(test)]
pub(crate) mod testutils;

pub use config::{load_registry_from_path, load_registry_from_pool, resolve, ApiConfig, ApiOptions, ModelIndex, RegistryConfig};
pub use error::{AppError, ConfigError, StoreError};
pub use routes::{api_router, common_routes, resource_routes};
pub use service::CrudExecutor;
pub use state::AppState;
pub use store::{ensure_database_exists, MemoryStore, PgStore, Store};
pub use transport::{EmberRest, JsonApi, Transport};
