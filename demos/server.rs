//! Example server. Uses PostgreSQL when DATABASE_URL is set (registry from REGISTRY_PATH or live
//! introspection of DATABASE_SCHEMA), otherwise an in-memory store with the registry at REGISTRY_PATH.

use model_api::{
    api_router, ensure_database_exists, load_registry_from_path, load_registry_from_pool, resolve, ApiConfig,
    ApiOptions, AppState, MemoryStore, PgStore, Store,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("model_api=info".parse()?))
        .init();

    let options = ApiOptions::new(ApiConfig::from_env()?);
    let registry_path = std::env::var("REGISTRY_PATH").ok();

    let (store, registry): (Arc<dyn Store>, _) = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            ensure_database_exists(&database_url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;
            let registry = match &registry_path {
                Some(path) => load_registry_from_path(path).await?,
                None => {
                    let schema = std::env::var("DATABASE_SCHEMA").unwrap_or_else(|_| "public".into());
                    load_registry_from_pool(&pool, &schema).await?
                }
            };
            let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
            (store, registry)
        }
        Err(_) => {
            let path = registry_path.unwrap_or_else(|| "demos/registry.json".into());
            tracing::info!(%path, "DATABASE_URL not set; serving from memory");
            let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
            (store, load_registry_from_path(&path).await?)
        }
    };

    let index = resolve(&registry, &options)?;
    let app = api_router(AppState::new(store, index, options))?;

    let addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
