//! Shared application state for all routes. The model index is built once and never mutated.

use crate::config::{ApiOptions, ModelIndex};
use crate::store::Store;
use crate::transport::{transport_for, Transport};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub index: Arc<ModelIndex>,
    pub options: Arc<ApiOptions>,
    pub transport: Arc<dyn Transport>,
}

impl AppState {
    /// Transport is picked from `options.config.transport`.
    pub fn new(store: Arc<dyn Store>, index: ModelIndex, options: ApiOptions) -> Self {
        let transport = transport_for(options.config.transport);
        AppState {
            store,
            index: Arc::new(index),
            options: Arc::new(options),
            transport,
        }
    }
}
