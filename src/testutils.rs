//! Test helpers: a seeded in-memory context, a call-counting store and one-shot request helpers.

use crate::config::{resolve, ApiConfig, ApiOptions, AssociationDescriptor, ModelDescriptor, RegistryConfig};
use crate::error::StoreError;
use crate::routes::api_router;
use crate::state::AppState;
use crate::store::{Attributes, FindOptions, Instance, MemoryStore, Store};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{self, HeaderName, HeaderValue, Request};
use axum::Router;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tower::util::ServiceExt;

/// Maximum body size for testing purposes.
const MAX_BODY_SIZE: usize = 64 * 1024;

/// Wraps a [`MemoryStore`] and counts every call made through the [`Store`] trait.
#[derive(Default)]
pub(crate) struct CountingStore {
    pub(crate) inner: MemoryStore,
    calls: AtomicUsize,
    fail_ping: AtomicBool,
}

impl CountingStore {
    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for CountingStore {
    async fn find(&self, model: &ModelDescriptor, options: &FindOptions) -> Result<Option<Instance>, StoreError> {
        self.hit();
        self.inner.find(model, options).await
    }

    async fn find_all(&self, model: &ModelDescriptor, options: &FindOptions) -> Result<Vec<Instance>, StoreError> {
        self.hit();
        self.inner.find_all(model, options).await
    }

    async fn create(&self, model: &ModelDescriptor, attributes: &Attributes) -> Result<Instance, StoreError> {
        self.hit();
        self.inner.create(model, attributes).await
    }

    async fn update_attributes(
        &self,
        model: &ModelDescriptor,
        id: &Value,
        attributes: &Attributes,
    ) -> Result<Instance, StoreError> {
        self.hit();
        self.inner.update_attributes(model, id, attributes).await
    }

    async fn set_association(
        &self,
        model: &ModelDescriptor,
        id: &Value,
        association: &AssociationDescriptor,
        target: &ModelDescriptor,
        ids: &[Value],
    ) -> Result<(), StoreError> {
        self.hit();
        self.inner.set_association(model, id, association, target, ids).await
    }

    async fn destroy(&self, model: &ModelDescriptor, id: &Value) -> Result<(), StoreError> {
        self.hit();
        self.inner.destroy(model, id).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.fail_ping.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("store offline".into()));
        }
        Ok(())
    }
}

/// Registry used by the HTTP tests:
/// widgets has many children, children belong to widgets and have many toys, gadgets stand alone,
/// toys and secrets are not exposed.
pub(crate) fn registry() -> RegistryConfig {
    serde_json::from_value(json!({
        "models": [
            {
                "name": "widgets",
                "columns": [{"name": "id", "type": "integer"}, {"name": "name"}],
                "associations": [{"kind": "has_many", "target": "children", "foreign_key": "widget_id"}]
            },
            {
                "name": "children",
                "columns": [{"name": "id", "type": "integer"}, {"name": "widget_id", "type": "integer"}, {"name": "label"}],
                "associations": [
                    {"kind": "belongs_to", "target": "widgets", "foreign_key": "widget_id"},
                    {"kind": "has_many", "target": "toys", "foreign_key": "child_id"}
                ]
            },
            {
                "name": "toys",
                "columns": [{"name": "id", "type": "integer"}, {"name": "child_id", "type": "integer"}],
                "associations": [{"kind": "belongs_to", "target": "children", "foreign_key": "child_id"}]
            },
            {
                "name": "gadgets",
                "columns": [{"name": "id", "type": "integer"}, {"name": "name"}]
            },
            {
                "name": "secrets",
                "columns": [{"name": "id", "type": "integer"}]
            }
        ]
    }))
    .unwrap()
}

fn default_config() -> ApiConfig {
    ApiConfig {
        allowed: Some(vec!["widgets".into(), "children".into(), "gadgets".into()]),
        allow_origin: "http://client.example".into(),
        ..ApiConfig::default()
    }
}

/// State shared by the HTTP tests. Seeded with widgets 1 ("gear") and 2 ("cog"), children
/// 1 (widget 1), 2 and 3 (widget 2), and toys 1 and 2 (child 2) and 3 (child 3).
pub(crate) struct TestContext {
    store: Arc<CountingStore>,
    options: ApiOptions,
}

impl TestContext {
    pub(crate) async fn setup() -> Self {
        Self::setup_with(ApiOptions::new(default_config())).await
    }

    pub(crate) async fn setup_with_config<F: FnOnce(&mut ApiConfig)>(f: F) -> Self {
        let mut config = default_config();
        f(&mut config);
        Self::setup_with(ApiOptions::new(config)).await
    }

    pub(crate) async fn setup_with(options: ApiOptions) -> Self {
        let context = TestContext {
            store: Arc::new(CountingStore::default()),
            options,
        };
        context.seed("widgets", json!({"name": "gear"})).await;
        context.seed("widgets", json!({"name": "cog"})).await;
        context.seed("children", json!({"widget_id": 1, "label": "a"})).await;
        context.seed("children", json!({"widget_id": 2, "label": "b"})).await;
        context.seed("children", json!({"widget_id": 2, "label": "c"})).await;
        context.seed("toys", json!({"child_id": 2})).await;
        context.seed("toys", json!({"child_id": 2})).await;
        context.seed("toys", json!({"child_id": 3})).await;
        context
    }

    /// Switches readiness probes to failing.
    pub(crate) fn fail_ping(&self) {
        self.store.fail_ping.store(true, Ordering::SeqCst);
    }

    /// Inserts a row directly, bypassing the call counter.
    pub(crate) async fn seed(&self, model: &str, attributes: Value) {
        let index = resolve(&registry(), &ApiOptions::default()).unwrap();
        let model = index.model(model).unwrap();
        self.store.inner.create(model, attributes.as_object().unwrap()).await.unwrap();
    }

    pub(crate) fn rows(&self, table: &str) -> Vec<Attributes> {
        self.store.inner.rows(table)
    }

    /// Number of calls made through the store trait so far.
    pub(crate) fn store_calls(&self) -> usize {
        self.store.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn app(&self) -> Router {
        let index = resolve(&registry(), &self.options).unwrap();
        let state = AppState::new(self.store.clone(), index, self.options.clone());
        api_router(state).unwrap()
    }
}

/// Builder for a single request to the API server.
#[must_use]
pub(crate) struct OneShotBuilder {
    app: Router,
    builder: http::request::Builder,
}

impl OneShotBuilder {
    pub(crate) fn new<U: AsRef<str>>(app: Router, (method, uri): (http::Method, U)) -> Self {
        let builder = Request::builder().method(method).uri(uri.as_ref());
        Self { app, builder }
    }

    pub(crate) fn with_header<K, V>(mut self, name: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.builder = self.builder.header(name, value);
        self
    }

    pub(crate) async fn send_empty(self) -> ResponseChecker {
        let request = self.builder.body(Body::empty()).unwrap();
        ResponseChecker::from(self.app.oneshot(request).await.unwrap())
    }

    pub(crate) async fn send_json<T: Serialize>(self, request: T) -> ResponseChecker {
        let request = self
            .builder
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&request).unwrap()))
            .unwrap();
        ResponseChecker::from(self.app.oneshot(request).await.unwrap())
    }

    pub(crate) async fn send_text<T: Into<String>>(self, text: T) -> ResponseChecker {
        let request = self
            .builder
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(text.into()))
            .unwrap();
        ResponseChecker::from(self.app.oneshot(request).await.unwrap())
    }
}

type HttpResponse = http::Response<Body>;

/// Validator for the outcome of a request sent by a `OneShotBuilder`.
#[must_use]
pub(crate) struct ResponseChecker {
    response: HttpResponse,
    exp_status: http::StatusCode,
}

impl From<HttpResponse> for ResponseChecker {
    fn from(response: HttpResponse) -> Self {
        Self { response, exp_status: http::StatusCode::OK }
    }
}

impl ResponseChecker {
    pub(crate) fn expect_status(mut self, status: http::StatusCode) -> Self {
        self.exp_status = status;
        self
    }

    /// Asserts that header `name` is present with `value`.
    pub(crate) fn expect_header(self, name: &str, value: &str) -> Self {
        let actual = self.header(name);
        assert_eq!(Some(value), actual.as_deref(), "header {}", name);
        self
    }

    pub(crate) fn header(&self, name: &str) -> Option<String> {
        self.response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub(crate) fn verify(&self) {
        assert_eq!(self.exp_status, self.response.status());
    }

    async fn body(self) -> Vec<u8> {
        self.verify();
        axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE)
            .await
            .unwrap()
            .to_vec()
    }

    pub(crate) async fn expect_empty(self) {
        let body = self.body().await;
        assert!(body.is_empty(), "Body not empty; got {}", String::from_utf8_lossy(&body));
    }

    pub(crate) async fn expect_json(self) -> Value {
        let body = self.body().await;
        match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => panic!("Invalid JSON response due to {}; content was {}", e, String::from_utf8_lossy(&body)),
        }
    }

    /// Expects an error payload with `title`; returns its description.
    pub(crate) async fn expect_error(self, title: &str) -> String {
        let body = self.expect_json().await;
        assert_eq!(json!(title), body["errors"]["title"], "unexpected error body {}", body);
        body["errors"]["description"].as_str().unwrap_or_default().to_string()
    }
}
