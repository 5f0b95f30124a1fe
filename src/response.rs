//! Response envelope helpers: every payload is keyed by the resource's plural name.

use axum::{http::StatusCode, Json};
use serde_json::{Map, Value};

pub fn envelope(key: &str, value: Value) -> Value {
    let mut body = Map::new();
    body.insert(key.to_string(), value);
    Value::Object(body)
}

pub fn success_one(key: &str, wire: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(envelope(key, wire)))
}

pub fn success_created(key: &str, wire: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(envelope(key, wire)))
}

pub fn success_many(key: &str, wires: Vec<Value>) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(envelope(key, Value::Array(wires))))
}
