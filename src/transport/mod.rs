//! Wire formats. Both strategies read the request body the same way and differ only in how
//! associations are shaped on the way out.

mod ember;
mod json_api;

pub use ember::EmberRest;
pub use json_api::JsonApi;

use crate::config::{ModelDescriptor, TransportKind};
use crate::error::AppError;
use crate::store::{Attributes, Instance};
use serde_json::Value;
use std::sync::Arc;

/// Scheme, host and endpoint prefix used to build `links` hrefs, e.g. "http://example.com/api".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkBase(pub String);

impl LinkBase {
    pub fn new(host: &str, endpoint: &str) -> Self {
        LinkBase(format!("http://{}{}", host, endpoint))
    }

    pub fn href(&self, segments: &[&str]) -> String {
        let mut out = self.0.clone();
        for s in segments {
            out.push('/');
            out.push_str(s);
        }
        out
    }
}

pub trait Transport: Send + Sync {
    /// Wire object for one instance. Works on a copy; the instance is left untouched.
    fn serialize_one(&self, links: &LinkBase, model: &ModelDescriptor, instance: &Instance) -> Value;

    /// Attributes for create/update: the sub-object keyed by the model's singular name.
    fn deserialize(&self, model: &ModelDescriptor, body: Value) -> Result<Attributes, AppError> {
        let Value::Object(mut body) = body else {
            return Err(AppError::InvalidPayload("request body must be a JSON object".into()));
        };
        match body.remove(&model.singular) {
            Some(Value::Object(attrs)) => Ok(attrs),
            Some(_) => Err(AppError::InvalidPayload(format!("'{}' must be a JSON object", model.singular))),
            None => Err(AppError::InvalidPayload(format!("request body must contain '{}'", model.singular))),
        }
    }
}

pub fn transport_for(kind: TransportKind) -> Arc<dyn Transport> {
    match kind {
        TransportKind::JsonApi => Arc::new(JsonApi),
        TransportKind::EmberRest => Arc::new(EmberRest),
    }
}
