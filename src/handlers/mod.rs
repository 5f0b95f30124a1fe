//! HTTP handlers for resource CRUD and nested collections.

pub mod resource;
pub use resource::*;
