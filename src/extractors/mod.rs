//! Request extractors.

pub mod resource;
pub use resource::{parse_id, ItemTarget, NestedTarget, ResourceTarget};
