//! CrudExecutor: per-endpoint orchestration of store calls.

mod crud;
pub use crud::CrudExecutor;
