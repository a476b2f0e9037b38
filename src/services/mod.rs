//! Services built on the storage layer.
//!
//! Currently the backend factory, which turns a backend type and parameters
//! into a ready-to-connect `Arc<dyn GraphBackend>`.

mod backend_factory;

pub use backend_factory::{BackendParams, BackendType, GraphBackendFactory};
