//! Port contracts for the server registry.

mod repository;

pub use repository::{ServerConfigRepository, ServerRegistryError, ServerRegistryResult};
