//! Application services for the server registry.

mod registry;

pub use registry::{
    RegisterAuth, RegisterServerRequest, ServerRegistry, ServerRegistryServiceError,
    ServerRegistryServiceResult,
};
