//! Repository port for registered MCP server persistence.

use crate::server_registry::domain::{
    ProviderName, ServerConfig, ServerId, ServerName, StatusUpdate, TenantId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for server registry operations.
pub type ServerRegistryResult<T> = Result<T, ServerRegistryError>;

/// Persistence contract for [`ServerConfig`] rows.
#[async_trait]
pub trait ServerConfigRepository: Send + Sync {
    /// Stores a new server.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryError::DuplicateServer`] when the id exists,
    /// [`ServerRegistryError::DuplicateServerName`] when the tenant already
    /// owns a server with that name, or
    /// [`ServerRegistryError::DuplicateProviderName`] when the dynamic
    /// provider name is taken.
    async fn insert(&self, server: &ServerConfig) -> ServerRegistryResult<()>;

    /// Persists configuration changes to an existing server.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryError::NotFound`] when the server does not
    /// exist or [`ServerRegistryError::DuplicateServerName`] when a rename
    /// collides within the tenant.
    async fn update(&self, server: &ServerConfig) -> ServerRegistryResult<()>;

    /// Deletes a server, returning whether a row was removed.
    async fn delete(&self, server_id: ServerId) -> ServerRegistryResult<bool>;

    /// Finds a server by identifier.
    async fn find_by_id(&self, server_id: ServerId) -> ServerRegistryResult<Option<ServerConfig>>;

    /// Returns the enabled servers of `tenant`, ordered by name.
    async fn list_enabled(&self, tenant: &TenantId) -> ServerRegistryResult<Vec<ServerConfig>>;

    /// Finds the OAuth server backing a dynamic provider name.
    async fn find_by_provider_name(
        &self,
        provider: &ProviderName,
    ) -> ServerRegistryResult<Option<ServerConfig>>;

    /// Writes the outcome of a connection attempt onto a server row.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryError::NotFound`] when the server does not
    /// exist.
    async fn update_status(
        &self,
        server_id: ServerId,
        update: &StatusUpdate,
        updated_at: DateTime<Utc>,
    ) -> ServerRegistryResult<()>;
}

/// Errors returned by server registry repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ServerRegistryError {
    /// A server with the same identifier already exists.
    #[error("duplicate MCP server identifier: {0}")]
    DuplicateServer(ServerId),

    /// The tenant already owns a server with the same name.
    #[error("duplicate MCP server name for tenant {tenant}: {name}")]
    DuplicateServerName {
        /// Owning tenant.
        tenant: TenantId,
        /// Conflicting name.
        name: ServerName,
    },

    /// Another server already uses the dynamic provider name.
    #[error("duplicate OAuth provider name: {0}")]
    DuplicateProviderName(ProviderName),

    /// The server was not found.
    #[error("MCP server not found: {0}")]
    NotFound(ServerId),

    /// Persisted data could not be reconstructed into domain types.
    #[error("invalid persisted MCP server data: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ServerRegistryError {
    /// Wraps persisted-data decoding or validation failures.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a persistence-layer failure.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
