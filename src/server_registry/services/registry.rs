//! Service layer over the server registry repository.

use crate::server_registry::{
    domain::{
        EndpointUrl, NewServerConfig, OAuthEndpoints, ServerAuthRequest, ServerConfig, ServerId,
        ServerName, ServerRegistryDomainError, StatusUpdate, TenantId, TransportKind,
    },
    ports::{ServerConfigRepository, ServerRegistryError},
};
use crate::vault::{CredentialError, CredentialVault};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Plaintext authentication supplied when registering a server.
#[derive(Clone, PartialEq, Eq)]
pub enum RegisterAuth {
    /// No credentials.
    None,
    /// Static bearer token.
    Bearer {
        /// Plaintext token, encrypted before it is stored.
        token: String,
    },
    /// OAuth with user-supplied endpoints.
    OAuth {
        /// Authorization endpoint.
        authorization_url: String,
        /// Token endpoint.
        token_url: String,
        /// Client id.
        client_id: String,
        /// Plaintext client secret, encrypted before it is stored.
        client_secret: Option<String>,
        /// Requested scope.
        scope: Option<String>,
    },
}

impl std::fmt::Debug for RegisterAuth {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => formatter.write_str("None"),
            Self::Bearer { .. } => formatter.write_str("Bearer { token: <redacted> }"),
            Self::OAuth {
                authorization_url,
                token_url,
                client_id,
                scope,
                ..
            } => formatter
                .debug_struct("OAuth")
                .field("authorization_url", authorization_url)
                .field("token_url", token_url)
                .field("client_id", client_id)
                .field("scope", scope)
                .finish_non_exhaustive(),
        }
    }
}

/// Request payload for registering an MCP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterServerRequest {
    /// Owning tenant.
    pub tenant: String,
    /// Human-readable name.
    pub name: String,
    /// Endpoint URL.
    pub url: String,
    /// Transport kind.
    pub transport: TransportKind,
    /// Authentication settings.
    pub auth: RegisterAuth,
}

/// Service-level errors for server registry operations.
#[derive(Debug, Error)]
pub enum ServerRegistryServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] ServerRegistryDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] ServerRegistryError),
    /// A secret could not be encrypted.
    #[error(transparent)]
    Credential(#[from] CredentialError),
    /// No server exists with the given identifier.
    #[error("MCP server {0} not found")]
    NotFound(ServerId),
}

/// Result type for server registry service operations.
pub type ServerRegistryServiceResult<T> = Result<T, ServerRegistryServiceError>;

/// Server registry access used by the pool and by administrative callers.
pub struct ServerRegistry<R, C>
where
    R: ServerConfigRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    vault: Arc<CredentialVault>,
    clock: Arc<C>,
}

impl<R, C> Clone for ServerRegistry<R, C>
where
    R: ServerConfigRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            vault: Arc::clone(&self.vault),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R, C> ServerRegistry<R, C>
where
    R: ServerConfigRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new registry service.
    #[must_use]
    pub const fn new(repository: Arc<R>, vault: Arc<CredentialVault>, clock: Arc<C>) -> Self {
        Self {
            repository,
            vault,
            clock,
        }
    }

    /// Returns the underlying repository.
    #[must_use]
    pub const fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    async fn find_server_or_error(
        &self,
        server_id: ServerId,
    ) -> ServerRegistryServiceResult<ServerConfig> {
        self.repository
            .find_by_id(server_id)
            .await?
            .ok_or(ServerRegistryServiceError::NotFound(server_id))
    }

    /// Registers a new server, encrypting any supplied secrets.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryServiceError`] when validation or encryption
    /// fails, or persistence rejects the row.
    pub async fn register(
        &self,
        request: RegisterServerRequest,
    ) -> ServerRegistryServiceResult<ServerConfig> {
        let params = NewServerConfig {
            tenant: TenantId::new(request.tenant)?,
            name: ServerName::new(request.name)?,
            url: EndpointUrl::parse("url", request.url)?,
            transport: request.transport,
            auth: self.seal_auth(request.auth)?,
        };
        let server = ServerConfig::new(params, &*self.clock);
        self.repository.insert(&server).await?;
        debug!(server_id = %server.id(), tenant = %server.tenant(), "registered MCP server");
        Ok(server)
    }

    /// Replaces the endpoint, transport and auth of an existing server.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryServiceError::NotFound`] for unknown servers,
    /// or validation, encryption and persistence errors.
    pub async fn reconfigure(
        &self,
        server_id: ServerId,
        url: &str,
        transport: TransportKind,
        auth: RegisterAuth,
    ) -> ServerRegistryServiceResult<ServerConfig> {
        let mut server = self.find_server_or_error(server_id).await?;
        let endpoint = EndpointUrl::parse("url", url)?;
        let sealed = self.seal_auth(auth)?;
        server.reconfigure(endpoint, transport, sealed, &*self.clock);
        self.repository.update(&server).await?;
        Ok(server)
    }

    /// Enables or disables a server.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryServiceError::NotFound`] for unknown servers
    /// or persistence errors.
    pub async fn set_enabled(
        &self,
        server_id: ServerId,
        enabled: bool,
    ) -> ServerRegistryServiceResult<ServerConfig> {
        let mut server = self.find_server_or_error(server_id).await?;
        server.set_enabled(enabled, &*self.clock);
        self.repository.update(&server).await?;
        Ok(server)
    }

    /// Deletes a server, returning the removed row.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryServiceError::NotFound`] for unknown servers
    /// or persistence errors.
    pub async fn delete(&self, server_id: ServerId) -> ServerRegistryServiceResult<ServerConfig> {
        let server = self.find_server_or_error(server_id).await?;
        if !self.repository.delete(server_id).await? {
            return Err(ServerRegistryServiceError::NotFound(server_id));
        }
        Ok(server)
    }

    /// Finds a server by identifier.
    ///
    /// # Errors
    ///
    /// Returns repository errors.
    pub async fn find(&self, server_id: ServerId) -> ServerRegistryServiceResult<Option<ServerConfig>> {
        Ok(self.repository.find_by_id(server_id).await?)
    }

    /// Returns the enabled servers of `tenant`.
    ///
    /// # Errors
    ///
    /// Returns repository errors.
    pub async fn list_enabled(
        &self,
        tenant: &TenantId,
    ) -> ServerRegistryServiceResult<Vec<ServerConfig>> {
        Ok(self.repository.list_enabled(tenant).await?)
    }

    /// Records the outcome of a connection attempt.
    ///
    /// Failures are logged and swallowed.
    pub async fn record_status(&self, server_id: ServerId, update: &StatusUpdate) {
        let now = self.clock.utc();
        if let Err(err) = self.repository.update_status(server_id, update, now).await {
            warn!(
                server_id = %server_id,
                status = %update.status(),
                error = %err,
                "failed to record MCP server status"
            );
        }
    }

    /// Records a successful connection that discovered `tool_count` tools.
    pub async fn record_connected(&self, server_id: ServerId, tool_count: usize) {
        let count = u32::try_from(tool_count).unwrap_or(u32::MAX);
        let update = StatusUpdate::connected(self.clock.utc(), count);
        self.record_status(server_id, &update).await;
    }

    /// Records a failed connection with a log-safe message.
    pub async fn record_failed(&self, server_id: ServerId, message: &str) {
        self.record_status(server_id, &StatusUpdate::failed(message))
            .await;
    }

    fn seal_auth(&self, auth: RegisterAuth) -> ServerRegistryServiceResult<ServerAuthRequest> {
        Ok(match auth {
            RegisterAuth::None => ServerAuthRequest::None,
            RegisterAuth::Bearer { token } => {
                ServerAuthRequest::Bearer(self.vault.encrypt(&token)?)
            }
            RegisterAuth::OAuth {
                authorization_url,
                token_url,
                client_id,
                client_secret,
                scope,
            } => {
                let secret = self.vault.encrypt_optional(client_secret.as_deref())?;
                ServerAuthRequest::OAuth(
                    OAuthEndpoints::new(authorization_url, token_url, client_id)?
                        .with_client_secret(secret)
                        .with_scope(scope),
                )
            }
        })
    }
}
