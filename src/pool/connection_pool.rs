//! Per-tenant cache of connected MCP clients.

use crate::mcp::services::{McpClient, McpClientFactory, McpTarget};
use crate::oauth::domain::OAuthProviderConfig;
use crate::oauth::registry::DynamicProviderRegistry;
use crate::server_registry::domain::{ProviderName, ServerAuth, ServerConfig, TenantId};
use crate::server_registry::ports::ServerConfigRepository;
use crate::server_registry::services::{ServerRegistry, ServerRegistryServiceError};
use crate::vault::{CredentialError, CredentialVault};
use futures::future::join_all;
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Connected clients of one tenant, baseline servers first.
pub type ClientList = Arc<Vec<Arc<McpClient>>>;

/// Errors returned by [`McpConnectionPool`].
///
/// Per-server connection failures are recorded on the server row and never
/// surface here.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Loading the tenant's servers failed.
    #[error(transparent)]
    Registry(#[from] ServerRegistryServiceError),

    /// A server's OAuth client secret could not be decrypted.
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Pool tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// How long a tenant's client list is served from cache. Failed servers
    /// are not retried until it expires.
    pub cache_ttl: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
        }
    }
}

struct CachedClients {
    clients: ClientList,
    loaded_at: Instant,
}

type TenantSlot = Arc<tokio::sync::Mutex<Option<CachedClients>>>;

/// Hands out connected MCP clients per tenant.
///
/// Each tenant has its own lock around "miss, load, connect, populate" so
/// concurrent first calls connect every server once while other tenants
/// proceed in parallel.
pub struct McpConnectionPool<R, C>
where
    R: ServerConfigRepository,
    C: Clock + Send + Sync,
{
    registry: ServerRegistry<R, C>,
    factory: McpClientFactory,
    providers: Arc<DynamicProviderRegistry>,
    vault: Arc<CredentialVault>,
    baseline: Vec<McpTarget>,
    settings: PoolSettings,
    tenants: Mutex<HashMap<TenantId, TenantSlot>>,
}

impl<R, C> McpConnectionPool<R, C>
where
    R: ServerConfigRepository,
    C: Clock + Send + Sync,
{
    /// Creates an empty pool.
    #[must_use]
    pub fn new(
        registry: ServerRegistry<R, C>,
        factory: McpClientFactory,
        providers: Arc<DynamicProviderRegistry>,
        vault: Arc<CredentialVault>,
        settings: PoolSettings,
    ) -> Self {
        Self {
            registry,
            factory,
            providers,
            vault,
            baseline: Vec::new(),
            settings,
            tenants: Mutex::new(HashMap::new()),
        }
    }

    /// Adds deploy-time servers offered to every tenant ahead of its own.
    #[must_use]
    pub fn with_baseline(mut self, baseline: Vec<McpTarget>) -> Self {
        self.baseline = baseline;
        self
    }

    /// Returns the connected clients of `tenant`.
    ///
    /// A fresh cache entry is returned as is. Otherwise the tenant's enabled
    /// servers are loaded and connected concurrently; each outcome is
    /// recorded on its row and failing servers are left out.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Registry`] when the server list cannot be loaded.
    pub async fn get_clients(&self, tenant: &TenantId) -> Result<ClientList, PoolError> {
        let slot = self.tenant_slot(tenant);
        let mut cached = slot.lock().await;

        if let Some(entry) = cached.as_ref()
            && entry.loaded_at.elapsed() < self.settings.cache_ttl
        {
            debug!(tenant = %tenant, clients = entry.clients.len(), "serving cached MCP clients");
            return Ok(Arc::clone(&entry.clients));
        }
        if let Some(stale) = cached.take() {
            disconnect_all(&stale.clients).await;
        }

        let clients = self.load(tenant).await?;
        *cached = Some(CachedClients {
            clients: Arc::clone(&clients),
            loaded_at: Instant::now(),
        });
        Ok(clients)
    }

    /// Disconnects and drops the cached clients of `tenant`.
    ///
    /// Nothing reconnects until the next [`Self::get_clients`] call.
    pub async fn disconnect_context(&self, tenant: &TenantId) {
        let Some(slot) = self.existing_slot(tenant) else {
            return;
        };
        let taken = slot.lock().await.take();
        self.release_idle_slot(tenant, &slot);
        let Some(entry) = taken else {
            return;
        };
        disconnect_all(&entry.clients).await;
        info!(tenant = %tenant, clients = entry.clients.len(), "disconnected MCP clients");
    }

    /// Forgets a changed or deleted server: unregisters its dynamic OAuth
    /// provider and invalidates the tenant's cache.
    pub async fn forget_server(&self, tenant: &TenantId, provider: Option<&ProviderName>) {
        if let Some(name) = provider.filter(|name| name.is_dynamic()) {
            self.providers.unregister(name);
        }
        self.disconnect_context(tenant).await;
    }

    /// Registers the dynamic OAuth provider of an OAuth server.
    ///
    /// Returns whether a provider was registered.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Credential`] when the client secret cannot be
    /// decrypted.
    pub fn register_server_provider(&self, server: &ServerConfig) -> Result<bool, PoolError> {
        let ServerAuth::OAuth {
            provider_name,
            endpoints,
        } = server.auth()
        else {
            return Ok(false);
        };
        let config = OAuthProviderConfig::from_server_endpoints(
            provider_name.clone(),
            endpoints,
            &self.vault,
        )?;
        self.providers.register(config);
        Ok(true)
    }

    fn tenant_slot(&self, tenant: &TenantId) -> TenantSlot {
        let mut tenants = self.tenants.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(tenants.entry(tenant.clone()).or_default())
    }

    fn existing_slot(&self, tenant: &TenantId) -> Option<TenantSlot> {
        let tenants = self.tenants.lock().unwrap_or_else(PoisonError::into_inner);
        tenants.get(tenant).map(Arc::clone)
    }

    /// Drops the map entry when only the map and `slot` reference it.
    fn release_idle_slot(&self, tenant: &TenantId, slot: &TenantSlot) {
        let mut tenants = self.tenants.lock().unwrap_or_else(PoisonError::into_inner);
        let unshared = Arc::strong_count(slot) == 2
            && tenants
                .get(tenant)
                .is_some_and(|current| Arc::ptr_eq(current, slot));
        if unshared {
            tenants.remove(tenant);
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_tenants(&self) -> usize {
        self.tenants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn load(&self, tenant: &TenantId) -> Result<ClientList, PoolError> {
        let servers = self.registry.list_enabled(tenant).await?;
        for server in &servers {
            if let Err(err) = self.register_server_provider(server) {
                warn!(
                    server_id = %server.id(),
                    error = %err,
                    "could not register OAuth provider for MCP server"
                );
            }
        }

        let candidates: Vec<Arc<McpClient>> = self
            .baseline
            .iter()
            .cloned()
            .chain(servers.iter().map(McpTarget::for_server))
            .map(|target| Arc::new(self.factory.client(target)))
            .collect();

        let outcomes = join_all(candidates.iter().map(|client| client.connect())).await;

        let mut connected = Vec::with_capacity(candidates.len());
        for (client, outcome) in candidates.into_iter().zip(outcomes) {
            match (outcome, client.server_id()) {
                (Ok(tool_count), Some(server_id)) => {
                    self.registry.record_connected(server_id, tool_count).await;
                    connected.push(client);
                }
                (Ok(_), None) => connected.push(client),
                (Err(err), Some(server_id)) => {
                    self.registry.record_failed(server_id, &err.message()).await;
                }
                (Err(err), None) => {
                    warn!(server = client.name(), error = %err, "baseline MCP server unavailable");
                }
            }
        }

        info!(
            tenant = %tenant,
            connected = connected.len(),
            attempted = servers.len().saturating_add(self.baseline.len()),
            "loaded MCP clients"
        );
        Ok(Arc::new(connected))
    }
}

async fn disconnect_all(clients: &[Arc<McpClient>]) {
    join_all(clients.iter().map(|client| client.disconnect())).await;
}
