//! In-memory repository for registered MCP servers.

use crate::server_registry::{
    domain::{ProviderName, ServerConfig, ServerId, ServerName, StatusUpdate, TenantId},
    ports::{ServerConfigRepository, ServerRegistryError, ServerRegistryResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory server registry.
#[derive(Debug, Clone, Default)]
pub struct InMemoryServerRegistry {
    state: Arc<RwLock<InMemoryRegistryState>>,
}

#[derive(Debug, Default)]
struct InMemoryRegistryState {
    servers: HashMap<ServerId, ServerConfig>,
    name_index: HashMap<(TenantId, ServerName), ServerId>,
    provider_index: HashMap<ProviderName, ServerId>,
}

impl InMemoryRegistryState {
    fn ensure_name_free(&self, server: &ServerConfig) -> ServerRegistryResult<()> {
        let key = (server.tenant().clone(), server.name().clone());
        match self.name_index.get(&key) {
            Some(&owner) if owner != server.id() => Err(ServerRegistryError::DuplicateServerName {
                tenant: key.0,
                name: key.1,
            }),
            Some(_) | None => Ok(()),
        }
    }

    fn ensure_provider_free(&self, server: &ServerConfig) -> ServerRegistryResult<()> {
        let Some(provider) = server.provider_name() else {
            return Ok(());
        };
        match self.provider_index.get(provider) {
            Some(&owner) if owner != server.id() => {
                Err(ServerRegistryError::DuplicateProviderName(provider.clone()))
            }
            Some(_) | None => Ok(()),
        }
    }

    fn unindex(&mut self, server: &ServerConfig) {
        self.name_index
            .remove(&(server.tenant().clone(), server.name().clone()));
        if let Some(provider) = server.provider_name() {
            self.provider_index.remove(provider);
        }
    }

    fn index(&mut self, server: &ServerConfig) {
        self.name_index.insert(
            (server.tenant().clone(), server.name().clone()),
            server.id(),
        );
        if let Some(provider) = server.provider_name() {
            self.provider_index.insert(provider.clone(), server.id());
        }
    }
}

impl InMemoryServerRegistry {
    /// Creates an empty in-memory registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl std::fmt::Display) -> ServerRegistryError {
    ServerRegistryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl ServerConfigRepository for InMemoryServerRegistry {
    async fn insert(&self, server: &ServerConfig) -> ServerRegistryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;

        if state.servers.contains_key(&server.id()) {
            return Err(ServerRegistryError::DuplicateServer(server.id()));
        }
        state.ensure_name_free(server)?;
        state.ensure_provider_free(server)?;

        state.index(server);
        state.servers.insert(server.id(), server.clone());
        Ok(())
    }

    async fn update(&self, server: &ServerConfig) -> ServerRegistryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;

        let stored = state
            .servers
            .get(&server.id())
            .cloned()
            .ok_or(ServerRegistryError::NotFound(server.id()))?;
        state.ensure_name_free(server)?;
        state.ensure_provider_free(server)?;

        state.unindex(&stored);
        state.index(server);
        state.servers.insert(server.id(), server.clone());
        Ok(())
    }

    async fn delete(&self, server_id: ServerId) -> ServerRegistryResult<bool> {
        let mut state = self.state.write().map_err(poisoned)?;
        let Some(removed) = state.servers.remove(&server_id) else {
            return Ok(false);
        };
        state.unindex(&removed);
        Ok(true)
    }

    async fn find_by_id(&self, server_id: ServerId) -> ServerRegistryResult<Option<ServerConfig>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.servers.get(&server_id).cloned())
    }

    async fn list_enabled(&self, tenant: &TenantId) -> ServerRegistryResult<Vec<ServerConfig>> {
        let state = self.state.read().map_err(poisoned)?;
        let mut servers: Vec<ServerConfig> = state
            .servers
            .values()
            .filter(|server| server.is_enabled() && server.tenant() == tenant)
            .cloned()
            .collect();
        servers.sort_by(|left, right| left.name().as_str().cmp(right.name().as_str()));
        Ok(servers)
    }

    async fn find_by_provider_name(
        &self,
        provider: &ProviderName,
    ) -> ServerRegistryResult<Option<ServerConfig>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .provider_index
            .get(provider)
            .and_then(|id| state.servers.get(id))
            .cloned())
    }

    async fn update_status(
        &self,
        server_id: ServerId,
        update: &StatusUpdate,
        updated_at: DateTime<Utc>,
    ) -> ServerRegistryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let server = state
            .servers
            .get_mut(&server_id)
            .ok_or(ServerRegistryError::NotFound(server_id))?;
        server.apply_status(update, updated_at);
        Ok(())
    }
}
