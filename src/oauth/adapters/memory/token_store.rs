//! In-memory OAuth token store.

use crate::oauth::{
    domain::OAuthToken,
    ports::{OAuthStoreError, OAuthStoreResult, OAuthTokenStore},
};
use crate::server_registry::domain::{ProviderName, TenantId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type TokenKey = (ProviderName, TenantId);

/// Thread-safe in-memory token store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOAuthTokenStore {
    tokens: Arc<RwLock<HashMap<TokenKey, OAuthToken>>>,
}

impl InMemoryOAuthTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl std::fmt::Display) -> OAuthStoreError {
    OAuthStoreError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl OAuthTokenStore for InMemoryOAuthTokenStore {
    async fn find(
        &self,
        provider: &ProviderName,
        tenant: &TenantId,
    ) -> OAuthStoreResult<Option<OAuthToken>> {
        let tokens = self.tokens.read().map_err(poisoned)?;
        Ok(tokens.get(&(provider.clone(), tenant.clone())).cloned())
    }

    async fn upsert(&self, token: &OAuthToken) -> OAuthStoreResult<()> {
        let mut tokens = self.tokens.write().map_err(poisoned)?;
        tokens.insert(
            (token.provider().clone(), token.tenant().clone()),
            token.clone(),
        );
        Ok(())
    }

    async fn delete(&self, provider: &ProviderName, tenant: &TenantId) -> OAuthStoreResult<bool> {
        let mut tokens = self.tokens.write().map_err(poisoned)?;
        Ok(tokens.remove(&(provider.clone(), tenant.clone())).is_some())
    }
}
