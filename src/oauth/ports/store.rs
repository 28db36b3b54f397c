//! Persistence ports for OAuth tokens and authorization states.

use crate::oauth::domain::{AuthorizationState, OAuthToken};
use crate::server_registry::domain::{ProviderName, TenantId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for OAuth persistence operations.
pub type OAuthStoreResult<T> = Result<T, OAuthStoreError>;

/// Durable storage of token pairs, one row per (provider, tenant).
#[async_trait]
pub trait OAuthTokenStore: Send + Sync {
    /// Finds the token pair for a provider and tenant.
    async fn find(
        &self,
        provider: &ProviderName,
        tenant: &TenantId,
    ) -> OAuthStoreResult<Option<OAuthToken>>;

    /// Inserts or replaces the token pair in a single write.
    async fn upsert(&self, token: &OAuthToken) -> OAuthStoreResult<()>;

    /// Removes the token pair, returning whether a row existed.
    async fn delete(&self, provider: &ProviderName, tenant: &TenantId) -> OAuthStoreResult<bool>;
}

/// Durable storage of pending authorization attempts.
#[async_trait]
pub trait AuthorizationStateStore: Send + Sync {
    /// Stores a freshly issued attempt.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthStoreError::DuplicateState`] when the state value is
    /// already stored.
    async fn insert(&self, state: &AuthorizationState) -> OAuthStoreResult<()>;

    /// Finds an attempt by its exact state value.
    async fn find(&self, state: &str) -> OAuthStoreResult<Option<AuthorizationState>>;

    /// Marks an attempt consumed if it is not already.
    ///
    /// Returns `true` only for the caller that performed the transition.
    async fn mark_consumed(&self, state: &str) -> OAuthStoreResult<bool>;

    /// Deletes attempts created before `cutoff`, returning the count.
    async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> OAuthStoreResult<usize>;
}

/// Errors returned by OAuth store implementations.
#[derive(Debug, Clone, Error)]
pub enum OAuthStoreError {
    /// An attempt with the same state value already exists.
    #[error("authorization state already exists")]
    DuplicateState,

    /// Persisted data could not be reconstructed into domain types.
    #[error("invalid persisted OAuth data: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl OAuthStoreError {
    /// Wraps persisted-data decoding or validation failures.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a persistence-layer failure.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
