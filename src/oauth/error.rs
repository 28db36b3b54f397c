//! Errors surfaced by OAuth provider resolution and flow operations.

use super::ports::{OAuthStoreError, TokenEndpointError};
use crate::server_registry::domain::{ProviderName, TenantId};
use crate::server_registry::ports::ServerRegistryError;
use crate::vault::CredentialError;
use thiserror::Error;

/// Result type for OAuth operations.
pub type OAuthResult<T> = Result<T, OAuthError>;

/// OAuth flow failures.
///
/// Messages never carry tokens, codes or raw provider response bodies.
#[derive(Debug, Clone, Error)]
pub enum OAuthError {
    /// No provider configuration resolves for the name.
    #[error("OAuth provider not found: {0}")]
    ProviderNotFound(ProviderName),

    /// The provider's authorization URL cannot be extended with query
    /// parameters.
    #[error("OAuth provider {0} has an unusable authorization URL")]
    MalformedProvider(ProviderName),

    /// The state is unknown, already exchanged, or expired.
    #[error("authorization state is invalid or expired")]
    InvalidState,

    /// The redirect URI recorded for the attempt differs from the configured
    /// one.
    #[error("redirect URI does not match the configured callback")]
    RedirectMismatch,

    /// The provider reported an authorization error on the callback.
    #[error("authorization was denied by the provider: {0}")]
    AuthorizationDenied(String),

    /// The token endpoint failed or rejected the code exchange.
    #[error("token exchange failed: {0}")]
    ExchangeFailed(String),

    /// No token is stored for the provider and tenant.
    #[error("OAuth provider {provider} is not authorized for tenant {tenant}; authorize the server")]
    NotAuthorized {
        /// Provider name.
        provider: ProviderName,
        /// Tenant.
        tenant: TenantId,
    },

    /// The access token expired and could not be refreshed; the user must
    /// authorize again.
    #[error("OAuth authorization for provider {provider} and tenant {tenant} expired; re-authorize the server")]
    Expired {
        /// Provider name.
        provider: ProviderName,
        /// Tenant.
        tenant: TenantId,
    },

    /// A stored secret could not be decrypted or a new one encrypted.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Token or state persistence failed.
    #[error(transparent)]
    Store(#[from] OAuthStoreError),

    /// Server registry lookup failed during provider resolution.
    #[error(transparent)]
    Registry(#[from] ServerRegistryError),
}

impl OAuthError {
    /// Generalizes a token endpoint failure for a code exchange.
    #[must_use]
    pub fn exchange_failed(err: &TokenEndpointError) -> Self {
        Self::ExchangeFailed(crate::server_registry::domain::truncate_message(
            &err.to_string(),
        ))
    }
}
