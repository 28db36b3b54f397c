//! Port through which MCP clients obtain OAuth bearer credentials.

use crate::oauth::OAuthError;
use crate::server_registry::domain::{ProviderName, TenantId};
use async_trait::async_trait;
use std::fmt;

/// Decrypted access token plus whether it is known to be expired.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredAccessToken {
    /// Plaintext access token.
    pub value: String,
    /// Whether the token is past (or within skew of) its expiry.
    pub expired: bool,
}

impl fmt::Debug for StoredAccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StoredAccessToken")
            .field("expired", &self.expired)
            .finish_non_exhaustive()
    }
}

/// Source of access tokens for (provider, tenant) pairs.
///
/// Callers decide when to refresh so that one connection attempt refreshes
/// at most once.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Returns the stored access token without refreshing it.
    async fn stored_access_token(
        &self,
        provider: &ProviderName,
        tenant: &TenantId,
    ) -> Result<StoredAccessToken, OAuthError>;

    /// Refreshes the access token and returns the new value.
    async fn refresh(&self, provider: &ProviderName, tenant: &TenantId)
    -> Result<String, OAuthError>;
}
