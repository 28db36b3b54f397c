//! Stored OAuth token pair for one (provider, tenant).

use crate::server_registry::domain::{ProviderName, TenantId};
use crate::vault::EncryptedSecret;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Encrypted access/refresh token pair keyed by provider and tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    provider: ProviderName,
    tenant: TenantId,
    access_token: EncryptedSecret,
    refresh_token: Option<EncryptedSecret>,
    expires_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl OAuthToken {
    /// Creates a token record.
    #[must_use]
    pub const fn new(
        provider: ProviderName,
        tenant: TenantId,
        access_token: EncryptedSecret,
        refresh_token: Option<EncryptedSecret>,
        expires_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            provider,
            tenant,
            access_token,
            refresh_token,
            expires_at,
            updated_at,
        }
    }

    /// Returns the provider name.
    #[must_use]
    pub const fn provider(&self) -> &ProviderName {
        &self.provider
    }

    /// Returns the tenant.
    #[must_use]
    pub const fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// Returns the encrypted access token.
    #[must_use]
    pub const fn access_token(&self) -> &EncryptedSecret {
        &self.access_token
    }

    /// Returns the encrypted refresh token, if the provider issued one.
    #[must_use]
    pub const fn refresh_token(&self) -> Option<&EncryptedSecret> {
        self.refresh_token.as_ref()
    }

    /// Returns the access-token expiry, if known.
    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns the last write timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns whether the access token is expired at `now`, treating
    /// tokens within `skew` of expiry as already expired. Tokens without a
    /// known expiry are never considered expired here; a skew reaching past
    /// the representable range expires every token that has an expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, skew: TimeDelta) -> bool {
        self.expires_at.is_some_and(|expires_at| {
            now.checked_add_signed(skew)
                .is_none_or(|threshold| expires_at <= threshold)
        })
    }
}
