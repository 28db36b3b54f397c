//! Single-use authorization attempt records.

use super::{PkcePair, generate_state_token};
use crate::server_registry::domain::{ProviderName, TenantId};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::fmt;

/// Lifecycle phase of an authorization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorizationPhase {
    /// Issued and awaiting the provider callback.
    Initiated,
    /// Code exchanged; the state can no longer be used.
    Exchanged,
    /// Older than the state TTL.
    Expired,
}

/// Pending authorization attempt, persisted until exchanged or purged.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationState {
    state: String,
    code_verifier: String,
    provider: ProviderName,
    tenant: TenantId,
    redirect_uri: String,
    created_at: DateTime<Utc>,
    consumed: bool,
}

/// Parameter object for reconstructing a persisted authorization state.
#[derive(Clone, PartialEq, Eq)]
pub struct PersistedAuthorizationState {
    /// Opaque state value.
    pub state: String,
    /// PKCE code verifier.
    pub code_verifier: String,
    /// Provider the attempt targets.
    pub provider: ProviderName,
    /// Tenant the token will belong to.
    pub tenant: TenantId,
    /// Redirect URI sent with the authorization request.
    pub redirect_uri: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Whether the state was already exchanged.
    pub consumed: bool,
}

impl AuthorizationState {
    /// Starts a new attempt with a fresh opaque state value.
    #[must_use]
    pub fn issue(
        provider: ProviderName,
        tenant: TenantId,
        redirect_uri: impl Into<String>,
        pkce: &PkcePair,
        clock: &impl Clock,
    ) -> Self {
        Self {
            state: generate_state_token(),
            code_verifier: pkce.verifier().to_owned(),
            provider,
            tenant,
            redirect_uri: redirect_uri.into(),
            created_at: clock.utc(),
            consumed: false,
        }
    }

    /// Reconstructs a persisted attempt.
    #[must_use]
    pub fn from_persisted(data: PersistedAuthorizationState) -> Self {
        Self {
            state: data.state,
            code_verifier: data.code_verifier,
            provider: data.provider,
            tenant: data.tenant,
            redirect_uri: data.redirect_uri,
            created_at: data.created_at,
            consumed: data.consumed,
        }
    }

    /// Returns the opaque state value.
    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Returns the PKCE code verifier.
    #[must_use]
    pub fn code_verifier(&self) -> &str {
        &self.code_verifier
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

    /// Returns the recorded redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns whether the state was already exchanged.
    #[must_use]
    pub const fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Marks the state as exchanged.
    pub const fn consume(&mut self) {
        self.consumed = true;
    }

    /// Returns the phase of the attempt at `now` for the given TTL.
    #[must_use]
    pub fn phase(&self, now: DateTime<Utc>, ttl: TimeDelta) -> AuthorizationPhase {
        if self.consumed {
            AuthorizationPhase::Exchanged
        } else if now - self.created_at > ttl {
            AuthorizationPhase::Expired
        } else {
            AuthorizationPhase::Initiated
        }
    }
}

impl fmt::Debug for AuthorizationState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthorizationState")
            .field("provider", &self.provider)
            .field("tenant", &self.tenant)
            .field("redirect_uri", &self.redirect_uri)
            .field("created_at", &self.created_at)
            .field("consumed", &self.consumed)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for PersistedAuthorizationState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PersistedAuthorizationState")
            .field("provider", &self.provider)
            .field("tenant", &self.tenant)
            .field("created_at", &self.created_at)
            .field("consumed", &self.consumed)
            .finish_non_exhaustive()
    }
}
