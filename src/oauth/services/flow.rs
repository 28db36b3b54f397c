//! OAuth 2.1 authorization-code flow with PKCE and refresh rotation.

use super::AuthorizationCallback;
use crate::oauth::{
    domain::{
        AuthorizationPhase, AuthorizationState, CODE_CHALLENGE_METHOD, OAuthProviderConfig,
        OAuthToken, PkcePair,
    },
    error::{OAuthError, OAuthResult},
    ports::{
        AccessTokenSource, AuthorizationStateStore, IssuedTokens, OAuthTokenStore,
        StoredAccessToken, TokenEndpoint, TokenGrant, TokenRequest,
    },
    registry::DynamicProviderRegistry,
};
use crate::server_registry::domain::{ProviderName, TenantId, truncate_message};
use crate::vault::{CredentialVault, EncryptedSecret};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunables of the authorization flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthFlowSettings {
    /// The single redirect URI registered with every provider.
    pub redirect_uri: String,
    /// Lifetime of an unexchanged authorization state.
    pub state_ttl: Duration,
    /// Access tokens this close to expiry are refreshed before use.
    pub expiry_skew: Duration,
}

impl OAuthFlowSettings {
    /// Creates settings with a 10 minute state TTL and 60 second skew.
    #[must_use]
    pub fn new(redirect_uri: impl Into<String>) -> Self {
        Self {
            redirect_uri: redirect_uri.into(),
            state_ttl: Duration::from_secs(600),
            expiry_skew: Duration::from_secs(60),
        }
    }
}

/// URL the user is sent to, plus the state that identifies the attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRedirect {
    /// Fully formed authorization URL.
    pub url: String,
    /// Opaque state embedded in the URL.
    pub state: String,
}

type RefreshKey = (ProviderName, TenantId);

/// Runs the authorization-code flow and keeps stored tokens fresh.
pub struct OAuthFlowEngine<T, S, E, C>
where
    T: OAuthTokenStore,
    S: AuthorizationStateStore,
    E: TokenEndpoint,
    C: Clock + Send + Sync,
{
    tokens: Arc<T>,
    states: Arc<S>,
    endpoint: Arc<E>,
    providers: Arc<DynamicProviderRegistry>,
    vault: Arc<CredentialVault>,
    clock: Arc<C>,
    settings: OAuthFlowSettings,
    refresh_locks: Mutex<HashMap<RefreshKey, Arc<tokio::sync::Mutex<()>>>>,
}

fn to_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

fn expiry_from(now: DateTime<Utc>, expires_in: Option<u64>) -> Option<DateTime<Utc>> {
    let seconds = i64::try_from(expires_in?).ok()?;
    now.checked_add_signed(TimeDelta::try_seconds(seconds)?)
}

impl<T, S, E, C> OAuthFlowEngine<T, S, E, C>
where
    T: OAuthTokenStore,
    S: AuthorizationStateStore,
    E: TokenEndpoint,
    C: Clock + Send + Sync,
{
    /// Creates a flow engine.
    #[must_use]
    pub fn new(
        tokens: Arc<T>,
        states: Arc<S>,
        endpoint: Arc<E>,
        providers: Arc<DynamicProviderRegistry>,
        vault: Arc<CredentialVault>,
        clock: Arc<C>,
        settings: OAuthFlowSettings,
    ) -> Self {
        Self {
            tokens,
            states,
            endpoint,
            providers,
            vault,
            clock,
            settings,
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the flow settings.
    #[must_use]
    pub const fn settings(&self) -> &OAuthFlowSettings {
        &self.settings
    }

    /// Starts an authorization attempt for `provider` on behalf of `tenant`.
    ///
    /// The returned URL always carries an S256 code challenge.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::ProviderNotFound`] when the provider does not
    /// resolve, or store errors when the state cannot be persisted.
    pub async fn start_authorization(
        &self,
        provider: &ProviderName,
        tenant: &TenantId,
    ) -> OAuthResult<AuthorizationRedirect> {
        let config = self.providers.resolve(provider).await?;
        if !self.providers.is_static(provider) {
            self.providers.register(config.clone());
        }

        let pkce = PkcePair::generate();
        let state = AuthorizationState::issue(
            provider.clone(),
            tenant.clone(),
            self.settings.redirect_uri.clone(),
            &pkce,
            &*self.clock,
        );
        self.states.insert(&state).await?;

        let url = authorization_url(&config, &self.settings.redirect_uri, state.state(), &pkce)?;
        info!(provider = %provider, tenant = %tenant, "started OAuth authorization");
        Ok(AuthorizationRedirect {
            url,
            state: state.state().to_owned(),
        })
    }

    /// Handles the provider redirect.
    ///
    /// A provider-reported error rejects the attempt without touching the
    /// stored state.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::AuthorizationDenied`] for provider errors,
    /// [`OAuthError::InvalidState`] when `state` or `code` is missing, or any
    /// [`Self::exchange_code`] error.
    pub async fn handle_callback(
        &self,
        callback: AuthorizationCallback,
    ) -> OAuthResult<OAuthToken> {
        if let Some(error) = callback.error {
            let detail = callback
                .error_description
                .map_or_else(|| error.clone(), |description| format!("{error}: {description}"));
            let message = truncate_message(&detail);
            warn!(error = %message, "OAuth provider rejected authorization");
            return Err(OAuthError::AuthorizationDenied(message));
        }

        let (Some(state), Some(code)) = (callback.state, callback.code) else {
            return Err(OAuthError::InvalidState);
        };
        self.exchange_code(&state, &code).await
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// On success the token pair is upserted and then the state consumed.
    /// When sealing or storing the tokens fails the state stays usable.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::InvalidState`] when the state is unknown,
    /// consumed or expired, [`OAuthError::RedirectMismatch`] when the
    /// recorded redirect URI differs from the configured one, and
    /// [`OAuthError::ExchangeFailed`] when the token endpoint fails.
    pub async fn exchange_code(&self, state: &str, code: &str) -> OAuthResult<OAuthToken> {
        let record = self
            .states
            .find(state)
            .await?
            .ok_or(OAuthError::InvalidState)?;
        let phase = record.phase(self.clock.utc(), to_delta(self.settings.state_ttl));
        if phase != AuthorizationPhase::Initiated {
            debug!(phase = ?phase, "rejecting unusable authorization state");
            return Err(OAuthError::InvalidState);
        }
        if record.redirect_uri() != self.settings.redirect_uri {
            return Err(OAuthError::RedirectMismatch);
        }

        let config = self.providers.resolve(record.provider()).await?;
        let request = token_request(
            &config,
            TokenGrant::AuthorizationCode {
                code: code.to_owned(),
                code_verifier: record.code_verifier().to_owned(),
                redirect_uri: record.redirect_uri().to_owned(),
            },
        );
        let issued = self.endpoint.request_tokens(request).await.map_err(|err| {
            warn!(provider = %record.provider(), error = %err, "OAuth code exchange failed");
            OAuthError::exchange_failed(&err)
        })?;

        let token = self.seal_tokens(record.provider(), record.tenant(), &issued, None)?;
        self.tokens.upsert(&token).await?;
        if !self.states.mark_consumed(state).await? {
            return Err(OAuthError::InvalidState);
        }
        info!(
            provider = %record.provider(),
            tenant = %record.tenant(),
            "exchanged OAuth authorization code"
        );
        Ok(token)
    }

    /// Refreshes the access token of (`provider`, `tenant`).
    ///
    /// Concurrent calls for the same pair are serialized; callers that
    /// waited on a refresh already performed reuse its result.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Expired`] when no refresh token is stored or the
    /// provider rejects it.
    pub async fn refresh_access_token(
        &self,
        provider: &ProviderName,
        tenant: &TenantId,
    ) -> OAuthResult<String> {
        let expired = || OAuthError::Expired {
            provider: provider.clone(),
            tenant: tenant.clone(),
        };
        let observed = self.tokens.find(provider, tenant).await?;

        let lock = self.refresh_lock(provider, tenant);
        let _guard = lock.lock().await;

        let current = self
            .tokens
            .find(provider, tenant)
            .await?
            .ok_or_else(expired)?;
        let rotated_while_waiting = observed
            .as_ref()
            .is_none_or(|seen| seen.access_token() != current.access_token());
        if rotated_while_waiting {
            debug!(provider = %provider, tenant = %tenant, "reusing concurrent refresh");
            return Ok(self.vault.decrypt(current.access_token())?);
        }

        let Some(stored_refresh) = current.refresh_token() else {
            return Err(expired());
        };
        let refresh_token = self.vault.decrypt(stored_refresh)?;
        let config = self.providers.resolve(provider).await?;
        let request = token_request(&config, TokenGrant::RefreshToken { refresh_token });
        let issued = self.endpoint.request_tokens(request).await.map_err(|err| {
            warn!(provider = %provider, tenant = %tenant, error = %err, "OAuth refresh failed");
            expired()
        })?;

        let token = self.seal_tokens(provider, tenant, &issued, Some(stored_refresh.clone()))?;
        self.tokens.upsert(&token).await?;
        info!(provider = %provider, tenant = %tenant, "refreshed OAuth access token");
        Ok(issued.access_token)
    }

    /// Returns a usable access token, refreshing once when it is known to
    /// be expired.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::NotAuthorized`] when no token is stored, or any
    /// [`Self::refresh_access_token`] error.
    pub async fn current_access_token(
        &self,
        provider: &ProviderName,
        tenant: &TenantId,
    ) -> OAuthResult<String> {
        let token = self.require_token(provider, tenant).await?;
        if token.is_expired(self.clock.utc(), to_delta(self.settings.expiry_skew)) {
            return self.refresh_access_token(provider, tenant).await;
        }
        Ok(self.vault.decrypt(token.access_token())?)
    }

    /// Deletes authorization states older than the state TTL.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn purge_expired_states(&self) -> OAuthResult<usize> {
        let Some(cutoff) = self
            .clock
            .utc()
            .checked_sub_signed(to_delta(self.settings.state_ttl))
        else {
            return Ok(0);
        };
        let purged = self.states.purge_created_before(cutoff).await?;
        if purged > 0 {
            debug!(purged, "purged expired OAuth authorization states");
        }
        Ok(purged)
    }

    /// Removes the stored token pair of (`provider`, `tenant`).
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub async fn revoke(&self, provider: &ProviderName, tenant: &TenantId) -> OAuthResult<bool> {
        Ok(self.tokens.delete(provider, tenant).await?)
    }

    async fn require_token(
        &self,
        provider: &ProviderName,
        tenant: &TenantId,
    ) -> OAuthResult<OAuthToken> {
        self.tokens
            .find(provider, tenant)
            .await?
            .ok_or_else(|| OAuthError::NotAuthorized {
                provider: provider.clone(),
                tenant: tenant.clone(),
            })
    }

    fn refresh_lock(
        &self,
        provider: &ProviderName,
        tenant: &TenantId,
    ) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .refresh_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            locks
                .entry((provider.clone(), tenant.clone()))
                .or_default(),
        )
    }

    fn seal_tokens(
        &self,
        provider: &ProviderName,
        tenant: &TenantId,
        issued: &IssuedTokens,
        previous_refresh: Option<EncryptedSecret>,
    ) -> OAuthResult<OAuthToken> {
        let now = self.clock.utc();
        let access_token = self.vault.encrypt(&issued.access_token)?;
        let refresh_token = match issued.refresh_token.as_deref() {
            Some(rotated) => Some(self.vault.encrypt(rotated)?),
            None => previous_refresh,
        };
        Ok(OAuthToken::new(
            provider.clone(),
            tenant.clone(),
            access_token,
            refresh_token,
            expiry_from(now, issued.expires_in),
            now,
        ))
    }
}

#[async_trait]
impl<T, S, E, C> AccessTokenSource for OAuthFlowEngine<T, S, E, C>
where
    T: OAuthTokenStore,
    S: AuthorizationStateStore,
    E: TokenEndpoint,
    C: Clock + Send + Sync,
{
    async fn stored_access_token(
        &self,
        provider: &ProviderName,
        tenant: &TenantId,
    ) -> OAuthResult<StoredAccessToken> {
        let token = self.require_token(provider, tenant).await?;
        Ok(StoredAccessToken {
            value: self.vault.decrypt(token.access_token())?,
            expired: token.is_expired(self.clock.utc(), to_delta(self.settings.expiry_skew)),
        })
    }

    async fn refresh(&self, provider: &ProviderName, tenant: &TenantId) -> OAuthResult<String> {
        self.refresh_access_token(provider, tenant).await
    }
}

fn token_request(config: &OAuthProviderConfig, grant: TokenGrant) -> TokenRequest {
    TokenRequest {
        token_url: config.token_url().as_str().to_owned(),
        client_id: config.client_id().to_owned(),
        client_secret: config.client_secret().map(|secret| secret.expose().to_owned()),
        scope: config.scope().map(str::to_owned),
        grant,
    }
}

fn authorization_url(
    config: &OAuthProviderConfig,
    redirect_uri: &str,
    state: &str,
    pkce: &PkcePair,
) -> OAuthResult<String> {
    let mut url = url::Url::parse(config.authorization_url().as_str())
        .map_err(|_| OAuthError::MalformedProvider(config.name().clone()))?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("response_type", "code")
            .append_pair("client_id", config.client_id())
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", state)
            .append_pair("code_challenge", pkce.challenge())
            .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD);
        if let Some(scope) = config.scope() {
            query.append_pair("scope", scope);
        }
    }
    Ok(url.into())
}
