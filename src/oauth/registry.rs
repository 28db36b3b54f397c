//! Dynamic OAuth provider registry.
//!
//! Provider names resolve through an ordered chain of tiers:
//!
//! 1. providers configured at deploy time,
//! 2. providers registered at runtime in this process,
//! 3. an optional fallback that synthesizes a provider from the server
//!    registry row owning the name.
//!
//! A tier-3 hit is registered into tier 2, so a cold process converges on
//! the same view as a warm one.

use super::domain::OAuthProviderConfig;
use super::error::{OAuthError, OAuthResult};
use crate::server_registry::domain::{ProviderName, ServerAuth};
use crate::server_registry::ports::ServerConfigRepository;
use crate::vault::CredentialVault;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// One link in the provider resolution chain.
#[async_trait]
pub trait ProviderTier: Send + Sync {
    /// Short tier label used in logs.
    fn label(&self) -> &'static str;

    /// Looks up a provider; `Ok(None)` passes to the next tier.
    async fn lookup(&self, provider: &ProviderName) -> OAuthResult<Option<OAuthProviderConfig>>;
}

/// Providers fixed at deploy time.
#[derive(Debug, Clone, Default)]
pub struct StaticProviders {
    providers: HashMap<ProviderName, OAuthProviderConfig>,
}

impl StaticProviders {
    /// Builds the tier from configured providers.
    #[must_use]
    pub fn new(providers: impl IntoIterator<Item = OAuthProviderConfig>) -> Self {
        Self {
            providers: providers
                .into_iter()
                .map(|config| (config.name().clone(), config))
                .collect(),
        }
    }

    /// Returns whether `provider` is configured statically.
    #[must_use]
    pub fn contains(&self, provider: &ProviderName) -> bool {
        self.providers.contains_key(provider)
    }
}

#[async_trait]
impl ProviderTier for StaticProviders {
    fn label(&self) -> &'static str {
        "static"
    }

    async fn lookup(&self, provider: &ProviderName) -> OAuthResult<Option<OAuthProviderConfig>> {
        Ok(self.providers.get(provider).cloned())
    }
}

/// Providers registered at runtime.
#[derive(Debug, Default)]
pub struct DynamicProviders {
    providers: RwLock<HashMap<ProviderName, OAuthProviderConfig>>,
}

impl DynamicProviders {
    fn upsert(&self, config: OAuthProviderConfig) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        providers.insert(config.name().clone(), config);
    }

    fn remove(&self, provider: &ProviderName) -> bool {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        providers.remove(provider).is_some()
    }

    fn get(&self, provider: &ProviderName) -> Option<OAuthProviderConfig> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        providers.get(provider).cloned()
    }
}

#[async_trait]
impl ProviderTier for DynamicProviders {
    fn label(&self) -> &'static str {
        "dynamic"
    }

    async fn lookup(&self, provider: &ProviderName) -> OAuthResult<Option<OAuthProviderConfig>> {
        Ok(self.get(provider))
    }
}

/// Synthesizes providers from OAuth server registry rows.
pub struct ServerBackedProviders<R>
where
    R: ServerConfigRepository,
{
    repository: Arc<R>,
    vault: Arc<CredentialVault>,
}

impl<R> ServerBackedProviders<R>
where
    R: ServerConfigRepository,
{
    /// Creates the fallback tier.
    #[must_use]
    pub const fn new(repository: Arc<R>, vault: Arc<CredentialVault>) -> Self {
        Self { repository, vault }
    }
}

#[async_trait]
impl<R> ProviderTier for ServerBackedProviders<R>
where
    R: ServerConfigRepository,
{
    fn label(&self) -> &'static str {
        "server-registry"
    }

    async fn lookup(&self, provider: &ProviderName) -> OAuthResult<Option<OAuthProviderConfig>> {
        if !provider.is_dynamic() {
            return Ok(None);
        }
        let Some(server) = self.repository.find_by_provider_name(provider).await? else {
            return Ok(None);
        };
        let ServerAuth::OAuth { endpoints, .. } = server.auth() else {
            return Ok(None);
        };
        let config =
            OAuthProviderConfig::from_server_endpoints(provider.clone(), endpoints, &self.vault)?;
        Ok(Some(config))
    }
}

/// Resolves provider names to OAuth configuration.
pub struct DynamicProviderRegistry {
    static_tier: StaticProviders,
    dynamic_tier: DynamicProviders,
    fallback: Option<Arc<dyn ProviderTier>>,
}

impl DynamicProviderRegistry {
    /// Creates a registry with deploy-time providers and no fallback.
    #[must_use]
    pub fn new(static_tier: StaticProviders) -> Self {
        Self {
            static_tier,
            dynamic_tier: DynamicProviders::default(),
            fallback: None,
        }
    }

    /// Installs the tier-3 fallback.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn ProviderTier>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Registers or replaces a runtime provider.
    ///
    /// Names owned by a deploy-time provider keep resolving to it.
    pub fn register(&self, config: OAuthProviderConfig) {
        debug!(provider = %config.name(), "registering dynamic OAuth provider");
        self.dynamic_tier.upsert(config);
    }

    /// Removes a runtime provider, returning whether it was registered.
    pub fn unregister(&self, provider: &ProviderName) -> bool {
        let removed = self.dynamic_tier.remove(provider);
        if removed {
            debug!(provider = %provider, "unregistered dynamic OAuth provider");
        }
        removed
    }

    /// Returns whether `provider` is served by the deploy-time tier.
    #[must_use]
    pub fn is_static(&self, provider: &ProviderName) -> bool {
        self.static_tier.contains(provider)
    }

    /// Resolves a provider through the tier chain.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::ProviderNotFound`] when no tier knows the name,
    /// or the fallback's lookup error.
    pub async fn resolve(&self, provider: &ProviderName) -> OAuthResult<OAuthProviderConfig> {
        let in_process: [&dyn ProviderTier; 2] = [&self.static_tier, &self.dynamic_tier];
        for tier in in_process {
            if let Some(config) = tier.lookup(provider).await? {
                debug!(provider = %provider, tier = tier.label(), "resolved OAuth provider");
                return Ok(config);
            }
        }

        if let Some(fallback) = &self.fallback
            && let Some(config) = fallback.lookup(provider).await?
        {
            debug!(provider = %provider, tier = fallback.label(), "resolved OAuth provider");
            self.dynamic_tier.upsert(config.clone());
            return Ok(config);
        }

        Err(OAuthError::ProviderNotFound(provider.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_registry::adapters::memory::InMemoryServerRegistry;
    use crate::server_registry::domain::{
        EndpointUrl, NewServerConfig, OAuthEndpoints, ServerAuthRequest, ServerConfig, ServerId,
        ServerName, TenantId, TransportKind,
    };
    use crate::vault::VaultKey;
    use mockable::DefaultClock;

    fn provider_config(name: &str, client_id: &str) -> OAuthProviderConfig {
        OAuthProviderConfig::new(
            ProviderName::new(name).expect("valid provider"),
            EndpointUrl::parse("url", "https://auth.example.com/authorize").expect("valid url"),
            EndpointUrl::parse("url", "https://auth.example.com/token").expect("valid url"),
            client_id,
        )
    }

    #[tokio::test]
    async fn static_providers_win_over_runtime_registration() {
        let registry = DynamicProviderRegistry::new(StaticProviders::new([provider_config(
            "github", "static",
        )]));
        registry.register(provider_config("github", "dynamic"));

        let resolved = registry
            .resolve(&ProviderName::new("github").expect("valid provider"))
            .await
            .expect("resolves");
        assert_eq!(resolved.client_id(), "static");
    }

    #[tokio::test]
    async fn register_is_an_idempotent_upsert() {
        let registry = DynamicProviderRegistry::new(StaticProviders::default());
        let name = ProviderName::for_server(ServerId::new());
        registry.register(provider_config(name.as_str(), "first"));
        registry.register(provider_config(name.as_str(), "second"));

        let resolved = registry.resolve(&name).await.expect("resolves");
        assert_eq!(resolved.client_id(), "second");

        assert!(registry.unregister(&name));
        assert!(matches!(
            registry.resolve(&name).await,
            Err(OAuthError::ProviderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn fallback_synthesizes_and_rearms_dynamic_tier() {
        let vault = Arc::new(CredentialVault::new(&VaultKey::generate()));
        let repository = Arc::new(InMemoryServerRegistry::new());
        let endpoints = OAuthEndpoints::new(
            "https://auth.example.com/authorize",
            "https://auth.example.com/token",
            "row-client",
        )
        .expect("valid endpoints")
        .with_client_secret(Some(vault.encrypt("row-secret").expect("encrypts")));
        let server = ServerConfig::new(
            NewServerConfig {
                tenant: TenantId::new("tenant").expect("valid tenant"),
                name: ServerName::new("Secure").expect("valid name"),
                url: EndpointUrl::parse("url", "https://mcp.example.com").expect("valid url"),
                transport: TransportKind::Auto,
                auth: ServerAuthRequest::OAuth(endpoints),
            },
            &DefaultClock,
        );
        repository.insert(&server).await.expect("insert succeeds");
        let provider = server.provider_name().expect("oauth server").clone();

        let registry = DynamicProviderRegistry::new(StaticProviders::default()).with_fallback(
            Arc::new(ServerBackedProviders::new(Arc::clone(&repository), vault)),
        );

        let resolved = registry.resolve(&provider).await.expect("fallback resolves");
        assert_eq!(resolved.client_id(), "row-client");

        repository.delete(server.id()).await.expect("delete succeeds");
        let cached = registry
            .resolve(&provider)
            .await
            .expect("dynamic tier now holds the provider");
        assert_eq!(cached.client_id(), "row-client");
    }
}
