//! Fully wired in-memory deployment.

use super::auth_server::RotatingAuthServer;
use super::mcp_servers::ScriptedMcpServers;
use chrono::{TimeDelta, Utc};
use mockable::DefaultClock;
use std::sync::Arc;
use switchboard::mcp::domain::ClientTunables;
use switchboard::mcp::services::McpClientFactory;
use switchboard::oauth::adapters::memory::{
    InMemoryAuthorizationStateStore, InMemoryOAuthTokenStore,
};
use switchboard::oauth::domain::OAuthToken;
use switchboard::oauth::ports::OAuthTokenStore;
use switchboard::oauth::registry::{
    DynamicProviderRegistry, ServerBackedProviders, StaticProviders,
};
use switchboard::oauth::services::{OAuthFlowEngine, OAuthFlowSettings};
use switchboard::pool::{McpConnectionPool, PoolSettings};
use switchboard::server_registry::adapters::memory::InMemoryServerRegistry;
use switchboard::server_registry::domain::{ProviderName, ServerConfig, TenantId, TransportKind};
use switchboard::server_registry::services::{RegisterAuth, RegisterServerRequest, ServerRegistry};
use switchboard::vault::{CredentialVault, VaultKey};

/// Redirect URI configured for every test deployment.
pub const REDIRECT_URI: &str = "https://switchboard.example.com/oauth/callback";

/// Token endpoint URL of the scripted authorization server.
pub const TOKEN_URL: &str = "https://auth.example.com/token";

/// Flow engine wired to in-memory stores.
pub type Engine = OAuthFlowEngine<
    InMemoryOAuthTokenStore,
    InMemoryAuthorizationStateStore,
    RotatingAuthServer,
    DefaultClock,
>;

/// Registry service over the in-memory repository.
pub type Registry = ServerRegistry<InMemoryServerRegistry, DefaultClock>;

/// Pool over the in-memory repository.
pub type Pool = McpConnectionPool<InMemoryServerRegistry, DefaultClock>;

/// All collaborators of one deployment.
pub struct Switchboard {
    pub vault: Arc<CredentialVault>,
    pub registry: Registry,
    pub tokens: Arc<InMemoryOAuthTokenStore>,
    pub auth_server: Arc<RotatingAuthServer>,
    pub providers: Arc<DynamicProviderRegistry>,
    pub engine: Arc<Engine>,
    pub servers: Arc<ScriptedMcpServers>,
    pub pool: Pool,
}

impl Switchboard {
    /// Creates a deployment with default settings.
    pub fn new() -> Self {
        Self::build(ScriptedMcpServers::new(), RotatingAuthServer::new())
    }

    /// Creates a deployment from custom fakes.
    pub fn build(servers: ScriptedMcpServers, auth_server: RotatingAuthServer) -> Self {
        let vault = Arc::new(CredentialVault::new(&VaultKey::generate()));
        let clock = Arc::new(DefaultClock);
        let repository = Arc::new(InMemoryServerRegistry::new());
        let registry = ServerRegistry::new(Arc::clone(&repository), Arc::clone(&vault), Arc::clone(&clock));
        let providers = Arc::new(
            DynamicProviderRegistry::new(StaticProviders::default()).with_fallback(Arc::new(
                ServerBackedProviders::new(Arc::clone(&repository), Arc::clone(&vault)),
            )),
        );
        let tokens = Arc::new(InMemoryOAuthTokenStore::new());
        let auth_server = Arc::new(auth_server);
        let engine = Arc::new(OAuthFlowEngine::new(
            Arc::clone(&tokens),
            Arc::new(InMemoryAuthorizationStateStore::new()),
            Arc::clone(&auth_server),
            Arc::clone(&providers),
            Arc::clone(&vault),
            clock,
            OAuthFlowSettings::new(REDIRECT_URI),
        ));
        let servers = Arc::new(servers);
        let factory = McpClientFactory::new(
            Arc::clone(&servers) as _,
            Arc::clone(&vault),
            Arc::clone(&engine) as _,
            ClientTunables::default(),
        );
        let pool = McpConnectionPool::new(
            registry.clone(),
            factory,
            Arc::clone(&providers),
            Arc::clone(&vault),
            PoolSettings::default(),
        );

        Self {
            vault,
            registry,
            tokens,
            auth_server,
            providers,
            engine,
            servers,
            pool,
        }
    }

    /// Returns the default test tenant.
    pub fn tenant() -> TenantId {
        TenantId::new("tenant-a").expect("valid tenant")
    }

    /// OAuth registration pointing at the scripted authorization server.
    pub fn oauth_auth() -> RegisterAuth {
        RegisterAuth::OAuth {
            authorization_url: "https://auth.example.com/authorize".to_owned(),
            token_url: TOKEN_URL.to_owned(),
            client_id: "switchboard".to_owned(),
            client_secret: Some("client-secret".to_owned()),
            scope: Some("tools".to_owned()),
        }
    }

    /// Registers a server for the default tenant.
    pub async fn register(&self, name: &str, url: &str, auth: RegisterAuth) -> ServerConfig {
        self.registry
            .register(RegisterServerRequest {
                tenant: "tenant-a".to_owned(),
                name: name.to_owned(),
                url: url.to_owned(),
                transport: TransportKind::Auto,
                auth,
            })
            .await
            .expect("server registers")
    }

    /// Reloads a server row.
    pub async fn reload(&self, server: &ServerConfig) -> ServerConfig {
        self.registry
            .find(server.id())
            .await
            .expect("lookup succeeds")
            .expect("server exists")
    }

    /// Stores a token pair whose access token expired a minute ago.
    pub async fn store_expired_token(
        &self,
        provider: &ProviderName,
        access: &str,
        refresh: &str,
    ) {
        let now = Utc::now();
        let token = OAuthToken::new(
            provider.clone(),
            Self::tenant(),
            self.vault.encrypt(access).expect("encrypts"),
            Some(self.vault.encrypt(refresh).expect("encrypts")),
            Some(now - TimeDelta::minutes(1)),
            now,
        );
        self.tokens.upsert(&token).await.expect("token stored");
    }

    /// Returns the decrypted (access, refresh) pair stored for `provider`.
    pub async fn stored_pair(&self, provider: &ProviderName) -> (String, Option<String>) {
        let token = self
            .tokens
            .find(provider, &Self::tenant())
            .await
            .expect("lookup succeeds")
            .expect("token stored");
        (
            self.vault.decrypt(token.access_token()).expect("decrypts"),
            self.vault
                .decrypt_optional(token.refresh_token())
                .expect("decrypts"),
        )
    }
}
