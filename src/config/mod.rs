//! Deploy-time configuration loaded from TOML.
//!
//! Every field has a default except the OAuth redirect URI. A minimal file
//! looks like:
//!
//! ```toml
//! [oauth]
//! redirect_uri = "https://app.example.com/oauth/callback"
//! ```

use crate::mcp::domain::{ClientAuth, ClientTunables, McpEndpoint};
use crate::mcp::services::McpTarget;
use crate::oauth::domain::{ClientSecret, OAuthProviderConfig};
use crate::oauth::registry::StaticProviders;
use crate::oauth::services::OAuthFlowSettings;
use crate::pool::PoolSettings;
use crate::server_registry::domain::{
    EndpointUrl, ProviderName, ServerRegistryDomainError, TransportKind,
};
use crate::vault::{CredentialError, CredentialVault};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration file {path}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value failed validation.
    #[error("invalid configuration value: {0}")]
    Invalid(#[from] ServerRegistryDomainError),

    /// A numeric setting is out of range.
    #[error("configuration value {field} must be positive")]
    NotPositive {
        /// Offending field.
        field: &'static str,
    },

    /// A duration setting exceeds its upper bound.
    #[error("configuration value {field} must not exceed {max} seconds")]
    TooLarge {
        /// Offending field.
        field: &'static str,
        /// Largest accepted value.
        max: u64,
    },

    /// A baseline bearer token could not be sealed.
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchboardConfig {
    /// OAuth settings.
    pub oauth: OAuthSection,
    /// MCP connection settings.
    #[serde(default)]
    pub mcp: McpSection,
    /// Servers offered to every tenant ahead of its own.
    #[serde(default)]
    pub baseline_servers: Vec<BaselineServer>,
}

/// `[oauth]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OAuthSection {
    /// The single redirect URI registered with every provider.
    pub redirect_uri: String,
    /// Lifetime of an unexchanged authorization state.
    #[serde(default = "default_state_ttl_secs")]
    pub state_ttl_secs: u64,
    /// Access tokens this close to expiry are refreshed before use.
    #[serde(default = "default_expiry_skew_secs")]
    pub expiry_skew_secs: u64,
    /// Timeout of each token endpoint request.
    #[serde(default = "default_token_timeout_secs")]
    pub token_timeout_secs: u64,
    /// Deploy-time providers.
    #[serde(default)]
    pub providers: Vec<StaticProvider>,
}

/// One `[[oauth.providers]]` entry.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticProvider {
    /// Provider name.
    pub name: String,
    /// Authorization endpoint.
    pub authorization_url: String,
    /// Token endpoint.
    pub token_url: String,
    /// Client id.
    pub client_id: String,
    /// Client secret.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Requested scope.
    #[serde(default)]
    pub scope: Option<String>,
}

impl std::fmt::Debug for StaticProvider {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("StaticProvider")
            .field("name", &self.name)
            .field("authorization_url", &self.authorization_url)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// `[mcp]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct McpSection {
    /// Hard limit on handshake plus discovery per attempt.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Timeout of each JSON-RPC exchange.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Extra attempts after a transient failure.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Lifetime of a tenant's cached client list.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for McpSection {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            retries: default_retries(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// One `[[baseline_servers]]` entry.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaselineServer {
    /// Display name.
    pub name: String,
    /// Endpoint URL.
    pub url: String,
    /// Transport kind.
    #[serde(default)]
    pub transport: TransportKind,
    /// Static bearer token.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for BaselineServer {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("BaselineServer")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

const fn default_state_ttl_secs() -> u64 {
    600
}

const HOUR_SECS: u64 = 3_600;
const DAY_SECS: u64 = 86_400;

const fn default_expiry_skew_secs() -> u64 {
    60
}

const fn default_token_timeout_secs() -> u64 {
    10
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_retries() -> u32 {
    1
}

const fn default_cache_ttl_secs() -> u64 {
    300
}

impl SwitchboardConfig {
    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read, or the
    /// errors of [`Self::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        EndpointUrl::parse("OAuth redirect URI", self.oauth.redirect_uri.as_str())?;
        let positive = [
            ("oauth.state_ttl_secs", self.oauth.state_ttl_secs),
            ("oauth.token_timeout_secs", self.oauth.token_timeout_secs),
            ("mcp.connect_timeout_secs", self.mcp.connect_timeout_secs),
            ("mcp.request_timeout_secs", self.mcp.request_timeout_secs),
        ];
        if let Some(&(field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::NotPositive { field });
        }
        let bounded = [
            ("oauth.state_ttl_secs", self.oauth.state_ttl_secs, DAY_SECS),
            ("oauth.expiry_skew_secs", self.oauth.expiry_skew_secs, HOUR_SECS),
            ("oauth.token_timeout_secs", self.oauth.token_timeout_secs, HOUR_SECS),
            ("mcp.connect_timeout_secs", self.mcp.connect_timeout_secs, HOUR_SECS),
            ("mcp.request_timeout_secs", self.mcp.request_timeout_secs, HOUR_SECS),
            ("mcp.cache_ttl_secs", self.mcp.cache_ttl_secs, DAY_SECS),
        ];
        if let Some(&(field, _, max)) = bounded.iter().find(|(_, value, max)| value > max) {
            return Err(ConfigError::TooLarge { field, max });
        }
        for provider in &self.oauth.providers {
            provider_config(provider)?;
        }
        for server in &self.baseline_servers {
            EndpointUrl::parse("baseline server URL", server.url.as_str())?;
        }
        Ok(())
    }

    /// Returns the OAuth flow settings.
    #[must_use]
    pub fn flow_settings(&self) -> OAuthFlowSettings {
        OAuthFlowSettings {
            redirect_uri: self.oauth.redirect_uri.clone(),
            state_ttl: Duration::from_secs(self.oauth.state_ttl_secs),
            expiry_skew: Duration::from_secs(self.oauth.expiry_skew_secs),
        }
    }

    /// Returns the timeout of each token endpoint request.
    #[must_use]
    pub const fn token_timeout(&self) -> Duration {
        Duration::from_secs(self.oauth.token_timeout_secs)
    }

    /// Returns the MCP client tunables.
    #[must_use]
    pub const fn client_tunables(&self) -> ClientTunables {
        ClientTunables {
            connect_timeout: Duration::from_secs(self.mcp.connect_timeout_secs),
            retries: self.mcp.retries,
        }
    }

    /// Returns the timeout of each JSON-RPC exchange.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.mcp.request_timeout_secs)
    }

    /// Returns the pool settings.
    #[must_use]
    pub const fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            cache_ttl: Duration::from_secs(self.mcp.cache_ttl_secs),
        }
    }

    /// Builds the deploy-time provider tier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for malformed provider entries.
    pub fn static_providers(&self) -> Result<StaticProviders, ConfigError> {
        let configs = self
            .oauth
            .providers
            .iter()
            .map(provider_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StaticProviders::new(configs))
    }

    /// Builds baseline client targets, sealing bearer tokens with `vault`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for malformed URLs or when a token cannot be
    /// encrypted.
    pub fn baseline_targets(&self, vault: &CredentialVault) -> Result<Vec<McpTarget>, ConfigError> {
        self.baseline_servers
            .iter()
            .map(|server| {
                let auth = match server.bearer_token.as_deref() {
                    Some(token) => ClientAuth::Bearer(vault.encrypt(token)?),
                    None => ClientAuth::None,
                };
                Ok(McpTarget {
                    server_id: None,
                    name: server.name.clone(),
                    endpoint: McpEndpoint {
                        url: EndpointUrl::parse("baseline server URL", server.url.as_str())?,
                        transport: server.transport,
                    },
                    auth,
                })
            })
            .collect()
    }
}

fn provider_config(provider: &StaticProvider) -> Result<OAuthProviderConfig, ConfigError> {
    let config = OAuthProviderConfig::new(
        ProviderName::new(provider.name.as_str())?,
        EndpointUrl::parse("authorization URL", provider.authorization_url.as_str())?,
        EndpointUrl::parse("token URL", provider.token_url.as_str())?,
        provider.client_id.as_str(),
    )
    .with_client_secret(provider.client_secret.clone().map(ClientSecret::new))
    .with_scope(provider.scope.clone());
    Ok(config)
}
