//! Registered MCP server aggregate root.

use super::{
    ConnectionStatus, EndpointUrl, ProviderName, ServerAuth, ServerAuthRequest, ServerId,
    ServerName, ServerRegistryDomainError, StatusUpdate, TenantId, TransportKind,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Parameter object for registering a new server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewServerConfig {
    /// Owning tenant.
    pub tenant: TenantId,
    /// Human-readable name, unique per tenant.
    pub name: ServerName,
    /// MCP endpoint URL.
    pub url: EndpointUrl,
    /// Wire transport.
    pub transport: TransportKind,
    /// Requested authentication.
    pub auth: ServerAuthRequest,
}

/// Configuration and connection status of one registered MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    id: ServerId,
    tenant: TenantId,
    name: ServerName,
    url: EndpointUrl,
    transport: TransportKind,
    auth: ServerAuth,
    enabled: bool,
    status: ConnectionStatus,
    last_error: Option<String>,
    last_connected_at: Option<DateTime<Utc>>,
    tools_count: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing persisted server state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedServerData {
    /// Persisted server identifier.
    pub id: ServerId,
    /// Persisted tenant.
    pub tenant: TenantId,
    /// Persisted server name.
    pub name: ServerName,
    /// Persisted endpoint URL.
    pub url: EndpointUrl,
    /// Persisted transport.
    pub transport: TransportKind,
    /// Persisted auth settings.
    pub auth: ServerAuth,
    /// Persisted enabled flag.
    pub enabled: bool,
    /// Persisted status.
    pub status: ConnectionStatus,
    /// Persisted last error.
    pub last_error: Option<String>,
    /// Persisted last successful connection timestamp.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Persisted discovered tool count.
    pub tools_count: u32,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ServerConfig {
    /// Creates a new enabled server in `pending` status.
    ///
    /// OAuth servers receive the dynamic provider name `mcp_<server-id>`.
    #[must_use]
    pub fn new(params: NewServerConfig, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        let id = ServerId::new();
        let auth = match params.auth {
            ServerAuthRequest::None => ServerAuth::None,
            ServerAuthRequest::Bearer(token) => ServerAuth::Bearer { token },
            ServerAuthRequest::OAuth(endpoints) => ServerAuth::OAuth {
                provider_name: ProviderName::for_server(id),
                endpoints,
            },
        };

        Self {
            id,
            tenant: params.tenant,
            name: params.name,
            url: params.url,
            transport: params.transport,
            auth,
            enabled: true,
            status: ConnectionStatus::Pending,
            last_error: None,
            last_connected_at: None,
            tools_count: 0,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a server from persistence.
    #[must_use]
    pub fn from_persisted(data: PersistedServerData) -> Self {
        Self {
            id: data.id,
            tenant: data.tenant,
            name: data.name,
            url: data.url,
            transport: data.transport,
            auth: data.auth,
            enabled: data.enabled,
            status: data.status,
            last_error: data.last_error,
            last_connected_at: data.last_connected_at,
            tools_count: data.tools_count,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the server identifier.
    #[must_use]
    pub const fn id(&self) -> ServerId {
        self.id
    }

    /// Returns the owning tenant.
    #[must_use]
    pub const fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// Returns the server name.
    #[must_use]
    pub const fn name(&self) -> &ServerName {
        &self.name
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub const fn url(&self) -> &EndpointUrl {
        &self.url
    }

    /// Returns the transport kind.
    #[must_use]
    pub const fn transport(&self) -> TransportKind {
        self.transport
    }

    /// Returns the auth settings.
    #[must_use]
    pub const fn auth(&self) -> &ServerAuth {
        &self.auth
    }

    /// Returns the dynamic OAuth provider name, if this is an OAuth server.
    #[must_use]
    pub const fn provider_name(&self) -> Option<&ProviderName> {
        self.auth.provider_name()
    }

    /// Returns whether the server is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the connection status.
    #[must_use]
    pub const fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Returns the last connection error.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns the last successful connection timestamp.
    #[must_use]
    pub const fn last_connected_at(&self) -> Option<DateTime<Utc>> {
        self.last_connected_at
    }

    /// Returns the number of tools discovered on the last connection.
    #[must_use]
    pub const fn tools_count(&self) -> u32 {
        self.tools_count
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replaces the endpoint, transport and auth settings.
    ///
    /// The status returns to `pending` so the next connection attempt
    /// reports fresh health. OAuth servers keep their provider name.
    pub fn reconfigure(
        &mut self,
        url: EndpointUrl,
        transport: TransportKind,
        auth: ServerAuthRequest,
        clock: &impl Clock,
    ) {
        self.url = url;
        self.transport = transport;
        self.auth = match auth {
            ServerAuthRequest::None => ServerAuth::None,
            ServerAuthRequest::Bearer(token) => ServerAuth::Bearer { token },
            ServerAuthRequest::OAuth(endpoints) => ServerAuth::OAuth {
                provider_name: ProviderName::for_server(self.id),
                endpoints,
            },
        };
        if self.enabled {
            self.status = ConnectionStatus::Pending;
        }
        self.last_error = None;
        self.touch(clock);
    }

    /// Renames the server.
    pub fn rename(&mut self, name: ServerName, clock: &impl Clock) {
        self.name = name;
        self.touch(clock);
    }

    /// Enables or disables the server.
    ///
    /// Disabled servers report `disabled`; re-enabled servers report
    /// `pending` until the next connection attempt.
    pub fn set_enabled(&mut self, enabled: bool, clock: &impl Clock) {
        self.enabled = enabled;
        self.status = if enabled {
            ConnectionStatus::Pending
        } else {
            ConnectionStatus::Disabled
        };
        self.touch(clock);
    }

    /// Applies the outcome of a connection attempt observed at `updated_at`.
    pub fn apply_status(&mut self, update: &StatusUpdate, updated_at: DateTime<Utc>) {
        self.status = update.status();
        self.last_error = update.last_error().map(str::to_owned);
        if let Some(connected_at) = update.connected_at() {
            self.last_connected_at = Some(connected_at);
        }
        if let Some(tool_count) = update.tool_count() {
            self.tools_count = tool_count;
        }
        self.updated_at = updated_at;
    }

    /// Validates that the dynamic provider name matches this server.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryDomainError::InvalidProviderName`] when an
    /// OAuth server carries a provider name other than `mcp_<id>`.
    pub fn ensure_provider_name_matches(&self) -> Result<(), ServerRegistryDomainError> {
        match self.provider_name() {
            Some(provider) if *provider != ProviderName::for_server(self.id) => Err(
                ServerRegistryDomainError::InvalidProviderName(provider.as_str().to_owned()),
            ),
            Some(_) | None => Ok(()),
        }
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
