//! Connection lifecycle of one remote MCP server.

use crate::mcp::domain::{
    ClientAuth, ClientTunables, FailureReason, McpClientError, McpEndpoint, McpToolDefinition,
    redact_and_truncate,
};
use crate::mcp::ports::{McpConnector, McpSession, TransportError};
use crate::oauth::OAuthError;
use crate::oauth::ports::AccessTokenSource;
use crate::server_registry::domain::{ProviderName, ServerConfig, ServerId, TenantId};
use crate::vault::CredentialVault;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Identity, endpoint and credentials of one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpTarget {
    /// Registry row backing this client; `None` for baseline servers.
    pub server_id: Option<ServerId>,
    /// Display name used in errors and logs.
    pub name: String,
    /// Where to connect.
    pub endpoint: McpEndpoint,
    /// How to authenticate.
    pub auth: ClientAuth,
}

impl McpTarget {
    /// Builds the target for a registered server.
    #[must_use]
    pub fn for_server(server: &ServerConfig) -> Self {
        Self {
            server_id: Some(server.id()),
            name: server.name().as_str().to_owned(),
            endpoint: McpEndpoint {
                url: server.url().clone(),
                transport: server.transport(),
            },
            auth: ClientAuth::for_server(server.auth(), server.tenant()),
        }
    }
}

/// Collaborators shared by every client.
#[derive(Clone)]
pub struct McpClientFactory {
    connector: Arc<dyn McpConnector>,
    vault: Arc<CredentialVault>,
    tokens: Arc<dyn AccessTokenSource>,
    tunables: ClientTunables,
}

impl McpClientFactory {
    /// Creates a factory.
    #[must_use]
    pub fn new(
        connector: Arc<dyn McpConnector>,
        vault: Arc<CredentialVault>,
        tokens: Arc<dyn AccessTokenSource>,
        tunables: ClientTunables,
    ) -> Self {
        Self {
            connector,
            vault,
            tokens,
            tunables,
        }
    }

    /// Returns the connection tunables.
    #[must_use]
    pub const fn tunables(&self) -> ClientTunables {
        self.tunables
    }

    /// Builds an unconnected client for `target`.
    #[must_use]
    pub fn client(&self, target: McpTarget) -> McpClient {
        McpClient {
            target,
            factory: self.clone(),
            live: tokio::sync::Mutex::new(None),
        }
    }

    /// Builds an unconnected client for a registered server.
    #[must_use]
    pub fn client_for_server(&self, server: &ServerConfig) -> McpClient {
        self.client(McpTarget::for_server(server))
    }
}

struct LiveSession {
    session: Box<dyn McpSession>,
    tools: Vec<McpToolDefinition>,
}

/// Bearer credential for the current connect call.
struct Credential {
    bearer: Option<String>,
    stale: Option<String>,
    oauth: Option<(ProviderName, TenantId)>,
}

impl Credential {
    const fn anonymous() -> Self {
        Self {
            bearer: None,
            stale: None,
            oauth: None,
        }
    }

    fn secrets(&self) -> Vec<&str> {
        self.bearer
            .iter()
            .chain(self.stale.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Failure before any transport call, already log-safe.
struct CredentialFailure(String);

/// Client for one remote MCP server.
///
/// A client is connected at most once at a time; [`McpClient::connect`]
/// on a live client returns immediately.
pub struct McpClient {
    target: McpTarget,
    factory: McpClientFactory,
    live: tokio::sync::Mutex<Option<LiveSession>>,
}

impl McpClient {
    /// Returns the registry row id, if any.
    #[must_use]
    pub const fn server_id(&self) -> Option<ServerId> {
        self.target.server_id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.target.name
    }

    /// Returns the connection target.
    #[must_use]
    pub const fn target(&self) -> &McpTarget {
        &self.target
    }

    /// Connects, performs the handshake and discovers tools.
    ///
    /// Returns the number of discovered tools.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError::ConnectionFailed`] with a truncated message
    /// that never contains the bearer credential.
    pub async fn connect(&self) -> Result<usize, McpClientError> {
        let mut live = self.live.lock().await;
        if let Some(existing) = live.as_ref() {
            return Ok(existing.tools.len());
        }

        let mut credential = self
            .initial_credential()
            .await
            .map_err(|CredentialFailure(message)| {
                self.failed(FailureReason::Credential, &message, &[])
            })?;
        let mut retries_left = self.factory.tunables.retries;

        loop {
            match self.open_once(credential.bearer.as_deref()).await {
                Ok(session) => {
                    let count = session.tools.len();
                    info!(server = %self.target.name, tools = count, "connected to MCP server");
                    *live = Some(session);
                    return Ok(count);
                }
                Err(TransportError::Unauthorized(status)) if credential.oauth.is_some() => {
                    debug!(
                        server = %self.target.name,
                        status,
                        "MCP server rejected the access token, refreshing once"
                    );
                    credential = self.refresh_credential(credential).await?;
                }
                Err(err) if err.is_transient() && retries_left > 0 => {
                    retries_left = retries_left.saturating_sub(1);
                    debug!(server = %self.target.name, error = %err, "retrying MCP connection");
                }
                Err(err) => {
                    return Err(self.failed(
                        reason_for(&err),
                        &err.to_string(),
                        &credential.secrets(),
                    ));
                }
            }
        }
    }

    /// Returns the tools discovered by the last successful connect.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError::NotConnected`] when the client has no live
    /// session.
    pub async fn tools(&self) -> Result<Vec<McpToolDefinition>, McpClientError> {
        self.live
            .lock()
            .await
            .as_ref()
            .map(|session| session.tools.clone())
            .ok_or_else(|| McpClientError::NotConnected(self.target.name.clone()))
    }

    /// Returns whether the client holds a live session.
    pub async fn is_connected(&self) -> bool {
        self.live.lock().await.is_some()
    }

    /// Releases the session. Calling this on a disconnected client does
    /// nothing.
    pub async fn disconnect(&self) {
        let Some(session) = self.live.lock().await.take() else {
            return;
        };
        if let Err(err) = session.session.close().await {
            warn!(server = %self.target.name, error = %err, "closing MCP session failed");
        }
        debug!(server = %self.target.name, "disconnected from MCP server");
    }

    async fn open_once(&self, bearer: Option<&str>) -> Result<LiveSession, TransportError> {
        let attempt = async {
            let session = self
                .factory
                .connector
                .open(&self.target.endpoint, bearer)
                .await?;
            match session.list_tools().await {
                Ok(tools) => Ok(LiveSession { session, tools }),
                Err(err) => {
                    if let Err(close_err) = session.close().await {
                        debug!(error = %close_err, "closing failed MCP session");
                    }
                    Err(err)
                }
            }
        };
        tokio::time::timeout(self.factory.tunables.connect_timeout, attempt)
            .await
            .unwrap_or(Err(TransportError::Timeout))
    }

    async fn initial_credential(&self) -> Result<Credential, CredentialFailure> {
        match &self.target.auth {
            ClientAuth::None => Ok(Credential::anonymous()),
            ClientAuth::Bearer(secret) => {
                let token = self.factory.vault.decrypt(secret).map_err(|err| {
                    CredentialFailure(format!("bearer token unavailable: {err}"))
                })?;
                Ok(Credential {
                    bearer: Some(token),
                    ..Credential::anonymous()
                })
            }
            ClientAuth::OAuth { provider, tenant } => {
                let stored = self
                    .factory
                    .tokens
                    .stored_access_token(provider, tenant)
                    .await
                    .map_err(|err| credential_failure(&err))?;
                let credential = Credential {
                    bearer: Some(stored.value),
                    stale: None,
                    oauth: Some((provider.clone(), tenant.clone())),
                };
                if stored.expired {
                    debug!(server = %self.target.name, %provider, "access token expired, refreshing");
                    return self.refresh_oauth(credential).await;
                }
                Ok(credential)
            }
        }
    }

    async fn refresh_credential(&self, credential: Credential) -> Result<Credential, McpClientError> {
        let secrets: Vec<String> = credential.secrets().into_iter().map(str::to_owned).collect();
        self.refresh_oauth(credential)
            .await
            .map_err(|CredentialFailure(message)| {
                let borrowed: Vec<&str> = secrets.iter().map(String::as_str).collect();
                self.failed(FailureReason::Unauthorized, &message, &borrowed)
            })
    }

    /// Refreshes once; the returned credential can no longer refresh.
    async fn refresh_oauth(&self, credential: Credential) -> Result<Credential, CredentialFailure> {
        let Some((provider, tenant)) = credential.oauth else {
            return Err(CredentialFailure("credential cannot be refreshed".to_owned()));
        };
        let token = self
            .factory
            .tokens
            .refresh(&provider, &tenant)
            .await
            .map_err(|err| credential_failure(&err))?;
        Ok(Credential {
            bearer: Some(token),
            stale: credential.bearer,
            oauth: None,
        })
    }

    fn failed(&self, reason: FailureReason, message: &str, secrets: &[&str]) -> McpClientError {
        let safe_message = redact_and_truncate(message, secrets);
        warn!(
            server = %self.target.name,
            reason = ?reason,
            error = %safe_message,
            "MCP connection failed"
        );
        McpClientError::ConnectionFailed {
            server: self.target.name.clone(),
            reason,
            message: safe_message,
        }
    }
}

fn credential_failure(err: &OAuthError) -> CredentialFailure {
    CredentialFailure(err.to_string())
}

const fn reason_for(err: &TransportError) -> FailureReason {
    match err {
        TransportError::Unauthorized(_) => FailureReason::Unauthorized,
        TransportError::Timeout => FailureReason::Timeout,
        TransportError::Protocol(_) => FailureReason::Protocol,
        TransportError::Http { .. } | TransportError::Connection(_) => FailureReason::Transport,
    }
}
