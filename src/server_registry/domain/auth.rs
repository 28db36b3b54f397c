//! Authentication settings attached to a registered MCP server.

use super::{EndpointUrl, ParseAuthKindError, ProviderName, ServerRegistryDomainError};
use crate::vault::EncryptedSecret;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant of [`ServerAuth`] as stored in the `auth_kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    /// No credentials are sent.
    None,
    /// A static bearer token is sent.
    Bearer,
    /// An OAuth 2.1 access token is sent.
    #[serde(rename = "oauth")]
    OAuth,
}

impl AuthKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bearer => "bearer",
            Self::OAuth => "oauth",
        }
    }
}

impl fmt::Display for AuthKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AuthKind {
    type Error = ParseAuthKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "none" => Ok(Self::None),
            "bearer" => Ok(Self::Bearer),
            "oauth" => Ok(Self::OAuth),
            _ => Err(ParseAuthKindError(value.to_owned())),
        }
    }
}

/// OAuth endpoints and client credentials supplied for a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthEndpoints {
    authorization_url: EndpointUrl,
    token_url: EndpointUrl,
    client_id: String,
    client_secret: Option<EncryptedSecret>,
    scope: Option<String>,
}

impl OAuthEndpoints {
    /// Creates validated OAuth endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryDomainError`] when a URL is invalid or the
    /// client id is empty.
    pub fn new(
        authorization_url: impl Into<String>,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Result<Self, ServerRegistryDomainError> {
        let normalized_client_id = client_id.into().trim().to_owned();
        if normalized_client_id.is_empty() {
            return Err(ServerRegistryDomainError::EmptyClientId);
        }

        Ok(Self {
            authorization_url: EndpointUrl::parse("authorization URL", authorization_url)?,
            token_url: EndpointUrl::parse("token URL", token_url)?,
            client_id: normalized_client_id,
            client_secret: None,
            scope: None,
        })
    }

    /// Sets the encrypted client secret.
    #[must_use]
    pub fn with_client_secret(mut self, client_secret: Option<EncryptedSecret>) -> Self {
        self.client_secret = client_secret;
        self
    }

    /// Sets the requested scope string; blank scopes are dropped.
    #[must_use]
    pub fn with_scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        self
    }

    /// Returns the authorization endpoint.
    #[must_use]
    pub const fn authorization_url(&self) -> &EndpointUrl {
        &self.authorization_url
    }

    /// Returns the token endpoint.
    #[must_use]
    pub const fn token_url(&self) -> &EndpointUrl {
        &self.token_url
    }

    /// Returns the OAuth client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the encrypted client secret, if any.
    #[must_use]
    pub const fn client_secret(&self) -> Option<&EncryptedSecret> {
        self.client_secret.as_ref()
    }

    /// Returns the scope string, if any.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }
}

/// Authentication requested when a server is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAuthRequest {
    /// No credentials.
    None,
    /// Static bearer token, already encrypted.
    Bearer(EncryptedSecret),
    /// OAuth with endpoints supplied by the user.
    OAuth(OAuthEndpoints),
}

/// Authentication configured for a registered server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ServerAuth {
    /// No credentials are sent.
    None,
    /// Static bearer token.
    Bearer {
        /// Encrypted token.
        token: EncryptedSecret,
    },
    /// OAuth 2.1 via a dynamically registered provider.
    #[serde(rename = "oauth")]
    OAuth {
        /// Dynamic provider name, `mcp_<server-id>`.
        provider_name: ProviderName,
        /// Endpoints and client credentials.
        endpoints: OAuthEndpoints,
    },
}

impl ServerAuth {
    /// Returns the discriminant.
    #[must_use]
    pub const fn kind(&self) -> AuthKind {
        match self {
            Self::None => AuthKind::None,
            Self::Bearer { .. } => AuthKind::Bearer,
            Self::OAuth { .. } => AuthKind::OAuth,
        }
    }

    /// Returns the dynamic provider name for OAuth servers.
    #[must_use]
    pub const fn provider_name(&self) -> Option<&ProviderName> {
        match self {
            Self::OAuth { provider_name, .. } => Some(provider_name),
            Self::None | Self::Bearer { .. } => None,
        }
    }

    /// Rebuilds auth settings from flattened persisted columns.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryDomainError::MissingBearerToken`] for bearer
    /// rows without a token and
    /// [`ServerRegistryDomainError::IncompleteOAuthConfig`] for OAuth rows
    /// missing any of provider name, authorization URL, token URL or client
    /// id.
    pub fn from_columns(
        kind: AuthKind,
        columns: PersistedAuthColumns,
    ) -> Result<Self, ServerRegistryDomainError> {
        match kind {
            AuthKind::None => Ok(Self::None),
            AuthKind::Bearer => columns
                .bearer_token
                .map(|token| Self::Bearer { token })
                .ok_or(ServerRegistryDomainError::MissingBearerToken),
            AuthKind::OAuth => {
                let provider_name = columns
                    .provider_name
                    .ok_or(ServerRegistryDomainError::IncompleteOAuthConfig(
                        "provider name",
                    ))?;
                let authorization_url = columns.authorization_url.ok_or(
                    ServerRegistryDomainError::IncompleteOAuthConfig("authorization URL"),
                )?;
                let token_url = columns
                    .token_url
                    .ok_or(ServerRegistryDomainError::IncompleteOAuthConfig("token URL"))?;
                let client_id = columns
                    .client_id
                    .ok_or(ServerRegistryDomainError::IncompleteOAuthConfig("client id"))?;

                let endpoints = OAuthEndpoints::new(authorization_url, token_url, client_id)?
                    .with_client_secret(columns.client_secret)
                    .with_scope(columns.scope);
                Ok(Self::OAuth {
                    provider_name: ProviderName::new(provider_name)?,
                    endpoints,
                })
            }
        }
    }

    /// Flattens auth settings into persisted columns.
    #[must_use]
    pub fn to_columns(&self) -> PersistedAuthColumns {
        match self {
            Self::None => PersistedAuthColumns::default(),
            Self::Bearer { token } => PersistedAuthColumns {
                bearer_token: Some(token.clone()),
                ..PersistedAuthColumns::default()
            },
            Self::OAuth {
                provider_name,
                endpoints,
            } => PersistedAuthColumns {
                bearer_token: None,
                provider_name: Some(provider_name.as_str().to_owned()),
                authorization_url: Some(endpoints.authorization_url().as_str().to_owned()),
                token_url: Some(endpoints.token_url().as_str().to_owned()),
                client_id: Some(endpoints.client_id().to_owned()),
                client_secret: endpoints.client_secret().cloned(),
                scope: endpoints.scope().map(str::to_owned),
            },
        }
    }
}

/// Nullable auth columns of an `mcp_servers` row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedAuthColumns {
    /// Encrypted bearer token.
    pub bearer_token: Option<EncryptedSecret>,
    /// Dynamic OAuth provider name.
    pub provider_name: Option<String>,
    /// OAuth authorization endpoint.
    pub authorization_url: Option<String>,
    /// OAuth token endpoint.
    pub token_url: Option<String>,
    /// OAuth client id.
    pub client_id: Option<String>,
    /// Encrypted OAuth client secret.
    pub client_secret: Option<EncryptedSecret>,
    /// OAuth scope string.
    pub scope: Option<String>,
}
