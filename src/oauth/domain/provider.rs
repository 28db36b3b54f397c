//! OAuth provider configuration resolved by name.

use crate::server_registry::domain::{EndpointUrl, OAuthEndpoints, ProviderName};
use crate::vault::{CredentialError, CredentialVault};
use serde::Deserialize;
use std::fmt;

/// Plaintext OAuth client secret held only in memory.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ClientSecret(String);

impl ClientSecret {
    /// Wraps a plaintext secret.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Exposes the plaintext for a token request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("ClientSecret(..)")
    }
}

/// Endpoints and client credentials of one OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProviderConfig {
    name: ProviderName,
    authorization_url: EndpointUrl,
    token_url: EndpointUrl,
    client_id: String,
    client_secret: Option<ClientSecret>,
    scope: Option<String>,
}

impl OAuthProviderConfig {
    /// Creates a provider configuration.
    #[must_use]
    pub fn new(
        name: ProviderName,
        authorization_url: EndpointUrl,
        token_url: EndpointUrl,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            name,
            authorization_url,
            token_url,
            client_id: client_id.into(),
            client_secret: None,
            scope: None,
        }
    }

    /// Synthesizes a provider from the OAuth settings of a server row,
    /// decrypting the stored client secret.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the stored secret cannot be
    /// decrypted.
    pub fn from_server_endpoints(
        name: ProviderName,
        endpoints: &OAuthEndpoints,
        vault: &CredentialVault,
    ) -> Result<Self, CredentialError> {
        let secret = vault.decrypt_optional(endpoints.client_secret())?;
        Ok(Self::new(
            name,
            endpoints.authorization_url().clone(),
            endpoints.token_url().clone(),
            endpoints.client_id(),
        )
        .with_client_secret(secret.map(ClientSecret::new))
        .with_scope(endpoints.scope().map(str::to_owned)))
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, client_secret: Option<ClientSecret>) -> Self {
        self.client_secret = client_secret;
        self
    }

    /// Sets the scope; blank scopes are dropped.
    #[must_use]
    pub fn with_scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        self
    }

    /// Returns the provider name.
    #[must_use]
    pub const fn name(&self) -> &ProviderName {
        &self.name
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

    /// Returns the client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the client secret, if any.
    #[must_use]
    pub const fn client_secret(&self) -> Option<&ClientSecret> {
        self.client_secret.as_ref()
    }

    /// Returns the scope, if any.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }
}
