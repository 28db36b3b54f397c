//! Port for the provider's OAuth token endpoint.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Grant presented to the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub enum TokenGrant {
    /// `grant_type=authorization_code`.
    AuthorizationCode {
        /// Code returned to the redirect URI.
        code: String,
        /// PKCE verifier recorded when the attempt started.
        code_verifier: String,
        /// Redirect URI recorded when the attempt started.
        redirect_uri: String,
    },
    /// `grant_type=refresh_token`.
    RefreshToken {
        /// Current refresh token.
        refresh_token: String,
    },
}

impl TokenGrant {
    /// Returns the `grant_type` form value.
    #[must_use]
    pub const fn grant_type(&self) -> &'static str {
        match self {
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::RefreshToken { .. } => "refresh_token",
        }
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TokenGrant")
            .field("grant_type", &self.grant_type())
            .finish_non_exhaustive()
    }
}

/// Complete token endpoint request.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenRequest {
    /// Token endpoint URL.
    pub token_url: String,
    /// OAuth client id.
    pub client_id: String,
    /// Plaintext client secret, for confidential clients.
    pub client_secret: Option<String>,
    /// Scope to request on refresh.
    pub scope: Option<String>,
    /// Grant being presented.
    pub grant: TokenGrant,
}

impl fmt::Debug for TokenRequest {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TokenRequest")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("grant", &self.grant)
            .finish_non_exhaustive()
    }
}

/// Tokens issued by the endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedTokens {
    /// New access token.
    pub access_token: String,
    /// New refresh token, when the provider rotates or issues one.
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    pub expires_in: Option<u64>,
}

impl fmt::Debug for IssuedTokens {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("IssuedTokens")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Failures talking to the token endpoint.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenEndpointError {
    /// The provider rejected the grant.
    #[error("token endpoint rejected the request (status {status}, error {error})")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// OAuth `error` code, or `unknown`.
        error: String,
    },
    /// The request did not complete within the timeout.
    #[error("token endpoint timed out")]
    Timeout,
    /// The request failed before a response arrived.
    #[error("token endpoint unreachable: {0}")]
    Transport(String),
    /// The response body was not a valid token response.
    #[error("token endpoint returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Exchanges grants for tokens at a provider's token endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Presents `request` and returns the issued tokens.
    async fn request_tokens(&self, request: TokenRequest)
    -> Result<IssuedTokens, TokenEndpointError>;
}
