//! `reqwest` implementation of the token endpoint port.

use crate::oauth::ports::{
    IssuedTokens, TokenEndpoint, TokenEndpointError, TokenGrant, TokenRequest,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const MAX_ERROR_CODE_LENGTH: usize = 64;

/// Posts form-encoded grants to provider token endpoints.
#[derive(Debug, Clone)]
pub struct HttpTokenEndpoint {
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct TokenResponseBody {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct TokenErrorBody {
    error: String,
}

impl HttpTokenEndpoint {
    /// Creates an endpoint client whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenEndpointError::Transport`] when the HTTP client cannot
    /// be built.
    pub fn new(timeout: Duration) -> Result<Self, TokenEndpointError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TokenEndpointError::Transport(err.to_string()))?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn form_fields(request: &TokenRequest) -> Vec<(&'static str, &str)> {
    let mut fields = vec![
        ("grant_type", request.grant.grant_type()),
        ("client_id", request.client_id.as_str()),
    ];
    if let Some(secret) = request.client_secret.as_deref() {
        fields.push(("client_secret", secret));
    }
    match &request.grant {
        TokenGrant::AuthorizationCode {
            code,
            code_verifier,
            redirect_uri,
        } => {
            fields.push(("code", code));
            fields.push(("code_verifier", code_verifier));
            fields.push(("redirect_uri", redirect_uri));
        }
        TokenGrant::RefreshToken { refresh_token } => {
            fields.push(("refresh_token", refresh_token));
            if let Some(scope) = request.scope.as_deref() {
                fields.push(("scope", scope));
            }
        }
    }
    fields
}

fn sanitize_error_code(raw: &str) -> String {
    let code: String = raw
        .chars()
        .filter(|character| character.is_ascii_alphanumeric() || matches!(character, '_' | '-'))
        .take(MAX_ERROR_CODE_LENGTH)
        .collect();
    if code.is_empty() {
        String::from("unknown")
    } else {
        code
    }
}

fn map_send_error(err: &reqwest::Error) -> TokenEndpointError {
    // reqwest errors embed the request URL; report the failure class only.
    if err.is_timeout() {
        TokenEndpointError::Timeout
    } else if err.is_connect() {
        TokenEndpointError::Transport(String::from("connection failed"))
    } else {
        TokenEndpointError::Transport(String::from("request failed"))
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    async fn request_tokens(
        &self,
        request: TokenRequest,
    ) -> Result<IssuedTokens, TokenEndpointError> {
        debug!(
            token_url = %request.token_url,
            grant_type = request.grant.grant_type(),
            "requesting OAuth tokens"
        );
        let response = self
            .client
            .post(&request.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form_fields(&request))
            .send()
            .await
            .map_err(|err| map_send_error(&err))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|err| map_send_error(&err))?;

        if !status.is_success() {
            let error = serde_json::from_slice::<TokenErrorBody>(&body)
                .map_or_else(|_| String::from("unknown"), |parsed| sanitize_error_code(&parsed.error));
            return Err(TokenEndpointError::Rejected {
                status: status.as_u16(),
                error,
            });
        }

        let parsed: TokenResponseBody = serde_json::from_slice(&body).map_err(|err| {
            TokenEndpointError::InvalidResponse(format!(
                "malformed token response at line {} column {}",
                err.line(),
                err.column()
            ))
        })?;
        if parsed.access_token.trim().is_empty() {
            return Err(TokenEndpointError::InvalidResponse(String::from(
                "access_token is empty",
            )));
        }

        Ok(IssuedTokens {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token.filter(|token| !token.is_empty()),
            expires_in: parsed.expires_in,
        })
    }
}
