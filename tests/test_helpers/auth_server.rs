//! In-process OAuth authorization server with PKCE and refresh rotation.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use switchboard::oauth::ports::{
    IssuedTokens, TokenEndpoint, TokenEndpointError, TokenGrant, TokenRequest,
};

struct PendingCode {
    challenge: String,
    client_id: String,
    redirect_uri: String,
}

#[derive(Default)]
struct AuthState {
    codes: HashMap<String, PendingCode>,
    refresh_tokens: HashSet<String>,
    access_tokens: HashSet<String>,
    issued: u64,
    code_exchanges: usize,
    refreshes: usize,
}

impl AuthState {
    fn issue_pair(&mut self) -> (String, String) {
        self.issued += 1;
        let access = format!("at-{}", self.issued);
        let refresh = format!("rt-{}", self.issued);
        self.access_tokens.insert(access.clone());
        self.refresh_tokens.insert(refresh.clone());
        (access, refresh)
    }
}

/// Authorization server that validates S256 verifiers and rotates refresh
/// tokens, rejecting every refresh token it has already redeemed.
pub struct RotatingAuthServer {
    state: Mutex<AuthState>,
    expires_in: Option<u64>,
    latency: Option<Duration>,
}

fn rejected(error: &str) -> TokenEndpointError {
    TokenEndpointError::Rejected {
        status: 400,
        error: error.to_owned(),
    }
}

/// Computes the S256 challenge of `verifier` as RFC 7636 defines it.
pub fn s256(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

impl RotatingAuthServer {
    /// Creates a server issuing tokens that expire after an hour.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AuthState::default()),
            expires_in: Some(3_600),
            latency: None,
        }
    }

    /// Delays every token response.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AuthState> {
        self.state.lock().expect("auth server lock")
    }

    /// Simulates the user approving the request encoded in
    /// `authorization_url` and returns the issued code.
    pub fn approve(&self, authorization_url: &str) -> String {
        let url = url::Url::parse(authorization_url).expect("authorization URL parses");
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(query.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(
            query.get("code_challenge_method").map(String::as_str),
            Some("S256")
        );

        let mut state = self.lock();
        state.issued += 1;
        let code = format!("code-{}", state.issued);
        state.codes.insert(
            code.clone(),
            PendingCode {
                challenge: query.get("code_challenge").cloned().expect("code challenge"),
                client_id: query.get("client_id").cloned().expect("client id"),
                redirect_uri: query.get("redirect_uri").cloned().expect("redirect uri"),
            },
        );
        code
    }

    /// Issues a pair out of band, as if granted before the test began.
    /// The access token is already expired when `expired` is set.
    pub fn issue_pair(&self, expired: bool) -> (String, String) {
        let mut state = self.lock();
        let (access, refresh) = state.issue_pair();
        if expired {
            state.access_tokens.remove(&access);
        }
        (access, refresh)
    }

    /// Returns whether `token` is a live access token.
    pub fn accepts(&self, token: &str) -> bool {
        self.lock().access_tokens.contains(token)
    }

    /// Returns how many refresh grants were served.
    pub fn refreshes(&self) -> usize {
        self.lock().refreshes
    }

    /// Returns how many code exchanges succeeded.
    pub fn code_exchanges(&self) -> usize {
        self.lock().code_exchanges
    }

    fn exchange(
        &self,
        request: &TokenRequest,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> Result<IssuedTokens, TokenEndpointError> {
        let mut state = self.lock();
        let pending = state
            .codes
            .remove(code)
            .ok_or_else(|| rejected("invalid_grant"))?;
        if pending.challenge != s256(verifier)
            || pending.client_id != request.client_id
            || pending.redirect_uri != redirect_uri
        {
            return Err(rejected("invalid_grant"));
        }
        state.code_exchanges += 1;
        let (access, refresh) = state.issue_pair();
        Ok(IssuedTokens {
            access_token: access,
            refresh_token: Some(refresh),
            expires_in: self.expires_in,
        })
    }

    fn rotate(&self, refresh_token: &str) -> Result<IssuedTokens, TokenEndpointError> {
        let mut state = self.lock();
        if !state.refresh_tokens.remove(refresh_token) {
            return Err(rejected("invalid_grant"));
        }
        state.refreshes += 1;
        let (access, refresh) = state.issue_pair();
        Ok(IssuedTokens {
            access_token: access,
            refresh_token: Some(refresh),
            expires_in: self.expires_in,
        })
    }
}

#[async_trait]
impl TokenEndpoint for RotatingAuthServer {
    async fn request_tokens(
        &self,
        request: TokenRequest,
    ) -> Result<IssuedTokens, TokenEndpointError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match &request.grant {
            TokenGrant::AuthorizationCode {
                code,
                code_verifier,
                redirect_uri,
            } => self.exchange(&request, code, code_verifier, redirect_uri),
            TokenGrant::RefreshToken { refresh_token } => self.rotate(refresh_token),
        }
    }
}
