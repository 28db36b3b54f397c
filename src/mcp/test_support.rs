//! In-process doubles for MCP transports and token sources.

use crate::mcp::domain::{McpEndpoint, McpToolDefinition};
use crate::mcp::ports::{McpConnector, McpSession, TransportError, TransportResult};
use crate::oauth::OAuthError;
use crate::oauth::ports::{AccessTokenSource, StoredAccessToken};
use crate::server_registry::domain::{ProviderName, TenantId};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type ToolNames = Vec<&'static str>;

/// How the fake server at one URL answers.
#[derive(Debug, Clone)]
pub(crate) enum FakeServer {
    /// Accepts any credential and exposes the named tools.
    Tools(ToolNames),
    /// Accepts only `token` and exposes the named tools.
    RequireBearer { token: String, tools: ToolNames },
    /// Fails every open.
    Fail(TransportError),
    /// Answers successive opens from the queue, then fails.
    Script(VecDeque<TransportResult<ToolNames>>),
    /// Never answers.
    Hang,
}

/// Connector that serves scripted answers keyed by URL and counts opens.
#[derive(Default)]
pub(crate) struct FakeConnector {
    servers: Mutex<HashMap<String, FakeServer>>,
    opens: Mutex<HashMap<String, usize>>,
    bearers: Mutex<Vec<Option<String>>>,
    closes: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl FakeConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every open sleeps for `delay` before answering.
    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub(crate) fn serve(&self, url: &str, server: FakeServer) {
        self.servers
            .lock()
            .expect("servers lock")
            .insert(url.to_owned(), server);
    }

    pub(crate) fn opens(&self, url: &str) -> usize {
        self.opens
            .lock()
            .expect("opens lock")
            .get(url)
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn total_opens(&self) -> usize {
        self.opens.lock().expect("opens lock").values().sum()
    }

    pub(crate) fn bearers(&self) -> Vec<Option<String>> {
        self.bearers.lock().expect("bearers lock").clone()
    }

    pub(crate) fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn answer(&self, url: &str, bearer: Option<&str>) -> Option<TransportResult<ToolNames>> {
        let mut servers = self.servers.lock().expect("servers lock");
        let answer = match servers.get_mut(url) {
            None => Err(TransportError::Connection("no route".to_owned())),
            Some(FakeServer::Tools(tools)) => Ok(tools.clone()),
            Some(FakeServer::RequireBearer { token, tools }) => {
                if bearer == Some(token.as_str()) {
                    Ok(tools.clone())
                } else {
                    Err(TransportError::Unauthorized(401))
                }
            }
            Some(FakeServer::Fail(err)) => Err(err.clone()),
            Some(FakeServer::Script(queue)) => queue.pop_front().unwrap_or_else(|| {
                Err(TransportError::Connection("script exhausted".to_owned()))
            }),
            Some(FakeServer::Hang) => return None,
        };
        Some(answer)
    }
}

struct FakeSession {
    tools: Vec<McpToolDefinition>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl McpSession for FakeSession {
    async fn list_tools(&self) -> TransportResult<Vec<McpToolDefinition>> {
        Ok(self.tools.clone())
    }

    async fn close(&self) -> TransportResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl McpConnector for FakeConnector {
    async fn open(
        &self,
        endpoint: &McpEndpoint,
        bearer: Option<&str>,
    ) -> TransportResult<Box<dyn McpSession>> {
        let url = endpoint.url.as_str();
        *self
            .opens
            .lock()
            .expect("opens lock")
            .entry(url.to_owned())
            .or_default() += 1;
        self.bearers
            .lock()
            .expect("bearers lock")
            .push(bearer.map(str::to_owned));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let Some(answer) = self.answer(url, bearer) else {
            return std::future::pending().await;
        };
        let tools = answer?
            .into_iter()
            .map(|name| {
                McpToolDefinition::new(name, "", serde_json::json!({ "type": "object" }))
                    .expect("valid tool name")
            })
            .collect();
        Ok(Box::new(FakeSession {
            tools,
            closes: Arc::clone(&self.closes),
        }))
    }
}

/// Token source with one stored token and a fixed refresh outcome.
pub(crate) struct FakeTokens {
    stored: Mutex<Result<StoredAccessToken, OAuthError>>,
    refreshed: Mutex<Result<String, OAuthError>>,
    refreshes: AtomicUsize,
}

impl FakeTokens {
    pub(crate) fn new(access_token: &str, expired: bool, refreshed: &str) -> Self {
        Self {
            stored: Mutex::new(Ok(StoredAccessToken {
                value: access_token.to_owned(),
                expired,
            })),
            refreshed: Mutex::new(Ok(refreshed.to_owned())),
            refreshes: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing_refresh(self, error: OAuthError) -> Self {
        *self.refreshed.lock().expect("refresh lock") = Err(error);
        self
    }

    pub(crate) fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessTokenSource for FakeTokens {
    async fn stored_access_token(
        &self,
        _provider: &ProviderName,
        _tenant: &TenantId,
    ) -> Result<StoredAccessToken, OAuthError> {
        self.stored.lock().expect("stored lock").clone()
    }

    async fn refresh(
        &self,
        _provider: &ProviderName,
        _tenant: &TenantId,
    ) -> Result<String, OAuthError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.refreshed.lock().expect("refresh lock").clone()
    }
}
