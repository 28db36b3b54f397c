//! Transport selection for remote MCP endpoints.

use super::{jsonrpc::handshake, legacy_sse::LegacySseSession, streamable::StreamableHttpSession};
use crate::mcp::domain::McpEndpoint;
use crate::mcp::ports::{McpConnector, McpSession, TransportError, TransportResult};
use crate::server_registry::domain::TransportKind;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Opens MCP sessions over streamable HTTP or legacy SSE.
#[derive(Debug, Clone)]
pub struct HttpMcpConnector {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl HttpMcpConnector {
    /// Creates a connector.
    ///
    /// `connect_timeout` bounds TCP and TLS setup; `request_timeout` bounds
    /// each JSON-RPC exchange.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connection`] when the HTTP client cannot be
    /// built.
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|_| TransportError::Connection("HTTP client unavailable".to_owned()))?;
        Ok(Self {
            client,
            request_timeout,
        })
    }

    /// Wraps an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
        }
    }

    async fn open_streamable(
        &self,
        url: &str,
        bearer: Option<&str>,
    ) -> TransportResult<Box<dyn McpSession>> {
        let session =
            StreamableHttpSession::new(self.client.clone(), url, bearer, self.request_timeout);
        if let Err(err) = handshake(&session).await {
            if let Err(close_err) = session.close().await {
                debug!(error = %close_err, "closing half-open MCP session failed");
            }
            return Err(err);
        }
        Ok(Box::new(session))
    }

    async fn open_sse(
        &self,
        url: &str,
        bearer: Option<&str>,
    ) -> TransportResult<Box<dyn McpSession>> {
        let session =
            LegacySseSession::open(self.client.clone(), url, bearer, self.request_timeout).await?;
        handshake(&session).await?;
        Ok(Box::new(session))
    }
}

/// Streamable HTTP failures that suggest a legacy SSE server.
const fn should_fall_back(err: &TransportError) -> bool {
    matches!(
        err,
        TransportError::Http {
            status: 400 | 404 | 405 | 406 | 415
        } | TransportError::Protocol(_)
    )
}

#[async_trait]
impl McpConnector for HttpMcpConnector {
    async fn open(
        &self,
        endpoint: &McpEndpoint,
        bearer: Option<&str>,
    ) -> TransportResult<Box<dyn McpSession>> {
        let url = endpoint.url.as_str();
        match endpoint.transport {
            TransportKind::StreamableHttp => self.open_streamable(url, bearer).await,
            TransportKind::Sse => self.open_sse(url, bearer).await,
            TransportKind::Auto => match self.open_streamable(url, bearer).await {
                Err(err) if should_fall_back(&err) => {
                    warn!(
                        url = %endpoint.url,
                        error = %err,
                        "streamable HTTP unavailable, falling back to SSE"
                    );
                    self.open_sse(url, bearer).await
                }
                other => other,
            },
        }
    }
}
