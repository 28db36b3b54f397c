//! Transport port for reaching remote MCP servers.

use crate::mcp::domain::{McpEndpoint, McpToolDefinition};
use async_trait::async_trait;
use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Opens initialized MCP sessions.
#[async_trait]
pub trait McpConnector: Send + Sync {
    /// Connects to `endpoint` and completes the `initialize` handshake,
    /// including the `notifications/initialized` notification.
    ///
    /// `bearer` is sent verbatim as an `Authorization: Bearer` header.
    async fn open(
        &self,
        endpoint: &McpEndpoint,
        bearer: Option<&str>,
    ) -> TransportResult<Box<dyn McpSession>>;
}

/// Initialized session with one MCP server.
#[async_trait]
pub trait McpSession: Send + Sync {
    /// Lists every tool the server exposes, following pagination cursors.
    async fn list_tools(&self) -> TransportResult<Vec<McpToolDefinition>>;

    /// Releases the session. Closing twice is harmless.
    async fn close(&self) -> TransportResult<()>;
}

/// Errors returned by transport adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The server answered 401 or 403.
    #[error("server rejected the credential (HTTP {0})")]
    Unauthorized(u16),

    /// The server answered with another non-success status.
    #[error("server answered HTTP {status}")]
    Http {
        /// Status code.
        status: u16,
    },

    /// A single request exceeded its timeout.
    #[error("request timed out")]
    Timeout,

    /// The server answered with something other than MCP JSON-RPC.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The connection could not be established or was dropped.
    #[error("connection error: {0}")]
    Connection(String),
}

impl TransportError {
    /// Returns whether another attempt might succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connection(_) => true,
            Self::Http { status } => *status >= 500 || *status == 429,
            Self::Unauthorized(_) | Self::Protocol(_) => false,
        }
    }
}
