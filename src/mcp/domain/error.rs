//! Errors for MCP domain values and client connections.

use thiserror::Error;

/// Errors returned while constructing MCP domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum McpDomainError {
    /// The tool name is empty after trimming.
    #[error("MCP tool name must not be empty")]
    EmptyToolName,

    /// A `tools/list` entry is not a tool object.
    #[error("malformed MCP tool entry: {0}")]
    MalformedTool(String),
}

/// Category of a failed connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The endpoint rejected the credential, even after one refresh.
    Unauthorized,
    /// No usable credential could be produced.
    Credential,
    /// The handshake or discovery exceeded the connect timeout.
    Timeout,
    /// The endpoint was unreachable or answered with an error.
    Transport,
    /// The endpoint answered with something other than MCP.
    Protocol,
}

/// Errors raised by [`crate::mcp::services::McpClient`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum McpClientError {
    /// Connecting to the server failed. The message is truncated and never
    /// contains the bearer credential.
    #[error("connection to MCP server '{server}' failed: {message}")]
    ConnectionFailed {
        /// Server display name.
        server: String,
        /// Failure category.
        reason: FailureReason,
        /// Log-safe description.
        message: String,
    },

    /// The client has no live session.
    #[error("MCP server '{0}' is not connected")]
    NotConnected(String),
}

impl McpClientError {
    /// Returns the log-safe failure message.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::ConnectionFailed { message, .. } => message.clone(),
            Self::NotConnected(_) => self.to_string(),
        }
    }
}
