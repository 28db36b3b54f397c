//! Connection target and tunables for one MCP client.

use crate::server_registry::domain::{EndpointUrl, TransportKind};
use std::time::Duration;

/// Where and how to reach an MCP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpEndpoint {
    /// Endpoint URL.
    pub url: EndpointUrl,
    /// Requested transport.
    pub transport: TransportKind,
}

/// Connection tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTunables {
    /// Hard limit on handshake plus tool discovery, per attempt.
    pub connect_timeout: Duration,
    /// Extra attempts after a transient failure.
    pub retries: u32,
}

impl Default for ClientTunables {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            retries: 1,
        }
    }
}
