//! Port contracts for MCP client connections.

mod connector;

pub use connector::{McpConnector, McpSession, TransportError, TransportResult};
