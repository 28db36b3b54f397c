//! Clients for remote MCP servers.
//!
//! An [`services::McpClient`] resolves its bearer credential just before
//! connecting, completes the MCP handshake under a hard timeout, and
//! discovers the server's tools. Transports live behind the
//! [`ports::McpConnector`] port.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;
