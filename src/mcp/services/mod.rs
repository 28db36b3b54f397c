//! Client orchestration for remote MCP servers.

mod client;

pub use client::{McpClient, McpClientFactory, McpTarget};
