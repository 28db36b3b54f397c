//! Adapter implementations for MCP client ports.

pub mod http;
