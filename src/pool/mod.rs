//! Tenant-scoped pool of connected MCP clients.

mod connection_pool;

pub use connection_pool::{ClientList, McpConnectionPool, PoolError, PoolSettings};
