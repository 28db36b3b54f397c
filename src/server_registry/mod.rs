//! Durable per-tenant registry of remote MCP servers.
//!
//! Each row describes one MCP endpoint, how to authenticate against it, and
//! the outcome of the most recent connection attempt. The connection pool
//! reads enabled rows and writes status back; administrative callers create,
//! edit and delete rows. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
