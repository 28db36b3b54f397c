//! Switchboard: tenant-scoped connections to remote MCP servers.
//!
//! The crate keeps a pool of connected Model Context Protocol clients per
//! tenant and authenticates them with static bearer tokens or OAuth 2.1
//! access tokens obtained through an authorization-code flow with PKCE.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, HTTP, memory)
//! - **Services**: Orchestration over ports
//!
//! # Modules
//!
//! - [`vault`]: Encryption of credentials at rest
//! - [`server_registry`]: Tenant-owned MCP server rows and their status
//! - [`oauth`]: Provider resolution, authorization flow and token refresh
//! - [`mcp`]: Clients for remote MCP servers over HTTP transports
//! - [`pool`]: Per-tenant cache of connected clients
//! - [`config`]: Deploy-time configuration
//! - [`telemetry`]: Tracing subscriber setup

pub mod config;
pub mod mcp;
pub mod oauth;
pub mod pool;
pub mod server_registry;
pub mod telemetry;
pub mod vault;
