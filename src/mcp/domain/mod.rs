//! Domain model for MCP client connections.

mod auth;
mod endpoint;
mod error;
mod redact;
mod tool;

pub use auth::ClientAuth;
pub use endpoint::{ClientTunables, McpEndpoint};
pub use error::{FailureReason, McpClientError, McpDomainError};
pub use redact::redact_and_truncate;
pub use tool::McpToolDefinition;
