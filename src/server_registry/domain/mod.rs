//! Domain model for registered MCP servers.
//!
//! A [`ServerConfig`] describes one MCP endpoint owned by a tenant: where it
//! lives, how to authenticate against it, and how the last connection attempt
//! went. Infrastructure concerns remain outside this boundary.

mod auth;
mod error;
mod ids;
mod server;
mod status;
mod transport;

pub use auth::{AuthKind, OAuthEndpoints, PersistedAuthColumns, ServerAuth, ServerAuthRequest};
pub use error::{
    ParseAuthKindError, ParseConnectionStatusError, ParseTransportKindError,
    ServerRegistryDomainError,
};
pub use ids::{ProviderName, ServerId, ServerName, TenantId};
pub use server::{NewServerConfig, PersistedServerData, ServerConfig};
pub use status::{ConnectionStatus, MAX_ERROR_MESSAGE_LENGTH, StatusUpdate, truncate_message};
pub use transport::{EndpointUrl, TransportKind};
