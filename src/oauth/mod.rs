//! OAuth 2.1 credentials for MCP servers configured at runtime.
//!
//! Providers resolve by name through [`registry::DynamicProviderRegistry`].
//! [`services::OAuthFlowEngine`] issues PKCE authorization URLs, exchanges
//! codes, and rotates refresh tokens; token pairs are stored encrypted
//! through the [`ports::OAuthTokenStore`] port.

pub mod adapters;
pub mod domain;
mod error;
pub mod ports;
pub mod registry;
pub mod services;

pub use error::{OAuthError, OAuthResult};
