//! Error types for server registry domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing server registry domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServerRegistryDomainError {
    /// The tenant identifier is empty after trimming.
    #[error("tenant identifier must not be empty")]
    EmptyTenantId,

    /// The tenant identifier exceeds the storage limit.
    #[error("tenant identifier exceeds 255 character limit: {0}")]
    TenantIdTooLong(String),

    /// The server name is empty after trimming.
    #[error("MCP server name must not be empty")]
    EmptyServerName,

    /// The server name contains control characters.
    #[error("MCP server name '{0}' contains control characters")]
    InvalidServerName(String),

    /// The server name exceeds the 100-character storage limit.
    #[error("MCP server name exceeds 100 character limit: {0}")]
    ServerNameTooLong(String),

    /// The OAuth provider name is empty or uses characters outside
    /// `[A-Za-z0-9_-]`.
    #[error("OAuth provider name '{0}' is invalid")]
    InvalidProviderName(String),

    /// A URL is empty.
    #[error("{field} must not be empty")]
    EmptyUrl {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A URL does not parse or does not use `http` or `https`.
    #[error("{field} '{value}' must be an absolute http:// or https:// URL")]
    InvalidUrl {
        /// Name of the offending field.
        field: &'static str,
        /// Rejected value.
        value: String,
    },

    /// The OAuth client identifier is empty.
    #[error("OAuth client id must not be empty")]
    EmptyClientId,

    /// Persisted OAuth columns are only partially populated.
    #[error("OAuth configuration is incomplete: missing {0}")]
    IncompleteOAuthConfig(&'static str),

    /// Bearer auth was persisted without a token.
    #[error("bearer auth requires an encrypted token")]
    MissingBearerToken,
}

/// Error returned while parsing a transport kind from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown MCP transport kind: {0}")]
pub struct ParseTransportKindError(pub String);

/// Error returned while parsing an auth kind from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown MCP auth kind: {0}")]
pub struct ParseAuthKindError(pub String);

/// Error returned while parsing a connection status from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown MCP connection status: {0}")]
pub struct ParseConnectionStatusError(pub String);
