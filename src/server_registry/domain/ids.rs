//! Identifier and validated-name types for registered MCP servers.

use super::ServerRegistryDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum length for an MCP server name, matching `VARCHAR(100)`.
const MAX_SERVER_NAME_LENGTH: usize = 100;

/// Maximum length for a tenant identifier, matching `VARCHAR(255)`.
const MAX_TENANT_ID_LENGTH: usize = 255;

/// Maximum length for an OAuth provider name, matching `VARCHAR(100)`.
const MAX_PROVIDER_NAME_LENGTH: usize = 100;

/// Prefix of provider names derived from server identifiers.
const DYNAMIC_PROVIDER_PREFIX: &str = "mcp_";

/// Unique identifier for a registered MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(Uuid);

impl ServerId {
    /// Creates a new random server identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a server identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ServerId {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<Uuid> for ServerId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Identifier of an isolated tenant ("context").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a validated tenant identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryDomainError`] when the value is empty or too
    /// long after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, ServerRegistryDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(ServerRegistryDomainError::EmptyTenantId);
        }
        if normalized.chars().count() > MAX_TENANT_ID_LENGTH {
            return Err(ServerRegistryDomainError::TenantIdTooLong(normalized));
        }
        Ok(Self(normalized))
    }

    /// Returns the tenant identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Validated human-readable MCP server name, unique per tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerName(String);

impl ServerName {
    /// Creates a validated server name.
    ///
    /// The input is trimmed. Control characters are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryDomainError`] when validation fails.
    pub fn new(value: impl Into<String>) -> Result<Self, ServerRegistryDomainError> {
        let normalized = value.into().trim().to_owned();

        if normalized.is_empty() {
            return Err(ServerRegistryDomainError::EmptyServerName);
        }

        if normalized.chars().any(char::is_control) {
            return Err(ServerRegistryDomainError::InvalidServerName(normalized));
        }

        if normalized.chars().count() > MAX_SERVER_NAME_LENGTH {
            return Err(ServerRegistryDomainError::ServerNameTooLong(normalized));
        }

        Ok(Self(normalized))
    }

    /// Returns the server name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ServerName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ServerName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Name of an OAuth provider configuration.
///
/// Statically configured providers use arbitrary names such as `github`.
/// Providers backing a registered server are named `mcp_<server-id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderName(String);

impl ProviderName {
    /// Creates a validated provider name.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryDomainError::InvalidProviderName`] when the
    /// value is empty, too long, or uses characters outside `[A-Za-z0-9_-]`.
    pub fn new(value: impl Into<String>) -> Result<Self, ServerRegistryDomainError> {
        let normalized = value.into().trim().to_owned();
        let is_valid = !normalized.is_empty()
            && normalized.len() <= MAX_PROVIDER_NAME_LENGTH
            && normalized
                .chars()
                .all(|character| character.is_ascii_alphanumeric() || matches!(character, '_' | '-'));
        if !is_valid {
            return Err(ServerRegistryDomainError::InvalidProviderName(normalized));
        }
        Ok(Self(normalized))
    }

    /// Derives the dynamic provider name for a registered server.
    #[must_use]
    pub fn for_server(server_id: ServerId) -> Self {
        Self(format!("{DYNAMIC_PROVIDER_PREFIX}{server_id}"))
    }

    /// Returns whether the name follows the `mcp_<server-id>` convention.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.0
            .strip_prefix(DYNAMIC_PROVIDER_PREFIX)
            .is_some_and(|suffix| Uuid::parse_str(suffix).is_ok())
    }

    /// Returns the provider name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ProviderName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
