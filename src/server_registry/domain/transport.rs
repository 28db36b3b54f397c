//! MCP endpoint and transport value objects.

use super::{ParseTransportKindError, ServerRegistryDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire transport used to reach a remote MCP endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Try streamable HTTP first and fall back to legacy SSE.
    #[default]
    Auto,
    /// Legacy HTTP+SSE transport.
    Sse,
    /// Streamable HTTP transport.
    StreamableHttp,
}

impl TransportKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Sse => "sse",
            Self::StreamableHttp => "streamable-http",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TransportKind {
    type Error = ParseTransportKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "auto" => Ok(Self::Auto),
            "sse" => Ok(Self::Sse),
            "streamable-http" | "streamable_http" | "http" => Ok(Self::StreamableHttp),
            _ => Err(ParseTransportKindError(value.to_owned())),
        }
    }
}

/// Validated absolute `http(s)` URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointUrl(String);

impl EndpointUrl {
    /// Validates `value` as an endpoint URL for `field`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerRegistryDomainError`] when the value is empty, does not
    /// parse, or does not use the `http` or `https` scheme.
    pub fn parse(
        field: &'static str,
        value: impl Into<String>,
    ) -> Result<Self, ServerRegistryDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(ServerRegistryDomainError::EmptyUrl { field });
        }

        let is_http = url::Url::parse(&normalized)
            .is_ok_and(|parsed| matches!(parsed.scheme(), "http" | "https") && parsed.has_host());
        if !is_http {
            return Err(ServerRegistryDomainError::InvalidUrl {
                field,
                value: normalized,
            });
        }

        Ok(Self(normalized))
    }

    /// Returns the URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EndpointUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EndpointUrl {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
