//! Connection status reported back onto server registry rows.

use super::ParseConnectionStatusError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of characters kept from a connection error message.
pub const MAX_ERROR_MESSAGE_LENGTH: usize = 500;

/// Connection health of a registered MCP server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No connection has been attempted yet.
    #[default]
    Pending,
    /// The last connection attempt succeeded.
    Connected,
    /// The last connection attempt failed.
    Error,
    /// The server is disabled and never attempted.
    Disabled,
}

impl ConnectionStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Connected => "connected",
            Self::Error => "error",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ConnectionStatus {
    type Error = ParseConnectionStatusError;

    fn try_from(value: &str) -> Result<Self, ParseConnectionStatusError> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "connected" => Ok(Self::Connected),
            "error" => Ok(Self::Error),
            "disabled" => Ok(Self::Disabled),
            _ => Err(ParseConnectionStatusError(value.to_owned())),
        }
    }
}

/// Outcome of one connection attempt, written back onto the server row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    status: ConnectionStatus,
    last_error: Option<String>,
    connected_at: Option<DateTime<Utc>>,
    tool_count: Option<u32>,
}

impl StatusUpdate {
    /// Records a successful connection.
    #[must_use]
    pub const fn connected(connected_at: DateTime<Utc>, tool_count: u32) -> Self {
        Self {
            status: ConnectionStatus::Connected,
            last_error: None,
            connected_at: Some(connected_at),
            tool_count: Some(tool_count),
        }
    }

    /// Records a failed connection with a truncated message.
    #[must_use]
    pub fn failed(message: &str) -> Self {
        let truncated = truncate_message(message);
        Self {
            status: ConnectionStatus::Error,
            last_error: Some(if truncated.is_empty() {
                String::from("connection failed")
            } else {
                truncated
            }),
            connected_at: None,
            tool_count: None,
        }
    }

    /// Returns the new status.
    #[must_use]
    pub const fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Returns the error message for failed attempts.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns the connection timestamp for successful attempts.
    #[must_use]
    pub const fn connected_at(&self) -> Option<DateTime<Utc>> {
        self.connected_at
    }

    /// Returns the discovered tool count for successful attempts.
    #[must_use]
    pub const fn tool_count(&self) -> Option<u32> {
        self.tool_count
    }
}

/// Trims `message` and truncates it to [`MAX_ERROR_MESSAGE_LENGTH`]
/// characters, appending an ellipsis when shortened.
#[must_use]
pub fn truncate_message(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.chars().count() <= MAX_ERROR_MESSAGE_LENGTH {
        return trimmed.to_owned();
    }

    let mut truncated: String = trimmed.chars().take(MAX_ERROR_MESSAGE_LENGTH).collect();
    truncated.push('…');
    truncated
}
