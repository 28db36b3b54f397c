//! Diesel row models for server registry persistence.

use super::schema::mcp_servers;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for `mcp_servers`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = mcp_servers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ServerRow {
    /// Server identifier.
    pub id: uuid::Uuid,
    /// Owning tenant.
    pub tenant_id: String,
    /// Server name.
    pub name: String,
    /// Endpoint URL.
    pub url: String,
    /// Transport kind.
    pub transport: String,
    /// Auth kind.
    pub auth_kind: String,
    /// Encrypted bearer token.
    pub bearer_token: Option<String>,
    /// Dynamic OAuth provider name.
    pub oauth_provider_name: Option<String>,
    /// OAuth authorization endpoint.
    pub oauth_authorization_url: Option<String>,
    /// OAuth token endpoint.
    pub oauth_token_url: Option<String>,
    /// OAuth client id.
    pub oauth_client_id: Option<String>,
    /// Encrypted OAuth client secret.
    pub oauth_client_secret: Option<String>,
    /// OAuth scope.
    pub oauth_scope: Option<String>,
    /// Enabled flag.
    pub enabled: bool,
    /// Connection status.
    pub status: String,
    /// Last connection error.
    pub last_error: Option<String>,
    /// Last successful connection.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Discovered tool count.
    pub tools_count: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert and full-update model for `mcp_servers`.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = mcp_servers)]
#[diesel(treat_none_as_null = true)]
pub struct ServerRecord {
    /// Server identifier.
    pub id: uuid::Uuid,
    /// Owning tenant.
    pub tenant_id: String,
    /// Server name.
    pub name: String,
    /// Endpoint URL.
    pub url: String,
    /// Transport kind.
    pub transport: String,
    /// Auth kind.
    pub auth_kind: String,
    /// Encrypted bearer token.
    pub bearer_token: Option<String>,
    /// Dynamic OAuth provider name.
    pub oauth_provider_name: Option<String>,
    /// OAuth authorization endpoint.
    pub oauth_authorization_url: Option<String>,
    /// OAuth token endpoint.
    pub oauth_token_url: Option<String>,
    /// OAuth client id.
    pub oauth_client_id: Option<String>,
    /// Encrypted OAuth client secret.
    pub oauth_client_secret: Option<String>,
    /// OAuth scope.
    pub oauth_scope: Option<String>,
    /// Enabled flag.
    pub enabled: bool,
    /// Connection status.
    pub status: String,
    /// Last connection error.
    pub last_error: Option<String>,
    /// Last successful connection.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Discovered tool count.
    pub tools_count: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
