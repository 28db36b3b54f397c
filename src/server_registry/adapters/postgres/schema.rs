//! Diesel schema for server registry persistence.

diesel::table! {
    /// Registered MCP servers, one row per (tenant, name).
    mcp_servers (id) {
        /// Server identifier.
        id -> Uuid,
        /// Owning tenant.
        #[max_length = 255]
        tenant_id -> Varchar,
        /// Human-readable name, unique per tenant.
        #[max_length = 100]
        name -> Varchar,
        /// Endpoint URL.
        url -> Text,
        /// Transport kind (`auto`, `sse`, `streamable-http`).
        #[max_length = 50]
        transport -> Varchar,
        /// Auth kind (`none`, `bearer`, `oauth`).
        #[max_length = 20]
        auth_kind -> Varchar,
        /// Encrypted bearer token.
        bearer_token -> Nullable<Text>,
        /// Dynamic OAuth provider name, unique across rows.
        #[max_length = 100]
        oauth_provider_name -> Nullable<Varchar>,
        /// OAuth authorization endpoint.
        oauth_authorization_url -> Nullable<Text>,
        /// OAuth token endpoint.
        oauth_token_url -> Nullable<Text>,
        /// OAuth client id.
        oauth_client_id -> Nullable<Text>,
        /// Encrypted OAuth client secret.
        oauth_client_secret -> Nullable<Text>,
        /// OAuth scope string.
        oauth_scope -> Nullable<Text>,
        /// Whether the pool connects to this server.
        enabled -> Bool,
        /// Connection status (`pending`, `connected`, `error`, `disabled`).
        #[max_length = 50]
        status -> Varchar,
        /// Last connection error.
        last_error -> Nullable<Text>,
        /// Last successful connection.
        last_connected_at -> Nullable<Timestamptz>,
        /// Number of tools discovered on the last connection.
        tools_count -> Int4,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
