//! Diesel schema for OAuth persistence.

diesel::table! {
    /// Token pairs, one row per (provider, tenant).
    oauth_tokens (provider_name, tenant_id) {
        /// Provider name.
        #[max_length = 100]
        provider_name -> Varchar,
        /// Tenant identifier.
        #[max_length = 255]
        tenant_id -> Varchar,
        /// Encrypted access token.
        access_token -> Text,
        /// Encrypted refresh token.
        refresh_token -> Nullable<Text>,
        /// Access-token expiry.
        expires_at -> Nullable<Timestamptz>,
        /// Last write timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Pending authorization attempts.
    oauth_authorization_states (state) {
        /// Opaque state value.
        #[max_length = 128]
        state -> Varchar,
        /// PKCE code verifier.
        #[max_length = 128]
        code_verifier -> Varchar,
        /// Provider name.
        #[max_length = 100]
        provider_name -> Varchar,
        /// Tenant identifier.
        #[max_length = 255]
        tenant_id -> Varchar,
        /// Redirect URI sent with the request.
        redirect_uri -> Text,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Whether the code was exchanged.
        consumed -> Bool,
    }
}
