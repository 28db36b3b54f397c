//! Diesel row models for OAuth persistence.

use super::schema::{oauth_authorization_states, oauth_tokens};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Row of `oauth_tokens`.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = oauth_tokens)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OAuthTokenRow {
    /// Provider name.
    pub provider_name: String,
    /// Tenant identifier.
    pub tenant_id: String,
    /// Encrypted access token.
    pub access_token: String,
    /// Encrypted refresh token.
    pub refresh_token: Option<String>,
    /// Access-token expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Row of `oauth_authorization_states`.
#[derive(Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = oauth_authorization_states)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AuthorizationStateRow {
    /// Opaque state value.
    pub state: String,
    /// PKCE code verifier.
    pub code_verifier: String,
    /// Provider name.
    pub provider_name: String,
    /// Tenant identifier.
    pub tenant_id: String,
    /// Redirect URI.
    pub redirect_uri: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Whether the code was exchanged.
    pub consumed: bool,
}
