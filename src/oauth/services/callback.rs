//! Parsing of the provider redirect to the authorization callback.

use std::fmt;

/// Query parameters delivered to the OAuth redirect URI.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthorizationCallback {
    /// Opaque state issued by `start_authorization`.
    pub state: Option<String>,
    /// Authorization code, on success.
    pub code: Option<String>,
    /// OAuth error code, on failure.
    pub error: Option<String>,
    /// Human-readable error description, on failure.
    pub error_description: Option<String>,
}

impl AuthorizationCallback {
    /// Parses a raw query string such as `state=..&code=..`.
    ///
    /// Unknown parameters are ignored; blank values count as absent.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let trimmed = query.strip_prefix('?').unwrap_or(query);
        let mut callback = Self::default();
        for (key, value) in url::form_urlencoded::parse(trimmed.as_bytes()) {
            let slot = match key.as_ref() {
                "state" => &mut callback.state,
                "code" => &mut callback.code,
                "error" => &mut callback.error,
                "error_description" => &mut callback.error_description,
                _ => continue,
            };
            let normalized = value.trim();
            if !normalized.is_empty() {
                *slot = Some(normalized.to_owned());
            }
        }
        callback
    }
}

impl fmt::Debug for AuthorizationCallback {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthorizationCallback")
            .field("has_state", &self.state.is_some())
            .field("has_code", &self.code.is_some())
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
