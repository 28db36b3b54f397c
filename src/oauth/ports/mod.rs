//! Port contracts for the OAuth subsystem.

mod access;
mod store;
mod token_endpoint;

pub use access::{AccessTokenSource, StoredAccessToken};
pub use store::{AuthorizationStateStore, OAuthStoreError, OAuthStoreResult, OAuthTokenStore};
#[cfg(test)]
pub(crate) use token_endpoint::MockTokenEndpoint;
pub use token_endpoint::{
    IssuedTokens, TokenEndpoint, TokenEndpointError, TokenGrant, TokenRequest,
};
