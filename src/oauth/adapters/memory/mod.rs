//! In-memory adapters for OAuth persistence.

mod state_store;
mod token_store;

pub use state_store::InMemoryAuthorizationStateStore;
pub use token_store::InMemoryOAuthTokenStore;
