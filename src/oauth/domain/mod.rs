//! Domain model for OAuth providers, tokens and authorization attempts.

mod pkce;
mod provider;
mod state;
mod token;

pub use pkce::{CODE_CHALLENGE_METHOD, PkcePair, challenge_for, generate_state_token};
pub use provider::{ClientSecret, OAuthProviderConfig};
pub use state::{AuthorizationPhase, AuthorizationState, PersistedAuthorizationState};
pub use token::OAuthToken;
