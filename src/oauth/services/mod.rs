//! Application services for the OAuth flow.

mod callback;
mod flow;

pub use callback::AuthorizationCallback;
pub use flow::{AuthorizationRedirect, OAuthFlowEngine, OAuthFlowSettings};
