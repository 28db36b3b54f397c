//! `PostgreSQL` adapters for OAuth persistence.

mod models;
mod repository;
mod schema;

pub use repository::{PostgresAuthorizationStateStore, PostgresOAuthTokenStore};
