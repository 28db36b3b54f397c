//! HTTP adapter for provider token endpoints.

mod token_endpoint;

pub use token_endpoint::HttpTokenEndpoint;
