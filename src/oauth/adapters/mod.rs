//! Adapter implementations for the OAuth ports.

pub mod http;
pub mod memory;
pub mod postgres;
