//! Adapter implementations for the server registry port.

pub mod memory;
pub mod postgres;
