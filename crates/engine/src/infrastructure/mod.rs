//! Infrastructure implementations.
//!
//! Contains port traits, their implementations, and configuration.

pub mod clock;
pub mod config;
pub mod memory_transport;
pub mod ports;
